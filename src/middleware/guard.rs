//! The contract guard middleware.
//!
//! Runs once per matched route: resolves the route's contract operation,
//! validates the request, runs the handler, then validates the response.
//! Every failure is routed to the guard's [`FailureHandlers`] and never
//! reaches the transport.

use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{FromRequestParts, MatchedPath, RawPathParams, Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use futures::FutureExt;
use tracing::Instrument;

use crate::{
    config::ValidationSettings,
    contract::{ContractIndex, Operation, normalize_template},
    error::{FailureKind, GuardError},
    handlers::FailureHandlers,
    validation::{RequestContext, ResponseContext, read_form, validate_request, validate_response},
};

/// Settings and failure handlers of a guard.
#[derive(Debug, Clone, Default)]
pub struct GuardOptions {
    pub settings: ValidationSettings,
    pub handlers: FailureHandlers,
}

/// A contract plus the options it is enforced with.
///
/// Cheap to clone; every clone shares the same immutable state.
#[derive(Debug, Clone)]
pub struct ContractGuard {
    inner: Arc<GuardInner>,
}

#[derive(Debug)]
struct GuardInner {
    contract: Arc<ContractIndex>,
    settings: ValidationSettings,
    handlers: FailureHandlers,
}

impl ContractGuard {
    pub fn new(contract: impl Into<Arc<ContractIndex>>, options: GuardOptions) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                contract: contract.into(),
                settings: options.settings,
                handlers: options.handlers,
            }),
        }
    }

    pub fn contract(&self) -> &Arc<ContractIndex> {
        &self.inner.contract
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.inner.settings
    }

    /// A router serving the contract document at `contract_document_url`,
    /// or an empty router when serving is disabled.
    pub fn document_router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        if !self.inner.settings.serve_contract_document {
            return Router::new();
        }

        let contract = self.inner.contract.clone();
        Router::new().route(
            &self.inner.settings.contract_document_url,
            get(move || {
                let contract = contract.clone();
                async move {
                    (
                        [(header::CONTENT_TYPE, contract.document_media_type())],
                        contract.document().clone(),
                    )
                }
            }),
        )
    }

    /// Guard every route of `router` and mount the contract document route.
    ///
    /// The guard is applied with [`Router::route_layer`], so `router` must
    /// already have its routes, and none of them may use the document URL.
    pub fn install<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .route_layer(middleware::from_fn_with_state(
                self.clone(),
                contract_guard_middleware,
            ))
            .merge(self.document_router())
    }

    fn is_document_route(&self, template: &str) -> bool {
        self.inner.settings.serve_contract_document
            && template == self.inner.settings.contract_document_url
    }

    /// Steps of one guarded call. Panics are handled by the caller.
    async fn dispatch(
        &self,
        template: String,
        request: Request,
        next: Next,
    ) -> Result<Response, GuardError> {
        let settings = &self.inner.settings;

        let Some(operation) = self.inner.contract.resolve(request.method(), &template) else {
            if settings.ignore_undefined_routes {
                tracing::debug!("Route not declared in contract, passing through");
                return Ok(next.run(request).await);
            }
            return Err(GuardError::OperationNotFound {
                method: request.method().to_string(),
                path: template,
            });
        };

        let request = if settings.validate_requests {
            let (context, request) = self.request_context(request, &operation).await?;
            validate_request(&operation, &context)
                .into_result()
                .map_err(GuardError::InvalidRequest)?;
            request
        } else {
            request
        };

        let response = next.run(request).await;

        if !settings.validate_responses || is_redirect(&response) {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let context = ResponseContext {
            status: parts.status,
            headers: std::mem::take(&mut parts.headers),
            body: buffer_body(body, settings.max_body_bytes).await?,
        };
        validate_response(&operation, &context).into_result()?;

        parts.headers = context.headers;
        Ok(Response::from_parts(parts, Body::from(context.body)))
    }

    /// Buffer the request and collect what its parameters are read from.
    ///
    /// Returns the request rebuilt around the buffered body.
    async fn request_context(
        &self,
        request: Request,
        operation: &Operation,
    ) -> Result<(RequestContext, Request), GuardError> {
        let (mut parts, body) = request.into_parts();

        let path_params: HashMap<String, String> =
            match RawPathParams::from_request_parts(&mut parts, &()).await {
                Ok(params) => params
                    .iter()
                    .map(|(name, value)| (name.to_owned(), value.to_owned()))
                    .collect(),
                Err(_) => HashMap::new(),
            };

        let body = buffer_body(body, self.inner.settings.max_body_bytes).await?;

        let form = if operation.has_form_parameters() {
            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            read_form(content_type, body.clone())
                .await
                .map_err(GuardError::InvalidRequest)?
        } else {
            Vec::new()
        };

        let context = RequestContext {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            path_params,
            query: Vec::new(),
            headers: parts.headers.clone(),
            form,
            body: body.clone(),
        }
        .with_query(parts.uri.query());

        Ok((context, Request::from_parts(parts, Body::from(body))))
    }

    /// Log a failure and produce the response of its handler.
    fn fail(&self, error: &GuardError) -> Response {
        match error.kind() {
            FailureKind::Uncaught => {
                tracing::error!(kind = %error.kind(), error = %error, "Guarded call failed");
            }
            kind => {
                tracing::warn!(kind = %kind, error = %error, "Contract violation");
            }
        }
        self.inner.handlers.handle(error)
    }
}

/// Contract guard middleware.
///
/// Apply with `route_layer` so the matched route template is available:
///
/// ```ignore
/// let app = Router::new()
///     .route("/thing/{thing_id}", get(get_thing))
///     .route_layer(axum::middleware::from_fn_with_state(
///         guard.clone(),
///         contract_guard_middleware,
///     ));
/// ```
pub async fn contract_guard_middleware(
    State(guard): State<ContractGuard>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let template = normalize_template(&route).into_owned();

    // The contract document is never validated against itself
    if guard.is_document_route(&template) {
        return next.run(request).await;
    }

    let span = tracing::debug_span!(
        "contract_guard",
        method = %request.method(),
        route = %template,
    );

    async move {
        match AssertUnwindSafe(guard.dispatch(template, request, next))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => guard.fail(&error),
            Err(panic) => guard.fail(&GuardError::Uncaught(panic_message(panic.as_ref()))),
        }
    }
    .instrument(span)
    .await
}

async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, GuardError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| GuardError::Uncaught(format!("Failed to buffer body: {}", e)))
}

/// Redirects are passed through without response validation.
fn is_redirect(response: &Response) -> bool {
    response.status().is_redirection() && response.headers().contains_key(header::LOCATION)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Handler panicked: {}", message)
    } else {
        "Handler panicked".to_string()
    }
}
