//! Failure handlers.
//!
//! Each [`FailureKind`] is routed to its own handler, which turns the
//! [`GuardError`] into the HTTP response sent to the client. The defaults
//! answer with a JSON body `{"code": <status>, "message": <error>}`.
//! Handlers are independent: replacing one leaves the other three intact.

use std::{fmt::Display, sync::Arc};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, GuardError};

/// Turns a guard failure into a response.
pub trait FailureHandler: Send + Sync {
    fn handle(&self, error: &GuardError) -> Response;
}

impl<F> FailureHandler for F
where
    F: Fn(&GuardError) -> Response + Send + Sync,
{
    fn handle(&self, error: &GuardError) -> Response {
        self(error)
    }
}

/// Responds with a fixed status and an [`ErrorBody`] carrying the error message.
#[derive(Debug, Clone, Copy)]
pub struct StatusHandler(pub StatusCode);

impl FailureHandler for StatusHandler {
    fn handle(&self, error: &GuardError) -> Response {
        error_response(self.0, error)
    }
}

/// JSON body of the default failure responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Build an [`ErrorBody`] response.
pub fn error_response(status: StatusCode, message: &impl Display) -> Response {
    (
        status,
        Json(ErrorBody {
            code: status.as_u16(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// The four failure handlers of a guard.
#[derive(Clone)]
pub struct FailureHandlers {
    operation_not_found: Arc<dyn FailureHandler>,
    invalid_request: Arc<dyn FailureHandler>,
    invalid_response: Arc<dyn FailureHandler>,
    uncaught: Arc<dyn FailureHandler>,
}

impl Default for FailureHandlers {
    fn default() -> Self {
        Self {
            operation_not_found: Arc::new(StatusHandler(StatusCode::NOT_FOUND)),
            invalid_request: Arc::new(StatusHandler(StatusCode::BAD_REQUEST)),
            invalid_response: Arc::new(StatusHandler(StatusCode::INTERNAL_SERVER_ERROR)),
            uncaught: Arc::new(StatusHandler(StatusCode::INTERNAL_SERVER_ERROR)),
        }
    }
}

impl FailureHandlers {
    pub fn with_operation_not_found(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.operation_not_found = Arc::new(handler);
        self
    }

    pub fn with_invalid_request(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.invalid_request = Arc::new(handler);
        self
    }

    pub fn with_invalid_response(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.invalid_response = Arc::new(handler);
        self
    }

    pub fn with_uncaught(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.uncaught = Arc::new(handler);
        self
    }

    /// The handler a failure kind is routed to.
    pub fn for_kind(&self, kind: FailureKind) -> &dyn FailureHandler {
        match kind {
            FailureKind::OperationNotFound => self.operation_not_found.as_ref(),
            FailureKind::InvalidRequest => self.invalid_request.as_ref(),
            FailureKind::InvalidResponse => self.invalid_response.as_ref(),
            FailureKind::Uncaught => self.uncaught.as_ref(),
        }
    }

    pub fn handle(&self, error: &GuardError) -> Response {
        self.for_kind(error.kind()).handle(error)
    }
}

impl std::fmt::Debug for FailureHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureHandlers").finish_non_exhaustive()
    }
}
