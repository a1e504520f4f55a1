//! Response validation against an operation's declared responses.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use serde_json::Value;

use super::{
    ValidationFailure, Verdict,
    media::{is_json, media_type_listed},
    params::cast_values,
};
use crate::{
    contract::{Operation, ResponseSpec},
    error::ResponseFailure,
};

/// Content type assumed for responses sent without one.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A fully produced response, buffered for inspection.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseContext {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Check a produced response against the response its operation declares
/// for the status code (or the `default` response).
pub fn validate_response(operation: &Operation, response: &ResponseContext) -> Verdict<ResponseFailure> {
    let status = response.status.as_u16();
    let Some(spec) = operation.response_for(status) else {
        return Verdict::Invalid(ResponseFailure::MatchingResponseNotFound { status });
    };

    check_response(operation, spec, response)
        .map_err(ResponseFailure::Schema)
        .into()
}

fn check_response(
    operation: &Operation,
    spec: &ResponseSpec,
    response: &ResponseContext,
) -> Result<(), ValidationFailure> {
    let content_type = response.content_type();

    // Bodiless responses without a schema carry no content to type
    if (spec.schema.is_some() || !response.body.is_empty())
        && !operation.produces.is_empty()
        && !media_type_listed(content_type, &operation.produces)
    {
        return Err(ValidationFailure::new(format!(
            "Response content type '{}' is not one of {:?}",
            content_type, operation.produces
        )));
    }

    for declared in &spec.headers {
        let raw: Vec<String> = response
            .headers
            .get_all(declared.name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_owned)
            .collect();
        if raw.is_empty() {
            continue;
        }
        declared
            .schema
            .validate(&cast_values(&declared.shape, &raw))
            .with_subject(format!("response header '{}'", declared.name))
            .into_result()?;
    }

    match &spec.schema {
        Some(schema) if is_json(content_type) => {
            let value = if response.body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&response.body).map_err(|e| {
                    ValidationFailure::new(format!("Response body is not valid JSON: {}", e))
                })?
            };
            schema
                .validate(&value)
                .with_subject("response body")
                .into_result()
        }
        Some(_) => Ok(()),
        None if response.body.is_empty() => Ok(()),
        None => Err(ValidationFailure::new("Response body should be empty")),
    }
}
