//! Failure taxonomy of the validation pipeline.
//!
//! Every failure the guard can observe while handling a request is expressed
//! as a [`GuardError`]. The error's [`FailureKind`] selects which of the four
//! configured failure handlers turns it into an HTTP response.

use crate::validation::ValidationFailure;

/// The four policy points a failure can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No contract operation matches the request's method and route.
    OperationNotFound,
    /// The request violates its operation's parameter or body schema.
    InvalidRequest,
    /// The handler's response violates the declared response.
    InvalidResponse,
    /// Anything else, including a panic inside the wrapped handler.
    Uncaught,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::OperationNotFound => "operation_not_found",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::Uncaught => "uncaught",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a produced response was rejected.
///
/// Both variants reach the invalid-response handler, but they are different
/// conditions: the contract either says nothing about the produced status, or
/// it does and the response disagrees with it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResponseFailure {
    #[error("Response specification matching http status_code {status} not found")]
    MatchingResponseNotFound { status: u16 },

    #[error(transparent)]
    Schema(ValidationFailure),
}

/// A failure observed by the guard while handling one request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    #[error("No contract operation matches {method} {path}")]
    OperationNotFound { method: String, path: String },

    #[error(transparent)]
    InvalidRequest(ValidationFailure),

    #[error(transparent)]
    InvalidResponse(ResponseFailure),

    #[error("{0}")]
    Uncaught(String),
}

impl GuardError {
    /// The failure handler this error is routed to.
    pub fn kind(&self) -> FailureKind {
        match self {
            GuardError::OperationNotFound { .. } => FailureKind::OperationNotFound,
            GuardError::InvalidRequest(_) => FailureKind::InvalidRequest,
            GuardError::InvalidResponse(_) => FailureKind::InvalidResponse,
            GuardError::Uncaught(_) => FailureKind::Uncaught,
        }
    }
}

impl From<ResponseFailure> for GuardError {
    fn from(failure: ResponseFailure) -> Self {
        GuardError::InvalidResponse(failure)
    }
}
