//! Contract-driven request/response validation for axum services.
//!
//! A [`ContractGuard`] holds a Swagger 2.0 contract and enforces it on every
//! route it is layered onto. For each call it resolves the route's contract
//! operation, validates the request before the handler runs and validates the
//! handler's response before it is sent. Failures are answered by four
//! replaceable [`FailureHandler`]s.
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use contract_guard::{ContractGuard, ContractIndex, GuardOptions};
//!
//! let contract = ContractIndex::from_file("swagger.yml")?;
//! let guard = ContractGuard::new(contract, GuardOptions::default());
//! let app = guard.install(
//!     Router::new()
//!         .route("/thing", get(list_things))
//!         .route("/thing/{thing_id}", get(get_thing)),
//! );
//! ```

pub mod config;
pub mod contract;
mod error;
pub mod handlers;
pub mod middleware;
#[cfg(feature = "server")]
pub mod observability;
pub mod validation;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, GuardConfig, ValidationSettings};
pub use contract::{ContractError, ContractIndex, Operation, normalize_template};
pub use error::{FailureKind, GuardError, ResponseFailure};
pub use handlers::{ErrorBody, FailureHandler, FailureHandlers, StatusHandler, error_response};
pub use middleware::{ContractGuard, GuardOptions, contract_guard_middleware};
pub use validation::{ValidationFailure, Verdict};
