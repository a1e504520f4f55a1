//! Request and response validation against a loaded contract.
//!
//! The checks here are pure functions of an [`Operation`](crate::contract::Operation)
//! and a buffered request or response. They never invoke handlers and never
//! modify what they inspect; the middleware decides what to do with a
//! [`Verdict`].
//!
//! # Usage
//!
//! ```ignore
//! use contract_guard::validation::{RequestContext, validate_request};
//!
//! let request = RequestContext {
//!     method: http::Method::GET,
//!     path: "/thing/123".into(),
//!     ..Default::default()
//! };
//! if let Err(failure) = validate_request(&operation, &request).into_result() {
//!     tracing::warn!("Request rejected: {}", failure);
//! }
//! ```

mod media;
mod params;
mod request;
mod response;
mod schema;

pub use media::{essence, is_json, media_type_listed};
pub use params::cast_values;
pub use request::{RequestContext, read_form, validate_request};
pub use response::{ResponseContext, validate_response};
pub use schema::{CompiledSchema, JsonSchemaValidator, SchemaValidator, ValidationFailure, Verdict};
