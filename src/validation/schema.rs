//! Structural schema validation.
//!
//! The guard never interprets JSON Schema itself. Contract loading compiles
//! every schema through a [`SchemaValidator`], and request/response checks run
//! the resulting [`CompiledSchema`]s. [`JsonSchemaValidator`] is the default
//! implementation, backed by the `jsonschema` crate.

use std::sync::Arc;

use serde_json::Value;

/// Details about a single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// What was being validated, e.g. `query parameter 'thing_id'`.
    pub subject: Option<String>,
    /// JSON pointer to the offending value inside the validated instance.
    pub instance_path: String,
    /// JSON pointer to the schema keyword that rejected the value.
    pub schema_path: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            subject: None,
            instance_path: String::new(),
            schema_path: String::new(),
            message: message.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(subject) = &self.subject {
            write!(f, "{}: ", subject)?;
        }
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Result of a validation step.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Verdict<E = ValidationFailure> {
    Valid,
    Invalid(E),
}

impl<E> Verdict<E> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn into_result(self) -> Result<(), E> {
        match self {
            Verdict::Valid => Ok(()),
            Verdict::Invalid(reason) => Err(reason),
        }
    }

    pub fn map_invalid<F>(self, f: impl FnOnce(E) -> F) -> Verdict<F> {
        match self {
            Verdict::Valid => Verdict::Valid,
            Verdict::Invalid(reason) => Verdict::Invalid(f(reason)),
        }
    }
}

impl Verdict {
    /// Attach a subject to the failure, if any.
    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        self.map_invalid(|failure| failure.with_subject(subject))
    }
}

impl<E> From<Result<(), E>> for Verdict<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Verdict::Valid,
            Err(reason) => Verdict::Invalid(reason),
        }
    }
}

/// A schema ready to validate values.
pub trait CompiledSchema: Send + Sync + std::fmt::Debug {
    /// Validate a value, reporting the first violation found.
    fn validate(&self, value: &Value) -> Verdict;
}

/// Compiles self-contained schemas into [`CompiledSchema`]s.
///
/// References in a schema point into the schema's own root, where the
/// contract's `definitions` are placed.
pub trait SchemaValidator: Send + Sync {
    /// Compile a schema, returning a message describing why it is unusable.
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, String>;
}

/// Draft 4 JSON Schema validation, the dialect Swagger 2.0 schemas are written in.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, String> {
        let validator = jsonschema::draft4::new(schema).map_err(|e| e.to_string())?;
        Ok(Arc::new(JsonSchema {
            schema: schema.clone(),
            validator,
        }))
    }
}

struct JsonSchema {
    schema: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema for JsonSchema {
    fn validate(&self, value: &Value) -> Verdict {
        match self.validator.iter_errors(value).next() {
            None => Verdict::Valid,
            Some(e) => Verdict::Invalid(ValidationFailure {
                subject: None,
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
