//! Swagger 2.0 contract loading and operation lookup.
//!
//! A [`ContractIndex`] is built once from a contract document. Loading
//! follows parameter and response `$ref`s, merges path-level and
//! operation-level parameters, computes effective media types and compiles
//! every schema, so a malformed document fails here rather than on some
//! later request. After that the index is read-only and shared by every
//! in-flight request.
//!
//! # Usage
//!
//! ```ignore
//! use contract_guard::contract::{ContractIndex, normalize_template};
//!
//! let contract = ContractIndex::from_file("swagger.yml")?;
//! let template = normalize_template("/thing/<thing_id>");
//! let operation = contract.resolve(&http::Method::GET, &template);
//! ```

mod path;
mod refs;

use std::{collections::HashMap, path::Path, sync::Arc};

use bytes::Bytes;
use http::Method;
use serde_json::{Map, Value, json};

pub use path::normalize_template;
use refs::RefResolver;

use crate::validation::{CompiledSchema, JsonSchemaValidator, SchemaValidator};

/// Media type reported for contracts loaded from JSON or from a `Value`.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Media type reported for contracts loaded from YAML.
pub const YAML_MEDIA_TYPE: &str = "application/yaml";

/// Path item keys that declare operations.
const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Parameter keywords that carry over into the parameter's JSON Schema.
const SCHEMA_KEYWORDS: &[&str] = &[
    "type",
    "format",
    "enum",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "multipleOf",
];

/// Errors raised while loading a contract document.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Failed to read contract file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse contract JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error("Failed to parse contract YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported contract version '{0}' (only swagger 2.0 is supported)")]
    UnsupportedVersion(String),

    #[error("Malformed contract: {0}")]
    Malformed(String),

    #[error("Unresolvable reference '{0}'")]
    UnresolvedRef(String),

    #[error("Operation {method} {path} is declared more than once")]
    DuplicateOperation { method: String, path: String },

    #[error("Invalid schema at {location}: {message}")]
    InvalidSchema { location: String, message: String },
}

/// Where a parameter value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    FormData,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Body => "body",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "formData" => Some(ParameterLocation::FormData),
            "body" => Some(ParameterLocation::Body),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How array values are serialized into a single string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionFormat {
    /// Comma separated (`a,b`).
    #[default]
    Csv,
    /// Space separated (`a b`).
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated (`a|b`).
    Pipes,
    /// One value per occurrence (`?x=a&x=b`).
    Multi,
}

impl CollectionFormat {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("ssv") => CollectionFormat::Ssv,
            Some("tsv") => CollectionFormat::Tsv,
            Some("pipes") => CollectionFormat::Pipes,
            Some("multi") => CollectionFormat::Multi,
            _ => CollectionFormat::Csv,
        }
    }

    /// The separator, or `None` for `multi`.
    pub fn delimiter(&self) -> Option<char> {
        match self {
            CollectionFormat::Csv => Some(','),
            CollectionFormat::Ssv => Some(' '),
            CollectionFormat::Tsv => Some('\t'),
            CollectionFormat::Pipes => Some('|'),
            CollectionFormat::Multi => None,
        }
    }
}

/// Declared type information used to turn raw strings into typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueShape {
    pub value_type: Option<String>,
    pub items_type: Option<String>,
    pub collection_format: CollectionFormat,
}

impl ValueShape {
    fn from_declaration(declaration: &Map<String, Value>) -> Self {
        Self {
            value_type: declaration
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_owned),
            items_type: declaration
                .get("items")
                .and_then(|items| items.get("type"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            collection_format: CollectionFormat::parse(
                declaration.get("collectionFormat").and_then(Value::as_str),
            ),
        }
    }
}

/// One declared operation parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub default: Option<Value>,
    /// Type information for non-body parameters.
    pub shape: ValueShape,
    pub schema: Arc<dyn CompiledSchema>,
}

impl Parameter {
    /// Human-readable name used in failure messages.
    pub fn describe(&self) -> String {
        format!("{} parameter '{}'", self.location, self.name)
    }
}

/// A declared response header.
#[derive(Debug, Clone)]
pub struct HeaderSpec {
    pub name: String,
    pub shape: ValueShape,
    pub schema: Arc<dyn CompiledSchema>,
}

/// A declared response for one status code (or `default`).
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    /// Body schema. `None` means the response declares no body.
    pub schema: Option<Arc<dyn CompiledSchema>>,
    pub headers: Vec<HeaderSpec>,
}

/// One (method, path template) entry of the contract.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    /// Ordered path, query, header, formData, body.
    pub parameters: Vec<Parameter>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    /// Keyed by status code string or `default`.
    pub responses: HashMap<String, ResponseSpec>,
}

impl Operation {
    /// The response declared for `status`, falling back to `default`.
    pub fn response_for(&self, status: u16) -> Option<&ResponseSpec> {
        self.responses
            .get(status.to_string().as_str())
            .or_else(|| self.responses.get("default"))
    }

    pub fn has_form_parameters(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.location == ParameterLocation::FormData)
    }
}

/// The loaded contract: every operation plus the raw document.
#[derive(Debug)]
pub struct ContractIndex {
    document: Bytes,
    media_type: &'static str,
    /// Path template -> upper-case method -> operation.
    operations: HashMap<String, HashMap<String, Arc<Operation>>>,
}

impl ContractIndex {
    /// Load a contract from an in-memory document.
    pub fn from_value(document: Value) -> Result<Self, ContractError> {
        Self::from_value_with(document, &JsonSchemaValidator)
    }

    /// Load a contract from an in-memory document, compiling schemas with `validator`.
    pub fn from_value_with(
        document: Value,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, ContractError> {
        let raw = Bytes::from(serde_json::to_vec(&document)?);
        Self::build(&document, raw, JSON_MEDIA_TYPE, validator)
    }

    /// Load a contract from JSON text. The text is kept verbatim for serving.
    pub fn from_json_str(text: &str) -> Result<Self, ContractError> {
        let document: Value = serde_json::from_str(text)?;
        Self::build(
            &document,
            Bytes::copy_from_slice(text.as_bytes()),
            JSON_MEDIA_TYPE,
            &JsonSchemaValidator,
        )
    }

    /// Load a contract from YAML text. The text is kept verbatim for serving.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, ContractError> {
        // Through serde_yaml::Value so integer keys (`200:`) become strings
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        let document = serde_json::to_value(yaml)?;
        Self::build(
            &document,
            Bytes::copy_from_slice(text.as_bytes()),
            YAML_MEDIA_TYPE,
            &JsonSchemaValidator,
        )
    }

    /// Load a contract file. `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContractError::Io(e, path.to_path_buf()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            #[cfg(not(feature = "yaml"))]
            Some("yaml" | "yml") => Err(ContractError::Malformed(
                "YAML contracts require the 'yaml' feature".into(),
            )),
            _ => Self::from_json_str(&text),
        }
    }

    /// Find the operation for a method and a normalized path template.
    ///
    /// The method is compared case-insensitively; the template must match the
    /// contract's path key exactly.
    pub fn resolve(&self, method: &Method, template: &str) -> Option<Arc<Operation>> {
        self.operations
            .get(template)?
            .get(method.as_str().to_ascii_uppercase().as_str())
            .cloned()
    }

    /// The contract document exactly as it was supplied.
    pub fn document(&self) -> &Bytes {
        &self.document
    }

    pub fn document_media_type(&self) -> &'static str {
        self.media_type
    }

    /// Every operation, sorted by path then method.
    pub fn operations(&self) -> Vec<Arc<Operation>> {
        let mut operations: Vec<_> = self
            .operations
            .values()
            .flat_map(|by_method| by_method.values().cloned())
            .collect();
        operations.sort_by(|a, b| {
            (a.path.as_str(), a.method.as_str()).cmp(&(b.path.as_str(), b.method.as_str()))
        });
        operations
    }

    pub fn len(&self) -> usize {
        self.operations.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(
        document: &Value,
        raw: Bytes,
        media_type: &'static str,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, ContractError> {
        let root = document
            .as_object()
            .ok_or_else(|| ContractError::Malformed("document must be an object".into()))?;

        match root.get("swagger").and_then(Value::as_str) {
            Some("2.0") => {}
            Some(other) => return Err(ContractError::UnsupportedVersion(other.to_string())),
            None => {
                return Err(ContractError::Malformed(
                    "missing 'swagger' version field".into(),
                ));
            }
        }

        let paths = root
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| ContractError::Malformed("missing 'paths' object".into()))?;

        let loader = OperationLoader {
            resolver: RefResolver::new(document)?,
            validator,
            consumes: media_types(root.get("consumes")),
            produces: media_types(root.get("produces")),
        };

        let mut operations = HashMap::with_capacity(paths.len());
        for (path, item) in paths {
            if path.starts_with("x-") {
                continue;
            }
            let item = loader.resolver.resolve(item)?;
            let item = item.as_object().ok_or_else(|| {
                ContractError::Malformed(format!("path item '{}' must be an object", path))
            })?;

            let mut by_method: HashMap<String, Arc<Operation>> = HashMap::new();
            for (key, definition) in item {
                if !HTTP_METHODS.contains(&key.to_ascii_lowercase().as_str()) {
                    continue;
                }
                let operation = loader.load(path, key, item.get("parameters"), definition)?;
                let method = operation.method.as_str().to_string();
                if by_method.insert(method.clone(), Arc::new(operation)).is_some() {
                    return Err(ContractError::DuplicateOperation {
                        method,
                        path: path.clone(),
                    });
                }
            }
            operations.insert(path.clone(), by_method);
        }

        let index = Self {
            document: raw,
            media_type,
            operations,
        };
        tracing::debug!(operations = index.len(), "Contract loaded");
        Ok(index)
    }
}

/// Builds [`Operation`]s from raw path item entries.
struct OperationLoader<'a> {
    resolver: RefResolver<'a>,
    validator: &'a dyn SchemaValidator,
    consumes: Vec<String>,
    produces: Vec<String>,
}

impl OperationLoader<'_> {
    fn load(
        &self,
        path: &str,
        method: &str,
        shared_parameters: Option<&Value>,
        definition: &Value,
    ) -> Result<Operation, ContractError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| ContractError::Malformed(format!("{} {}: {}", method, path, e)))?;
        let context = format!("{} {}", method, path);

        let definition = definition.as_object().ok_or_else(|| {
            ContractError::Malformed(format!("operation {} must be an object", context))
        })?;

        let parameters =
            self.load_parameters(&context, shared_parameters, definition.get("parameters"))?;

        let responses = definition
            .get("responses")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ContractError::Malformed(format!("operation {} has no 'responses'", context))
            })?;
        let mut response_specs = HashMap::with_capacity(responses.len());
        for (code, response) in responses {
            if code.starts_with("x-") {
                continue;
            }
            let location = format!("{} responses/{}", context, code);
            response_specs.insert(code.clone(), self.load_response(&location, response)?);
        }

        Ok(Operation {
            method,
            path: path.to_string(),
            operation_id: definition
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_owned),
            parameters,
            consumes: definition
                .get("consumes")
                .map(|c| media_types(Some(c)))
                .unwrap_or_else(|| self.consumes.clone()),
            produces: definition
                .get("produces")
                .map(|p| media_types(Some(p)))
                .unwrap_or_else(|| self.produces.clone()),
            responses: response_specs,
        })
    }

    /// Merge path-level and operation-level parameters; the operation wins on
    /// the same name and location.
    fn load_parameters(
        &self,
        context: &str,
        shared: Option<&Value>,
        own: Option<&Value>,
    ) -> Result<Vec<Parameter>, ContractError> {
        let declared = [shared, own]
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten();

        let mut merged: Vec<(String, ParameterLocation, Map<String, Value>)> = Vec::new();
        for raw in declared {
            let resolved = self.resolver.resolve(raw)?;
            let Value::Object(declaration) = resolved else {
                return Err(ContractError::Malformed(format!(
                    "parameter of {} must be an object",
                    context
                )));
            };
            let name = declaration
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ContractError::Malformed(format!("parameter of {} has no name", context))
                })?
                .to_string();
            let location = declaration
                .get("in")
                .and_then(Value::as_str)
                .and_then(ParameterLocation::parse)
                .ok_or_else(|| {
                    ContractError::Malformed(format!(
                        "parameter '{}' of {} has a missing or unknown 'in'",
                        name, context
                    ))
                })?;

            match merged
                .iter_mut()
                .find(|(n, l, _)| *n == name && *l == location)
            {
                Some(existing) => existing.2 = declaration,
                None => merged.push((name, location, declaration)),
            }
        }

        let mut parameters = merged
            .into_iter()
            .map(|(name, location, declaration)| {
                self.load_parameter(context, name, location, &declaration)
            })
            .collect::<Result<Vec<_>, _>>()?;
        parameters.sort_by_key(|p| p.location);
        Ok(parameters)
    }

    fn load_parameter(
        &self,
        context: &str,
        name: String,
        location: ParameterLocation,
        declaration: &Map<String, Value>,
    ) -> Result<Parameter, ContractError> {
        let schema_location = format!("{} {} parameter '{}'", context, location, name);
        let schema = if location == ParameterLocation::Body {
            declaration.get("schema").cloned().ok_or_else(|| {
                ContractError::Malformed(format!("{} has no 'schema'", schema_location))
            })?
        } else {
            value_schema(declaration)
        };

        Ok(Parameter {
            required: location == ParameterLocation::Path
                || declaration
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            default: declaration.get("default").cloned(),
            shape: ValueShape::from_declaration(declaration),
            schema: self.compile(&schema_location, &schema)?,
            name,
            location,
        })
    }

    fn load_response(&self, location: &str, response: &Value) -> Result<ResponseSpec, ContractError> {
        let response = self.resolver.resolve(response)?;

        let schema = match response.get("schema") {
            Some(schema) => Some(self.compile(location, schema)?),
            None => None,
        };

        let mut headers = Vec::new();
        if let Some(declared) = response.get("headers").and_then(Value::as_object) {
            for (name, header) in declared {
                let Some(header) = header.as_object() else {
                    continue;
                };
                headers.push(HeaderSpec {
                    name: name.clone(),
                    shape: ValueShape::from_declaration(header),
                    schema: self.compile(
                        &format!("{} header '{}'", location, name),
                        &value_schema(header),
                    )?,
                });
            }
        }

        Ok(ResponseSpec { schema, headers })
    }

    fn compile(&self, location: &str, schema: &Value) -> Result<Arc<dyn CompiledSchema>, ContractError> {
        let schema = self.resolver.schema(schema)?;
        self.validator
            .compile(&schema)
            .map_err(|message| ContractError::InvalidSchema {
                location: location.to_string(),
                message,
            })
    }
}

/// JSON Schema for a non-body parameter or header declaration.
///
/// Swagger describes these inline (`type`, `format`, `items`, bounds, ...);
/// `file` parameters accept any value.
fn value_schema(declaration: &Map<String, Value>) -> Value {
    if declaration.get("type").and_then(Value::as_str) == Some("file") {
        return json!({});
    }

    let mut schema: Map<String, Value> = SCHEMA_KEYWORDS
        .iter()
        .filter_map(|key| {
            declaration
                .get(*key)
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect();

    if let Some(Value::Object(items)) = declaration.get("items") {
        schema.insert("items".into(), value_schema(items));
    }

    Value::Object(schema)
}

fn media_types(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"version": "1.0.0", "title": "things"},
            "consumes": ["application/json"],
            "produces": ["application/json"],
            "definitions": {
                "Thing": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {"id": {"type": "string"}}
                }
            },
            "parameters": {
                "Trace": {"name": "X-Trace", "in": "header", "type": "string"}
            },
            "paths": {
                "/thing": {
                    "get": {
                        "operationId": "listThings",
                        "responses": {
                            "200": {"description": "", "schema": {"$ref": "#/definitions/Thing"}},
                            "default": {"description": "error"}
                        }
                    },
                    "post": {
                        "consumes": ["application/vnd.thing+json"],
                        "parameters": [
                            {"name": "thing", "in": "body", "required": true,
                             "schema": {"$ref": "#/definitions/Thing"}},
                            {"name": "dry_run", "in": "query", "type": "boolean"},
                            {"$ref": "#/parameters/Trace"}
                        ],
                        "responses": {"201": {"description": ""}}
                    }
                },
                "/thing/{thing_id}": {
                    "parameters": [
                        {"name": "thing_id", "in": "path", "type": "string"},
                        {"name": "verbose", "in": "query", "type": "string"}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "verbose", "in": "query", "type": "boolean"}
                        ],
                        "responses": {
                            "200": {
                                "description": "",
                                "headers": {"X-Rate": {"type": "integer"}}
                            }
                        }
                    }
                },
                "x-internal": {"note": "ignored"}
            }
        })
    }

    #[test]
    fn test_resolve_exact_template() {
        let index = ContractIndex::from_value(contract()).unwrap();
        assert_eq!(index.len(), 3);

        let op = index.resolve(&Method::GET, "/thing").unwrap();
        assert_eq!(op.operation_id.as_deref(), Some("listThings"));
        assert!(index.resolve(&Method::GET, "/thing/{thing_id}").is_some());

        // No fuzzy matching: trailing slashes and unknown paths miss
        assert!(index.resolve(&Method::GET, "/thing/").is_none());
        assert!(index.resolve(&Method::GET, "/thing/{id}").is_none());
        assert!(index.resolve(&Method::DELETE, "/thing").is_none());
        assert!(index.resolve(&Method::GET, "x-internal").is_none());
    }

    #[test]
    fn test_resolve_method_case_insensitive() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let lower = Method::from_bytes(b"get").unwrap();
        assert!(index.resolve(&lower, "/thing").is_some());
    }

    #[test]
    fn test_parameters_ordered_by_location() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let locations: Vec<_> = op.parameters.iter().map(|p| p.location).collect();
        assert_eq!(
            locations,
            vec![
                ParameterLocation::Query,
                ParameterLocation::Header,
                ParameterLocation::Body
            ]
        );
        assert_eq!(op.parameters[1].name, "X-Trace");
    }

    #[test]
    fn test_operation_parameters_override_path_parameters() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        assert_eq!(op.parameters.len(), 2);

        let thing_id = &op.parameters[0];
        assert_eq!(thing_id.location, ParameterLocation::Path);
        assert!(thing_id.required, "path parameters are always required");

        let verbose = &op.parameters[1];
        assert_eq!(verbose.shape.value_type.as_deref(), Some("boolean"));
    }

    #[test]
    fn test_media_types_override() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let get = index.resolve(&Method::GET, "/thing").unwrap();
        assert_eq!(get.consumes, vec!["application/json"]);

        let post = index.resolve(&Method::POST, "/thing").unwrap();
        assert_eq!(post.consumes, vec!["application/vnd.thing+json"]);
        assert_eq!(post.produces, vec!["application/json"]);
    }

    #[test]
    fn test_response_lookup_falls_back_to_default() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let op = index.resolve(&Method::GET, "/thing").unwrap();
        assert!(op.response_for(200).unwrap().schema.is_some());
        assert!(op.response_for(500).unwrap().schema.is_none());

        let post = index.resolve(&Method::POST, "/thing").unwrap();
        assert!(post.response_for(201).is_some());
        assert!(post.response_for(200).is_none());
    }

    #[test]
    fn test_response_headers_loaded() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let response = op.response_for(200).unwrap();
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.headers[0].name, "X-Rate");
    }

    #[test]
    fn test_document_served_verbatim() {
        let text = serde_json::to_string_pretty(&contract()).unwrap();
        let index = ContractIndex::from_json_str(&text).unwrap();
        assert_eq!(index.document().as_ref(), text.as_bytes());
        assert_eq!(index.document_media_type(), JSON_MEDIA_TYPE);

        let from_value = ContractIndex::from_value(contract()).unwrap();
        let served: Value = serde_json::from_slice(from_value.document()).unwrap();
        assert_eq!(served, contract());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_contract() {
        let text = include_str!("../../demos/swagger.yml");
        let index = ContractIndex::from_yaml_str(text).unwrap();
        assert_eq!(index.document().as_ref(), text.as_bytes());
        assert_eq!(index.document_media_type(), YAML_MEDIA_TYPE);

        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        assert!(op.response_for(200).is_some());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(&path, contract().to_string()).unwrap();

        let index = ContractIndex::from_file(&path).unwrap();
        assert_eq!(index.len(), 3);

        let missing = ContractIndex::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ContractError::Io(..)));
    }

    #[test]
    fn test_operations_sorted() {
        let index = ContractIndex::from_value(contract()).unwrap();
        let listed: Vec<_> = index
            .operations()
            .iter()
            .map(|op| format!("{} {}", op.method, op.path))
            .collect();
        assert_eq!(
            listed,
            vec!["GET /thing", "POST /thing", "GET /thing/{thing_id}"]
        );
    }

    #[test]
    fn test_rejects_non_swagger_documents() {
        let err = ContractIndex::from_value(json!([])).unwrap_err();
        assert!(matches!(err, ContractError::Malformed(_)));

        let err = ContractIndex::from_value(json!({"paths": {}})).unwrap_err();
        assert!(matches!(err, ContractError::Malformed(_)));

        let err = ContractIndex::from_value(json!({"openapi": "3.0.0", "swagger": "3.0", "paths": {}}))
            .unwrap_err();
        assert!(matches!(err, ContractError::UnsupportedVersion(v) if v == "3.0"));

        let err = ContractIndex::from_value(json!({"swagger": "2.0"})).unwrap_err();
        assert!(err.to_string().contains("paths"));
    }

    #[test]
    fn test_rejects_operation_without_responses() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {"get": {}}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("GET /thing"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_parameter_location() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {"get": {
                "parameters": [{"name": "x", "in": "cookie", "type": "string"}],
                "responses": {"200": {"description": ""}}
            }}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("'x'"), "{err}");
    }

    #[test]
    fn test_rejects_body_parameter_without_schema() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {"post": {
                "parameters": [{"name": "thing", "in": "body"}],
                "responses": {"200": {"description": ""}}
            }}}
        }))
        .unwrap_err();
        assert!(matches!(err, ContractError::Malformed(_)));
    }

    #[test]
    fn test_rejects_unresolvable_reference() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {"get": {
                "responses": {"200": {"description": "", "schema": {"$ref": "#/definitions/Nope"}}}
            }}}
        }))
        .unwrap_err();
        assert!(matches!(err, ContractError::UnresolvedRef(_)));
    }

    #[test]
    fn test_recursive_definitions_stay_recursive() {
        let properties: Map<String, Value> = (0..6)
            .map(|i| (format!("p{}", i), json!({"$ref": "#/definitions/Props"})))
            .chain([("value".to_string(), json!({"type": "integer"}))])
            .collect();
        let index = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "definitions": {"Props": {"type": "object", "properties": properties}},
            "paths": {"/props": {"get": {
                "responses": {"200": {"description": "", "schema": {"$ref": "#/definitions/Props"}}}
            }}}
        }))
        .unwrap();
        let op = index.resolve(&Method::GET, "/props").unwrap();
        let schema = op.response_for(200).unwrap().schema.clone().unwrap();

        let mut body = json!({"value": "not an integer"});
        for i in 0..15 {
            body = json!({format!("p{}", i % 6): body});
        }
        let failure = schema.validate(&body).into_result().unwrap_err();
        assert!(failure.instance_path.ends_with("/value"));
    }

    #[test]
    fn test_rejects_invalid_schema() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {"get": {
                "responses": {"200": {"description": "", "schema": {"type": 5}}}
            }}}
        }))
        .unwrap_err();
        assert!(matches!(err, ContractError::InvalidSchema { .. }));
    }

    #[test]
    fn test_rejects_duplicate_operation() {
        let err = ContractIndex::from_value(json!({
            "swagger": "2.0",
            "paths": {"/thing": {
                "get": {"responses": {"200": {"description": ""}}},
                "GET": {"responses": {"200": {"description": ""}}}
            }}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ContractError::DuplicateOperation { ref method, ref path } if method == "GET" && path == "/thing"
        ));
    }

    #[test]
    fn test_value_schema_from_declaration() {
        let declaration = json!({
            "name": "ids",
            "in": "query",
            "type": "array",
            "collectionFormat": "pipes",
            "minItems": 1,
            "items": {"type": "integer", "minimum": 0}
        });
        let schema = value_schema(declaration.as_object().unwrap());
        assert_eq!(
            schema,
            json!({"type": "array", "minItems": 1, "items": {"type": "integer", "minimum": 0}})
        );

        let file = json!({"name": "upload", "in": "formData", "type": "file"});
        assert_eq!(value_schema(file.as_object().unwrap()), json!({}));
    }
}
