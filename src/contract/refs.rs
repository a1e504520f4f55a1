//! `$ref` handling for Swagger 2.0 documents.
//!
//! Parameter, response and path item references are followed to their
//! target object. Schema references are left in place: every compiled schema
//! carries the document's `definitions`, so `#/definitions/...` pointers
//! resolve lazily while validating and recursive definitions stay recursive.

use serde_json::{Map, Value, json};

use super::ContractError;

/// Keywords whose values are instance data rather than schemas.
const VALUE_KEYWORDS: &[&str] = &["default", "enum", "example", "examples", "x-example"];

/// Prefix of the only references allowed inside schemas.
const DEFINITIONS_PREFIX: &str = "#/definitions/";

pub(crate) struct RefResolver<'a> {
    document: &'a Value,
    /// The document's `definitions`, with Swagger extensions rewritten.
    definitions: Value,
}

impl<'a> RefResolver<'a> {
    /// Longest chain of object references followed before giving up.
    const MAX_REF_HOPS: usize = 32;

    /// Prepare the document's definitions, checking every reference they make.
    pub(crate) fn new(document: &'a Value) -> Result<Self, ContractError> {
        let definitions = match document.get("definitions") {
            Some(Value::Object(definitions)) => {
                let mut prepared = Map::with_capacity(definitions.len());
                for (name, schema) in definitions {
                    prepared.insert(name.clone(), prepare_schema(schema.clone()));
                }
                Value::Object(prepared)
            }
            _ => Value::Object(Map::new()),
        };

        let resolver = Self {
            document,
            definitions,
        };
        resolver.check_refs(&resolver.definitions)?;
        Ok(resolver)
    }

    /// Follow a `$ref` chain to the referenced object. Nested values are
    /// returned as they are.
    pub(crate) fn resolve(&self, value: &Value) -> Result<Value, ContractError> {
        let mut current = value;
        for _ in 0..Self::MAX_REF_HOPS {
            match current.get("$ref").and_then(Value::as_str) {
                Some(ref_path) => current = self.lookup(ref_path)?,
                None => return Ok(current.clone()),
            }
        }
        let start = value.get("$ref").and_then(Value::as_str).unwrap_or_default();
        Err(ContractError::UnresolvedRef(start.to_string()))
    }

    /// A self-contained schema ready to compile.
    ///
    /// Schemas that reference definitions are wrapped so the definitions
    /// sit at the schema root, where `#/definitions/...` points.
    pub(crate) fn schema(&self, schema: &Value) -> Result<Value, ContractError> {
        let prepared = prepare_schema(schema.clone());
        if !self.check_refs(&prepared)? {
            return Ok(prepared);
        }
        Ok(json!({
            "definitions": self.definitions,
            "allOf": [prepared],
        }))
    }

    /// Check that every schema reference in `value` names an existing
    /// definition. Returns whether any reference was found.
    fn check_refs(&self, value: &Value) -> Result<bool, ContractError> {
        match value {
            Value::Object(map) => {
                let mut found = false;
                if let Some(Value::String(ref_path)) = map.get("$ref") {
                    let name = ref_path
                        .strip_prefix(DEFINITIONS_PREFIX)
                        .ok_or_else(|| ContractError::UnresolvedRef(ref_path.clone()))?;
                    let pointer = format!("/{}", name);
                    if self.definitions.pointer(&pointer).is_none() {
                        return Err(ContractError::UnresolvedRef(ref_path.clone()));
                    }
                    found = true;
                }
                for (key, item) in map {
                    if !VALUE_KEYWORDS.contains(&key.as_str()) {
                        found |= self.check_refs(item)?;
                    }
                }
                Ok(found)
            }
            Value::Array(items) => {
                let mut found = false;
                for item in items {
                    found |= self.check_refs(item)?;
                }
                Ok(found)
            }
            _ => Ok(false),
        }
    }

    /// Look up a local JSON pointer reference like `#/parameters/Limit`.
    fn lookup(&self, ref_path: &str) -> Result<&'a Value, ContractError> {
        let pointer = ref_path
            .strip_prefix('#')
            .ok_or_else(|| ContractError::UnresolvedRef(ref_path.to_string()))?;

        self.document
            .pointer(pointer)
            .ok_or_else(|| ContractError::UnresolvedRef(ref_path.to_string()))
    }
}

/// Rewrite Swagger's `x-nullable: true` extension as a JSON Schema `anyOf`
/// with `null`, everywhere inside `schema`.
fn prepare_schema(schema: Value) -> Value {
    match schema {
        Value::Object(mut map) => {
            let nullable = map.get("x-nullable").and_then(Value::as_bool) == Some(true);
            map.remove("x-nullable");

            let prepared: Map<String, Value> = map
                .into_iter()
                .map(|(key, item)| {
                    let item = if VALUE_KEYWORDS.contains(&key.as_str()) {
                        item
                    } else {
                        prepare_schema(item)
                    };
                    (key, item)
                })
                .collect();

            if nullable {
                json!({"anyOf": [Value::Object(prepared), {"type": "null"}]})
            } else {
                Value::Object(prepared)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(prepare_schema).collect()),
        other => other,
    }
}
