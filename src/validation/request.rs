//! Request validation against an operation's declared parameters.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
};
use bytes::Bytes;
use http::{HeaderMap, Method, header};
use serde_json::Value;

use super::{
    ValidationFailure, Verdict,
    media::{essence, is_json, media_type_listed},
    params::cast_values,
};
use crate::contract::{Operation, Parameter, ParameterLocation};

/// Content type assumed for bodies sent without one.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The parts of a live request that parameters are read from.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    /// Path parameters as captured by the router.
    pub path_params: HashMap<String, String>,
    /// Decoded query pairs, in order, repeats included.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// Decoded form fields, read only for operations with formData parameters.
    pub form: Vec<(String, String)>,
    pub body: Bytes,
}

impl RequestContext {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Parse a raw query string into [`RequestContext::query`].
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        self
    }

    /// Every raw occurrence of a non-body parameter.
    fn raw_values(&self, parameter: &Parameter) -> Vec<String> {
        let pairs = |source: &[(String, String)]| -> Vec<String> {
            source
                .iter()
                .filter(|(name, _)| *name == parameter.name)
                .map(|(_, value)| value.clone())
                .collect()
        };

        match parameter.location {
            ParameterLocation::Path => self
                .path_params
                .get(&parameter.name)
                .cloned()
                .into_iter()
                .collect(),
            ParameterLocation::Query => pairs(&self.query),
            ParameterLocation::FormData => pairs(&self.form),
            ParameterLocation::Header => self
                .headers
                .get_all(parameter.name.as_str())
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_owned)
                .collect(),
            ParameterLocation::Body => Vec::new(),
        }
    }
}

/// Decode form fields from an urlencoded or multipart body.
///
/// File parts contribute their file name as the field value.
pub async fn read_form(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Vec<(String, String)>, ValidationFailure> {
    let Some(content_type) = content_type else {
        return Ok(Vec::new());
    };

    match essence(content_type).as_str() {
        "application/x-www-form-urlencoded" => Ok(url::form_urlencoded::parse(&body)
            .into_owned()
            .collect()),
        "multipart/form-data" => {
            let request = http::Request::builder()
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .map_err(|e| ValidationFailure::new(format!("Invalid multipart request: {}", e)))?;
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| ValidationFailure::new(e.body_text()))?;

            let mut fields = Vec::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| ValidationFailure::new(e.body_text()))?
            {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                let value = match field.file_name() {
                    Some(file_name) => file_name.to_owned(),
                    None => field
                        .text()
                        .await
                        .map_err(|e| ValidationFailure::new(e.body_text()))?,
                };
                fields.push((name, value));
            }
            Ok(fields)
        }
        _ => Ok(Vec::new()),
    }
}

/// Check a request against every parameter of its operation.
///
/// Parameters are visited path, query, header, formData, body; the first
/// violation wins.
pub fn validate_request(operation: &Operation, request: &RequestContext) -> Verdict {
    operation
        .parameters
        .iter()
        .try_for_each(|parameter| match parameter.location {
            ParameterLocation::Body => check_body(operation, parameter, request),
            _ => check_value(parameter, request),
        })
        .into()
}

fn check_value(parameter: &Parameter, request: &RequestContext) -> Result<(), ValidationFailure> {
    let raw = request.raw_values(parameter);
    let value = if raw.is_empty() {
        match missing_value(parameter)? {
            Some(default) => default,
            None => return Ok(()),
        }
    } else {
        cast_values(&parameter.shape, &raw)
    };

    parameter
        .schema
        .validate(&value)
        .with_subject(parameter.describe())
        .into_result()
}

fn check_body(
    operation: &Operation,
    parameter: &Parameter,
    request: &RequestContext,
) -> Result<(), ValidationFailure> {
    let value = if request.body.is_empty() {
        match missing_value(parameter)? {
            Some(default) => default,
            None => return Ok(()),
        }
    } else {
        let content_type = request.content_type().unwrap_or(DEFAULT_CONTENT_TYPE);
        if !operation.consumes.is_empty() && !media_type_listed(content_type, &operation.consumes)
        {
            return Err(ValidationFailure::new(format!(
                "Request content type '{}' is not one of {:?}",
                content_type, operation.consumes
            )));
        }

        if is_json(content_type) {
            serde_json::from_slice(&request.body).map_err(|e| {
                ValidationFailure::new(format!("Request body is not valid JSON: {}", e))
                    .with_subject(parameter.describe())
            })?
        } else {
            Value::String(String::from_utf8_lossy(&request.body).into_owned())
        }
    };

    parameter
        .schema
        .validate(&value)
        .with_subject(parameter.describe())
        .into_result()
}

/// The value to validate for an absent parameter, or an error if it is required.
fn missing_value(parameter: &Parameter) -> Result<Option<Value>, ValidationFailure> {
    if parameter.required {
        return Err(ValidationFailure::new(format!(
            "Required parameter '{}' not found",
            parameter.name
        )));
    }
    Ok(parameter.default.clone())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::contract::ContractIndex;

    fn contract() -> ContractIndex {
        ContractIndex::from_value(json!({
            "swagger": "2.0",
            "consumes": ["application/json"],
            "paths": {
                "/thing/{thing_id}": {
                    "get": {
                        "parameters": [
                            {"name": "thing_id", "in": "path", "type": "integer", "minimum": 1},
                            {"name": "verbose", "in": "query", "type": "boolean"},
                            {"name": "tags", "in": "query", "type": "array",
                             "items": {"type": "string", "enum": ["a", "b"]},
                             "collectionFormat": "multi"},
                            {"name": "limit", "in": "query", "type": "integer",
                             "maximum": 10, "default": 5},
                            {"name": "X-Thing-Id", "in": "header", "type": "string",
                             "required": true, "pattern": "^[0-9]+$"}
                        ],
                        "responses": {"200": {"description": ""}}
                    }
                },
                "/thing": {
                    "post": {
                        "parameters": [
                            {"name": "thing", "in": "body", "required": true,
                             "schema": {"type": "object", "required": ["id"],
                                        "properties": {"id": {"type": "string"}}}}
                        ],
                        "responses": {"200": {"description": ""}}
                    }
                },
                "/thing_formdata": {
                    "post": {
                        "consumes": ["application/x-www-form-urlencoded", "multipart/form-data"],
                        "parameters": [
                            {"name": "thing_id", "in": "formData", "type": "string", "required": true}
                        ],
                        "responses": {"200": {"description": ""}}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn get_request(thing_id: &str, query: Option<&str>, header: Option<&str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(value) = header {
            headers.insert("x-thing-id", value.parse().unwrap());
        }
        RequestContext {
            method: Method::GET,
            path: format!("/thing/{}", thing_id),
            path_params: HashMap::from([("thing_id".to_string(), thing_id.to_string())]),
            headers,
            ..Default::default()
        }
        .with_query(query)
    }

    fn post_request(body: &str, content_type: Option<&str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type {
            headers.insert(header::CONTENT_TYPE, value.parse().unwrap());
        }
        RequestContext {
            method: Method::POST,
            path: "/thing".into(),
            headers,
            body: Bytes::copy_from_slice(body.as_bytes()),
            ..Default::default()
        }
    }

    fn failure(verdict: Verdict) -> ValidationFailure {
        verdict.into_result().unwrap_err()
    }

    #[test]
    fn test_valid_parameters() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let request = get_request("12", Some("verbose=true&tags=a&tags=b"), Some("12"));
        assert!(validate_request(&op, &request).is_valid());
    }

    #[test]
    fn test_path_parameter_cast_and_checked() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();

        let err = failure(validate_request(&op, &get_request("abc", None, Some("1"))));
        assert_eq!(err.subject.as_deref(), Some("path parameter 'thing_id'"));

        let err = failure(validate_request(&op, &get_request("0", None, Some("1"))));
        assert_eq!(err.subject.as_deref(), Some("path parameter 'thing_id'"));
    }

    #[test]
    fn test_query_parameter_type_mismatch() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let err = failure(validate_request(
            &op,
            &get_request("1", Some("verbose=maybe"), Some("1")),
        ));
        assert_eq!(err.subject.as_deref(), Some("query parameter 'verbose'"));
    }

    #[test]
    fn test_multi_array_items_checked() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let err = failure(validate_request(
            &op,
            &get_request("1", Some("tags=a&tags=c"), Some("1")),
        ));
        assert_eq!(err.subject.as_deref(), Some("query parameter 'tags'"));
        assert_eq!(err.instance_path, "/1");
    }

    #[test]
    fn test_missing_required_header() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let err = failure(validate_request(&op, &get_request("1", None, None)));
        assert_eq!(err.message, "Required parameter 'X-Thing-Id' not found");
    }

    #[test]
    fn test_header_pattern_checked() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let err = failure(validate_request(&op, &get_request("1", None, Some("abc"))));
        assert_eq!(err.subject.as_deref(), Some("header parameter 'X-Thing-Id'"));
    }

    #[test]
    fn test_query_value_bound_checked() {
        let index = contract();
        let op = index.resolve(&Method::GET, "/thing/{thing_id}").unwrap();
        let err = failure(validate_request(
            &op,
            &get_request("1", Some("limit=11"), Some("1")),
        ));
        assert_eq!(err.subject.as_deref(), Some("query parameter 'limit'"));
    }

    #[test]
    fn test_valid_body() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let request = post_request(r#"{"id": "123"}"#, Some("application/json"));
        assert!(validate_request(&op, &request).is_valid());

        // No content type defaults to JSON
        let request = post_request(r#"{"id": "123"}"#, None);
        assert!(validate_request(&op, &request).is_valid());
    }

    #[test]
    fn test_invalid_body() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let err = failure(validate_request(
            &op,
            &post_request(r#"{"not_id": "123"}"#, Some("application/json")),
        ));
        assert_eq!(err.subject.as_deref(), Some("body parameter 'thing'"));
        assert!(err.message.contains("id"), "{}", err.message);
    }

    #[test]
    fn test_missing_required_body() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let err = failure(validate_request(&op, &post_request("", None)));
        assert_eq!(err.message, "Required parameter 'thing' not found");
    }

    #[test]
    fn test_malformed_json_body() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let err = failure(validate_request(&op, &post_request("{", None)));
        assert!(err.message.starts_with("Request body is not valid JSON"));
    }

    #[test]
    fn test_body_content_type_must_be_consumed() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing").unwrap();
        let err = failure(validate_request(
            &op,
            &post_request(r#"{"id": "1"}"#, Some("text/plain")),
        ));
        assert!(err.message.contains("text/plain"), "{}", err.message);
    }

    #[tokio::test]
    async fn test_read_urlencoded_form() {
        let form = read_form(
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"thing_id=123&name=a+b"),
        )
        .await
        .unwrap();
        assert_eq!(
            form,
            vec![
                ("thing_id".to_string(), "123".to_string()),
                ("name".to_string(), "a b".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_read_multipart_form() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"thing_id\"\r\n\r\n\
            123\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"thing.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            contents\r\n\
            --XYZ--\r\n";
        let form = read_form(
            Some("multipart/form-data; boundary=XYZ"),
            Bytes::from(body),
        )
        .await
        .unwrap();
        assert_eq!(
            form,
            vec![
                ("thing_id".to_string(), "123".to_string()),
                ("upload".to_string(), "thing.txt".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_form_parameters() {
        let index = contract();
        let op = index.resolve(&Method::POST, "/thing_formdata").unwrap();

        let mut request = RequestContext {
            method: Method::POST,
            path: "/thing_formdata".into(),
            ..Default::default()
        };
        request.form = read_form(
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"thing_id=123"),
        )
        .await
        .unwrap();
        assert!(validate_request(&op, &request).is_valid());

        request.form.clear();
        let err = failure(validate_request(&op, &request));
        assert_eq!(err.message, "Required parameter 'thing_id' not found");
    }

    #[tokio::test]
    async fn test_unknown_form_content_type_reads_nothing() {
        let form = read_form(Some("text/plain"), Bytes::from_static(b"thing_id=1"))
            .await
            .unwrap();
        assert!(form.is_empty());
        assert!(read_form(None, Bytes::new()).await.unwrap().is_empty());
    }
}
