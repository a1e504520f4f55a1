use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which validation steps run and how the contract document is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationSettings {
    /// Validate requests before the handler runs.
    #[serde(default = "default_true")]
    pub validate_requests: bool,

    /// Validate handler responses before they are sent.
    #[serde(default = "default_true")]
    pub validate_responses: bool,

    /// Let requests to routes the contract does not declare through untouched
    /// instead of answering with the operation-not-found handler.
    #[serde(default)]
    pub ignore_undefined_routes: bool,

    /// Mount a GET route that serves the contract document.
    #[serde(default = "default_true")]
    pub serve_contract_document: bool,

    /// Path the contract document is served at.
    #[serde(default = "default_contract_document_url")]
    pub contract_document_url: String,

    /// Contract file loaded by the `contract-guard` binary (JSON or YAML).
    #[serde(default)]
    pub contract_path: Option<PathBuf>,

    /// Maximum request or response body buffered for validation.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            validate_requests: true,
            validate_responses: true,
            ignore_undefined_routes: false,
            serve_contract_document: true,
            contract_document_url: default_contract_document_url(),
            contract_path: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_contract_document_url() -> String {
    "/swagger.json".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}
