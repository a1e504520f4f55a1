//! Route template normalization.
//!
//! Host routers mark path parameters in their own syntax. The contract uses
//! brace-delimited names (`/thing/{thing_id}`), and operations are looked up
//! by exact template equality, so every host template is rewritten into the
//! contract's syntax first.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};

/// Matches one parameter marker directly after a `/`:
/// `<name>` / `<name:filter>` (bottle), `{*name}` (axum wildcard),
/// `:name` (axum 0.7, express) and `*name` (wildcard).
static PARAM_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"/(?:<([^<>:/]+)(?::[^>]*)?>|\{\*([^{}/]+)\}|:([A-Za-z_][A-Za-z0-9_]*)|\*([A-Za-z_][A-Za-z0-9_]*))",
    )
    .expect("parameter marker pattern is valid")
});

/// Rewrite a host-router route template into the contract's `{name}` syntax.
///
/// Literal segments and parameter names are kept exactly. Templates that are
/// already brace-delimited, contain no parameters, or contain markers this
/// function does not recognize are returned unchanged.
pub fn normalize_template(template: &str) -> Cow<'_, str> {
    PARAM_MARKER.replace_all(template, |caps: &Captures<'_>| {
        let name = (1..=4)
            .find_map(|i| caps.get(i))
            .map(|m| m.as_str())
            .unwrap_or_default();
        format!("/{{{name}}}")
    })
}
