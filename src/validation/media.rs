//! Media type matching for `consumes` / `produces` lists.

/// The media type without parameters, lower-cased (`Application/JSON; charset=utf-8` -> `application/json`).
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a media type carries JSON (`application/json` or any `+json` suffix).
pub fn is_json(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Whether `content_type` is allowed by `listed`, honouring `*/*` and `type/*`.
pub fn media_type_listed(content_type: &str, listed: &[String]) -> bool {
    let actual = essence(content_type);
    let (actual_type, _) = actual.split_once('/').unwrap_or((actual.as_str(), ""));

    listed.iter().any(|candidate| {
        let candidate = essence(candidate);
        match candidate.split_once('/') {
            Some(("*", "*")) => true,
            Some((major, "*")) => major == actual_type,
            _ => candidate == actual,
        }
    })
}
