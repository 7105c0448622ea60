use serde_json::{Map, Value};

/// Normalizes `path` and substitutes `{name}` placeholders from `path_params`.
///
/// An empty path becomes `/` and a leading slash is always present. Without
/// params the path is returned as is, placeholders included. Substitution is
/// a single left-to-right pass: values are inserted verbatim and never
/// re-scanned, and placeholders with no matching param are left untouched.
pub fn resolve_path(path: &str, path_params: Option<&Map<String, Value>>) -> String {
    let path = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let params = match path_params {
        Some(p) if !p.is_empty() => p,
        _ => return path,
    };

    let mut out = String::with_capacity(path.len());
    let mut rest = path.as_str();
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };

        let name = &tail[1..close];
        match params.get(name) {
            Some(value) => out.push_str(&param_string(value)),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

/// String form of a JSON value as used in paths: strings verbatim, everything
/// else as its JSON text.
pub(crate) fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flattens a query mapping into `key=value` pairs.
///
/// Arrays are joined with commas, which is how Mailchimp takes list-valued
/// params such as `fields` and `exclude_fields`. `null` becomes an empty value.
pub(crate) fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::Null => String::new(),
                Value::Array(items) => items
                    .iter()
                    .map(param_string)
                    .collect::<Vec<_>>()
                    .join(","),
                other => param_string(other),
            };
            (k.clone(), value)
        })
        .collect()
}
