//! Dotted-path lookup over resume data.
//!
//! One policy for every render mode: a path that does not resolve, or resolves
//! to `null`, reads as the empty string. Nothing here fails.

use serde_json::{Number, Value};

/// Resolves a dotted path (`personalInfo.email`, `experience.0.company`)
/// against `root`. `this`, `.` and the empty path resolve to `root` itself.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let path = path.strip_prefix("this.").unwrap_or(path);
    if path.is_empty() || path == "this" || path == "." {
        return Some(root);
    }

    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// [`lookup`] rendered as display text; missing paths become `""`.
pub fn lookup_text(root: &Value, path: &str) -> String {
    lookup(root, path).map(display_value).unwrap_or_default()
}

/// Text form of a JSON value, the way a template prints it.
///
/// Integral floats print without a fractional part (`3.0` → `3`), arrays are
/// comma-joined and objects print as nothing.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}
