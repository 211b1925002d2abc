//! Template helper library.
//!
//! Every helper is a pure function from positional JSON arguments to a JSON
//! value. The expander exposes each one three ways: as a value (`{{formatDate
//! startDate "YYYY-MM"}}`), inside a sub-expression (`{{#if (gte proficiency
//! 3)}}`), and as a block gate (`{{#eq status "current"}}…{{else}}…{{/eq}}`).
//!
//! `times` is not in the table: it needs the block body and lives with the
//! expander.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::render::path::display_value;

/// Signature shared by all table helpers.
pub type HelperFn = fn(&[Value]) -> Value;

static MISSING: Value = Value::Null;

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&MISSING)
}

// ────────────────────────────────────────────────────────────────────────────
// Helper table
// ────────────────────────────────────────────────────────────────────────────

/// An immutable name → helper mapping handed to an expander at construction.
///
/// Tables are plain values: build one, clone it, extend it with [`HelperTable::with`].
/// Nothing is registered process-wide.
#[derive(Debug, Clone)]
pub struct HelperTable {
    helpers: BTreeMap<String, HelperFn>,
}

impl HelperTable {
    pub fn empty() -> Self {
        Self {
            helpers: BTreeMap::new(),
        }
    }

    /// The helpers stored resume templates rely on.
    pub fn standard() -> Self {
        Self::empty()
            .with("formatDate", format_date_helper)
            .with("eq", eq_helper)
            .with("mod", mod_helper)
            .with("gte", gte_helper)
            .with("lt", lt_helper)
            .with("join", join_helper)
    }

    /// Returns a table with `name` bound to `helper`, replacing any previous binding.
    pub fn with(mut self, name: impl Into<String>, helper: HelperFn) -> Self {
        self.helpers.insert(name.into(), helper);
        self
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.helpers.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, HelperFn)> {
        self.helpers.iter().map(|(name, f)| (name.as_str(), *f))
    }
}

impl Default for HelperTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn format_date_helper(args: &[Value]) -> Value {
    Value::String(format_date(arg(args, 0), arg(args, 1).as_str()))
}

fn eq_helper(args: &[Value]) -> Value {
    Value::Bool(loose_eq(arg(args, 0), arg(args, 1)))
}

fn mod_helper(args: &[Value]) -> Value {
    Value::Bool(is_multiple(arg(args, 0), arg(args, 1)))
}

fn gte_helper(args: &[Value]) -> Value {
    Value::Bool(compare(arg(args, 0), arg(args, 1), |a, b| a >= b))
}

fn lt_helper(args: &[Value]) -> Value {
    Value::Bool(compare(arg(args, 0), arg(args, 1), |a, b| a < b))
}

fn join_helper(args: &[Value]) -> Value {
    Value::String(join(arg(args, 0), arg(args, 1).as_str()))
}

// ────────────────────────────────────────────────────────────────────────────
// Pure helper functions
// ────────────────────────────────────────────────────────────────────────────

/// Formats an ISO-like date (`2027-03-01`, `2027-03`, RFC 3339 timestamps).
///
/// Format tokens: `YYYY`, `MMMM`/`Month` (full month name), `MMM` (short month
/// name), `MM`, `DD`. No format means `MMMM YYYY`. Input that does not parse as
/// a date comes back unchanged; a missing value is the empty string.
pub fn format_date(value: &Value, format: Option<&str>) -> String {
    let raw = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => display_value(other),
    };

    let Some(date) = parse_date(raw.trim()) else {
        return raw;
    };

    let pattern = chrono_pattern(format.unwrap_or("MMMM YYYY"));
    date.format(&pattern).to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // chrono's %Y takes 1-3 digit years too; only a 4-digit year counts.
    let bytes = s.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.get(4).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    // Year-month only.
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()
}

/// Translates a `YYYY`-style format into a chrono pattern. Literal `%` is escaped
/// so the result never contains an invalid specifier.
fn chrono_pattern(format: &str) -> String {
    format
        .replace('%', "%%")
        .replace("YYYY", "%Y")
        .replace("Month", "%B")
        .replace("MMMM", "%B")
        .replace("MMM", "%b")
        .replace("MM", "%m")
        .replace("DD", "%d")
}

/// Loose equality.
///
/// Same-typed values compare structurally. Across types, numbers, numeric
/// strings and booleans are compared as numbers (`"2" == 2`, `true == 1`).
/// `null` only equals `null`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Array(_), _) | (_, Value::Array(_)) | (Value::Object(_), _) | (_, Value::Object(_)) => {
            a == b
        }
        _ => match (to_number(a), to_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// True when `a` is an exact multiple of `b`. A zero or non-numeric divisor is false.
pub fn is_multiple(a: &Value, b: &Value) -> bool {
    match (to_number(a), to_number(b)) {
        (Some(x), Some(y)) if y != 0.0 => x % y == 0.0,
        _ => false,
    }
}

/// Numeric comparison; false whenever either side is not a number.
pub fn compare(a: &Value, b: &Value, op: fn(f64, f64) -> bool) -> bool {
    match (to_number(a), to_number(b)) {
        (Some(x), Some(y)) => op(x, y),
        _ => false,
    }
}

/// Joins array items with `separator` (default `", "`). Non-arrays join to nothing.
pub fn join(value: &Value, separator: Option<&str>) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(separator.unwrap_or(", ")),
        _ => String::new(),
    }
}

/// Numeric view of a value: numbers, numeric strings and booleans.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Template truthiness: `false`, `null`, `""`, `0` and `[]` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_date_month_year() {
        assert_eq!(format_date(&json!("2027-03-01"), Some("MMMM YYYY")), "March 2027");
        assert_eq!(format_date(&json!("2027-03-01"), Some("Month YYYY")), "March 2027");
    }

    #[test]
    fn test_format_date_year_month() {
        assert_eq!(format_date(&json!("2027-03-01"), Some("YYYY-MM")), "2027-03");
        assert_eq!(format_date(&json!("2019-11"), Some("YYYY-MM")), "2019-11");
    }

    #[test]
    fn test_format_date_rfc3339_and_short_month() {
        assert_eq!(
            format_date(&json!("2021-09-15T08:30:00Z"), Some("MMM YYYY")),
            "Sep 2021"
        );
    }

    #[test]
    fn test_format_date_default_format() {
        assert_eq!(format_date(&json!("2020-01-31"), None), "January 2020");
    }

    #[test]
    fn test_format_date_unparseable_returned_unchanged() {
        assert_eq!(format_date(&json!("not-a-date"), Some("YYYY-MM")), "not-a-date");
        assert_eq!(format_date(&json!("Present"), Some("MMMM YYYY")), "Present");
    }

    #[test]
    fn test_format_date_requires_four_digit_year() {
        assert_eq!(format_date(&json!("5-10"), None), "5-10");
        assert_eq!(format_date(&json!("1-1"), None), "1-1");
        assert_eq!(format_date(&json!("202-01-01"), None), "202-01-01");
        assert_eq!(format_date(&json!("20201-01"), None), "20201-01");
        assert_eq!(format_date(&json!("2021-05"), None), "May 2021");
    }

    #[test]
    fn test_format_date_missing_is_empty() {
        assert_eq!(format_date(&Value::Null, Some("YYYY-MM")), "");
    }

    #[test]
    fn test_format_date_literal_percent_is_kept() {
        assert_eq!(format_date(&json!("2027-03-01"), Some("YYYY %")), "2027 %");
    }

    #[test]
    fn test_mod() {
        assert!(is_multiple(&json!(6), &json!(2)));
        assert!(!is_multiple(&json!(5), &json!(2)));
        assert!(is_multiple(&json!(0), &json!(2)));
        assert!(!is_multiple(&json!(4), &json!(0)));
        assert!(!is_multiple(&json!("x"), &json!(2)));
    }

    #[test]
    fn test_gte_and_lt() {
        assert!(compare(&json!(3), &json!(3), |a, b| a >= b));
        assert!(compare(&json!(2), &json!(3), |a, b| a < b));
        assert!(!compare(&json!(4), &json!(3), |a, b| a < b));
        assert!(compare(&json!("8"), &json!(7), |a, b| a >= b));
        assert!(!compare(&Value::Null, &json!(0), |a, b| a >= b));
    }

    #[test]
    fn test_table_helpers_through_signatures() {
        let table = HelperTable::standard();
        let gte = table.get("gte").unwrap();
        let lt = table.get("lt").unwrap();
        let modulo = table.get("mod").unwrap();
        assert_eq!(gte(&[json!(3), json!(3)]), json!(true));
        assert_eq!(lt(&[json!(2), json!(3)]), json!(true));
        assert_eq!(modulo(&[json!(6), json!(2)]), json!(true));
        assert_eq!(modulo(&[json!(5), json!(2)]), json!(false));
    }

    #[test]
    fn test_loose_eq_coerces_numbers_and_strings() {
        assert!(loose_eq(&json!("2"), &json!(2)));
        assert!(loose_eq(&json!(1), &json!(true)));
        assert!(loose_eq(&json!("current"), &json!("current")));
        assert!(!loose_eq(&json!("current"), &json!("past")));
        assert!(!loose_eq(&Value::Null, &json!(0)));
        assert!(loose_eq(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_join_defaults_separator() {
        assert_eq!(join(&json!(["Rust", "Go"]), None), "Rust, Go");
        assert_eq!(join(&json!(["Rust", "Go"]), Some(" / ")), "Rust / Go");
        assert_eq!(join(&json!("Rust"), None), "");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("0")));
    }

    #[test]
    fn test_table_with_replaces_binding() {
        fn always_true(_: &[Value]) -> Value {
            Value::Bool(true)
        }
        let table = HelperTable::standard().with("eq", always_true);
        let eq = table.get("eq").unwrap();
        assert_eq!(eq(&[json!(1), json!(2)]), json!(true));
        assert_eq!(table.iter().count(), HelperTable::standard().iter().count());
    }
}
