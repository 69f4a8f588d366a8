//! Small helpers shared by the publishing pipeline.

use serde_json::Value;

/// Upstream bodies attached to error details are cut to this many bytes.
const MAX_UPSTREAM_BODY: usize = 2048;

/// Lowercase ASCII slug: alphanumeric runs joined by single hyphens.
///
/// Returns `None` when nothing slug-worthy remains (e.g. a non-Latin keyword),
/// leaving slug generation to the publish target.
pub fn slugify(input: &str) -> Option<String> {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    (!slug.is_empty()).then_some(slug)
}

/// Return the first value produced by `extract` over the given JSON pointers,
/// tried in order.
pub fn first_match<T>(
    value: &Value,
    pointers: &[&str],
    extract: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    pointers
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find_map(extract)
}

/// Non-empty, trimmed string.
pub fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Number, or a string holding one.
pub fn as_number(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Non-negative integer, or a string holding one.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean, also accepting `"true"`/`"false"` and `0`/`1`.
pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Render an upstream response body for error details: parsed JSON when it is
/// JSON, otherwise the (truncated) text.
pub fn upstream_body(raw: &str) -> Value {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        if raw.len() <= MAX_UPSTREAM_BODY {
            return json;
        }
    }

    let mut end = raw.len().min(MAX_UPSTREAM_BODY);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    let mut text = raw[..end].to_string();
    if end < raw.len() {
        text.push_str("...");
    }
    Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(
            slugify("  Best Hotels in Bangkok -- 2026! ").as_deref(),
            Some("best-hotels-in-bangkok-2026")
        );
        assert_eq!(slugify("Café & Spa").as_deref(), Some("caf-spa"));
        assert_eq!(slugify("โรงแรม"), None);
    }

    #[test]
    fn first_match_respects_pointer_order() {
        let value = json!({ "name": "Second", "hotelName": "", "propertyName": "Third" });
        let found = first_match(&value, &["/hotelName", "/name", "/propertyName"], as_text);
        assert_eq!(found.as_deref(), Some("Second"));
    }

    #[test]
    fn first_match_reaches_nested_fields() {
        let value = json!({ "address": { "city": "Lisbon" } });
        assert_eq!(
            first_match(&value, &["/city", "/address/city"], as_text).as_deref(),
            Some("Lisbon")
        );
        assert_eq!(first_match(&value, &["/country"], as_text), None);
    }

    #[test]
    fn scalar_extractors_accept_stringly_values() {
        assert_eq!(as_number(&json!("8.4")), Some(8.4));
        assert_eq!(as_number(&json!(120)), Some(120.0));
        assert_eq!(as_count(&json!("42")), Some(42));
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_flag(&json!("TRUE")), Some(true));
        assert_eq!(as_flag(&json!(0)), Some(false));
        assert_eq!(as_flag(&json!("maybe")), None);
    }

    #[test]
    fn upstream_body_keeps_json_and_truncates_text() {
        assert_eq!(
            upstream_body(r#"{"error":"boom"}"#),
            json!({ "error": "boom" })
        );

        let long = "x".repeat(MAX_UPSTREAM_BODY + 10);
        let rendered = upstream_body(&long);
        let text = rendered.as_str().unwrap();
        assert_eq!(text.len(), MAX_UPSTREAM_BODY + 3);
        assert!(text.ends_with("..."));
    }
}
