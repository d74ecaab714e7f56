//! Body comparison policy shared by request assertions and stub rules.

use mime::Mime;
use serde_json::Value;

/// How a declared body is compared, decided by the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/x-www-form-urlencoded`: order-independent `key=value` superset.
    Form,
    /// `application/json`, optionally with a UTF-8 charset: lenient structural equality.
    Json,
    /// Anything else: exact text equality.
    Text,
}

impl BodyKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(mime) = content_type.and_then(|ct| ct.trim().parse::<Mime>().ok()) else {
            return BodyKind::Text;
        };

        if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
            return BodyKind::Form;
        }

        if mime.essence_str() == mime::APPLICATION_JSON.essence_str() {
            let mut params = mime.params();
            let plain_or_utf8 = match params.next() {
                None => true,
                Some((name, value)) => {
                    name == mime::CHARSET && value == mime::UTF_8 && params.next().is_none()
                }
            };
            if plain_or_utf8 {
                return BodyKind::Json;
            }
        }

        BodyKind::Text
    }
}

/// `key=value` tokens of a declared form body, with line breaks and empty
/// tokens removed.
pub fn expected_form_pairs(expected: &str) -> Vec<String> {
    expected
        .replace(|c: char| c == '\r' || c == '\n', "")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether every declared form token appears in the observed body.
pub fn form_contains_all(expected_pairs: &[String], actual: &str) -> bool {
    let observed: Vec<&str> = actual.split('&').collect();
    expected_pairs
        .iter()
        .all(|pair| observed.contains(&pair.as_str()))
}

/// Lenient structural JSON comparison.
///
/// Objects in `actual` may carry extra fields; every field present in
/// `expected` must match. Arrays must match in length and order. Numbers
/// compare by value, so `1` matches `1.0`.
pub fn json_contains(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|observed| json_contains(value, observed))
        }),
        (Value::Array(expected), Value::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(e, a)| json_contains(e, a))
        }
        (Value::Number(expected), Value::Number(actual)) => {
            expected == actual
                || matches!((expected.as_f64(), actual.as_f64()), (Some(e), Some(a)) if e == a)
        }
        _ => expected == actual,
    }
}

/// [`json_contains`] over raw text; unparseable bodies never match.
pub fn json_text_contains(expected: &str, actual: &str) -> bool {
    match (
        serde_json::from_str::<Value>(expected),
        serde_json::from_str::<Value>(actual),
    ) {
        (Ok(expected), Ok(actual)) => json_contains(&expected, &actual),
        _ => false,
    }
}
