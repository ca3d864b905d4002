//! Input checks shared by the log, the options parser and the view.

use serde_json::Value;

/// Whether `value` is a plain key-value object (not an array, primitive or null).
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object()
}

/// Interpret `value` as a natural number (a non-negative integer).
///
/// Integers, integral floats (`5.0`) and numeric strings (`"3"`, `" 12 "`,
/// `"1e2"`) are accepted. Negative numbers, fractions, empty strings and any
/// other JSON type are rejected.
pub fn natural_number(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(n) = n.as_u64() {
                return usize::try_from(n).ok();
            }
            n.as_f64().and_then(integral)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().and_then(integral)
        }
        _ => None,
    }
}

fn integral(n: f64) -> Option<usize> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// Short description of a JSON value's type, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
