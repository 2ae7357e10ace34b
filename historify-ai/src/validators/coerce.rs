//! Lenient scalar coercion for untrusted JSON values
//!
//! These helpers never fail: a value that cannot be interpreted yields `None`
//! and the caller substitutes its default.

use serde_json::Value;

/// Integer coercion
///
/// Accepts JSON integers, finite floats (truncated toward zero) and strings
/// holding an integer (surrounding whitespace ignored). Booleans, `null`,
/// arrays and objects are rejected.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if let Some(u) = n.as_u64() {
                Some(i64::try_from(u).unwrap_or(i64::MAX))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Integer coercion clamped into `[0, 100]`
pub fn to_score(value: &Value) -> Option<u8> {
    to_int(value).map(|i| i.clamp(0, 100) as u8)
}

/// Text coercion
///
/// Strings pass through unmodified; numbers and booleans are rendered;
/// `null`, arrays and objects count as absent.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean coercion: JSON booleans and the strings `"true"` / `"false"`
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Float coercion for coordinates: numbers and numeric strings
pub fn to_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(&json!(1945)), Some(1945));
        assert_eq!(to_int(&json!(-3)), Some(-3));
        assert_eq!(to_int(&json!(1945.9)), Some(1945));
        assert_eq!(to_int(&json!(" 1912 ")), Some(1912));
        assert_eq!(to_int(&json!("1912.0")), None);
        assert_eq!(to_int(&json!("circa 1900")), None);
        assert_eq!(to_int(&json!(true)), None);
        assert_eq!(to_int(&json!(null)), None);
        assert_eq!(to_int(&json!([1])), None);
        assert_eq!(to_int(&json!(u64::MAX)), Some(i64::MAX));
    }

    #[test]
    fn test_to_score_clamps() {
        assert_eq!(to_score(&json!(150)), Some(100));
        assert_eq!(to_score(&json!(-5)), Some(0));
        assert_eq!(to_score(&json!("73")), Some(73));
        assert_eq!(to_score(&json!("high")), None);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&json!("  kept as is ")), Some("  kept as is ".to_string()));
        assert_eq!(to_text(&json!(12)), Some("12".to_string()));
        assert_eq!(to_text(&json!(null)), None);
        assert_eq!(to_text(&json!({"a": 1})), None);
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool(&json!(true)), Some(true));
        assert_eq!(to_bool(&json!("False")), Some(false));
        assert_eq!(to_bool(&json!(1)), None);
        assert_eq!(to_bool(&json!("yes")), None);
    }

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&json!(52.52)), Some(52.52));
        assert_eq!(to_float(&json!("13.40")), Some(13.40));
        assert_eq!(to_float(&json!("NaN")), None);
        assert_eq!(to_float(&json!(false)), None);
    }
}
