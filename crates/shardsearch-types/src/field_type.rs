use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The semantic type assigned to a field, per §3/§4.2 of the design.
///
/// Once a field is registered in [`crate::Mappings`] its type is permanent
/// unless the caller explicitly overwrites it; new fields discovered during
/// ingestion are auto-assigned using [`infer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Keyword,
    Email,
    Url,
    Phone,
    Date,
    Boolean,
    Integer,
    Float,
    GeoPoint,
    Object,
}

impl FieldType {
    /// Text-like field types are the ones `match{field:"*"}` expands over.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Keyword | FieldType::Email | FieldType::Url | FieldType::Phone
        )
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://.+").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap());
static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d+]").unwrap());

/// Best-effort ISO-8601-ish date detection: a plain calendar date or a full
/// RFC 3339 timestamp. Covers the shapes the engine is expected to see
/// without pulling in a general-purpose date parser.
fn looks_like_date(s: &str) -> bool {
    use time::macros::format_description as fd;
    time::Date::parse(s, fd!("[year]-[month]-[day]")).is_ok()
        || time::OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).is_ok()
}

/// Implements the priority-ordered detection rules of §4.2: first match wins.
pub fn infer(value: &Value, declared_integer: bool) -> FieldType {
    match value {
        Value::Null => FieldType::Text,
        Value::String(s) => infer_string(s),
        Value::Number(n) => {
            if declared_integer && (n.is_i64() || n.is_u64()) {
                FieldType::Integer
            } else {
                FieldType::Float
            }
        }
        Value::Bool(_) => FieldType::Boolean,
        Value::Array(items) => infer_array(items),
        Value::Object(map) => {
            if map.contains_key("lat") && map.contains_key("lon") {
                FieldType::GeoPoint
            } else {
                FieldType::Object
            }
        }
    }
}

fn infer_string(s: &str) -> FieldType {
    if EMAIL_RE.is_match(s) {
        FieldType::Email
    } else if URL_RE.is_match(s) {
        FieldType::Url
    } else if PHONE_RE.is_match(&NON_DIGIT_RE.replace_all(s, "")) && s.chars().any(|c| c.is_ascii_digit()) {
        FieldType::Phone
    } else if looks_like_date(s) {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

fn infer_array(items: &[Value]) -> FieldType {
    if items.len() == 2 && items.iter().all(|v| v.is_number()) {
        return FieldType::GeoPoint;
    }
    match items.first() {
        None => FieldType::Text,
        Some(first) => infer(first, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email() {
        assert_eq!(infer(&Value::String("a@b.com".into()), false), FieldType::Email);
    }

    #[test]
    fn detects_url() {
        assert_eq!(infer(&Value::String("https://example.com/a".into()), false), FieldType::Url);
    }

    #[test]
    fn detects_phone() {
        assert_eq!(infer(&Value::String("+14155552671".into()), false), FieldType::Phone);
    }

    #[test]
    fn detects_date() {
        assert_eq!(infer(&Value::String("2024-01-15".into()), false), FieldType::Date);
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(infer(&Value::String("just some words".into()), false), FieldType::Text);
    }

    #[test]
    fn detects_geo_point_array() {
        let v = serde_json::json!([12.34, -56.78]);
        assert_eq!(infer(&v, false), FieldType::GeoPoint);
    }

    #[test]
    fn detects_geo_point_object() {
        let v = serde_json::json!({"lat": 1.0, "lon": 2.0});
        assert_eq!(infer(&v, false), FieldType::GeoPoint);
    }

    #[test]
    fn empty_array_is_text() {
        assert_eq!(infer(&serde_json::json!([]), false), FieldType::Text);
    }

    #[test]
    fn boolean_and_float() {
        assert_eq!(infer(&Value::Bool(true), false), FieldType::Boolean);
        assert_eq!(infer(&serde_json::json!(3.14), false), FieldType::Float);
    }
}
