use serde_json::Value;

/// Namespaces an analyzed term under its field, producing the `field:term`
/// tokens stored in the inverted index (§3's Token definition).
pub fn field_token(field: &str, term: &str) -> String {
    format!("{field}:{term}")
}

/// A reserved-namespace token carrying the *exact*, unanalyzed stored value
/// for a field. `term{field,value}` needs equality lookups that bypass
/// tokenization entirely (§4.5); rather than re-scanning every document on
/// every exact-match query, the indexer also emits one of these per field so
/// the same sharded posting-list machinery serves both paths. The ``
/// separator can't appear in an analyzed token, so it can never collide
/// with a real `field:term` entry.
pub fn exact_token(field: &str, value: &Value) -> String {
    format!("{field}\u{1}{}", canonical_value_string(value))
}

/// Canonical string form of a JSON scalar used for exact-match comparisons:
/// strings are lowercased (exact match is case-insensitive on the stored
/// value, matching `term`'s sibling `wildcard` semantics), everything else
/// uses its compact JSON rendering.
pub fn canonical_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_token_is_case_insensitive_for_strings() {
        assert_eq!(exact_token("name", &json!("Paris")), exact_token("name", &json!("paris")));
    }

    #[test]
    fn exact_token_differs_by_field() {
        assert_ne!(exact_token("a", &json!("x")), exact_token("b", &json!("x")));
    }
}
