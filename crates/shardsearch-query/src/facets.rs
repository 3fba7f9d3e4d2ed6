use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde::Serialize;
use serde_json::Value;

use crate::corpus::Corpus;

const RESERVED_FIELDS: &[&str] = &["id", "indexName", "_score"];
const AUTO_DISCOVER_MAX_DISTINCT: usize = 50;
const AUTO_DISCOVER_MAX_LEN: usize = 100;
const AUTO_DISCOVER_TOP_VALUES: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct FacetResult {
    pub values: Vec<FacetValue>,
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Counts distinct string-ish values of `field` over `candidates`, keeping
/// only the top `size` by count (ties broken by first-seen order, which is
/// deterministic for a fixed candidate iteration order since `RoaringBitmap`
/// iterates in ascending id order).
pub fn compute_facet(corpus: &Corpus, candidates: &RoaringBitmap, field: &str, size: usize) -> FacetResult {
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for doc in candidates.iter() {
        let Some(ext_id) = corpus.repository.external_id(doc) else { continue };
        let Some(document) = corpus.repository.get(ext_id) else { continue };
        let Some(value) = document.get(field) else { continue };
        let values: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for v in values {
            let Some(s) = string_value(v) else { continue };
            if !counts.contains_key(&s) {
                order.push(s.clone());
            }
            *counts.entry(s).or_insert(0) += 1;
        }
    }
    let mut values: Vec<FacetValue> = order.into_iter().map(|v| { let count = counts[&v]; FacetValue { value: v, count } }).collect();
    values.sort_by(|a, b| b.count.cmp(&a.count));
    values.truncate(size);
    FacetResult { values }
}

pub fn compute_facets(
    corpus: &Corpus,
    candidates: &RoaringBitmap,
    fields: &[String],
    size_per_field: usize,
) -> HashMap<String, FacetResult> {
    fields.iter().map(|f| (f.clone(), compute_facet(corpus, candidates, f, size_per_field))).collect()
}

struct FieldSample {
    total: usize,
    short_strings: usize,
    distinct: std::collections::HashSet<String>,
}

/// §4.5's auto-discovery heuristic, used when a search doesn't name explicit
/// facet fields: sample every candidate document's top-level fields and keep
/// the ones that look facetable.
pub fn auto_discover_facets(corpus: &Corpus, candidates: &RoaringBitmap) -> HashMap<String, FacetResult> {
    let mut samples: HashMap<String, FieldSample> = HashMap::new();
    for doc in candidates.iter() {
        let Some(ext_id) = corpus.repository.external_id(doc) else { continue };
        let Some(document) = corpus.repository.get(ext_id) else { continue };
        for (field, value) in document.iter() {
            if RESERVED_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if value.is_null() {
                continue;
            }
            let sample = samples.entry(field.clone()).or_insert_with(|| FieldSample {
                total: 0,
                short_strings: 0,
                distinct: std::collections::HashSet::new(),
            });
            sample.total += 1;
            if let Some(s) = value.as_str() {
                if s.chars().count() <= AUTO_DISCOVER_MAX_LEN && !s.contains(['\n', '\t']) {
                    sample.short_strings += 1;
                }
            }
            if let Some(s) = string_value(value) {
                sample.distinct.insert(s);
            }
        }
    }

    let eligible: Vec<String> = samples
        .iter()
        .filter(|(_, s)| {
            s.total > 0
                && (s.short_strings as f64 / s.total as f64) >= 0.5
                && s.distinct.len() <= AUTO_DISCOVER_MAX_DISTINCT
        })
        .map(|(f, _)| f.clone())
        .collect();

    compute_facets(corpus, candidates, &eligible, AUTO_DISCOVER_TOP_VALUES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_corpus;
    use serde_json::json;

    #[test]
    fn facet_counts_distinct_values_over_candidates() {
        let docs = vec![
            json!({"id":"1","color":"red"}),
            json!({"id":"2","color":"blue"}),
            json!({"id":"3","color":"red"}),
        ];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let all: RoaringBitmap = corpus.repository.iter().filter_map(|(e, _)| corpus.repository.internal_id(e)).collect();
        let result = compute_facet(&corpus, &all, "color", 10);
        assert_eq!(result.values.iter().find(|v| v.value == "red").unwrap().count, 2);
        assert_eq!(result.values.iter().find(|v| v.value == "blue").unwrap().count, 1);
    }

    #[test]
    fn auto_discovery_skips_reserved_and_high_cardinality_fields() {
        let mut docs = Vec::new();
        for i in 0..10 {
            docs.push(json!({"id": format!("{i}"), "status": if i % 2 == 0 {"open"} else {"closed"}, "uuid": format!("u-{i}")}));
        }
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let all: RoaringBitmap = corpus.repository.iter().filter_map(|(e, _)| corpus.repository.internal_id(e)).collect();
        let discovered = auto_discover_facets(&corpus, &all);
        assert!(discovered.contains_key("status"));
        assert!(!discovered.contains_key("id"));
    }
}
