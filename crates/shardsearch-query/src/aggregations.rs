use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde::Serialize;
use serde_json::Value;

use crate::corpus::Corpus;
use crate::query::{AggregationRequest, RangeBucketSpec};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bucket {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    pub doc_count: u64,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct AggregationResult {
    pub buckets: Vec<Bucket>,
}

fn bucket_key_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn terms_aggregation(corpus: &Corpus, candidates: &RoaringBitmap, field: &str, size: usize) -> AggregationResult {
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
            let Some(key) = bucket_key_value(v) else { continue };
            if !counts.contains_key(&key) {
                order.push(key.clone());
            }
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut buckets: Vec<Bucket> =
        order.into_iter().map(|key| { let doc_count = counts[&key]; Bucket { key, from: None, to: None, doc_count } }).collect();
    buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count));
    buckets.truncate(size);
    AggregationResult { buckets }
}

fn range_key(spec: &RangeBucketSpec) -> String {
    match (spec.from, spec.to) {
        (Some(from), Some(to)) => format!("{from}-{to}"),
        (Some(from), None) => format!("{from}-*"),
        (None, Some(to)) => format!("*-{to}"),
        (None, None) => "*-*".to_string(),
    }
}

/// Half-open `[from, to)` buckets: a value belongs to the first spec whose
/// bounds it falls within, matching the range-filter semantics elsewhere in
/// the query engine.
fn range_aggregation(corpus: &Corpus, candidates: &RoaringBitmap, field: &str, ranges: &[RangeBucketSpec]) -> AggregationResult {
    let mut counts = vec![0u64; ranges.len()];
    for doc in candidates.iter() {
        let Some(ext_id) = corpus.repository.external_id(doc) else { continue };
        let Some(document) = corpus.repository.get(ext_id) else { continue };
        let Some(v) = document.get(field).and_then(Value::as_f64) else { continue };
        for (i, spec) in ranges.iter().enumerate() {
            let above_from = spec.from.map_or(true, |f| v >= f);
            let below_to = spec.to.map_or(true, |t| v < t);
            if above_from && below_to {
                counts[i] += 1;
                break;
            }
        }
    }
    let buckets = ranges
        .iter()
        .zip(counts)
        .map(|(spec, doc_count)| Bucket { key: range_key(spec), from: spec.from, to: spec.to, doc_count })
        .collect();
    AggregationResult { buckets }
}

pub fn compute_aggregation(corpus: &Corpus, candidates: &RoaringBitmap, request: &AggregationRequest) -> AggregationResult {
    match request {
        AggregationRequest::Terms { field, size } => terms_aggregation(corpus, candidates, field, size.unwrap_or(10)),
        AggregationRequest::Range { field, ranges } => range_aggregation(corpus, candidates, field, ranges),
    }
}

pub fn compute_aggregations(
    corpus: &Corpus,
    candidates: &RoaringBitmap,
    requests: &std::collections::BTreeMap<String, AggregationRequest>,
) -> std::collections::BTreeMap<String, AggregationResult> {
    requests.iter().map(|(name, req)| (name.clone(), compute_aggregation(corpus, candidates, req))).collect()
}
