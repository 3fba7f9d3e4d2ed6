use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use roaring::RoaringBitmap;
use serde_json::Value;
use shardsearch_index::{exact_token, field_token, Bm25Scorer, InternalId};
use shardsearch_tokenizer::{analyzer_for_field_type, tokenize, Analyzer};
use shardsearch_types::{Document, FieldType};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::query::Query;

/// What one query-tree node evaluates to: a candidate doc-id set and the
/// per-document partial score it contributes (§4.5).
#[derive(Debug, Default, Clone)]
pub struct NodeResult {
    pub candidates: RoaringBitmap,
    pub scores: HashMap<InternalId, f64>,
}

impl NodeResult {
    fn empty() -> Self {
        NodeResult::default()
    }
}

impl<'a> Corpus<'a> {
    pub fn scorer(&self) -> Bm25Scorer {
        Bm25Scorer::with_defaults(self.total_docs, self.avg_doc_len.max(0.0))
            .expect("avg_doc_len is kept non-negative by the owning SearchEngine")
    }
}

pub fn evaluate(query: &Query, corpus: &Corpus) -> Result<NodeResult> {
    match query {
        Query::MatchAll => Ok(eval_match_all(corpus)),
        Query::Match { field, value, operator, boost } => eval_match(field, value, operator, *boost, corpus),
        Query::Term { field, value, boost } => Ok(eval_term(field, value, *boost, corpus)),
        Query::Prefix { field, value, boost } => Ok(eval_prefix(field, value, *boost, corpus)),
        Query::Wildcard { field, value, boost } => eval_wildcard(field, value, *boost, corpus),
        Query::Fuzzy { field, value, fuzziness, boost } => Ok(eval_fuzzy(field, value, *fuzziness, *boost, corpus)),
        Query::MatchPhrase { field, value, boost } => Ok(eval_match_phrase(field, value, *boost, corpus)),
        Query::Range { field, gte, lte, gt, lt } => Ok(eval_range(field, *gte, *lte, *gt, *lt, corpus)),
        Query::GeoDistance { field, center, distance } => Ok(eval_geo_distance(field, *center, *distance, corpus)),
        Query::Bool { must, should, must_not, filter, minimum_should_match } => {
            eval_bool(must, should, must_not, filter, *minimum_should_match, corpus)
        }
    }
}

fn apply_boost(scores: &mut HashMap<InternalId, f64>, boost: Option<f64>) {
    if let Some(b) = boost {
        for v in scores.values_mut() {
            *v *= b;
        }
    }
}

fn resolve_fields(corpus: &Corpus, field: &str) -> Vec<String> {
    if field == "*" {
        corpus.mappings.text_like_fields().into_iter().map(|s| s.to_string()).collect()
    } else {
        vec![field.to_string()]
    }
}

fn analyzer_for(corpus: &Corpus, field: &str) -> Analyzer {
    if field == "*" {
        Analyzer::Standard
    } else {
        analyzer_for_field_type(corpus.mappings.get(field).unwrap_or(FieldType::Text))
    }
}

fn eval_match_all(corpus: &Corpus) -> NodeResult {
    let candidates: RoaringBitmap =
        corpus.repository.iter().filter_map(|(ext, _)| corpus.repository.internal_id(ext)).collect();
    NodeResult { candidates, scores: HashMap::new() }
}

fn eval_match(field: &str, value: &str, operator: &str, boost: Option<f64>, corpus: &Corpus) -> Result<NodeResult> {
    let fields = resolve_fields(corpus, field);
    if fields.is_empty() {
        return Ok(NodeResult::empty());
    }
    let bm25 = corpus.scorer();
    let mut candidates = RoaringBitmap::new();
    let mut scores = HashMap::new();
    let is_or = operator.eq_ignore_ascii_case("or");

    for f in fields {
        let analyzer = analyzer_for(corpus, &f);
        let tokens = tokenize(value, &analyzer, corpus.stopwords);
        if tokens.is_empty() {
            continue;
        }
        let mut field_candidates: Option<RoaringBitmap> = None;
        let mut postings = Vec::with_capacity(tokens.len());
        for term in &tokens {
            let token = field_token(&f, term);
            let posting = corpus.index.get_posting(&token);
            let bitmap: RoaringBitmap = posting.keys().copied().collect();
            field_candidates = Some(match field_candidates {
                None => bitmap,
                Some(acc) => if is_or { acc | &bitmap } else { acc & &bitmap },
            });
            postings.push(posting);
        }
        let Some(field_candidates) = field_candidates else { continue };
        candidates |= &field_candidates;
        for posting in &postings {
            let df = posting.len() as u32;
            for (doc, positions) in posting {
                if !field_candidates.contains(*doc) {
                    continue;
                }
                let tf = positions.len() as u32;
                *scores.entry(*doc).or_insert(0.0) += bm25.score(tf, df, corpus.doc_len(*doc));
            }
        }
    }
    apply_boost(&mut scores, boost);
    Ok(NodeResult { candidates, scores })
}

fn eval_term(field: &str, value: &Value, boost: Option<f64>, corpus: &Corpus) -> NodeResult {
    let token = exact_token(field, value);
    let posting = corpus.index.get_posting(&token);
    let df = posting.len() as u32;
    let bm25 = corpus.scorer();
    let mut candidates = RoaringBitmap::new();
    let mut scores = HashMap::new();
    for (doc, _positions) in &posting {
        candidates.insert(*doc);
        scores.insert(*doc, bm25.score(1, df, corpus.doc_len(*doc)));
    }
    apply_boost(&mut scores, boost);
    NodeResult { candidates, scores }
}

/// Per-slot position lists; a doc matches iff each slot's posting contains
/// a strictly consecutive ascending position starting from some offset in
/// slot 0. Shared by `match_phrase` and multi-word `prefix`.
fn consecutive_match(slots: &[HashMap<InternalId, Vec<u32>>]) -> RoaringBitmap {
    let mut result = RoaringBitmap::new();
    if slots.is_empty() {
        return result;
    }
    let mut candidate_docs: HashSet<InternalId> = slots[0].keys().copied().collect();
    for slot in &slots[1..] {
        let keys: HashSet<InternalId> = slot.keys().copied().collect();
        candidate_docs = candidate_docs.intersection(&keys).copied().collect();
    }
    'doc: for doc in candidate_docs {
        let first_positions = &slots[0][&doc];
        for &start in first_positions {
            let mut ok = true;
            for (i, slot) in slots.iter().enumerate().skip(1) {
                let want = start + i as u32;
                if !slot[&doc].contains(&want) {
                    ok = false;
                    break;
                }
            }
            if ok {
                result.insert(doc);
                continue 'doc;
            }
        }
    }
    result
}

fn eval_match_phrase(field: &str, value: &str, boost: Option<f64>, corpus: &Corpus) -> NodeResult {
    let analyzer = analyzer_for(corpus, field);
    let tokens = tokenize(value, &analyzer, corpus.stopwords);
    if tokens.is_empty() {
        return NodeResult::empty();
    }
    let slots: Vec<HashMap<InternalId, Vec<u32>>> =
        tokens.iter().map(|t| corpus.index.get_posting(&field_token(field, t)).into_iter().collect()).collect();
    let candidates = consecutive_match(&slots);
    let bm25 = corpus.scorer();
    let mut scores = HashMap::new();
    for slot in &slots {
        let df = slot.len() as u32;
        for doc in candidates.iter() {
            if let Some(positions) = slot.get(&doc) {
                let tf = positions.len() as u32;
                *scores.entry(doc).or_insert(0.0) += bm25.score(tf, df, corpus.doc_len(doc));
            }
        }
    }
    apply_boost(&mut scores, boost);
    NodeResult { candidates, scores }
}

/// Merges every document token that `term` is a prefix of into one slot,
/// the way `consecutive_match` expects: positions from every matching
/// expansion pooled together per document.
fn prefix_slot(field: &str, term: &str, corpus: &Corpus) -> HashMap<InternalId, Vec<u32>> {
    let prefix = field_token(field, term);
    let expanded: Vec<String> = corpus.index.tokens_with_prefix(&prefix).into_iter().map(|s| s.to_string()).collect();
    let mut slot: HashMap<InternalId, Vec<u32>> = HashMap::new();
    for tok in &expanded {
        for (doc, positions) in corpus.index.get_posting(tok) {
            slot.entry(doc).or_default().extend(positions);
        }
    }
    slot
}

fn eval_prefix(field: &str, value: &str, boost: Option<f64>, corpus: &Corpus) -> NodeResult {
    let analyzer = analyzer_for(corpus, field);
    let tokens = tokenize(value, &analyzer, corpus.stopwords);
    if tokens.is_empty() {
        return NodeResult::empty();
    }

    let slots: Vec<HashMap<InternalId, Vec<u32>>> = tokens.iter().map(|t| prefix_slot(field, t, corpus)).collect();
    if slots.iter().any(|s| s.is_empty()) {
        return NodeResult::empty();
    }
    let bm25 = corpus.scorer();

    if slots.len() == 1 {
        let slot = &slots[0];
        let df = slot.len() as u32;
        let mut candidates = RoaringBitmap::new();
        let mut scores = HashMap::new();
        for (doc, positions) in slot {
            candidates.insert(*doc);
            let tf = positions.len() as u32;
            scores.insert(*doc, bm25.score(tf, df, corpus.doc_len(*doc)));
        }
        apply_boost(&mut scores, boost);
        return NodeResult { candidates, scores };
    }

    let candidates = consecutive_match(&slots);
    let mut scores = HashMap::new();
    for slot in &slots {
        let df = slot.len() as u32;
        for doc in candidates.iter() {
            if let Some(positions) = slot.get(&doc) {
                let tf = positions.len() as u32;
                *scores.entry(doc).or_insert(0.0) += bm25.score(tf, df, corpus.doc_len(doc));
            }
        }
    }
    apply_boost(&mut scores, boost);
    NodeResult { candidates, scores }
}

static WILDCARD_SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*?]").unwrap());

fn compile_wildcard(pattern: &str) -> Result<Regex> {
    let mut out = String::from("(?i)^");
    let mut last = 0;
    for m in WILDCARD_SPECIAL.find_iter(pattern) {
        out.push_str(&regex::escape(&pattern[last..m.start()]));
        out.push_str(if m.as_str() == "*" { ".*" } else { "." });
        last = m.end();
    }
    out.push_str(&regex::escape(&pattern[last..]));
    out.push('$');
    Regex::new(&out).map_err(|e| Error::InvalidQuery(format!("bad wildcard pattern `{pattern}`: {e}")))
}

fn get_nested<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn value_matches_wildcard(value: &Value, regex: &Regex) -> bool {
    match value {
        Value::String(s) => regex.is_match(s),
        Value::Array(items) => items.iter().any(|v| value_matches_wildcard(v, regex)),
        _ => false,
    }
}

fn eval_wildcard(field: &str, pattern: &str, boost: Option<f64>, corpus: &Corpus) -> Result<NodeResult> {
    let regex = compile_wildcard(pattern)?;
    let mut candidates = RoaringBitmap::new();
    let mut scores = HashMap::new();
    for (ext_id, doc) in corpus.repository.iter() {
        let Some(value) = get_nested(doc, field) else { continue };
        if value_matches_wildcard(value, &regex) {
            if let Some(internal) = corpus.repository.internal_id(ext_id) {
                candidates.insert(internal);
                scores.insert(internal, 1.0);
            }
        }
    }
    apply_boost(&mut scores, boost);
    Ok(NodeResult { candidates, scores })
}

fn eval_fuzzy(field: &str, value: &str, fuzziness: u32, boost: Option<f64>, corpus: &Corpus) -> NodeResult {
    let normalized = value.to_lowercase();
    let prefix = format!("{field}:");
    let bm25 = corpus.scorer();
    let mut candidates = RoaringBitmap::new();
    let mut scores = HashMap::new();
    for token in corpus.index.all_tokens() {
        let Some(term) = token.strip_prefix(prefix.as_str()) else { continue };
        let len_diff = (term.chars().count() as i64 - normalized.chars().count() as i64).unsigned_abs() as u32;
        if len_diff > fuzziness {
            continue;
        }
        if strsim::levenshtein(term, &normalized) > fuzziness as usize {
            continue;
        }
        let posting = corpus.index.get_posting(token);
        let df = posting.len() as u32;
        for (doc, positions) in &posting {
            candidates.insert(*doc);
            let tf = positions.len() as u32;
            *scores.entry(*doc).or_insert(0.0) += bm25.score(tf, df, corpus.doc_len(*doc));
        }
    }
    apply_boost(&mut scores, boost);
    NodeResult { candidates, scores }
}

fn passes_range(v: f64, gte: Option<f64>, lte: Option<f64>, gt: Option<f64>, lt: Option<f64>) -> bool {
    gte.map_or(true, |x| v >= x) && lte.map_or(true, |x| v <= x) && gt.map_or(true, |x| v > x) && lt.map_or(true, |x| v < x)
}

fn eval_range(field: &str, gte: Option<f64>, lte: Option<f64>, gt: Option<f64>, lt: Option<f64>, corpus: &Corpus) -> NodeResult {
    let mut candidates = RoaringBitmap::new();
    for (ext_id, doc) in corpus.repository.iter() {
        if let Some(v) = get_nested(doc, field).and_then(Value::as_f64) {
            if passes_range(v, gte, lte, gt, lt) {
                if let Some(internal) = corpus.repository.internal_id(ext_id) {
                    candidates.insert(internal);
                }
            }
        }
    }
    NodeResult { candidates, scores: HashMap::new() }
}

fn extract_geo_point(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(items) if items.len() == 2 => Some((items[0].as_f64()?, items[1].as_f64()?)),
        Value::Object(map) => Some((map.get("lat")?.as_f64()?, map.get("lon")?.as_f64()?)),
        _ => None,
    }
}

fn eval_geo_distance(field: &str, center: [f64; 2], distance_km: f64, corpus: &Corpus) -> NodeResult {
    use geoutils::Location;
    let center_loc = Location::new(center[0], center[1]);
    let mut candidates = RoaringBitmap::new();
    for (ext_id, doc) in corpus.repository.iter() {
        let Some((lat, lon)) = get_nested(doc, field).and_then(extract_geo_point) else { continue };
        let loc = Location::new(lat, lon);
        if let Ok(d) = center_loc.distance_to(&loc) {
            if d.meters() / 1000.0 <= distance_km {
                if let Some(internal) = corpus.repository.internal_id(ext_id) {
                    candidates.insert(internal);
                }
            }
        }
    }
    NodeResult { candidates, scores: HashMap::new() }
}

#[allow(clippy::too_many_arguments)]
fn eval_bool(
    must: &[Query],
    should: &[Query],
    must_not: &[Query],
    filter: &[Query],
    minimum_should_match: Option<usize>,
    corpus: &Corpus,
) -> Result<NodeResult> {
    let must_results: Vec<NodeResult> = must.iter().map(|q| evaluate(q, corpus)).collect::<Result<_>>()?;
    let should_results: Vec<NodeResult> = should.iter().map(|q| evaluate(q, corpus)).collect::<Result<_>>()?;
    let filter_results: Vec<NodeResult> = filter.iter().map(|q| evaluate(q, corpus)).collect::<Result<_>>()?;
    let must_not_results: Vec<NodeResult> = must_not.iter().map(|q| evaluate(q, corpus)).collect::<Result<_>>()?;

    let mut candidates: Option<RoaringBitmap> = None;
    for r in &must_results {
        candidates = Some(match candidates {
            None => r.candidates.clone(),
            Some(acc) => acc & &r.candidates,
        });
    }

    // `should` only gates the candidate set when there is no `must`/`filter`
    // clause to constrain it already (§4.5).
    if candidates.is_none() && !should.is_empty() {
        let msm = minimum_should_match.unwrap_or(1);
        if msm == 0 {
            let mut union = RoaringBitmap::new();
            for r in &should_results {
                union |= &r.candidates;
            }
            candidates = Some(union);
        } else {
            let mut match_count: HashMap<InternalId, usize> = HashMap::new();
            for r in &should_results {
                for doc in r.candidates.iter() {
                    *match_count.entry(doc).or_insert(0) += 1;
                }
            }
            candidates = Some(match_count.into_iter().filter(|(_, c)| *c >= msm).map(|(d, _)| d).collect());
        }
    }

    if !filter.is_empty() {
        let mut filter_candidates = filter_results[0].candidates.clone();
        for r in &filter_results[1..] {
            filter_candidates &= &r.candidates;
        }
        candidates = Some(match candidates {
            None => filter_candidates,
            Some(acc) => acc & &filter_candidates,
        });
    }

    let mut candidates = candidates.unwrap_or_else(|| eval_match_all(corpus).candidates);

    if !must_not.is_empty() {
        let mut excluded = RoaringBitmap::new();
        for r in &must_not_results {
            excluded |= &r.candidates;
        }
        candidates -= &excluded;
    }

    let mut scores: HashMap<InternalId, f64> = HashMap::new();
    for r in must_results.iter().chain(should_results.iter()) {
        for (doc, score) in &r.scores {
            if candidates.contains(*doc) {
                *scores.entry(*doc).or_insert(0.0) += score;
            }
        }
    }

    Ok(NodeResult { candidates, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_corpus;
    use serde_json::json;

    #[test]
    fn multi_word_and_match_requires_all_tokens() {
        let docs = vec![json!({"id":"1","n":"rick"}), json!({"id":"2","n":"morty"}), json!({"id":"3","n":"rick morty"})];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let result = eval_match("n", "rick morty", "and", None, &corpus).unwrap();
        let hits: Vec<_> = result.candidates.iter().map(|i| corpus.repository.external_id(i).unwrap()).collect();
        assert_eq!(hits, vec!["3"]);
    }

    #[test]
    fn multi_word_prefix_expands_every_token() {
        let docs = vec![
            json!({"id":"1","n":"application architecture"}),
            json!({"id":"2","n":"application"}),
            json!({"id":"3","n":"architecture application"}),
        ];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let result = eval_prefix("n", "applica architec", None, &corpus);
        let hits: Vec<_> = result.candidates.iter().map(|i| corpus.repository.external_id(i).unwrap()).collect();
        assert_eq!(hits, vec!["1"], "only the doc with the tokens in that consecutive order matches");
    }

    #[test]
    fn wildcard_prefix_pattern() {
        let docs = vec![
            json!({"id":"w1","n":"apple"}),
            json!({"id":"w2","n":"application"}),
            json!({"id":"w3","n":"applet"}),
            json!({"id":"w4","n":"banana"}),
        ];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let result = eval_wildcard("n", "app*", None, &corpus).unwrap();
        assert_eq!(result.candidates.len(), 3);
    }

    #[test]
    fn range_filters_numerically() {
        let docs = vec![json!({"id":"1","price":5.0}), json!({"id":"2","price":15.0}), json!({"id":"3","price":25.0})];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let result = eval_range("price", Some(10.0), Some(20.0), None, None, &corpus);
        let hits: Vec<_> = result.candidates.iter().map(|i| corpus.repository.external_id(i).unwrap().to_string()).collect();
        assert_eq!(hits, vec!["2".to_string()]);
    }
}
