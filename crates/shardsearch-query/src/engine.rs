use std::collections::HashMap;

use serde::Serialize;
use shardsearch_index::InternalId;
use shardsearch_types::Document;

use crate::aggregations::{compute_aggregations, AggregationResult};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::facets::{auto_discover_facets, compute_facets, FacetResult};
use crate::plan::evaluate;
use crate::query::{Query, SearchContext};

const DEFAULT_SIZE: usize = 10;
const DEFAULT_FACET_SIZE: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Hit {
    #[serde(flatten)]
    pub document: Document,
    #[serde(rename = "_score")]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchResult {
    pub hits: Vec<Hit>,
    pub total: u64,
    pub from: usize,
    pub size: usize,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub aggregations: std::collections::BTreeMap<String, AggregationResult>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub facets: HashMap<String, FacetResult>,
}

/// `match_all` with no explicit `size` returns every candidate (§4.5's
/// "a bare match_all is a listing, not a ranked top-N"); every other query
/// defaults to the usual page of 10.
fn default_size(query: &Query, total: usize) -> usize {
    if matches!(query, Query::MatchAll) {
        total
    } else {
        DEFAULT_SIZE
    }
}

fn sequence_order_map(corpus: &Corpus) -> HashMap<&str, usize> {
    corpus.repository.ids_by_sequence().into_iter().enumerate().map(|(i, id)| (id, i)).collect()
}

fn sequence_of(corpus: &Corpus, sequence_order: &HashMap<&str, usize>, doc: InternalId) -> usize {
    corpus.repository.external_id(doc).and_then(|id| sequence_order.get(id).copied()).unwrap_or(usize::MAX)
}

fn order_by_sequence(corpus: &Corpus, ranked: &mut [(InternalId, f64)]) {
    let sequence_order = sequence_order_map(corpus);
    ranked.sort_by_key(|(doc, _)| sequence_of(corpus, &sequence_order, *doc));
}

/// Runs `query` against `corpus`, ranks and paginates the candidates, then
/// computes aggregations and facets over the full (unpaginated) result set
/// (§4.5: "facets are computed on the filtered set", before pagination).
pub fn execute(
    query: &Query,
    context: &SearchContext,
    corpus: &Corpus,
    facet_fields: &[String],
    facet_size: Option<usize>,
) -> Result<SearchResult> {
    let node = evaluate(query, corpus)?;
    let total = node.candidates.len();
    let from = context.from.unwrap_or(0);
    let size = context.size.unwrap_or_else(|| default_size(query, total as usize));

    let mut ranked: Vec<(InternalId, f64)> =
        node.candidates.iter().map(|doc| (doc, node.scores.get(&doc).copied().unwrap_or(0.0))).collect();
    if ranked.iter().any(|(_, score)| *score != 0.0) {
        let sequence_order = sequence_order_map(corpus);
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| sequence_of(corpus, &sequence_order, a.0).cmp(&sequence_of(corpus, &sequence_order, b.0)))
        });
    } else {
        order_by_sequence(corpus, &mut ranked);
    }

    let hits = ranked
        .into_iter()
        .skip(from)
        .take(size)
        .filter_map(|(doc, score)| {
            let ext_id = corpus.repository.external_id(doc)?;
            let document = corpus.repository.get(ext_id)?.clone();
            Some(Hit { document, score })
        })
        .collect();

    let aggregations = compute_aggregations(corpus, &node.candidates, &context.aggregations);
    let facets = if facet_fields.is_empty() {
        auto_discover_facets(corpus, &node.candidates)
    } else {
        compute_facets(corpus, &node.candidates, facet_fields, facet_size.unwrap_or(DEFAULT_FACET_SIZE))
    };

    Ok(SearchResult { hits, total: total as u64, from, size, aggregations, facets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_corpus;
    use serde_json::json;

    #[test]
    fn match_all_lists_everything_without_an_explicit_size() {
        let docs = (0..15).map(|i| json!({"id": format!("{i}"), "title": "x"})).collect();
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let result = execute(&Query::MatchAll, &SearchContext::default(), &corpus, &[], None).unwrap();
        assert_eq!(result.hits.len(), 15);
        assert_eq!(result.total, 15);
    }

    #[test]
    fn ranked_query_paginates_with_default_page_size() {
        let docs = vec![
            json!({"id":"1","title":"rust rust rust"}),
            json!({"id":"2","title":"rust"}),
        ];
        let fixture = build_corpus(docs);
        let corpus = fixture.corpus();
        let query = Query::from_text("rust");
        let result = execute(&query, &SearchContext::default(), &corpus, &[], None).unwrap();
        assert_eq!(result.size, 10);
        assert_eq!(result.hits[0].document.get("id").unwrap(), "1", "higher term frequency ranks first");
    }

    #[test]
    fn tied_scores_break_by_sequence_even_when_internal_ids_disagree() {
        let mut fixture = build_corpus(vec![
            json!({"id":"placeholder-a","title":"nothing"}),
            json!({"id":"placeholder-b","title":"nothing"}),
        ]);
        // Removing in insertion order leaves the free list (a LIFO stack) such
        // that the next two saves hand out internal ids in the opposite order
        // from the sequence they're saved in, the same way a delete-then-re-add
        // churn does in a live index.
        fixture.remove("placeholder-a");
        fixture.remove("placeholder-b");

        let a_internal = fixture.add(json!({"id":"a","title":"rust rust"}));
        let b_internal = fixture.add(json!({"id":"b","title":"rust rust"}));
        assert!(a_internal > b_internal, "recycled ids should land in reverse of save order for this case to be meaningful");

        let corpus = fixture.corpus();
        let query = Query::from_text("rust");
        let result = execute(&query, &SearchContext::default(), &corpus, &[], None).unwrap();
        let ids: Vec<_> = result.hits.iter().map(|h| h.document.get("id").unwrap().clone()).collect();
        assert_eq!(ids, vec!["a", "b"], "tie must break by save sequence, not by the (here reversed) internal id");
    }
}
