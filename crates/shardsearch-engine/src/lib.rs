//! `SearchEngine`: the per-index aggregate tying tokenization, the sharded
//! inverted index, the document repository, query execution, and snapshot
//! (de)serialization together (§3, §4.6).

pub mod config;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod stats;

pub use config::EngineConfig;
pub use engine::{AddOutcome, SearchEngine};
pub use error::{Error, Result};
pub use stats::{IndexSummary, Stats};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shardsearch_query::{Query, SearchContext};

    #[test]
    fn add_search_delete_round_trip() {
        let mut engine = SearchEngine::new("products", EngineConfig::default()).unwrap();
        let docs = vec![
            json!({"id": "a", "title": "red shoes"}).as_object().unwrap().clone(),
            json!({"id": "b", "title": "blue shoes"}).as_object().unwrap().clone(),
        ];
        let outcomes = engine.add_documents(docs).unwrap();
        assert!(outcomes.iter().all(|o| o.was_added));

        let result = engine.search(&Query::from_text("shoes"), &SearchContext::default()).unwrap();
        assert_eq!(result.total, 2);

        engine.delete_document("a").unwrap();
        let result = engine.search(&Query::from_text("shoes"), &SearchContext::default()).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.hits[0].document.get("id").unwrap(), "b");
    }

    #[test]
    fn duplicate_add_is_reported_without_mutating_the_existing_document() {
        let mut engine = SearchEngine::new("products", EngineConfig::default()).unwrap();
        engine.add_documents(vec![json!({"id": "a", "title": "first"}).as_object().unwrap().clone()]).unwrap();
        let outcomes = engine
            .add_documents(vec![json!({"id": "a", "title": "second"}).as_object().unwrap().clone()])
            .unwrap();
        assert!(!outcomes[0].was_added);
        assert_eq!(engine.repository.get("a").unwrap().get("title").unwrap(), "first");
    }

    #[test]
    fn snapshot_round_trip_preserves_search_results() {
        let mut engine = SearchEngine::new("products", EngineConfig::default()).unwrap();
        engine
            .add_documents(vec![
                json!({"id": "1", "title": "rust programming"}).as_object().unwrap().clone(),
                json!({"id": "2", "title": "python programming"}).as_object().unwrap().clone(),
            ])
            .unwrap();
        let before = engine.search(&Query::from_text("programming"), &SearchContext::default()).unwrap();

        let snapshot = engine.to_snapshot();
        let restored = SearchEngine::from_snapshot("products", snapshot, false).unwrap();
        let after = restored.search(&Query::from_text("programming"), &SearchContext::default()).unwrap();

        assert_eq!(before.total, after.total);
        let before_ids: Vec<_> = before.hits.iter().map(|h| h.document.get("id").cloned()).collect();
        let after_ids: Vec<_> = after.hits.iter().map(|h| h.document.get("id").cloned()).collect();
        assert_eq!(before_ids, after_ids);
    }
}
