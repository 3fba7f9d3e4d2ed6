//! Worker-pool coordinator: task dispatch, vector clocks, a bounded CRDT
//! operation log, and the throttled persistence triggers that tie an
//! index's writes to its snapshots (§4.6, §6, §9).

pub mod coordinator;
pub mod error;
pub mod health;
pub mod operation;
pub mod oplog;
pub mod vector_clock;
pub mod worker;

pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use health::HealthReport;
pub use operation::{InitConfig, Operation, OperationResult};
pub use oplog::{OpKind, OpLogEntry, OperationLog};
pub use vector_clock::VectorClock;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shardsearch_query::{Query, SearchContext};

    fn sample_doc(id: &str, title: &str) -> shardsearch_types::Document {
        json!({"id": id, "title": title}).as_object().unwrap().clone()
    }

    #[test]
    fn add_and_search_round_trip_through_the_coordinator() {
        let coordinator = Coordinator::new(2, None);
        coordinator
            .execute(Operation::InitEngine { index_name: "products".into(), config: InitConfig::default() })
            .unwrap();
        let result = coordinator
            .execute(Operation::AddDocuments {
                index_name: "products".into(),
                documents: vec![sample_doc("1", "red shoes"), sample_doc("2", "blue shoes")],
            })
            .unwrap();
        match result {
            OperationResult::AddOutcomes(outcomes) => assert_eq!(outcomes.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }

        let result = coordinator
            .execute(Operation::Search {
                index_name: "products".into(),
                query: Query::from_text("shoes"),
                context: SearchContext::default(),
            })
            .unwrap();
        match result {
            OperationResult::Search(search) => assert_eq!(search.total, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn searching_an_unknown_index_reports_not_found() {
        let coordinator = Coordinator::new(1, None);
        let err = coordinator
            .execute(Operation::Search {
                index_name: "missing".into(),
                query: Query::MatchAll,
                context: SearchContext::default(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn duplicate_document_id_does_not_error_and_reports_was_added_false() {
        let coordinator = Coordinator::new(1, None);
        coordinator
            .execute(Operation::AddDocuments { index_name: "products".into(), documents: vec![sample_doc("1", "first")] })
            .unwrap();
        let result = coordinator
            .execute(Operation::AddDocuments { index_name: "products".into(), documents: vec![sample_doc("1", "second")] })
            .unwrap();
        match result {
            OperationResult::AddOutcomes(outcomes) => assert!(!outcomes[0].was_added),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn retrying_an_identical_add_documents_call_is_deduped_by_the_operation_log() {
        let coordinator = Coordinator::new(2, None);
        let documents = vec![sample_doc("1", "red shoes"), sample_doc("2", "blue shoes")];

        let first = coordinator
            .execute(Operation::AddDocuments { index_name: "products".into(), documents: documents.clone() })
            .unwrap();
        match first {
            OperationResult::AddOutcomes(outcomes) => assert_eq!(outcomes.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }

        let retry = coordinator.execute(Operation::AddDocuments { index_name: "products".into(), documents }).unwrap();
        match retry {
            OperationResult::AddOutcomes(outcomes) => {
                assert!(outcomes.is_empty(), "identical retry should be discarded by opId dedup, not reprocessed")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn flush_then_restore_preserves_search_results() {
        let tmp = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(1, Some(tmp.path().to_path_buf()));
        coordinator
            .execute(Operation::AddDocuments {
                index_name: "products".into(),
                documents: vec![sample_doc("1", "rust programming"), sample_doc("2", "python programming")],
            })
            .unwrap();
        coordinator.execute(Operation::Flush { index_name: "products".into() }).unwrap();

        let paths = shardsearch_persistence::IndexPaths::new(tmp.path(), "products");
        let snapshot = shardsearch_persistence::read_snapshot(&paths).unwrap();

        let restored = Coordinator::new(1, None);
        restored.execute(Operation::InitFromSnap { index_name: "products".into(), snapshot, facet_fields: vec![] }).unwrap();
        let result = restored
            .execute(Operation::Search {
                index_name: "products".into(),
                query: Query::from_text("programming"),
                context: SearchContext::default(),
            })
            .unwrap();
        match result {
            OperationResult::Search(search) => assert_eq!(search.total, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
