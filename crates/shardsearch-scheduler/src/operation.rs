use serde::{Deserialize, Serialize};
use shardsearch_engine::Stats;
use shardsearch_persistence::Snapshot;
use shardsearch_query::{Query, SearchContext, SearchResult};
use shardsearch_types::{Document, Mappings};

/// The coordinator's single operation surface (§6): every request, write or
/// read, enters through one tagged `Operation` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    InitEngine { index_name: String, config: InitConfig },
    InitFromSnap { index_name: String, snapshot: Snapshot, #[serde(default)] facet_fields: Vec<String> },
    AddDocuments { index_name: String, documents: Vec<Document> },
    DeleteDocument { index_name: String, doc_id: String },
    Search { index_name: String, query: Query, context: SearchContext },
    GetFacets { index_name: String },
    GetStats { index_name: String },
    Flush { index_name: String },
    DeleteIndex { index_name: String },
    ListIndices,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    #[serde(default)]
    pub sharding: bool,
    #[serde(default)]
    pub num_shards: Option<usize>,
    #[serde(default)]
    pub facet_fields: Vec<String>,
    #[serde(default)]
    pub mappings: Option<Mappings>,
}

/// What each [`Operation`] variant resolves to.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OperationResult {
    Ack,
    AddOutcomes(Vec<shardsearch_engine::AddOutcome>),
    Search(SearchResult),
    Facets(std::collections::HashMap<String, shardsearch_query::FacetResult>),
    Stats(Stats),
    Indices(Vec<shardsearch_engine::IndexSummary>),
}
