use serde::Serialize;

/// `GetStats` response payload.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_docs: u64,
    pub avg_doc_length: f64,
    pub num_shards: usize,
    pub facet_fields: Vec<String>,
    pub mappings_version: u64,
    pub last_flush: Option<i64>,
}

/// `ListIndices` entry for one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub total_docs: u64,
    pub mappings_version: u64,
}
