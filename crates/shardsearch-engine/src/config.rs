use serde::{Deserialize, Serialize};
use shardsearch_types::Mappings;

fn default_num_shards() -> usize {
    1
}

/// `InitEngine`'s `config` payload (§6): how a freshly created index is
/// sharded and which fields it should report facets for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sharding: bool,
    #[serde(default = "default_num_shards")]
    pub num_shards: usize,
    #[serde(default)]
    pub facet_fields: Vec<String>,
    #[serde(default)]
    pub mappings: Option<Mappings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { sharding: false, num_shards: default_num_shards(), facet_fields: Vec::new(), mappings: None }
    }
}
