use serde::{Deserialize, Serialize};

fn default_operator() -> String {
    "and".to_string()
}

fn default_fuzziness() -> u32 {
    2
}

/// The closed query-tree tag set of §6. Externally tagged so a clause
/// serializes the way the spec writes it, e.g. `{"match": {"field": "title",
/// "value": "rust"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    MatchAll,
    Match {
        field: String,
        value: String,
        #[serde(default = "default_operator")]
        operator: String,
        #[serde(default)]
        boost: Option<f64>,
    },
    Term {
        field: String,
        value: serde_json::Value,
        #[serde(default)]
        boost: Option<f64>,
    },
    Prefix {
        field: String,
        value: String,
        #[serde(default)]
        boost: Option<f64>,
    },
    Wildcard {
        field: String,
        value: String,
        #[serde(default)]
        boost: Option<f64>,
    },
    Fuzzy {
        field: String,
        value: String,
        #[serde(default = "default_fuzziness")]
        fuzziness: u32,
        #[serde(default)]
        boost: Option<f64>,
    },
    MatchPhrase {
        field: String,
        value: String,
        #[serde(default)]
        boost: Option<f64>,
    },
    Range {
        field: String,
        #[serde(default)]
        gte: Option<f64>,
        #[serde(default)]
        lte: Option<f64>,
        #[serde(default)]
        gt: Option<f64>,
        #[serde(default)]
        lt: Option<f64>,
    },
    GeoDistance {
        field: String,
        center: [f64; 2],
        distance: f64,
    },
    Bool {
        #[serde(default)]
        must: Vec<Query>,
        #[serde(default)]
        should: Vec<Query>,
        #[serde(default)]
        must_not: Vec<Query>,
        #[serde(default)]
        filter: Vec<Query>,
        #[serde(default)]
        minimum_should_match: Option<usize>,
    },
}

impl Query {
    /// A bare free-text string normalizes to `{match:{field:"*", value}}`
    /// (§4.5/§9 — the one canonical read path; the divergent
    /// all-fields-free-scan path named as an alternative in the source is
    /// not implemented).
    pub fn from_text(text: impl Into<String>) -> Query {
        Query::Match { field: "*".to_string(), value: text.into(), operator: default_operator(), boost: None }
    }
}

/// `{from?, size?, aggregations?}` execution context for a search (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchContext {
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub aggregations: std::collections::BTreeMap<String, AggregationRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationRequest {
    Terms { field: String, #[serde(default)] size: Option<usize> },
    Range { field: String, ranges: Vec<RangeBucketSpec> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeBucketSpec {
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
}
