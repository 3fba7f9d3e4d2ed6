//! Query tree, plan evaluation, facets, and aggregations (§4.5/§6).

pub mod aggregations;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod facets;
pub mod plan;
pub mod query;

#[cfg(test)]
mod test_support;

pub use aggregations::{AggregationResult, Bucket};
pub use corpus::Corpus;
pub use engine::{execute, Hit, SearchResult};
pub use error::{Error, Result};
pub use facets::{FacetResult, FacetValue};
pub use plan::{evaluate, NodeResult};
pub use query::{AggregationRequest, Query, RangeBucketSpec, SearchContext};
