//! Text → token stream (§4.1): the analyzer family and the mutable
//! stop-word set it consults.

pub mod analyzer;
pub mod error;
pub mod stopwords;

pub use analyzer::{analyzer_by_name, analyzer_for_field_type, tokenize, Analyzer, CustomAnalyzerConfig};
pub use error::{Error, Result};
pub use stopwords::{Stopwords, DEFAULT_AUTO_DETECT_THRESHOLD};
