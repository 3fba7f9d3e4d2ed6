use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidDocument(#[from] shardsearch_types::Error),
    #[error(transparent)]
    Query(#[from] shardsearch_query::Error),
    #[error(transparent)]
    Index(#[from] shardsearch_index::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
