use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("document `{0}` not found")]
    NotFound(String),
    #[error("document `{0}` already exists")]
    Duplicate(String),
}
