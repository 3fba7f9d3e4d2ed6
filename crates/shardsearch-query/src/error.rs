use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
