use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("document is missing a non-empty `id` field")]
    InvalidDocument,
    #[error("field `{0}` rejected value: {1}")]
    ValidationFailure(String, String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
