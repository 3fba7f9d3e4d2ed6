use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid custom analyzer parameter: {0}")]
    InvalidParameter(String),
}
