use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("index `{0}` not found")]
    NotFound(String),
    #[error("task exceeded its deadline")]
    Timeout,
    #[error("worker {0} crashed")]
    WorkerCrash(usize),
    #[error(transparent)]
    Engine(#[from] shardsearch_engine::Error),
    #[error(transparent)]
    Persistence(#[from] shardsearch_persistence::Error),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
