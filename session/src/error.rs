use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection could be acquired from the pool.
    #[error("session storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A statement reached the database and failed there.
    #[error("{0}")]
    Statement(#[source] sqlx::Error),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
