use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JournalError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        JournalError::Database(err.to_string())
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
