use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("lottery type not found: {id}")]
    LotteryTypeNotFound { id: i64 },

    #[error("lottery type already exists: {code}")]
    LotteryTypeExists { code: String },

    #[error("recommendation not found: {id}")]
    RecommendationNotFound { id: i64 },

    /// A JSON column could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
