use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Queue-store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] axum::Error),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, HelperError>;
