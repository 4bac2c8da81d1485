use thiserror::Error;

#[derive(Error, Debug)]
pub enum TierEngineError {
    #[error("Malformed activity row: {0}")]
    MalformedRow(String),
    
    #[error("Invalid reporting period: {0}")]
    InvalidPeriod(String),
    
    #[error("Configuration error: {0}")]
    ConfigError(String),
    
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    
    #[error("Persistence failed for batch {batch}: {message}")]
    PersistenceError { batch: usize, message: String },
}

pub type Result<T> = std::result::Result<T, TierEngineError>;
