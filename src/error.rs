use thiserror::Error;

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing or malformed configuration: search configuration, SQL
    /// templates, resources or manager implementation names
    #[error("Configuration error: {0}")]
    Config(String),

    /// Statement execution or connection pool failure
    #[error("Database error: {0}")]
    Database(String),

    /// Item values that cannot be bound or coerced
    #[error("Invalid item data: {0}")]
    InvalidData(String),

    /// Lookup by identifier returned nothing within the current site scope
    #[error("Item not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
