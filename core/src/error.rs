use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuskError {
    /// No row matched a lookup by identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// A builder or result set was used in a way that can never succeed
    #[error("Builder misuse: {0}")]
    BuilderMisuse(String),

    /// A record type lacks its table or primary key descriptor
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A serialized filter could not be decoded
    #[error("Transport error: {0}")]
    Transport(String),

    /// ORDER BY direction other than ASC or DESC
    #[error("Invalid order direction: {0}")]
    InvalidOrder(String),

    /// Error mapping a row onto a record
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Error reported by the persistence engine
    #[error("Engine error: {0}")]
    Engine(String),

    /// Configuration file could not be loaded
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type for tusk operations
pub type Result<T> = std::result::Result<T, TuskError>;
