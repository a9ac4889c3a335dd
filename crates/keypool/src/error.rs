//! Error types for credential pool operations

/// Errors from pool construction and slot bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable credential could be loaded, or the pool settings are invalid.
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("slot not found: {0}")]
    SlotNotFound(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
