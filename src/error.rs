//! Error types for the track feature store
//!
//! This module provides structured error definitions using thiserror. The
//! four domain variants map directly onto the outcomes the transport layer
//! has to distinguish: bad input, absent data, a transient store fault, and
//! a schema conflict that needs operator attention.

use thiserror::Error;

/// Main error type for feature store operations
#[derive(Error, Debug)]
pub enum FeatureStoreError {
    /// Raw feature name is empty or, after normalization, contains
    /// characters outside `[a-z0-9_]`. Raised before any store access.
    #[error("Invalid feature name: {0}")]
    InvalidFeatureName(String),

    /// The requested value does not exist: the feature has no column yet,
    /// the track has no row, or the cell is NULL. A normal empty outcome
    /// rather than a fault.
    #[error("Not found")]
    NotFound,

    /// Connection, pool, or query failure, or a sync deadline expiry.
    /// Transient; the caller may retry the whole operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A planned feature column collides with an existing non-feature
    /// column, or an existing column of a different type. Fatal for the
    /// sync attempt; not retried automatically.
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeatureStoreError {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeatureStoreError::StoreUnavailable(_))
    }
}

/// Result type alias for feature store operations
pub type Result<T> = std::result::Result<T, FeatureStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeatureStoreError::InvalidFeatureName("bad name!".to_string());
        assert_eq!(err.to_string(), "Invalid feature name: bad name!");

        let err = FeatureStoreError::SchemaConflict("column type mismatch".to_string());
        assert_eq!(err.to_string(), "Schema conflict: column type mismatch");
    }

    #[test]
    fn test_retryability() {
        assert!(FeatureStoreError::StoreUnavailable("timeout".into()).is_retryable());
        assert!(!FeatureStoreError::SchemaConflict("pk collision".into()).is_retryable());
        assert!(!FeatureStoreError::NotFound.is_retryable());
    }
}
