//! Domain error types
//!
//! This module defines the error hierarchy for Quarry. Errors are domain-specific
//! and don't expose third-party driver or SDK types.

use thiserror::Error;

/// Main Quarry error type
///
/// This is the primary error type used throughout the pipeline. The variants follow
/// the pipeline's failure taxonomy: configuration problems are fatal before any I/O,
/// per-table extraction and transform failures are recovered by the stage that owns
/// them, and per-row load failures roll back a single batch.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Configuration-related errors (missing or invalid settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure while reading changed rows from a source table
    #[error("Extraction error for table '{table}': {message}")]
    Extraction {
        /// Source table being extracted
        table: String,
        /// Underlying failure
        message: String,
    },

    /// Failure while reshaping rows for a warehouse target
    #[error("Transform error for '{table}': {message}")]
    Transform {
        /// Warehouse target being produced
        table: String,
        /// Underlying failure
        message: String,
    },

    /// Failure while loading a batch into the warehouse
    #[error("Load error for '{table}': {message}")]
    Load {
        /// Warehouse table being loaded
        table: String,
        /// Underlying failure
        message: String,
    },

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Object was not found in storage
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Database-related errors (source or warehouse)
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors (rejected input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record or batch does not conform to its declared schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Watermark state errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl QuarryError {
    /// Creates an extraction error for a source table
    pub fn extraction(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a transform error for a warehouse target
    pub fn transform(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a load error for a warehouse table
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether this error should abort a whole stage rather than a single table
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QuarryError::Configuration(_) | QuarryError::State(_) | QuarryError::Connection(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return QuarryError::NotFound(err.to_string());
        }
        QuarryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for QuarryError {
    fn from(err: toml::de::Error) -> Self {
        QuarryError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarry_error_display() {
        let err = QuarryError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_table_scoped_errors_display() {
        let err = QuarryError::extraction("sales_order", "connection reset");
        assert_eq!(
            err.to_string(),
            "Extraction error for table 'sales_order': connection reset"
        );

        let err = QuarryError::transform("fact_payment", "payment_amount is not numeric");
        assert!(err.to_string().contains("fact_payment"));

        let err = QuarryError::load("dim_staff", "duplicate key");
        assert!(err.to_string().starts_with("Load error for 'dim_staff'"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(QuarryError::Configuration("x".to_string()).is_fatal());
        assert!(QuarryError::State("x".to_string()).is_fatal());
        assert!(!QuarryError::extraction("staff", "x").is_fatal());
        assert!(!QuarryError::Storage("x".to_string()).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: QuarryError = io_err.into();
        assert!(matches!(err, QuarryError::Io(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: QuarryError = io_err.into();
        assert!(matches!(err, QuarryError::NotFound(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: QuarryError = json_err.into();
        assert!(matches!(err, QuarryError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: QuarryError = toml_err.into();
        assert!(matches!(err, QuarryError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_quarry_error_implements_std_error() {
        let err = QuarryError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
