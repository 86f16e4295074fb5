// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for Kea-Perch

use thiserror::Error;

/// Result type alias for Kea-Perch operations
pub type Result<T> = std::result::Result<T, PerchError>;

/// Errors that can occur while building a resource graph
#[derive(Error, Debug)]
pub enum PerchError {
    /// A required configuration field is empty or absent
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A field or derived resource name violates naming constraints
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidNaming {
        field: String,
        value: String,
        reason: String,
    },

    /// A downstream stage received an invalid upstream artifact
    #[error("Resource graph assembly failed: {message}")]
    AssemblyError { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PerchError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn naming(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidNaming {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn assembly(message: impl Into<String>) -> Self {
        Self::AssemblyError {
            message: message.into(),
        }
    }
}
