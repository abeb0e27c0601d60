//! Error types for pd-core

use crate::cell::TypeId;
use thiserror::Error;

/// Core error type for plugdb value handling and configuration
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Cell downcast requested for a type other than the live payload
    #[error("[C001] Invalid cell cast: expected {expected}, found {actual}")]
    Cast { expected: TypeId, actual: TypeId },

    /// C002: Configuration file not found
    #[error("[C002] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C003: Failed to parse configuration file
    #[error("[C003] Failed to parse config: {message}")]
    ConfigParse { message: String },

    /// C004: Blob input stream could not be read
    #[error("[C004] Failed to read blob input: {0}")]
    BlobRead(#[source] std::io::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
