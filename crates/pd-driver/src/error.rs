//! Error types for pd-driver

use crate::backend::BackendError;
use pd_core::{CoreError, TypeId};
use pd_plugin::PluginError;
use thiserror::Error;

/// Driver-manager errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Backend module could not be located or loaded (D001)
    #[error("[D001] Backend '{backend}' could not be loaded: {reason}")]
    Load { backend: String, reason: String },

    /// Module loaded but does not export the requested class (D002)
    #[error("[D002] Backend '{backend}' does not export class '{class}'")]
    ClassNotFound { backend: String, class: String },

    /// Backend refused to connect (D003)
    #[error("[D003] Database connection failed: {0}")]
    Connection(String),

    /// Backend rejected the query text (D004)
    #[error("[D004] Failed to prepare statement: {0}")]
    Prepare(String),

    /// Backend has no bind routine for this cell type (D005)
    #[error("[D005] Backend cannot bind values of type {0}")]
    UnsupportedType(TypeId),

    /// Backend reported a runtime failure (D006)
    #[error("[D006] SQL execution failed (code {code}): {message}")]
    Execution { code: i32, message: String },

    /// Cell downcast failed (D007)
    #[error("[D007] {0}")]
    Cast(#[source] CoreError),

    /// Schema migration failed (D008)
    #[error("[D008] Migration failed: {0}")]
    Migration(String),

    /// Optional backend capability missing (D009)
    #[error("[D009] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Rows were already pulled one at a time (D010)
    #[error("[D010] fetch_all() cannot be called after fetch()")]
    FetchOrder,

    /// Local I/O failed (D011)
    #[error("[D011] I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection mutex poisoned (D012)
    #[error("[D012] Connection mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Any other plugin failure (D013)
    #[error("[D013] {0}")]
    Plugin(#[source] PluginError),

    /// Connection parameters could not be loaded (D014)
    #[error("[D014] {0}")]
    Config(#[source] CoreError),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Convert a backend failure, prefixing the message with the failed operation.
    pub(crate) fn from_backend(backend: &str, operation: &str, err: BackendError) -> Self {
        match err {
            BackendError::Failed { code, message } => DbError::Execution {
                code,
                message: format!("{operation}: {message}"),
            },
            BackendError::UnsupportedType(tag) => DbError::UnsupportedType(tag),
            BackendError::NotImplemented(feature) => DbError::NotImplemented {
                backend: backend.to_string(),
                feature: feature.to_string(),
            },
        }
    }
}

impl From<PluginError> for DbError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Load { path, reason } => DbError::Load {
                backend: path,
                reason,
            },
            PluginError::ClassNotFound { library, class } => DbError::ClassNotFound {
                backend: library,
                class,
            },
            other => DbError::Plugin(other),
        }
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::BlobRead(source) => DbError::Io {
                context: "reading blob input".to_string(),
                source,
            },
            cast @ CoreError::Cast { .. } => DbError::Cast(cast),
            config => DbError::Config(config),
        }
    }
}
