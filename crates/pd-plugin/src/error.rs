//! Error types for pd-plugin

use thiserror::Error;

/// Plugin loading errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// Module file missing, unloadable, or lacking the registration entry point (P001)
    #[error("[P001] Plugin {path} not loadable: {reason}")]
    Load { path: String, reason: String },

    /// Requested class was not registered by the module (P002)
    #[error("[P002] Class '{class}' is not exported by plugin {library}")]
    ClassNotFound { library: String, class: String },

    /// Registration entry point reported failure (P003)
    #[error("[P003] Plugin {library} failed to register its classes (code {code})")]
    Registration { library: String, code: i32 },

    /// Module constructor returned no object (P004)
    #[error("[P004] Plugin {library} failed to construct class '{class}'")]
    Construction { library: String, class: String },
}

/// Result type alias for PluginError
pub type PluginResult<T> = Result<T, PluginError>;
