//! Connection parameters and their YAML configuration form
//!
//! ```yaml
//! backend: duckdb
//! filename: ./app.duckdb
//! plugin_dir: ./plugins
//! ```

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{compiler_fence, Ordering};

/// Environment variable overriding the default plugin directory
pub const PLUGIN_DIR_ENV: &str = "PD_PLUGIN_DIR";

/// Environment variable consulted by [`ConnectionParameters::resolve_password_from_env`]
pub const PASSWORD_ENV: &str = "PD_PASSWORD";

const DEFAULT_PLUGIN_DIR: &str = "plugins";

/// TLS preference handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Never negotiate TLS
    Disable,
    /// Use TLS when the server offers it (default)
    #[default]
    Prefer,
    /// Fail the connection without TLS
    Require,
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsMode::Disable => write!(f, "disable"),
            TlsMode::Prefer => write!(f, "prefer"),
            TlsMode::Require => write!(f, "require"),
        }
    }
}

/// Everything needed to locate a backend module and open a connection.
///
/// Cloning duplicates every field, so erasing the password of one copy never
/// affects another. The password is redacted from `Debug` output and is never
/// serialized.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionParameters {
    /// Backend identifier, e.g. `duckdb`
    pub backend: String,

    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    /// Database name (server backends)
    #[serde(default)]
    pub dbname: String,

    /// Database file path (embedded backends)
    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing)]
    password: String,

    /// Directory searched for backend modules
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// File extension of backend modules, including the dot
    #[serde(default = "default_plugin_extension")]
    pub plugin_extension: String,

    #[serde(default)]
    pub tls: TlsMode,
}

fn default_plugin_dir() -> PathBuf {
    std::env::var_os(PLUGIN_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_DIR))
}

fn default_plugin_extension() -> String {
    std::env::consts::DLL_SUFFIX.to_string()
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            backend: String::new(),
            host: String::new(),
            port: None,
            dbname: String::new(),
            filename: String::new(),
            user: String::new(),
            password: String::new(),
            plugin_dir: default_plugin_dir(),
            plugin_extension: default_plugin_extension(),
            tls: TlsMode::default(),
        }
    }
}

impl ConnectionParameters {
    /// Parameters for `backend` with every other field defaulted
    pub fn new(backend: impl Into<String>) -> Self {
        let mut params = Self::default();
        params.backend = backend.into();
        params
    }

    /// Load parameters from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigParse {
            message: format!("{}: {e}", path.display()),
        })?;
        let params = Self::from_yaml_str(&content)?;
        log::debug!(
            "Loaded connection parameters for backend '{}' from {}",
            params.backend,
            path.display()
        );
        Ok(params)
    }

    /// Parse parameters from YAML text
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParse {
            message: e.to_string(),
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = dbname.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.set_password(password);
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_plugin_extension(mut self, extension: impl Into<String>) -> Self {
        self.plugin_extension = extension.into();
        self
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Replace the password, erasing the previous one first
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.erase_password();
        self.password = password.into();
    }

    /// Overwrite the password buffer with zeros, then clear it
    pub fn erase_password(&mut self) {
        let mut bytes = std::mem::take(&mut self.password).into_bytes();
        for byte in bytes.iter_mut() {
            // SAFETY: `byte` is a valid, exclusive reference into `bytes`.
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
        compiler_fence(Ordering::SeqCst);
    }

    /// Fill an empty password from `PD_PASSWORD`, if set
    pub fn resolve_password_from_env(&mut self) {
        if self.password.is_empty() {
            if let Ok(password) = std::env::var(PASSWORD_ENV) {
                self.password = password;
            }
        }
    }

    /// Primary module location: `<plugin_dir>/<backend><extension>`
    pub fn plugin_path(&self) -> PathBuf {
        self.plugin_dir
            .join(format!("{}{}", self.backend, self.plugin_extension))
    }

    /// Module locations to try, in order.
    ///
    /// Cargo names cdylib outputs with the platform prefix (`lib` on Unix), so
    /// the prefixed file name is tried after the plain one.
    pub fn plugin_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.plugin_path()];
        let prefix = std::env::consts::DLL_PREFIX;
        if !prefix.is_empty() {
            candidates.push(self.plugin_dir.join(format!(
                "{prefix}{}{}",
                self.backend, self.plugin_extension
            )));
        }
        candidates
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("filename", &self.filename)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("plugin_dir", &self.plugin_dir)
            .field("plugin_extension", &self.plugin_extension)
            .field("tls", &self.tls)
            .finish()
    }
}

impl Drop for ConnectionParameters {
    fn drop(&mut self) {
        self.erase_password();
    }
}

#[cfg(test)]
#[path = "params_test.rs"]
mod tests;
