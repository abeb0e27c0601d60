//! Client-side connection handle.
//!
//! [`Connection`] is a cheap, cloneable handle to one backend connection
//! instance. The instance is disconnected and destroyed when the last handle
//! (including the ones held by live statements) is dropped, and only then is
//! the backend module released.

use crate::backend::{BackendError, ConnectionImpl, MigratorImpl};
use crate::error::{DbError, DbResult};
use crate::loader::PluginLoader;
use crate::statement::Statement;
use pd_core::ConnectionParameters;
use pd_plugin::{ForeignBox, LoadedClass};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to a connected backend
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    backend: Mutex<LoadedClass<dyn ConnectionImpl>>,
    backend_name: String,
    params: ConnectionParameters,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        let backend = self
            .backend
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match backend.disconnect() {
            Ok(()) => log::debug!("Disconnected from {}", self.backend_name),
            Err(e) => log::warn!("Disconnect from {} failed: {e}", self.backend_name),
        }
    }
}

impl Connection {
    /// Open a connection through the process-wide [`PluginLoader`].
    pub fn open(params: &ConnectionParameters) -> DbResult<Self> {
        PluginLoader::global().load(params)
    }

    /// Connect a freshly constructed backend instance.
    ///
    /// On failure the instance is destroyed and no handle is created.
    pub(crate) fn connect(
        mut backend: LoadedClass<dyn ConnectionImpl>,
        params: ConnectionParameters,
    ) -> DbResult<Self> {
        let backend_name = backend.backend_name().to_string();
        backend.connect(&params).map_err(|e| match e {
            BackendError::Failed { message, .. } => DbError::Connection(message),
            other => DbError::from_backend(&backend_name, "connect", other),
        })?;
        log::debug!(
            "Connected to {} (module {} version {})",
            backend_name,
            backend.library().name(),
            backend.library().version()
        );
        Ok(Self {
            inner: Arc::new(ConnectionInner {
                backend: Mutex::new(backend),
                backend_name,
                params,
            }),
        })
    }

    /// Run `f` with the backend locked for the duration of the call.
    fn with_backend<T>(&self, f: impl FnOnce(&mut dyn ConnectionImpl) -> T) -> DbResult<T> {
        let mut backend = self
            .inner
            .backend
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(f(&mut **backend))
    }

    /// Run `f` holding the backend lock without touching the backend.
    ///
    /// Statements call their backend statement through this, so statement
    /// calls are serialized with the connection's own calls.
    pub(crate) fn serialized<T>(&self, f: impl FnOnce() -> T) -> DbResult<T> {
        let _backend = self
            .inner
            .backend
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(f())
    }

    fn backend_call(
        &self,
        operation: &str,
        f: impl FnOnce(&mut dyn ConnectionImpl) -> Result<(), BackendError>,
    ) -> DbResult<()> {
        self.with_backend(f)?
            .map_err(|e| DbError::from_backend(&self.inner.backend_name, operation, e))
    }

    /// Compile `query` into a [`Statement`].
    pub fn prepare(&self, query: &str) -> DbResult<Statement> {
        let statement = self.with_backend(|backend| backend.prepare(query))?;
        let statement = statement.map_err(|e| match e {
            BackendError::Failed { message, .. } => {
                log::debug!("Prepare failed on {}: {message}", self.inner.backend_name);
                DbError::Prepare(message)
            }
            other => DbError::from_backend(&self.inner.backend_name, "prepare", other),
        })?;
        Ok(Statement::new(statement, self.clone(), query.to_string()))
    }

    /// Read the query text from `path`, then [`prepare`](Self::prepare) it.
    pub fn prepare_from_file(&self, path: &Path) -> DbResult<Statement> {
        let query = std::fs::read_to_string(path).map_err(|source| DbError::Io {
            context: format!("reading query file {}", path.display()),
            source,
        })?;
        self.prepare(&query)
    }

    /// Run a statement once, discarding any rows
    pub fn execute(&self, query: &str) -> DbResult<()> {
        self.backend_call("execute", |backend| backend.execute(query))
    }

    pub fn begin(&self) -> DbResult<()> {
        self.backend_call("begin transaction", |backend| backend.start_transaction())
    }

    pub fn commit(&self) -> DbResult<()> {
        self.backend_call("commit", |backend| backend.commit())
    }

    pub fn rollback(&self) -> DbResult<()> {
        self.backend_call("rollback", |backend| backend.rollback())
    }

    pub fn set_autocommit(&self, enabled: bool) -> DbResult<()> {
        self.backend_call("set autocommit", |backend| backend.set_autocommit(enabled))
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T>(&self, body: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        self.begin()?;

        let result = body(self);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.commit() {
                    let _ = self.rollback();
                    return Err(commit_err);
                }
            }
            Err(_) => {
                if let Err(e) = self.rollback() {
                    log::warn!("Rollback on {} failed: {e}", self.inner.backend_name);
                }
            }
        }
        result
    }

    /// Most recent diagnostic reported by the backend
    pub fn error_message(&self) -> DbResult<String> {
        self.with_backend(|backend| backend.error_message())
    }

    /// Backend-provided migrator, if the backend has one
    pub(crate) fn backend_migrator(&self) -> DbResult<Option<ForeignBox<dyn MigratorImpl>>> {
        self.with_backend(|backend| backend.migrator())
    }

    /// Copy of the parameters this connection was opened with
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.inner.params
    }

    pub fn backend_name(&self) -> &str {
        &self.inner.backend_name
    }

    /// Version string reported by the backend module
    pub fn module_version(&self) -> DbResult<String> {
        let backend = self
            .inner
            .backend
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(backend.library().version().to_string())
    }

    /// Number of live handles, including those held by statements
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.inner.backend_name)
            .field("params", &self.inner.params)
            .finish()
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
