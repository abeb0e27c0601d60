//! Backend resolution: static registry first, then modules on disk.

use crate::backend::{ConnectionImpl, CONNECTION_CLASS};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use pd_core::ConnectionParameters;
use pd_plugin::{Library, RegisterClassesFn, VersionFn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

/// Turns [`ConnectionParameters`] into connected [`Connection`]s.
///
/// Backends linked into the binary are registered by name with
/// [`register_static`](Self::register_static). Anything else is looked up as
/// a module file in the parameters' plugin directory. Loaded modules are
/// cached weakly, so connections to the same backend share one module without
/// the cache keeping it loaded.
#[derive(Debug, Default)]
pub struct PluginLoader {
    statics: RwLock<HashMap<String, Arc<Library>>>,
    modules: Mutex<HashMap<PathBuf, Weak<Library>>>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide loader used by [`Connection::open`]
    pub fn global() -> Arc<PluginLoader> {
        static GLOBAL: OnceLock<Arc<PluginLoader>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PluginLoader::new())))
    }

    /// Register a statically linked backend under `name`.
    ///
    /// Replaces any earlier registration with the same name.
    pub fn register_static(
        &self,
        name: &str,
        version: Option<VersionFn>,
        register: RegisterClassesFn,
    ) -> DbResult<()> {
        let library = Library::from_entry_points(name, version, register)?;
        if !library.has_class(CONNECTION_CLASS) {
            return Err(DbError::ClassNotFound {
                backend: name.to_string(),
                class: CONNECTION_CLASS.to_string(),
            });
        }
        log::debug!(
            "Registered static backend '{}' (version {})",
            name,
            library.version()
        );
        self.statics
            .write()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .insert(name.to_string(), library);
        Ok(())
    }

    /// Names of the statically registered backends, sorted
    pub fn static_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.statics.read() {
            Ok(statics) => statics.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Load (or reuse) the module at `path`
    pub fn open_library(&self, path: &Path) -> DbResult<Arc<Library>> {
        let mut modules = self
            .modules
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        if let Some(library) = modules.get(path).and_then(Weak::upgrade) {
            return Ok(library);
        }
        let library = Library::load(path)?;
        modules.retain(|_, weak| weak.strong_count() > 0);
        modules.insert(path.to_path_buf(), Arc::downgrade(&library));
        Ok(library)
    }

    fn library_for(&self, params: &ConnectionParameters) -> DbResult<Arc<Library>> {
        if params.backend.is_empty() {
            return Err(DbError::Load {
                backend: String::new(),
                reason: "no backend specified".to_string(),
            });
        }

        let registered = self
            .statics
            .read()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .get(&params.backend)
            .cloned();
        if let Some(library) = registered {
            return Ok(library);
        }

        let candidates = params.plugin_candidates();
        if let Some(path) = candidates.iter().find(|path| path.exists()) {
            return self.open_library(path);
        }

        Err(DbError::Load {
            backend: params.backend.clone(),
            reason: format!(
                "no module found (tried {})",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }

    /// Resolve the backend named in `params`, construct its connection class,
    /// and connect it.
    ///
    /// Nothing is returned unless every step succeeds.
    pub fn load(&self, params: &ConnectionParameters) -> DbResult<Connection> {
        let library = self.library_for(params)?;
        // SAFETY: backends register CONNECTION_CLASS with `Box<dyn ConnectionImpl>`
        // objects, and host and module share this crate's definition of the trait.
        let loaded =
            unsafe { Library::load_class::<dyn ConnectionImpl>(&library, CONNECTION_CLASS) };
        let backend = loaded.map_err(|e| match DbError::from(e) {
            DbError::ClassNotFound { class, .. } => DbError::ClassNotFound {
                backend: params.backend.clone(),
                class,
            },
            other => other,
        })?;
        drop(library);
        Connection::connect(backend, params.clone())
    }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
