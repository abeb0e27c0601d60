//! Loaded backend modules and the objects they create

use crate::abi::{
    ClassConstructor, ClassDestructor, RegisterClassesFn, VersionFn, REGISTER_SYMBOL,
    VERSION_SYMBOL,
};
use crate::error::{PluginError, PluginResult};
use crate::foreign::ForeignBox;
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Arc;

const UNKNOWN_VERSION: &str = "unknown";

/// Constructor/destructor pair registered for one class
#[derive(Clone, Copy)]
pub struct ClassFunctions {
    pub constructor: ClassConstructor,
    pub destructor: ClassDestructor,
}

impl fmt::Debug for ClassFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassFunctions").finish_non_exhaustive()
    }
}

/// A backend module and its class table.
///
/// Always handled through `Arc<Library>`: every [`LoadedClass`] holds a clone,
/// so the module is unloaded only after the last object it created is dropped.
pub struct Library {
    name: String,
    version: String,
    classes: HashMap<String, ClassFunctions>,
    /// `None` for modules linked into the host binary. Declared last so it is
    /// closed after everything else is dropped.
    handle: Option<libloading::Library>,
}

impl Library {
    /// Load a module from disk and read its class table.
    pub fn load(path: impl AsRef<Path>) -> PluginResult<Arc<Self>> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let load_err = |reason: String| PluginError::Load {
            path: display.clone(),
            reason,
        };

        if !path.exists() {
            return Err(load_err("file does not exist".to_string()));
        }

        // SAFETY: loading runs the module's initializers; modules are trusted
        // code built against this crate.
        let handle =
            unsafe { libloading::Library::new(path) }.map_err(|e| load_err(e.to_string()))?;

        // SAFETY: symbol types are fixed by the module ABI.
        let register = unsafe { handle.get::<RegisterClassesFn>(REGISTER_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|e| load_err(e.to_string()))?;
        // SAFETY: as above; the version entry point is optional.
        let version = unsafe { handle.get::<VersionFn>(VERSION_SYMBOL) }
            .ok()
            .map(|symbol| *symbol);

        let library = Self::register(display, version, register, Some(handle))?;
        log::debug!(
            "Loaded plugin {} (version {}, classes: {})",
            library.name,
            library.version,
            library.class_names().join(", ")
        );
        Ok(Arc::new(library))
    }

    /// Build a library from entry points linked into the current binary.
    pub fn from_entry_points(
        name: impl Into<String>,
        version: Option<VersionFn>,
        register: RegisterClassesFn,
    ) -> PluginResult<Arc<Self>> {
        Self::register(name.into(), version, register, None).map(Arc::new)
    }

    fn register(
        name: String,
        version: Option<VersionFn>,
        register: RegisterClassesFn,
        handle: Option<libloading::Library>,
    ) -> PluginResult<Self> {
        let mut classes: HashMap<String, ClassFunctions> = HashMap::new();
        // SAFETY: `insert_class` expects exactly this context type.
        let code = unsafe {
            register(
                (&mut classes as *mut HashMap<String, ClassFunctions>).cast::<c_void>(),
                insert_class,
            )
        };
        if code != 0 {
            return Err(PluginError::Registration {
                library: name,
                code,
            });
        }

        let version = version
            // SAFETY: the version entry point returns a static string or null.
            .map(|f| unsafe { read_static_str(f()) })
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        Ok(Self {
            name,
            version,
            classes,
            handle,
        })
    }

    /// Path the module was loaded from, or the registration name of a static module
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn class_functions(&self, class: &str) -> Option<ClassFunctions> {
        self.classes.get(class).copied()
    }

    /// True when the module was loaded from disk
    pub fn is_dynamic(&self) -> bool {
        self.handle.is_some()
    }

    /// Construct an instance of `class`, tied to this module's lifetime.
    ///
    /// # Safety
    ///
    /// The module must have registered `class` with objects of type `Box<T>`.
    pub unsafe fn load_class<T: ?Sized>(
        library: &Arc<Self>,
        class: &str,
    ) -> PluginResult<LoadedClass<T>> {
        let functions =
            library
                .class_functions(class)
                .ok_or_else(|| PluginError::ClassNotFound {
                    library: library.name.clone(),
                    class: class.to_string(),
                })?;

        // SAFETY: constructor and destructor come from the same registration.
        let object = unsafe {
            let raw = (functions.constructor)();
            ForeignBox::<T>::from_raw(raw, functions.destructor)
        }
        .ok_or_else(|| PluginError::Construction {
            library: library.name.clone(),
            class: class.to_string(),
        })?;

        log::trace!("Constructed '{}' from plugin {}", class, library.name);
        Ok(LoadedClass {
            object: ManuallyDrop::new(object),
            module: Arc::clone(library),
        })
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("classes", &self.class_names())
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::debug!("Unloading plugin {}", self.name);
        }
    }
}

unsafe extern "C" fn insert_class(
    context: *mut c_void,
    name: *const c_char,
    constructor: ClassConstructor,
    destructor: ClassDestructor,
) {
    if context.is_null() || name.is_null() {
        return;
    }
    // SAFETY: `context` is the class map passed by `Library::register`.
    let classes = unsafe { &mut *context.cast::<HashMap<String, ClassFunctions>>() };
    // SAFETY: modules pass NUL-terminated names.
    let name = unsafe { CStr::from_ptr(name) }
        .to_string_lossy()
        .into_owned();
    classes.insert(
        name,
        ClassFunctions {
            constructor,
            destructor,
        },
    );
}

unsafe fn read_static_str(raw: *const c_char) -> String {
    if raw.is_null() {
        return UNKNOWN_VERSION.to_string();
    }
    // SAFETY: non-null pointers from modules are NUL-terminated.
    unsafe { CStr::from_ptr(raw) }
        .to_string_lossy()
        .into_owned()
}

/// An object created by a module, keeping that module loaded.
///
/// On drop the object is destroyed first, then the module reference is
/// released.
pub struct LoadedClass<T: ?Sized> {
    object: ManuallyDrop<ForeignBox<T>>,
    module: Arc<Library>,
}

impl<T: ?Sized> LoadedClass<T> {
    /// The module this object came from
    pub fn library(&self) -> &Arc<Library> {
        &self.module
    }
}

impl<T: ?Sized> Deref for LoadedClass<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T: ?Sized> DerefMut for LoadedClass<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.object
    }
}

impl<T: ?Sized> Drop for LoadedClass<T> {
    fn drop(&mut self) {
        // SAFETY: dropped exactly once, here, before `module` is released.
        unsafe { ManuallyDrop::drop(&mut self.object) }
    }
}

impl<T: ?Sized> fmt::Debug for LoadedClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedClass")
            .field("library", &self.module.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "library_test.rs"]
mod tests;
