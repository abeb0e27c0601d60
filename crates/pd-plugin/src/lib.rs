//! pd-plugin - Plugin loader for plugdb
//!
//! Backend modules are loaded from disk (or registered in-process) through a
//! small C ABI: a version-query entry point and a class-registration entry
//! point that hands the loader one `(constructor, destructor)` pair per
//! exported class. Objects created by a module are always destroyed by that
//! module's own destructor, and the module stays loaded until the last object
//! it created is gone.

pub mod abi;
pub mod error;
pub mod foreign;
pub mod library;

pub use abi::{
    ClassConstructor, ClassDestructor, ClassInserter, RegisterClassesFn, VersionFn,
    PLUGIN_ABI_VERSION,
};
pub use error::{PluginError, PluginResult};
pub use foreign::ForeignBox;
pub use library::{ClassFunctions, Library, LoadedClass};
