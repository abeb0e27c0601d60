//! The C ABI every backend module exports.
//!
//! A module exports two symbols:
//!
//! - `pd_plugin_version() -> *const c_char`, a static NUL-terminated string;
//! - `pd_register_classes(context, inserter) -> c_int`, which calls
//!   `inserter(context, name, constructor, destructor)` once per class and
//!   returns 0 on success.
//!
//! A constructor returns a thin pointer to a heap-allocated `Box<T>`; the
//! matching destructor frees it with the module's own allocator. Use
//! [`declare_plugin!`](crate::declare_plugin) instead of writing these by hand.
//!
//! The object types are Rust trait objects, so host and module must be built
//! with the same toolchain and the same version of the crate defining the
//! traits. [`PLUGIN_ABI_VERSION`] is bumped whenever that contract changes.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use std::panic::AssertUnwindSafe;
use std::ptr;

/// Revision of the module ABI described in this file
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Symbol name of the version-query entry point
pub const VERSION_SYMBOL: &[u8] = b"pd_plugin_version\0";

/// Symbol name of the class-registration entry point
pub const REGISTER_SYMBOL: &[u8] = b"pd_register_classes\0";

pub type VersionFn = unsafe extern "C" fn() -> *const c_char;
pub type ClassConstructor = unsafe extern "C" fn() -> *mut c_void;
pub type ClassDestructor = unsafe extern "C" fn(*mut c_void);
pub type ClassInserter =
    unsafe extern "C" fn(*mut c_void, *const c_char, ClassConstructor, ClassDestructor);
pub type RegisterClassesFn = unsafe extern "C" fn(*mut c_void, ClassInserter) -> c_int;

/// Build an object and hand it out as a raw `Box<T>` pointer.
///
/// A panic inside `build` is caught and reported as a null pointer.
pub fn construct_boxed<T: ?Sized, F>(build: F) -> *mut c_void
where
    F: FnOnce() -> Box<T>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(object) => Box::into_raw(Box::new(object)).cast::<c_void>(),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy an object produced by [`construct_boxed`] or
/// [`ForeignBox::new`](crate::ForeignBox::new).
///
/// # Safety
///
/// `raw` must be null or a pointer obtained from `construct_boxed::<T, _>` or
/// `ForeignBox::<T>::new` that has not been destroyed yet.
pub unsafe extern "C" fn destroy_boxed<T: ?Sized>(raw: *mut c_void) {
    if raw.is_null() {
        return;
    }
    let raw = raw.cast::<Box<T>>();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: guaranteed by the caller contract above.
        drop(unsafe { Box::from_raw(raw) });
    }));
    if result.is_err() {
        log::error!("Panic while destroying a plugin object");
    }
}

/// Export the module ABI for a backend crate.
///
/// ```ignore
/// pd_plugin::declare_plugin! {
///     version: "0.1.0",
///     classes: {
///         "DatabaseConnection" => dyn ConnectionImpl = MyConnection::new(),
///     }
/// }
/// ```
///
/// Expands to `pd_plugin_version` and `pd_register_classes`. Both are plain
/// Rust functions as well, so a binary can link the backend statically and
/// pass them to [`Library::from_entry_points`](crate::Library::from_entry_points).
#[macro_export]
macro_rules! declare_plugin {
    (
        version: $version:literal,
        classes: { $($name:literal => $iface:ty = $ctor:expr),* $(,)? } $(,)?
    ) => {
        /// Version-query entry point of this module
        #[no_mangle]
        pub extern "C" fn pd_plugin_version() -> *const ::std::os::raw::c_char {
            concat!($version, "\0").as_ptr().cast()
        }

        /// Class-registration entry point of this module
        ///
        /// # Safety
        ///
        /// `inserter` must be safe to call with `context`.
        #[no_mangle]
        pub unsafe extern "C" fn pd_register_classes(
            context: *mut ::std::ffi::c_void,
            inserter: $crate::abi::ClassInserter,
        ) -> ::std::os::raw::c_int {
            $(
                {
                    unsafe extern "C" fn construct() -> *mut ::std::ffi::c_void {
                        $crate::abi::construct_boxed::<$iface, _>(|| {
                            let object: ::std::boxed::Box<$iface> = ::std::boxed::Box::new($ctor);
                            object
                        })
                    }
                    // SAFETY: forwarded from this function's contract.
                    unsafe {
                        inserter(
                            context,
                            concat!($name, "\0").as_ptr().cast(),
                            construct,
                            $crate::abi::destroy_boxed::<$iface>,
                        );
                    }
                }
            )*
            0
        }
    };
}
