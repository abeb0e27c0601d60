//! Objects owned by the module that allocated them

use crate::abi::{destroy_boxed, ClassDestructor};
use std::ffi::c_void;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// An object paired with the destructor compiled into the module that built it.
///
/// `ForeignBox::new` captures `destroy_boxed::<T>` as instantiated in the
/// calling crate, so a backend module that boxes its statement with
/// `ForeignBox::new` is guaranteed to free it with its own code, whichever
/// crate finally drops the box. The box does not keep the module loaded; the
/// owner must hold a module handle that outlives it.
pub struct ForeignBox<T: ?Sized> {
    raw: NonNull<Box<T>>,
    destructor: ClassDestructor,
}

impl<T: ?Sized> ForeignBox<T> {
    pub fn new(object: Box<T>) -> Self {
        Self {
            raw: NonNull::from(Box::leak(Box::new(object))),
            destructor: destroy_boxed::<T>,
        }
    }

    /// Adopt a raw object produced by a module constructor.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live `Box<T>` produced by the same module as
    /// `destructor`, and must not be owned by anything else.
    pub unsafe fn from_raw(raw: *mut c_void, destructor: ClassDestructor) -> Option<Self> {
        NonNull::new(raw.cast::<Box<T>>()).map(|raw| Self { raw, destructor })
    }

    /// The destructor that will free this object
    pub fn destructor(&self) -> ClassDestructor {
        self.destructor
    }
}

impl<T: ?Sized> Deref for ForeignBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `raw` is valid and exclusively owned until drop.
        unsafe { self.raw.as_ref() }
    }
}

impl<T: ?Sized> DerefMut for ForeignBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: `raw` is valid and exclusively owned until drop.
        unsafe { self.raw.as_mut() }
    }
}

impl<T: ?Sized> Drop for ForeignBox<T> {
    fn drop(&mut self) {
        // SAFETY: `raw` came from the module owning `destructor` and is freed once.
        unsafe { (self.destructor)(self.raw.as_ptr().cast::<c_void>()) }
    }
}

impl<T: ?Sized> fmt::Debug for ForeignBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignBox")
            .field("raw", &self.raw.as_ptr().cast::<c_void>())
            .finish()
    }
}

// SAFETY: a ForeignBox owns its object exactly like a Box does.
unsafe impl<T: ?Sized + Send> Send for ForeignBox<T> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: ?Sized + Sync> Sync for ForeignBox<T> {}
