//! Reference-counted, process-wide initialization for native libraries.
//!
//! Backend modules place a [`LibraryInit`] in a `static`. Every backend
//! instance holds a [`LibraryInitGuard`]; the init routine runs when the first
//! guard is taken and the teardown routine when the last one is dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Init/teardown pair with a usage count
#[derive(Debug)]
pub struct LibraryInit {
    count: Mutex<usize>,
    init: fn(),
    teardown: fn(),
}

impl LibraryInit {
    pub const fn new(init: fn(), teardown: fn()) -> Self {
        Self {
            count: Mutex::new(0),
            init,
            teardown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the usage count, running `init` on the first use
    pub fn acquire(&self) {
        let mut count = self.lock();
        if *count == 0 {
            (self.init)();
        }
        *count += 1;
    }

    /// Decrement the usage count, running `teardown` when it reaches zero.
    ///
    /// Unbalanced releases are ignored.
    pub fn release(&self) {
        let mut count = self.lock();
        match *count {
            0 => log::warn!("LibraryInit released more often than acquired"),
            1 => {
                *count = 0;
                (self.teardown)();
            }
            _ => *count -= 1,
        }
    }

    /// [`acquire`](Self::acquire) now, [`release`](Self::release) when the guard drops
    pub fn guard(&self) -> LibraryInitGuard<'_> {
        self.acquire();
        LibraryInitGuard { init: self }
    }

    pub fn ref_count(&self) -> usize {
        *self.lock()
    }
}

/// Keeps a [`LibraryInit`] acquired
#[derive(Debug)]
pub struct LibraryInitGuard<'a> {
    init: &'a LibraryInit,
}

impl Drop for LibraryInitGuard<'_> {
    fn drop(&mut self) {
        self.init.release();
    }
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
