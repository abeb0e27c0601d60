//! Patterns for using connections from several threads.
//!
//! A [`Connection`] serializes individual backend calls, but a sequence of
//! calls (prepare, bind, execute, fetch) is only safe from one caller at a
//! time. Either share one connection behind [`SharedConnection`], or give each
//! thread its own through [`ThreadLocalConnections`].

use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::loader::PluginLoader;
use pd_core::ConnectionParameters;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// One connection, locked for the whole of each closure
#[derive(Debug)]
pub struct SharedConnection {
    conn: Mutex<Connection>,
}

impl SharedConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `body` with exclusive use of the connection
    pub fn with<T>(&self, body: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        body(&conn)
    }

    pub fn into_inner(self) -> DbResult<Connection> {
        self.conn
            .into_inner()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

/// One connection per thread, opened on first use from shared parameters.
///
/// Each thread's handle lives in that thread's local storage, so it is
/// dropped (and the backend disconnected) when the thread exits. Dropping the
/// pool releases the calling thread's connection; other threads keep theirs
/// until they exit.
#[derive(Debug)]
pub struct ThreadLocalConnections {
    id: u64,
    params: ConnectionParameters,
    loader: Arc<PluginLoader>,
    live: Arc<AtomicUsize>,
}

/// A pool's connection as stored in one thread
struct ThreadSlot {
    conn: Connection,
    live: Arc<AtomicUsize>,
}

impl ThreadSlot {
    fn new(conn: Connection, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            conn,
            live: Arc::clone(live),
        }
    }
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

thread_local! {
    static THREAD_CONNECTIONS: RefCell<HashMap<u64, ThreadSlot>> = RefCell::new(HashMap::new());
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

impl ThreadLocalConnections {
    pub fn new(params: ConnectionParameters, loader: Arc<PluginLoader>) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            params,
            loader,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The calling thread's connection, opening it if needed
    pub fn get(&self) -> DbResult<Connection> {
        let existing = with_slots(|slots| slots.get(&self.id).map(|slot| slot.conn.clone()))?;
        if let Some(conn) = existing {
            return Ok(conn);
        }

        let conn = self.loader.load(&self.params)?;
        log::debug!(
            "Opened {} connection for thread {:?}",
            conn.backend_name(),
            thread::current().id()
        );
        let slot = ThreadSlot::new(conn.clone(), &self.live);
        with_slots(|slots| slots.insert(self.id, slot))?;
        Ok(conn)
    }

    pub fn with<T>(&self, body: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self.get()?;
        body(&conn)
    }

    /// Drop the calling thread's connection handle. Returns whether one existed.
    pub fn release_current(&self) -> DbResult<bool> {
        // Dropped outside the borrow; disconnecting may run backend code.
        let slot = with_slots(|slots| slots.remove(&self.id))?;
        Ok(slot.is_some())
    }

    /// Number of threads currently holding a connection from this pool
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ThreadLocalConnections {
    fn drop(&mut self) {
        if let Err(e) = self.release_current() {
            log::warn!("Failed to release thread connection: {e}");
        }
    }
}

fn with_slots<T>(f: impl FnOnce(&mut HashMap<u64, ThreadSlot>) -> T) -> DbResult<T> {
    THREAD_CONNECTIONS
        .try_with(|slots| f(&mut slots.borrow_mut()))
        .map_err(|e| DbError::Connection(format!("thread-local connections unavailable: {e}")))
}

#[cfg(test)]
#[path = "shared_test.rs"]
mod tests;
