use super::*;
use crate::test_backend;

fn pool(dbname: &str) -> Arc<ThreadLocalConnections> {
    Arc::new(ThreadLocalConnections::new(
        test_backend::params(dbname),
        test_backend::loader(),
    ))
}

fn count(dbname: &str, event: &str) -> usize {
    test_backend::events(dbname)
        .iter()
        .filter(|e| e.as_str() == event)
        .count()
}

#[test]
fn test_thread_exit_disconnects() {
    let pool = pool("tl_exit");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.with(|conn| conn.execute("noop")).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pool.len(), 0);
    assert_eq!(count("tl_exit", "connect"), 8);
    assert_eq!(count("tl_exit", "disconnect"), 8);
    assert_eq!(count("tl_exit", "destroyed"), 8);
}

#[test]
fn test_same_thread_reuses_connection() {
    let pool = pool("tl_reuse");
    let first = pool.get().unwrap();
    let again = pool.get().unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(count("tl_reuse", "connect"), 1);
    // pool slot, `first` and `again`
    assert_eq!(first.handle_count(), 3);
    drop(again);
}

#[test]
fn test_release_current() {
    let pool = pool("tl_release");
    pool.with(|conn| conn.execute("noop")).unwrap();

    assert!(pool.release_current().unwrap());
    assert!(pool.is_empty());
    assert_eq!(count("tl_release", "disconnect"), 1);
    assert!(!pool.release_current().unwrap());
}

#[test]
fn test_dropping_pool_releases_calling_thread() {
    let pool = pool("tl_drop");
    pool.get().unwrap();
    drop(pool);
    assert_eq!(count("tl_drop", "disconnect"), 1);
}

#[test]
fn test_pools_are_independent() {
    let first = pool("tl_independent");
    let second = pool("tl_independent");
    first.get().unwrap();
    second.get().unwrap();
    assert_eq!(count("tl_independent", "connect"), 2);

    first.release_current().unwrap();
    assert_eq!(first.len(), 0);
    assert_eq!(second.len(), 1);
}

#[test]
fn test_shared_connection_serializes_closures() {
    let shared = Arc::new(SharedConnection::new(test_backend::open("shared_conn")));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                shared
                    .with(|conn| conn.execute(&format!("work {i}")))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let executed = test_backend::events("shared_conn")
        .iter()
        .filter(|e| e.starts_with("execute work"))
        .count();
    assert_eq!(executed, 4);

    let conn = Arc::try_unwrap(shared).unwrap().into_inner().unwrap();
    assert_eq!(conn.backend_name(), "mock");
}
