use super::*;
use crate::test_backend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn recording(
    log: &Arc<Mutex<Vec<i64>>>,
    version: i64,
) -> impl Fn(&Connection) -> DbResult<()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |conn| {
        conn.execute(&format!("upgrade {version}"))?;
        log.lock().unwrap().push(version);
        Ok(())
    }
}

#[test]
fn test_duplicate_from_version_rejected() {
    let mut migrator = Migrator::new();
    migrator.add_migration(Migration::new(0, 1, |_| Ok(()))).unwrap();
    let err = migrator
        .add_migration(Migration::new(0, 2, |_| Ok(())))
        .unwrap_err();
    assert!(matches!(err, DbError::Migration(_)));
    assert_eq!(migrator.len(), 1);
}

#[test]
fn test_non_increasing_migration_rejected() {
    let mut migrator = Migrator::new();
    assert!(migrator.add_migration(Migration::new(2, 2, |_| Ok(()))).is_err());
    assert!(migrator.add_migration(Migration::new(3, 1, |_| Ok(()))).is_err());
    assert!(migrator.is_empty());
}

#[test]
fn test_migrations_listed_in_order() {
    let mut migrator = Migrator::new();
    migrator.add_migration(Migration::new(1, 2, |_| Ok(()))).unwrap();
    migrator.add_migration(Migration::new(0, 1, |_| Ok(()))).unwrap();
    let steps: Vec<(i64, i64)> = migrator
        .migrations()
        .map(|m| (m.from_version(), m.to_version()))
        .collect();
    assert_eq!(steps, vec![(0, 1), (1, 2)]);
}

#[test]
fn test_version_unavailable_before_init() {
    let conn = test_backend::open("mig_uninit");
    let err = Migrator::new().schema_version(&conn).unwrap_err();
    assert!(matches!(err, DbError::Migration(ref m) if m == "schema version not available"));
}

#[test]
fn test_init_schema_idempotent() {
    let conn = test_backend::open("mig_idempotent");
    let migrator = Migrator::new();
    migrator.init_schema(&conn).unwrap();
    test_backend::database("mig_idempotent").lock().unwrap().version = Some(3);
    migrator.init_schema(&conn).unwrap();
    assert_eq!(migrator.schema_version(&conn).unwrap(), 3);
}

#[test]
fn test_migrations_run_in_order_once() {
    let conn = test_backend::open("mig_order");
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut migrator = Migrator::new();
    migrator.add_migration(Migration::new(1, 2, recording(&log, 2))).unwrap();
    migrator.add_migration(Migration::new(0, 1, recording(&log, 1))).unwrap();

    migrator.init_schema(&conn).unwrap();
    assert_eq!(migrator.start_migration(&conn).unwrap(), 2);
    assert_eq!(migrator.schema_version(&conn).unwrap(), 2);
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);

    assert_eq!(migrator.start_migration(&conn).unwrap(), 0);
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);

    let events = test_backend::events("mig_order");
    let upgrade_one = events.iter().position(|e| e == "execute upgrade 1").unwrap();
    assert_eq!(events[upgrade_one - 1], "begin");
    assert_eq!(events[upgrade_one + 1], "commit");
}

#[test]
fn test_failed_migration_rolls_back() {
    let conn = test_backend::open("mig_rollback");
    let mut migrator = Migrator::new();
    migrator.add_migration(Migration::new(0, 1, |_| Ok(()))).unwrap();
    migrator
        .add_migration(Migration::new(1, 2, |conn| conn.execute("fail")))
        .unwrap();
    migrator
        .add_migration(Migration::new(2, 3, |_| Ok(())))
        .unwrap();

    migrator.init_schema(&conn).unwrap();
    let err = migrator.start_migration(&conn).unwrap_err();
    match err {
        DbError::Migration(message) => assert!(message.contains("1 -> 2"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(migrator.schema_version(&conn).unwrap(), 1);
    assert_eq!(test_backend::events("mig_rollback").last().unwrap(), "rollback");
}

#[test]
fn test_panicking_migration_rolls_back() {
    let conn = test_backend::open("mig_panic");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut migrator = Migrator::new();
    migrator
        .add_migration(Migration::new(0, 1, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("upgrade exploded");
        }))
        .unwrap();

    migrator.init_schema(&conn).unwrap();
    let err = migrator.start_migration(&conn).unwrap_err();
    assert!(matches!(err, DbError::Migration(ref m) if m.contains("upgrade exploded")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(migrator.schema_version(&conn).unwrap(), 0);
}

#[test]
fn test_gap_stops_migration() {
    let conn = test_backend::open("mig_gap");
    let mut migrator = Migrator::new();
    migrator.add_migration(Migration::new(0, 1, |_| Ok(()))).unwrap();
    migrator.add_migration(Migration::new(2, 3, |_| Ok(()))).unwrap();

    migrator.init_schema(&conn).unwrap();
    assert_eq!(migrator.start_migration(&conn).unwrap(), 1);
    assert_eq!(migrator.schema_version(&conn).unwrap(), 1);
}

#[test]
fn test_schema_info_uses_text_columns() {
    let conn = test_backend::open("mig_schema_info_ddl");
    let mut store = SchemaInfoMigrator;
    store.init_schema(&conn).unwrap();

    let events = test_backend::events("mig_schema_info_ddl");
    assert!(events.contains(
        &"execute CREATE TABLE IF NOT EXISTS schema_info (name TEXT PRIMARY KEY, value TEXT)"
            .to_string()
    ));
    let insert = "execute INSERT INTO schema_info (name, value) VALUES (?, ?)";
    assert!(events.iter().any(|e| e == insert));
}
