use super::*;
use std::fs;
use tempfile::TempDir;

fn global() -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        config: None,
        backend: None,
        database: None,
        plugin_dir: None,
    }
}

#[test]
fn defaults_to_in_memory_duckdb() {
    let params = connection_parameters(&global()).unwrap();
    assert_eq!(params.backend, "duckdb");
    assert!(params.filename.is_empty());
}

#[test]
fn overrides_apply_on_top_of_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("conn.yml");
    fs::write(&config, "backend: postgres\nhost: db.internal\nfilename: ignored.db\n").unwrap();

    let mut args = global();
    args.config = Some(config.display().to_string());
    args.database = Some("local.duckdb".to_string());
    args.plugin_dir = Some("/opt/pd/plugins".to_string());

    let params = connection_parameters(&args).unwrap();
    assert_eq!(params.backend, "postgres");
    assert_eq!(params.host, "db.internal");
    assert_eq!(params.filename, "local.duckdb");
    assert_eq!(params.plugin_dir, std::path::PathBuf::from("/opt/pd/plugins"));
}

#[test]
fn missing_config_is_an_error() {
    let mut args = global();
    args.config = Some("/definitely/not/here.yml".to_string());
    let err = connection_parameters(&args).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yml"));
}

#[test]
fn open_connection_uses_linked_duckdb() {
    let conn = open_connection(&global()).unwrap();
    assert_eq!(conn.backend_name(), "duckdb");
    assert!(loader()
        .unwrap()
        .static_backends()
        .contains(&"duckdb".to_string()));
}
