//! Unit tests for configuration and graceful degradation
//!
//! Covers root folder priority order, missing/malformed TOML handling,
//! import settings validation and atomic config writes.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate SHELF_ROOT_FOLDER or SHELF_ROOT are marked with #[serial].

use serial_test::serial;
use shelf_common::config::{
    load_or_default, load_toml_config, write_toml_config, CompiledDefaults, ImportSettings,
    LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_root_env() {
    env::remove_var("SHELF_ROOT_FOLDER");
    env::remove_var("SHELF_ROOT");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("shelf") || defaults.root_folder.ends_with("shelf_data"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_root_env();
    let temp_dir = TempDir::new().unwrap();

    let resolver = RootFolderResolver::new("test-module")
        .with_config_path(Some(temp_dir.path().join("absent.toml")));

    assert_eq!(resolver.resolve(), CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    env::set_var("SHELF_ROOT_FOLDER", "/tmp/shelf-env");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/shelf-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/shelf-cli"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_shelf_root_folder_takes_precedence() {
    clear_root_env();
    env::set_var("SHELF_ROOT_FOLDER", "/tmp/shelf-priority-1");
    env::set_var("SHELF_ROOT", "/tmp/shelf-priority-2");

    let resolver = RootFolderResolver::new("test-module");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/shelf-priority-1"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_falls_back_to_shelf_root() {
    clear_root_env();
    env::set_var("SHELF_ROOT", "/tmp/shelf-env-root");

    let resolver = RootFolderResolver::new("test-module");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/shelf-env-root"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_reads_root_folder_from_toml() {
    clear_root_env();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("shelf-import.toml");
    std::fs::write(&config_path, "root_folder = \"/srv/shelf\"\n").unwrap();

    let resolver = RootFolderResolver::new("shelf-import").with_config_path(Some(config_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/srv/shelf"));
}

#[test]
#[serial]
fn test_resolver_ignores_malformed_toml() {
    clear_root_env();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    std::fs::write(&config_path, "root_folder = [unclosed").unwrap();

    let resolver = RootFolderResolver::new("shelf-import").with_config_path(Some(config_path));
    assert_eq!(resolver.resolve(), CompiledDefaults::for_current_platform().root_folder);
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/shelf-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("shelf.db"));
}

#[test]
fn test_initializer_creates_nested_directory_idempotently() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.ensure_directory_exists().is_ok());

    assert!(root.is_dir());
    assert!(!initializer.database_exists());
}

#[test]
fn test_missing_config_file_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nope.toml");

    assert!(load_toml_config(&path).unwrap().is_none());
    assert_eq!(load_or_default(Some(&path)).unwrap(), TomlConfig::default());
}

#[test]
fn test_partial_config_gets_import_defaults() {
    let toml_str = r#"
        root_folder = "/books"
        [logging]
        level = "debug"
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/books")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.import, ImportSettings::default());
    assert_eq!(config.import.batch_size, 50);
    assert_eq!(config.import.max_file_size_bytes, 5 * 1024 * 1024);
}

#[test]
fn test_zero_batch_size_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("zero.toml");
    std::fs::write(&path, "[import]\nbatch_size = 0\n").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn test_atomic_write_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("shelf-import.toml");

    let mut config = TomlConfig {
        root_folder: Some(PathBuf::from("/books")),
        logging: LoggingConfig::default(),
        ..Default::default()
    };
    config.import.batch_size = 25;

    write_toml_config(&config, &target).unwrap();

    assert!(target.exists());
    assert!(!target.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&target).unwrap(), Some(config));
}

#[cfg(unix)]
#[test]
fn test_atomic_write_sets_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("shelf-import.toml");
    write_toml_config(&TomlConfig::default(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
