//! Configuration Layering Tests
//!
//! Defaults, TOML file and `DATAREFW_` environment variables, in that order
//! of precedence. Tests touching the process environment run serially.

use std::env;
use std::io::Write;

use datarefw::config::{DatarefwConfig, LogFormat, LogTarget};
use serial_test::serial;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let file = config_file(
        r#"
[logging]
level = "debug"
format = "pretty"
target = "stderr"

[access]
single_thread_check = false
"#,
    );

    let config = DatarefwConfig::load_from(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.logging.target, LogTarget::Stderr);
    assert!(!config.access.single_thread_check);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = config_file("[logging]\nlevel = \"warn\"\n");

    env::set_var("DATAREFW_LOGGING__LEVEL", "trace");
    env::set_var("DATAREFW_ACCESS__SINGLE_THREAD_CHECK", "false");
    let result = DatarefwConfig::load_from(file.path());
    env::remove_var("DATAREFW_LOGGING__LEVEL");
    env::remove_var("DATAREFW_ACCESS__SINGLE_THREAD_CHECK");

    let config = result.unwrap();
    assert_eq!(config.logging.level, "trace");
    assert!(!config.access.single_thread_check);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
#[serial]
fn test_invalid_level_fails_validation() {
    let file = config_file("[logging]\nlevel = \"verbose\"\n");
    let config = DatarefwConfig::load_from(file.path()).unwrap();
    assert!(config.validate().unwrap_err().contains("verbose"));
}
