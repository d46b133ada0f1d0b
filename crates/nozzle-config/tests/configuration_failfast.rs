use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;

use nozzle_config::Config;

#[test]
fn malformed_config_files_fail_loading() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("nozzle.toml");
    fs::write(&path, r#"subscription_id = "unterminated"#).expect("write malformed config");

    let args = vec![
        OsString::from("nozzle"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_layered(args).expect_err("loading must fail");
    assert!(!error.to_string().is_empty());
}

#[test]
fn mistyped_values_fail_loading() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("nozzle.toml");
    fs::write(&path, "debug = \"sometimes\"\n").expect("write mistyped config");

    let args = vec![
        OsString::from("nozzle"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    assert!(Config::load_layered(args).is_err());
}
