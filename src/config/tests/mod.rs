//! Unit tests for config module
//!
//! Tests normalization, defaults and TOML loading.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::{fs, time::Duration};

use tempfile::TempDir;

use crate::{
    RccError,
    config::{CachePaths, Conf, DEFAULT_CACHE_DIR},
};

fn valid_conf() -> Conf {
    Conf {
        server_url: "http://rcc.local:8080/".to_string(),
        project_name: "billing".to_string(),
        env_name: "prod".to_string(),
        api_password: "secret".to_string(),
        ..Conf::default()
    }
}

fn rejected_field(conf: Conf) -> String {
    match conf.normalize() {
        Err(RccError::InvalidConfig { field, .. }) => field,
        other => panic!("Expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn conf_defaults() {
    let conf = Conf::default();

    assert_eq!(conf.version_name, "default");
    assert_eq!(conf.callback_interval(), Duration::from_secs(60));
    assert_eq!(conf.request_timeout(), Duration::from_secs(10));
    assert_eq!(conf.cache_dir, DEFAULT_CACHE_DIR);
    assert!(!conf.enable_cache);
    assert!(!conf.enable_callback);
}

#[test]
fn normalize_trims_trailing_slash() {
    let conf = valid_conf().normalize().unwrap();
    assert_eq!(conf.server_url, "http://rcc.local:8080");
}

#[test]
fn normalize_trims_whitespace() {
    let mut conf = valid_conf();
    conf.project_name = "  billing ".to_string();
    conf.env_name = "prod\n".to_string();

    let conf = conf.normalize().unwrap();
    assert_eq!(conf.project_name, "billing");
    assert_eq!(conf.env_name, "prod");
}

#[test]
fn normalize_rejects_missing_server_url() {
    let mut conf = valid_conf();
    conf.server_url = "   ".to_string();
    assert_eq!(rejected_field(conf), "server_url");
}

#[test]
fn normalize_rejects_non_http_scheme() {
    let mut conf = valid_conf();
    conf.server_url = "ftp://rcc.local".to_string();
    assert_eq!(rejected_field(conf), "server_url");
}

#[test]
fn normalize_rejects_unparseable_url() {
    let mut conf = valid_conf();
    conf.server_url = "not a url".to_string();
    assert_eq!(rejected_field(conf), "server_url");
}

#[test]
fn normalize_rejects_empty_identity() {
    let mut conf = valid_conf();
    conf.project_name.clear();
    assert_eq!(rejected_field(conf), "project_name");

    let mut conf = valid_conf();
    conf.env_name.clear();
    assert_eq!(rejected_field(conf), "env_name");

    let mut conf = valid_conf();
    conf.api_password.clear();
    assert_eq!(rejected_field(conf), "api_password");
}

#[test]
fn normalize_rejects_path_like_names() {
    for name in ["../x", "a/b", "a\\b", ".."] {
        let mut conf = valid_conf();
        conf.project_name = name.to_string();
        assert_eq!(rejected_field(conf), "project_name", "{name}");

        let mut conf = valid_conf();
        conf.env_name = name.to_string();
        assert_eq!(rejected_field(conf), "env_name", "{name}");
    }

    let mut conf = valid_conf();
    conf.env_name = "v1.2".to_string();
    assert_eq!(conf.normalize().unwrap().env_name, "v1.2");
}

#[test]
fn normalize_rejects_zero_intervals() {
    let mut conf = valid_conf();
    conf.callback_interval_secs = 0;
    assert_eq!(rejected_field(conf), "callback_interval_secs");

    let mut conf = valid_conf();
    conf.request_timeout_secs = 0;
    assert_eq!(rejected_field(conf), "request_timeout_secs");
}

#[test]
fn normalize_fills_empty_cache_dir() {
    let mut conf = valid_conf();
    conf.cache_dir = String::new();

    let conf = conf.normalize().unwrap();
    assert_eq!(conf.cache_dir, DEFAULT_CACHE_DIR);
}

#[test]
fn conf_from_minimal_toml() {
    let conf = Conf::from_toml_str(
        r#"
        server_url = "https://rcc.example.com"
        project_name = "shop"
        env_name = "staging"
        api_password = "pw"
        enable_cache = true
        "#,
    )
    .unwrap();

    assert_eq!(conf.project_name, "shop");
    assert!(conf.enable_cache);
    assert_eq!(conf.callback_interval_secs, 60);
    assert!(conf.normalize().is_ok());
}

#[test]
fn conf_from_invalid_toml() {
    let result = Conf::from_toml_str("server_url = [");
    assert!(matches!(result, Err(RccError::TomlParse { .. })));
}

#[test]
fn conf_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rcc.toml");
    fs::write(
        &path,
        "server_url = \"http://localhost\"\nproject_name = \"p\"\nenv_name = \"e\"\ncallback_interval_secs = 5\n",
    )
    .unwrap();

    let conf = Conf::from_file(&path).unwrap();
    assert_eq!(conf.callback_interval(), Duration::from_secs(5));
}

#[test]
fn conf_from_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = Conf::from_file(&temp.path().join("missing.toml"));
    assert!(matches!(result, Err(RccError::Io { .. })));
}

#[test]
fn cache_path_is_per_project_and_env() {
    let paths = CachePaths::new("/var/cache/rcc", "billing", "prod");

    assert_eq!(paths.file(), std::path::Path::new("/var/cache/rcc/.billing_prod"));
    assert_ne!(
        paths.file(),
        CachePaths::new("/var/cache/rcc", "billing", "test").file()
    );
}

#[test]
fn ensure_dir_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let paths = CachePaths::new(temp.path().join("nested/cache"), "p", "e");

    paths.ensure_dir().unwrap();
    assert!(paths.dir().is_dir());

    paths.ensure_dir().unwrap();
}

#[test]
fn ensure_dir_rejects_regular_file() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("cache");
    fs::write(&not_a_dir, "x").unwrap();

    let paths = CachePaths::new(&not_a_dir, "p", "e");
    assert!(matches!(
        paths.ensure_dir(),
        Err(RccError::InvalidConfig { .. })
    ));
}
