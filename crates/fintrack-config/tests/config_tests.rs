use std::{fs, path::PathBuf, time::Duration};

use fintrack_config::{BackendKind, Config, ConfigError, ConfigManager};
use tempfile::tempdir;

#[test]
fn default_config_targets_local_api() {
    let cfg = Config::default();

    assert_eq!(cfg.api_base_url, "http://localhost:3000");
    assert_eq!(cfg.backend, BackendKind::Http);
    assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.currency, "USD");
    assert_eq!(cfg.locale, "en-US");
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let mut cfg = Config::default();
    cfg.backend = BackendKind::Local;
    cfg.data_dir = Some(dir.path().join("data"));
    cfg.locale = "pt-PT".to_string();

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, cfg);
    assert_eq!(
        manager.config_path(),
        dir.path().join("config").join("config.json")
    );
    assert_eq!(manager.token_path(), dir.path().join("session").join("token"));
}

#[test]
fn missing_config_file_loads_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("session"));

    assert_eq!(manager.load().expect("load"), Config::default());
}

#[test]
fn partial_config_file_fills_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "backend": "local", "currency": "EUR" }"#).expect("write");
    let manager = ConfigManager::new(path, dir.path().join("session"));

    let cfg = manager.load().expect("load");
    assert_eq!(cfg.backend, BackendKind::Local);
    assert_eq!(cfg.currency, "EUR");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.api_base_url, "http://localhost:3000");
}

#[test]
fn unknown_backend_value_falls_back_to_http() {
    let cfg: Config = load_raw(r#"{ "backend": "carrier-pigeon" }"#);
    assert_eq!(cfg.backend, BackendKind::Http);
}

#[test]
fn malformed_config_reports_serde_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(&path, "{ nope").expect("write");
    let manager = ConfigManager::new(path, dir.path().join("session"));

    assert!(matches!(manager.load(), Err(ConfigError::Serde(_))));
}

#[test]
fn set_validates_values() {
    let mut cfg = Config::default();

    cfg.set("backend", "LOCAL").expect("backend");
    assert_eq!(cfg.backend, BackendKind::Local);

    cfg.set("api_base_url", "https://api.example.com/").expect("url");
    assert_eq!(cfg.api_base_url, "https://api.example.com");

    cfg.set("currency", "eur").expect("currency");
    assert_eq!(cfg.currency, "EUR");

    cfg.set("data_dir", "/tmp/fintrack").expect("data dir");
    assert_eq!(cfg.resolve_data_dir(), PathBuf::from("/tmp/fintrack"));

    assert!(cfg.set("request_timeout_secs", "0").is_err());
    assert!(cfg.set("api_base_url", "localhost").is_err());
    assert!(matches!(
        cfg.set("colour", "blue"),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn money_follows_locale_and_currency() {
    let mut config = Config::default();
    assert_eq!(config.format_money(1234.5), "1234.50 USD");

    config.set("locale", "fr-FR").expect("locale");
    config.set("currency", "eur").expect("currency");
    assert_eq!(config.decimal_separator(), ',');
    assert_eq!(config.format_money(12.5), "12,50 EUR");

    config.set("locale", "en_GB").expect("locale");
    assert_eq!(config.format_money(-3.0), "-3.00 EUR");
}

fn load_raw(raw: &str) -> Config {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(&path, raw).expect("write");
    ConfigManager::new(path, dir.path().join("session"))
        .load()
        .expect("load")
}
