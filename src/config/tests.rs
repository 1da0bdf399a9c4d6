use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{load_config_from, HubSettings};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8081);
    assert_eq!(settings.hub.max_connections, 1000);
    assert_eq!(settings.hub.mailbox_capacity, 256);
    assert_eq!(settings.hub.max_message_size, 1024);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn test_ping_period_is_nine_tenths_of_pong_wait() {
    let hub = HubSettings::default();
    assert_eq!(hub.pong_wait(), Duration::from_secs(30));
    assert_eq!(hub.write_wait(), Duration::from_secs(10));
    assert_eq!(hub.ping_period(), Duration::from_secs(27));
}

#[test]
fn test_ping_period_with_huge_pong_wait() {
    let hub = HubSettings {
        pong_wait_ms: u64::MAX,
        ..HubSettings::default()
    };
    assert_eq!(hub.ping_period(), Duration::from_millis(16_602_069_666_338_596_453));

    let tiny = HubSettings {
        pong_wait_ms: 1,
        ..HubSettings::default()
    };
    assert_eq!(tiny.ping_period(), Duration::from_millis(1));
}

#[test]
#[serial]
fn load_config_without_file_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("missing");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [hub]
        max_connections = 10
        pong_wait_ms = 2000

        [log]
        level = "debug"
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.hub.max_connections, 10);
    assert_eq!(cfg.hub.pong_wait_ms, 2000);
    assert_eq!(cfg.hub.ping_period(), Duration::from_millis(1800));
    // untouched keys keep their defaults
    assert_eq!(cfg.hub.mailbox_capacity, 256);
    assert_eq!(cfg.hub.write_wait_ms, 10_000);
    assert_eq!(cfg.log.level, "debug");
}

#[test]
#[serial]
fn load_config_from_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    fs::write(&path, "[server]\nport = 9000\n").expect("write config file");

    temp_env::with_vars(
        [
            ("GAMEHUB_SERVER__PORT", Some("9100")),
            ("GAMEHUB_HUB__MAILBOX_CAPACITY", Some("0")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            // a zero-sized mailbox is raised to one slot
            assert_eq!(cfg.hub.mailbox_capacity, 1);
        },
    );
}
