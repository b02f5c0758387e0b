//! kube-rtas.toml integration tests
//!
//! - example file parses and validates
//! - partial files keep defaults for missing sections
//! - env overrides win over file values

use rtas_core::config::RtasConfig;
use rtas_core::error::{ConfigError, RtasError};
use serial_test::serial;

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../kube-rtas.toml.example");
    let config = RtasConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert!(config.general.pid_file.is_empty());
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../kube-rtas.toml.example");
    let config = RtasConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_servicelog_defaults() {
    let content = include_str!("../../../kube-rtas.toml.example");
    let config = RtasConfig::parse(content).expect("should parse");
    let defaults = RtasConfig::default();

    assert_eq!(config.servicelog.db_path, defaults.servicelog.db_path);
    assert_eq!(
        config.servicelog.poll_interval_secs,
        defaults.servicelog.poll_interval_secs
    );
    assert_eq!(
        config.servicelog.severity_threshold,
        defaults.servicelog.severity_threshold
    );
    assert_eq!(config.servicelog.start_from, "beginning");
}

#[test]
fn example_config_matches_notifier_defaults() {
    let content = include_str!("../../../kube-rtas.toml.example");
    let config = RtasConfig::parse(content).expect("should parse");

    assert_eq!(config.notifier.kind, "kubernetes");
    assert_eq!(config.notifier.namespace, "default");
    assert_eq!(config.notifier.component, "RTASNotifier");
    assert_eq!(config.notifier.timeout_secs, 10);
}

#[test]
fn only_notifier_section_keeps_other_defaults() {
    let config = RtasConfig::parse(
        r#"
[notifier]
kind = "log"
node_name = "worker-7"
"#,
    )
    .expect("should parse");

    assert_eq!(config.notifier.node_name, "worker-7");
    assert_eq!(config.servicelog.poll_interval_secs, 10);
    assert_eq!(config.metrics.port, 9464);
    config.validate().expect("partial config should validate");
}

#[test]
fn wrong_type_is_parse_error() {
    let err = RtasConfig::parse(
        r#"
[servicelog]
poll_interval_secs = "ten"
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RtasError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
#[serial]
async fn load_applies_env_over_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kube-rtas.toml");
    std::fs::write(
        &path,
        "[servicelog]\nseverity_threshold = 2\npoll_interval_secs = 5\n",
    )
    .unwrap();

    // SAFETY: serialized with the other env-mutating tests.
    unsafe { std::env::set_var("RTAS_SERVICELOG_SEVERITY_THRESHOLD", "6") };
    let config = RtasConfig::load(&path).await;
    unsafe { std::env::remove_var("RTAS_SERVICELOG_SEVERITY_THRESHOLD") };

    let config = config.expect("load should succeed");
    assert_eq!(config.servicelog.severity_threshold, 6);
    assert_eq!(config.servicelog.poll_interval_secs, 5);
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_env_value_after_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kube-rtas.toml");
    std::fs::write(&path, "").unwrap();

    // SAFETY: serialized with the other env-mutating tests.
    unsafe { std::env::set_var("RTAS_NOTIFIER_KIND", "pagerduty") };
    let result = RtasConfig::load(&path).await;
    unsafe { std::env::remove_var("RTAS_NOTIFIER_KIND") };

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        RtasError::Config(ConfigError::InvalidValue { .. })
    ));
}
