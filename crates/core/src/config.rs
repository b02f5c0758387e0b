//! Configuration: `kube-rtas.toml` parsing and runtime settings.
//!
//! [`RtasConfig`] holds every section; each component reads only its own.
//!
//! # Load order
//! 1. Config file (`kube-rtas.toml`, or the legacy `config.json` format)
//! 2. Environment variables (`RTAS_SERVICELOG_POLL_INTERVAL_SECS=30` style)
//! 3. CLI flags (applied by the daemon)
//! 4. Defaults for anything left unset
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), rtas_core::error::RtasError> {
//! use rtas_core::config::RtasConfig;
//!
//! let config = RtasConfig::load("/etc/kube-rtas/kube-rtas.toml").await?;
//! let config = RtasConfig::parse("[servicelog]\nseverity_threshold = 4")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RtasError};

/// Longest accepted poll interval (one day).
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RtasConfig {
    /// Logging and process settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Servicelog polling settings
    #[serde(default)]
    pub servicelog: ServicelogConfig,
    /// Event sink settings
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Prometheus endpoint settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl RtasConfig {
    /// Loads the config file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RtasError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads the config file without environment overrides.
    ///
    /// Files ending in `.json` are read in the legacy
    /// `{ "ServicelogDBPath", "PollInterval", "Severity" }` format.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RtasError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RtasError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RtasError::Io(e)
            }
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::parse_legacy_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parses a TOML document.
    pub fn parse(toml_str: &str) -> Result<Self, RtasError> {
        toml::from_str(toml_str).map_err(|e| {
            RtasError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Parses the legacy JSON config. Sections other than `servicelog` keep
    /// their defaults.
    pub fn parse_legacy_json(json_str: &str) -> Result<Self, RtasError> {
        let legacy: LegacyJsonConfig = serde_json::from_str(json_str).map_err(|e| {
            RtasError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })?;

        let mut config = Self::default();
        config.servicelog.db_path = legacy.servicelog_db_path;
        config.servicelog.poll_interval_secs = legacy.poll_interval;
        config.servicelog.severity_threshold = legacy.severity;
        Ok(config)
    }

    /// Overrides fields from `RTAS_{SECTION}_{FIELD}` environment variables.
    ///
    /// Returns the variables that were set but could not be parsed; those
    /// fields keep their previous value.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        let mut ignored = Vec::new();

        override_string(&mut self.general.log_level, "RTAS_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "RTAS_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "RTAS_GENERAL_PID_FILE");

        override_string(&mut self.servicelog.db_path, "RTAS_SERVICELOG_DB_PATH");
        override_parsed(
            &mut self.servicelog.poll_interval_secs,
            "RTAS_SERVICELOG_POLL_INTERVAL_SECS",
            &mut ignored,
        );
        override_parsed(
            &mut self.servicelog.severity_threshold,
            "RTAS_SERVICELOG_SEVERITY_THRESHOLD",
            &mut ignored,
        );
        override_parsed(
            &mut self.servicelog.store_timeout_secs,
            "RTAS_SERVICELOG_STORE_TIMEOUT_SECS",
            &mut ignored,
        );
        override_string(&mut self.servicelog.start_from, "RTAS_SERVICELOG_START_FROM");

        override_string(&mut self.notifier.kind, "RTAS_NOTIFIER_KIND");
        override_string(&mut self.notifier.node_name, "RTAS_NOTIFIER_NODE_NAME");
        override_string(&mut self.notifier.api_server, "RTAS_NOTIFIER_API_SERVER");
        override_string(&mut self.notifier.token_path, "RTAS_NOTIFIER_TOKEN_PATH");
        override_string(&mut self.notifier.ca_path, "RTAS_NOTIFIER_CA_PATH");
        override_string(&mut self.notifier.namespace, "RTAS_NOTIFIER_NAMESPACE");
        override_string(&mut self.notifier.component, "RTAS_NOTIFIER_COMPONENT");
        override_parsed(
            &mut self.notifier.timeout_secs,
            "RTAS_NOTIFIER_TIMEOUT_SECS",
            &mut ignored,
        );

        override_parsed(&mut self.metrics.enabled, "RTAS_METRICS_ENABLED", &mut ignored);
        override_string(&mut self.metrics.listen_addr, "RTAS_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "RTAS_METRICS_PORT", &mut ignored);
        override_string(&mut self.metrics.endpoint, "RTAS_METRICS_ENDPOINT");

        ignored
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), RtasError> {
        check_one_of(
            "general.log_level",
            &self.general.log_level,
            &["trace", "debug", "info", "warn", "error"],
        )?;
        check_one_of(
            "general.log_format",
            &self.general.log_format,
            &["json", "pretty"],
        )?;

        if self.servicelog.db_path.trim().is_empty() {
            return Err(invalid("servicelog.db_path", "must not be empty"));
        }
        if self.servicelog.poll_interval_secs == 0
            || self.servicelog.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(invalid(
                "servicelog.poll_interval_secs",
                &format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }
        if !(-1..=7).contains(&self.servicelog.severity_threshold) {
            return Err(invalid(
                "servicelog.severity_threshold",
                "must be -1-7 (-1 forwards every entry)",
            ));
        }
        if self.servicelog.store_timeout_secs == 0 {
            return Err(invalid(
                "servicelog.store_timeout_secs",
                "must be greater than 0",
            ));
        }
        check_one_of(
            "servicelog.start_from",
            &self.servicelog.start_from,
            &["beginning", "end"],
        )?;

        check_one_of("notifier.kind", &self.notifier.kind, &["kubernetes", "log"])?;
        if self.notifier.timeout_secs == 0 {
            return Err(invalid("notifier.timeout_secs", "must be greater than 0"));
        }
        // Node is cluster-scoped; the API server only accepts its events in "default".
        if self.notifier.kind == "kubernetes" && self.notifier.namespace != "default" {
            return Err(invalid(
                "notifier.namespace",
                "must be 'default' for events on a Node",
            ));
        }

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(invalid(
                "metrics.endpoint",
                "only '/metrics' is supported",
            ));
        }

        Ok(())
    }
}

/// Logging and process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
    /// PID file path; empty disables it
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// Servicelog polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicelogConfig {
    /// Path of the servicelog SQLite database
    pub db_path: String,
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Entries with a severity strictly above this value are published
    pub severity_threshold: i64,
    /// Deadline for each store operation
    pub store_timeout_secs: u64,
    /// `beginning` publishes existing entries on the first cycle,
    /// `end` only publishes entries logged after startup
    pub start_from: String,
}

impl Default for ServicelogConfig {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/servicelog/servicelog.db".to_owned(),
            poll_interval_secs: 10,
            severity_threshold: 3,
            store_timeout_secs: 30,
            start_from: "beginning".to_owned(),
        }
    }
}

/// Event sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// `kubernetes` posts to the API server, `log` only writes log lines
    pub kind: String,
    /// Node name override; empty falls back to `NODE_NAME`, then the host name
    pub node_name: String,
    /// API server base URL; empty uses in-cluster discovery
    pub api_server: String,
    /// Service-account token file
    pub token_path: String,
    /// CA bundle for the API server; empty uses the system roots
    pub ca_path: String,
    /// Namespace events are written to; only "default" is accepted for Node events
    pub namespace: String,
    /// Reporting component name
    pub component: String,
    /// Deadline for one notification
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: "kubernetes".to_owned(),
            node_name: String::new(),
            api_server: String::new(),
            token_path: "/var/run/secrets/kubernetes.io/serviceaccount/token".to_owned(),
            ca_path: "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_owned(),
            namespace: "default".to_owned(),
            component: "RTASNotifier".to_owned(),
            timeout_secs: 10,
        }
    }
}

/// Prometheus endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose the endpoint
    pub enabled: bool,
    /// Listen address
    pub listen_addr: String,
    /// Listen port
    pub port: u16,
    /// Scrape path
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// Original `config.json` layout.
#[derive(Debug, Deserialize)]
struct LegacyJsonConfig {
    #[serde(rename = "ServicelogDBPath")]
    servicelog_db_path: String,
    #[serde(rename = "PollInterval")]
    poll_interval: u64,
    #[serde(rename = "Severity")]
    severity: i64,
}

fn invalid(field: &str, reason: &str) -> RtasError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), RtasError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            &format!("must be one of: {}", allowed.join(", ")),
        ))
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(
    target: &mut T,
    env_key: &str,
    ignored: &mut Vec<String>,
) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => {
                warn!(
                    env_key,
                    value = val.as_str(),
                    "failed to parse env var, ignoring"
                );
                ignored.push(format!("{env_key}={val}"));
            }
        }
    }
}
