//! CLI argument definitions for kube-rtas.

use std::path::PathBuf;

use clap::Parser;

use rtas_core::config::RtasConfig;
use rtas_core::error::RtasError;

/// A validated config and the environment overrides that were ignored.
#[derive(Debug)]
pub struct LoadedConfig {
    /// Validated configuration
    pub config: RtasConfig,
    /// `KEY=value` for each env override that failed to parse
    pub ignored_env: Vec<String>,
}

/// Publishes firmware servicelog entries as Kubernetes node events.
#[derive(Parser, Debug)]
#[command(name = "kube-rtas")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to kube-rtas.toml (or a legacy config.json).
    #[arg(short, long, default_value = "/etc/kube-rtas/kube-rtas.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Reads the config file, then env overrides, then CLI overrides, and
    /// validates the result once.
    pub async fn load_config(&self) -> Result<LoadedConfig, RtasError> {
        let mut config = RtasConfig::from_file(&self.config).await?;
        let ignored_env = config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(LoadedConfig {
            config,
            ignored_env,
        })
    }

    /// Applies the CLI overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut RtasConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
    }
}
