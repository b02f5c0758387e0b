//! Tailer settings
//!
//! [`TailerConfig`] is derived from the core
//! [`ServicelogConfig`](rtas_core::config::ServicelogConfig) section, plus
//! the dispatch deadline that lives under `[notifier]`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rtas_core::config::{MAX_POLL_INTERVAL_SECS, NotifierConfig, ServicelogConfig};

use crate::error::ServicelogError;

/// Where a fresh process starts reading the servicelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFrom {
    /// Cursor starts at 0: existing entries are published on the first cycle
    #[default]
    Beginning,
    /// The first cycle only records the current row count
    End,
}

impl FromStr for StartFrom {
    type Err = ServicelogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            other => Err(ServicelogError::Config {
                field: "start_from".to_owned(),
                reason: format!("unknown start position '{other}'"),
            }),
        }
    }
}

impl fmt::Display for StartFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => f.write_str("beginning"),
            Self::End => f.write_str("end"),
        }
    }
}

/// Tailer settings
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Servicelog SQLite database
    pub db_path: PathBuf,
    /// Entries with a severity strictly above this are published
    pub severity_threshold: i64,
    /// Seconds between cycles
    pub poll_interval_secs: u64,
    /// Deadline per store operation
    pub store_timeout_secs: u64,
    /// Deadline per published event
    pub dispatch_timeout_secs: u64,
    /// Initial cursor policy
    pub start_from: StartFrom,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("/var/lib/servicelog/servicelog.db"),
            severity_threshold: 3,
            poll_interval_secs: 10,
            store_timeout_secs: 30,
            dispatch_timeout_secs: 10,
            start_from: StartFrom::Beginning,
        }
    }
}

impl TailerConfig {
    /// Builds tailer settings from the core config sections.
    pub fn from_core(
        servicelog: &ServicelogConfig,
        notifier: &NotifierConfig,
    ) -> Result<Self, ServicelogError> {
        Ok(Self {
            db_path: PathBuf::from(&servicelog.db_path),
            severity_threshold: servicelog.severity_threshold,
            poll_interval_secs: servicelog.poll_interval_secs,
            store_timeout_secs: servicelog.store_timeout_secs,
            dispatch_timeout_secs: notifier.timeout_secs,
            start_from: servicelog.start_from.parse()?,
        })
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ServicelogError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ServicelogError::Config {
                field: "db_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ServicelogError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            });
        }

        if self.store_timeout_secs == 0 {
            return Err(ServicelogError::Config {
                field: "store_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.dispatch_timeout_secs == 0 {
            return Err(ServicelogError::Config {
                field: "dispatch_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Store deadline as a [`Duration`].
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Dispatch deadline as a [`Duration`].
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}
