//! Tracing initialisation from the `[general]` section.
//!
//! `RUST_LOG` wins over `general.log_level` when set.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rtas_core::config::GeneralConfig;

/// Installs the global subscriber. Call once, before the first log line.
///
/// * `"json"`: one JSON object per line (production)
/// * `"pretty"`: multi-line human-readable output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.log_format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
        "pretty" => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        other => {
            anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'");
        }
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
