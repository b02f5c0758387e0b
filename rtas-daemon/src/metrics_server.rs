//! Prometheus endpoint, served by the `metrics-exporter-prometheus` listener.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use rtas_core::config::MetricsConfig;
use rtas_core::metrics as m;

/// Installs the global recorder and starts the HTTP listener.
///
/// Once per process; a second call fails because the recorder is global.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::SERVICELOG_CYCLE_DURATION_SECONDS.to_owned()),
            &m::CYCLE_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {e}"))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?;

    m::describe_all();

    tracing::info!(listen_addr = %addr, endpoint = %config.endpoint, "Prometheus metrics endpoint active");
    Ok(())
}

/// Socket address the listener binds to.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_parses_default() {
        let addr = listen_addr(&MetricsConfig::default()).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9464");
    }

    #[test]
    fn listen_addr_rejects_hostname() {
        let config = MetricsConfig {
            listen_addr: "metrics.local".to_owned(),
            ..Default::default()
        };
        assert!(listen_addr(&config).is_err());
    }
}
