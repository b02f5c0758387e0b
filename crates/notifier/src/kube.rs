//! Kubernetes API server sink.
//!
//! Publishes each [`NodeEvent`] as a `core/v1` `Event` with one POST to
//! `{api_server}/api/v1/namespaces/{namespace}/events`, authenticated with
//! the pod's service-account token.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use reqwest::{Certificate, Client};
use serde::Serialize;
use tracing::{debug, warn};

use rtas_core::config::NotifierConfig;
use rtas_core::error::DispatchError;
use rtas_core::event::NodeEvent;
use rtas_core::metrics as m;
use rtas_core::pipeline::EventSink;

use crate::error::NotifierError;

/// In-cluster API server host variable.
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
/// In-cluster API server port variable.
pub const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// Settings for [`KubeEventSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeSinkConfig {
    /// API server base URL, without trailing slash
    pub api_server: String,
    /// Bearer token file; empty sends no token
    pub token_path: String,
    /// CA bundle; empty uses the system roots
    pub ca_path: String,
    /// Namespace events are created in
    pub namespace: String,
    /// Reporting component
    pub component: String,
    /// Request deadline
    pub timeout: Duration,
}

impl KubeSinkConfig {
    /// Builds the sink settings, discovering the API server from the
    /// environment when none is configured.
    pub fn from_core(core: &NotifierConfig) -> Result<Self, NotifierError> {
        let api_server = if core.api_server.trim().is_empty() {
            in_cluster_api_server(
                std::env::var(SERVICE_HOST_ENV).ok(),
                std::env::var(SERVICE_PORT_ENV).ok(),
            )?
        } else {
            core.api_server.trim().trim_end_matches('/').to_owned()
        };

        Ok(Self {
            api_server,
            token_path: core.token_path.clone(),
            ca_path: core.ca_path.clone(),
            namespace: core.namespace.clone(),
            component: core.component.clone(),
            timeout: Duration::from_secs(core.timeout_secs),
        })
    }

    /// Event collection URL.
    pub fn events_url(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/events",
            self.api_server, self.namespace
        )
    }
}

/// `https://host:port` from the in-cluster service variables.
pub fn in_cluster_api_server(
    host: Option<String>,
    port: Option<String>,
) -> Result<String, NotifierError> {
    let host = host.filter(|h| !h.is_empty()).ok_or_else(|| {
        NotifierError::ApiServerUnknown(format!(
            "notifier.api_server is empty and {SERVICE_HOST_ENV} is unset"
        ))
    })?;
    let port = port.filter(|p| !p.is_empty()).ok_or_else(|| {
        NotifierError::ApiServerUnknown(format!(
            "notifier.api_server is empty and {SERVICE_PORT_ENV} is unset"
        ))
    })?;

    if host.contains(':') {
        Ok(format!("https://[{host}]:{port}"))
    } else {
        Ok(format!("https://{host}:{port}"))
    }
}

/// Posts node events to the Kubernetes API server.
#[derive(Debug, Clone)]
pub struct KubeEventSink {
    client: Client,
    config: KubeSinkConfig,
    events_url: String,
    token: Option<String>,
}

impl KubeEventSink {
    /// Reads the token and CA bundle and builds the HTTP client.
    pub fn new(config: KubeSinkConfig) -> Result<Self, NotifierError> {
        let token = if config.token_path.is_empty() {
            None
        } else {
            let raw = std::fs::read_to_string(&config.token_path).map_err(|e| {
                NotifierError::Token {
                    path: config.token_path.clone(),
                    reason: e.to_string(),
                }
            })?;
            Some(raw.trim().to_owned())
        };

        let mut builder = Client::builder().timeout(config.timeout);
        if !config.ca_path.is_empty() {
            builder = builder.add_root_certificate(load_ca(Path::new(&config.ca_path))?);
        }
        let client = builder
            .build()
            .map_err(|e| NotifierError::Client(e.to_string()))?;

        Ok(Self {
            client,
            events_url: config.events_url(),
            config,
            token,
        })
    }

    /// Sink settings.
    pub fn config(&self) -> &KubeSinkConfig {
        &self.config
    }
}

impl EventSink for KubeEventSink {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn notify(&self, event: &NodeEvent) -> Result<(), DispatchError> {
        let body = KubeEvent::from_node_event(event, &self.config.namespace, &self.config.component);

        let mut request = self.client.post(&self.events_url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout {
                    secs: self.config.timeout.as_secs(),
                }
            } else {
                DispatchError::Failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "api server rejected node event");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        counter!(m::NOTIFIER_REQUESTS_TOTAL, m::LABEL_SINK => "kubernetes").increment(1);
        debug!(event = %body.metadata.name, "node event recorded");
        Ok(())
    }
}

const PEM_CERT_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";

fn load_ca(path: &Path) -> Result<Certificate, NotifierError> {
    let pem = std::fs::read(path).map_err(|e| NotifierError::CaBundle {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if !pem.windows(PEM_CERT_MARKER.len()).any(|w| w == PEM_CERT_MARKER) {
        return Err(NotifierError::CaBundle {
            path: path.display().to_string(),
            reason: "no PEM certificate found".to_owned(),
        });
    }
    Certificate::from_pem(&pem).map_err(|e| NotifierError::CaBundle {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `core/v1` Event body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeEvent {
    /// Always `v1`
    pub api_version: &'static str,
    /// Always `Event`
    pub kind: &'static str,
    /// Event name and namespace
    pub metadata: ObjectMeta,
    /// The node the event is about
    pub involved_object: ObjectReference,
    /// `PlatformEvent`
    pub reason: String,
    /// Servicelog entry description
    pub message: String,
    /// `Normal` or `Warning`
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// Reporting component and host
    pub source: EventSource,
    /// RFC 3339, seconds precision
    pub first_timestamp: String,
    /// Same as `first_timestamp`; events are never aggregated
    pub last_timestamp: String,
    /// Always 1
    pub count: u32,
    /// Matches `source.component`
    pub reporting_component: String,
    /// Node name
    pub reporting_instance: String,
}

/// Event metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectMeta {
    /// Unique per event
    pub name: String,
    /// Namespace the event is created in
    pub namespace: String,
}

/// Reference to the node.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectReference {
    /// `Node`
    pub kind: String,
    /// Node name
    pub name: String,
    /// Node name as well; the node object is never looked up
    pub uid: String,
}

/// Who reported the event.
#[derive(Debug, Clone, Serialize)]
pub struct EventSource {
    /// Configured component name
    pub component: String,
    /// Node name
    pub host: String,
}

impl KubeEvent {
    /// Builds the API object for `event`.
    pub fn from_node_event(event: &NodeEvent, namespace: &str, component: &str) -> Self {
        let node = event.node.name();
        let nanos = event
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let timestamp = rfc3339(event.timestamp);

        Self {
            api_version: "v1",
            kind: "Event",
            metadata: ObjectMeta {
                name: format!("{node}.{nanos:x}"),
                namespace: namespace.to_owned(),
            },
            involved_object: ObjectReference {
                kind: event.object_kind.clone(),
                name: node.to_owned(),
                uid: node.to_owned(),
            },
            reason: event.reason.clone(),
            message: event.message.clone(),
            event_type: event.class.as_str(),
            source: EventSource {
                component: component.to_owned(),
                host: node.to_owned(),
            },
            first_timestamp: timestamp.clone(),
            last_timestamp: timestamp,
            count: 1,
            reporting_component: component.to_owned(),
            reporting_instance: node.to_owned(),
        }
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use rtas_core::event::NodeIdentity;
    use rtas_core::types::LogEntry;

    use super::*;

    fn event(severity: i64) -> NodeEvent {
        let node = NodeIdentity::new("worker-1").unwrap();
        let mut event = NodeEvent::from_entry(&node, &LogEntry::new(9, severity, "DIMM 3 failed"));
        event.timestamp = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        event
    }

    #[test]
    fn body_matches_core_v1_event() {
        let body = KubeEvent::from_node_event(&event(6), "default", "RTASNotifier");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["apiVersion"], "v1");
        assert_eq!(json["kind"], "Event");
        assert_eq!(json["metadata"]["namespace"], "default");
        assert_eq!(json["involvedObject"]["kind"], "Node");
        assert_eq!(json["involvedObject"]["name"], "worker-1");
        assert_eq!(json["involvedObject"]["uid"], "worker-1");
        assert_eq!(json["type"], "Warning");
        assert_eq!(json["reason"], "PlatformEvent");
        assert_eq!(json["message"], "DIMM 3 failed");
        assert_eq!(json["source"]["component"], "RTASNotifier");
        assert_eq!(json["source"]["host"], "worker-1");
        assert_eq!(json["firstTimestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(json["count"], 1);
    }

    #[test]
    fn normal_class_for_low_severity() {
        let body = KubeEvent::from_node_event(&event(3), "default", "RTASNotifier");
        assert_eq!(body.event_type, "Normal");
    }

    #[test]
    fn event_name_is_node_plus_hex_nanos() {
        let body = KubeEvent::from_node_event(&event(5), "default", "RTASNotifier");
        let expected = format!("worker-1.{:x}", 1_700_000_000u128 * 1_000_000_000);
        assert_eq!(body.metadata.name, expected);
    }

    #[test]
    fn in_cluster_discovery() {
        let url =
            in_cluster_api_server(Some("10.96.0.1".to_owned()), Some("443".to_owned())).unwrap();
        assert_eq!(url, "https://10.96.0.1:443");

        let url = in_cluster_api_server(Some("fd00::1".to_owned()), Some("6443".to_owned()))
            .unwrap();
        assert_eq!(url, "https://[fd00::1]:6443");

        assert!(in_cluster_api_server(None, Some("443".to_owned())).is_err());
        assert!(in_cluster_api_server(Some("10.96.0.1".to_owned()), None).is_err());
    }

    #[test]
    fn explicit_api_server_skips_discovery() {
        let core = NotifierConfig {
            api_server: "https://kube.example:6443/".to_owned(),
            ..Default::default()
        };
        let config = KubeSinkConfig::from_core(&core).unwrap();
        assert_eq!(config.api_server, "https://kube.example:6443");
        assert_eq!(
            config.events_url(),
            "https://kube.example:6443/api/v1/namespaces/default/events"
        );
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_token_file_fails_construction() {
        let config = KubeSinkConfig {
            api_server: "http://127.0.0.1:1".to_owned(),
            token_path: "/nonexistent/token".to_owned(),
            ca_path: String::new(),
            namespace: "default".to_owned(),
            component: "RTASNotifier".to_owned(),
            timeout: Duration::from_secs(1),
        };
        let err = KubeEventSink::new(config).unwrap_err();
        assert!(matches!(err, NotifierError::Token { .. }));
    }

    #[test]
    fn invalid_ca_bundle_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.crt");
        std::fs::write(&ca, "not a certificate").unwrap();
        let config = KubeSinkConfig {
            api_server: "https://127.0.0.1:1".to_owned(),
            token_path: String::new(),
            ca_path: ca.display().to_string(),
            namespace: "default".to_owned(),
            component: "RTASNotifier".to_owned(),
            timeout: Duration::from_secs(1),
        };
        let err = KubeEventSink::new(config).unwrap_err();
        assert!(matches!(err, NotifierError::CaBundle { .. }));
    }
}
