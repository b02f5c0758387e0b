//! Node identity resolution.
//!
//! Order: configured override, the `NODE_NAME` environment variable (set
//! through the downward API), then the host name. The host-name fallback
//! means the agent is running outside a pod.

use rtas_core::error::IdentityError;
use rtas_core::event::NodeIdentity;
use tracing::info;

/// Environment variable carrying the node name inside a pod.
pub const NODE_NAME_ENV: &str = "NODE_NAME";

/// Resolves the node identity from config, environment and host name.
pub fn resolve_node_identity(configured: &str) -> Result<NodeIdentity, IdentityError> {
    resolve_from(configured, std::env::var(NODE_NAME_ENV).ok(), hostname)
}

/// Resolution with explicit inputs.
pub fn resolve_from(
    configured: &str,
    env_node_name: Option<String>,
    hostname: impl FnOnce() -> Option<String>,
) -> Result<NodeIdentity, IdentityError> {
    if let Some(identity) = NodeIdentity::new(configured) {
        return Ok(identity);
    }
    if let Some(identity) = env_node_name.and_then(NodeIdentity::new) {
        return Ok(identity);
    }

    info!("NODE_NAME is unset, assuming standalone mode");
    hostname().and_then(NodeIdentity::new).ok_or_else(|| {
        IdentityError::Unavailable(
            "hostname is unavailable, node events cannot be reported".to_owned(),
        )
    })
}

/// Host name of this machine.
#[cfg(unix)]
pub fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).ok()
}

/// Host name of this machine.
#[cfg(not(unix))]
pub fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_name_wins() {
        let id = resolve_from("cfg-node", Some("env-node".to_owned()), || {
            Some("host".to_owned())
        })
        .unwrap();
        assert_eq!(id.name(), "cfg-node");
    }

    #[test]
    fn env_name_used_when_not_configured() {
        let id = resolve_from("", Some("env-node".to_owned()), || Some("host".to_owned())).unwrap();
        assert_eq!(id.name(), "env-node");
    }

    #[test]
    fn blank_env_falls_back_to_hostname() {
        let id = resolve_from("", Some("  ".to_owned()), || Some("host-7".to_owned())).unwrap();
        assert_eq!(id.name(), "host-7");
    }

    #[test]
    fn nothing_available_is_an_error() {
        let err = resolve_from("", None, || None).unwrap_err();
        assert!(err.to_string().contains("hostname is unavailable"));

        let err = resolve_from("", None, || Some(String::new())).unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn hostname_is_readable() {
        let name = hostname().expect("host name");
        assert!(!name.is_empty());
    }
}
