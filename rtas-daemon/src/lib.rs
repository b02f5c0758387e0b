//! kube-rtas daemon library.
//!
//! Exposes the daemon's parts for integration tests; production use is the
//! `kube-rtas` binary.

pub mod cli;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod pid_file;
