//! # rtas-servicelog
//!
//! Tails the firmware servicelog database and publishes every new entry
//! above the severity threshold as a node event.
//!
//! ```text
//! interval tick -> open store -> count -> fetch delta -> dispatch -> advance cursor
//! ```
//!
//! - [`store`]: read-only SQLite accessor, one connection per cycle
//! - [`cursor`]: in-memory high-water mark
//! - [`dispatch`]: entry -> [`NodeEvent`](rtas_core::event::NodeEvent) -> sink
//! - [`cycle`]: one cycle and its state machine
//! - [`tailer`]: the scheduler, exposed as a core `Pipeline`

pub mod config;
pub mod cursor;
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod store;
pub mod tailer;

pub use config::{StartFrom, TailerConfig};
pub use cursor::TailCursor;
pub use cycle::{CycleOutcome, CycleRunner, CycleStage};
pub use dispatch::Dispatcher;
pub use error::ServicelogError;
pub use store::{SqliteLogStore, StoreHandle};
pub use tailer::{ServicelogTailer, ServicelogTailerBuilder, TailerStats, TailerStatsSnapshot};
