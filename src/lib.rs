//! tcp-echo-bench: a TCP echo server and round-trip latency benchmark
//!
//! - `echo-server` accepts one connection at a time and echoes every read
//!   back with a per-connection counter and timestamp appended.
//! - `echo-client` sends a fixed number of messages over one connection,
//!   strictly alternating write and read, and reports latency and
//!   throughput.
//!
//! Both sides tune their sockets (no-delay, widened buffers) right after
//! the connection is established.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod server;
pub mod stats;
pub mod tuning;

pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
