//! Configuration module for the echo benchmark.
//!
//! Both binaries take their settings from the command line. Every flag
//! defaults to the fixed benchmark constant, so running without arguments
//! reproduces the reference setup (port 8888, 1000 messages, 8 KiB reads).

use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Port the server listens on and the client connects to.
pub const DEFAULT_PORT: u16 = 8888;

/// Address the server binds to.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Address the client connects to.
pub const DEFAULT_CLIENT_HOST: &str = "127.0.0.1";

/// Size of a single read, on both sides.
pub const BUFFER_SIZE: usize = 8192;

/// Kernel send/receive buffer size requested during tuning.
pub const SOCKET_BUFFER_SIZE: usize = BUFFER_SIZE * 4;

/// Pending connections queued by the listener.
pub const BACKLOG: i32 = 10;

/// Messages sent per benchmark run.
pub const NUM_MESSAGES: usize = 1000;

/// Progress and rate lines are emitted every this many messages.
pub const PROGRESS_INTERVAL: u64 = 100;

pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

pub const READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Pause between connecting and starting the benchmark.
pub const CONNECT_SETTLE: Duration = Duration::from_millis(500);

/// Pause between the last exchange and disconnecting.
pub const DISCONNECT_LINGER: Duration = Duration::from_millis(1000);

/// Identifier embedded in every client message.
pub const DEFAULT_CLIENT_ID: &str = "Rust";

/// How the server schedules accepted connections.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServeMode {
    /// One session at a time; further clients wait in the backlog.
    #[default]
    Sequential,
    /// Each session runs on its own task.
    Concurrent,
}

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "echo-server")]
#[command(version = "0.1.0")]
#[command(about = "TCP echo server with per-session statistics", long_about = None)]
pub struct ServerArgs {
    /// Address to bind to
    #[arg(long, default_value = DEFAULT_SERVER_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listen backlog
    #[arg(long, default_value_t = BACKLOG)]
    pub backlog: i32,

    /// Bytes read per message
    #[arg(long, default_value_t = BUFFER_SIZE, value_parser = positive_usize)]
    pub buffer_size: usize,

    /// Session scheduling
    #[arg(long, value_enum, default_value_t = ServeMode::Sequential)]
    pub mode: ServeMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for the benchmark client
#[derive(Parser, Debug)]
#[command(name = "echo-client")]
#[command(version = "0.1.0")]
#[command(about = "Closed-loop TCP round-trip latency benchmark", long_about = None)]
pub struct ClientArgs {
    /// Server address
    #[arg(long, default_value = DEFAULT_CLIENT_HOST)]
    pub host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of messages to send
    #[arg(short = 'n', long, default_value_t = NUM_MESSAGES, value_parser = positive_usize)]
    pub messages: usize,

    /// Identifier embedded in the message text
    #[arg(long, default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Bytes read per response
    #[arg(long, default_value_t = BUFFER_SIZE, value_parser = positive_usize)]
    pub buffer_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Parse a count that must be at least 1.
///
/// A zero-length read buffer would make every read look like end-of-stream.
fn positive_usize(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Socket options applied once, right after a connection is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningParams {
    pub nodelay: bool,
    pub send_buffer_size: usize,
    pub recv_buffer_size: usize,
    /// Only set on accepted sockets.
    pub keepalive: Option<bool>,
    pub reuse_address: Option<bool>,
    /// Only set on the client socket.
    pub read_timeout: Option<Duration>,
}

impl TuningParams {
    /// Options for sockets accepted by the server.
    pub fn server() -> Self {
        Self {
            nodelay: true,
            send_buffer_size: SOCKET_BUFFER_SIZE,
            recv_buffer_size: SOCKET_BUFFER_SIZE,
            keepalive: Some(true),
            reuse_address: Some(true),
            read_timeout: None,
        }
    }

    /// Options for the client's connected socket.
    pub fn client() -> Self {
        Self {
            nodelay: true,
            send_buffer_size: SOCKET_BUFFER_SIZE,
            recv_buffer_size: SOCKET_BUFFER_SIZE,
            keepalive: None,
            reuse_address: None,
            read_timeout: Some(READ_TIMEOUT),
        }
    }
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    pub backlog: i32,
    pub buffer_size: usize,
    pub mode: ServeMode,
    pub tuning: TuningParams,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: format!("{DEFAULT_SERVER_HOST}:{DEFAULT_PORT}"),
            backlog: BACKLOG,
            buffer_size: BUFFER_SIZE,
            mode: ServeMode::Sequential,
            tuning: TuningParams::server(),
            log_level: "info".to_string(),
        }
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            listen: format!("{}:{}", args.host, args.port),
            backlog: args.backlog,
            buffer_size: args.buffer_size,
            mode: args.mode,
            tuning: TuningParams::server(),
            log_level: args.log_level,
        }
    }
}

impl ServerConfig {
    /// Parse the process arguments.
    pub fn load() -> Self {
        ServerArgs::parse().into()
    }
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub messages: usize,
    pub client_id: String,
    pub buffer_size: usize,
    pub connect_timeout: Duration,
    pub tuning: TuningParams,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: format!("{DEFAULT_CLIENT_HOST}:{DEFAULT_PORT}"),
            messages: NUM_MESSAGES,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            buffer_size: BUFFER_SIZE,
            connect_timeout: CONNECT_TIMEOUT,
            tuning: TuningParams::client(),
            log_level: "info".to_string(),
        }
    }
}

impl From<ClientArgs> for ClientConfig {
    fn from(args: ClientArgs) -> Self {
        Self {
            server: format!("{}:{}", args.host, args.port),
            messages: args.messages,
            client_id: args.client_id,
            buffer_size: args.buffer_size,
            connect_timeout: CONNECT_TIMEOUT,
            tuning: TuningParams::client(),
            log_level: args.log_level,
        }
    }
}

impl ClientConfig {
    /// Parse the process arguments.
    pub fn load() -> Self {
        ClientArgs::parse().into()
    }
}
