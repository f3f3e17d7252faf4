//! TCP echo server.
//!
//! Accepts connections and echoes every read back with a per-connection
//! counter and a wall-clock timestamp appended. By default sessions are
//! served one at a time: the next accept happens only after the current
//! peer disconnects, and further clients wait in the listen backlog.

use crate::config::{ServeMode, ServerConfig, TuningParams, PROGRESS_INTERVAL};
use crate::message::{echo_response, epoch_millis};
use crate::stats::{rate_per_sec, SessionStats};
use crate::tuning;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Stop trigger shared between the accept loop and whoever requests shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    running: AtomicBool,
    stopped: watch::Sender<bool>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                running: AtomicBool::new(true),
                stopped,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Request shutdown. Calling this more than once has no further effect.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::AcqRel) {
            self.inner.stopped.send_replace(true);
            info!("[STOPPED] Server stopped");
        }
    }

    /// Resolves once `stop` has been called.
    async fn stopped(&self) {
        let mut rx = self.inner.stopped.subscribe();
        // The sender lives in `inner`, so this only returns once stopped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Server instance
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::from_std(create_listener(addr, config.backlog)?)?;

        Ok(Server {
            config,
            listener,
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle used to stop the server from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept and serve connections until stopped.
    ///
    /// The listening socket is closed when this returns. In concurrent
    /// mode, sessions still open at shutdown are finished first.
    pub async fn run(self) -> io::Result<()> {
        let Server {
            config,
            listener,
            shutdown,
        } = self;

        let addr = listener.local_addr()?;
        info!(
            address = %addr,
            backlog = config.backlog,
            mode = ?config.mode,
            "TCP Optimized Server Started (Rust)"
        );
        info!("Listening on port {}", addr.port());
        info!("Waiting for connections...");

        let mut sessions = JoinSet::new();

        while shutdown.is_running() {
            let accepted = tokio::select! {
                _ = shutdown.stopped() => break,
                Some(_) = sessions.join_next(), if !sessions.is_empty() => continue,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let session = serve_session(
                        stream,
                        peer,
                        config.tuning,
                        config.buffer_size,
                        shutdown.clone(),
                    );
                    match config.mode {
                        ServeMode::Sequential => session.await,
                        ServeMode::Concurrent => {
                            sessions.spawn(session);
                        }
                    }
                }
                Err(e) => {
                    if shutdown.is_running() {
                        error!(error = %e, "[ERROR] Accept error");
                    }
                }
            }
        }

        shutdown.stop();
        drop(listener);

        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "[ERROR] Session task failed");
            }
        }
        Ok(())
    }
}

/// Tune, echo until the peer closes, then report the session.
async fn serve_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    tuning_params: TuningParams,
    buffer_size: usize,
    shutdown: ShutdownHandle,
) {
    tuning::apply(&stream, &tuning_params);
    info!(peer = %peer, "[CONNECTED] Client from {peer}");

    let start = Instant::now();
    let mut messages = 0u64;

    let result = tokio::select! {
        _ = shutdown.stopped() => Ok(()),
        result = echo_loop(&mut stream, buffer_size, start, &mut messages) => result,
    };

    match result {
        Ok(()) => {
            let stats = SessionStats {
                messages,
                elapsed: start.elapsed(),
            };
            println!("\n{stats}");
        }
        Err(e) => {
            if shutdown.is_running() {
                error!(peer = %peer, error = %e, "[ERROR] Client handler error");
            }
        }
    }

    if let Err(e) = stream.shutdown().await {
        debug!(peer = %peer, error = %e, "Error closing client socket");
    }
}

/// Echo every read back to the peer until end-of-stream.
async fn echo_loop(
    stream: &mut TcpStream,
    buffer_size: usize,
    start: Instant,
    messages: &mut u64,
) -> io::Result<()> {
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            info!("[DISCONNECTED] Client closed connection");
            return Ok(());
        }

        *messages += 1;
        let response = echo_response(&buffer[..n], *messages, epoch_millis());
        stream.write_all(&response).await?;
        stream.flush().await?;

        if *messages % PROGRESS_INTERVAL == 0 {
            if let Some(rate) = rate_per_sec(*messages, start.elapsed()) {
                info!("[STATS] Messages: {}, Rate: {:.2} msg/sec", *messages, rate);
            }
        }
    }
}

/// Create the listening socket with address reuse and an explicit backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn test_config() -> ServerConfig {
        ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = assert_ok!(Server::bind(test_config()));
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.shutdown_handle().is_running());
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let config = ServerConfig {
            listen: "not an address".to_string(),
            ..Default::default()
        };
        let err = Server::bind(config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let server = Server::bind(test_config()).unwrap();
        let handle = server.shutdown_handle();
        handle.stop();
        handle.stop();
        assert!(!handle.is_running());
        // Stopped before running: returns immediately.
        assert_ok!(server.run().await);
        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_unblocks_pending_accept() {
        let server = Server::bind(test_config()).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), task).await;
        assert_ok!(assert_ok!(assert_ok!(result)));
        // Listener is closed once the loop returns.
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_create_listener_backlog() {
        let listener = assert_ok!(create_listener("127.0.0.1:0".parse().unwrap(), 10));
        assert!(listener.local_addr().unwrap().port() > 0);
    }
}
