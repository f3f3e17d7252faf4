//! Echo server entry point.
//!
//! Serves until interrupted or terminated, then closes the listener and
//! exits.

use std::future::Future;
use std::io;
use tcp_echo_bench::config::ServerConfig;
use tcp_echo_bench::server::Server;
use tracing::info;

/// Resolves on SIGINT or SIGTERM.
///
/// Handlers are registered before this returns, so a signal arriving
/// between registration and the first poll is not lost.
#[cfg(unix)]
fn termination_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn termination_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load();
    tcp_echo_bench::init_logging(&config.log_level);

    let server = Server::bind(config)?;
    let shutdown = server.shutdown_handle();

    let signal = termination_signal()?;
    tokio::spawn(async move {
        signal.await;
        info!("[INFO] Shutdown signal received");
        shutdown.stop();
    });

    info!("Press Ctrl+C to stop");
    server.run().await?;
    Ok(())
}
