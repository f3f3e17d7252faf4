//! Closed-loop benchmark client.
//!
//! Sends messages one at a time over a single connection and waits for
//! each response before sending the next, recording the round-trip
//! latency of every exchange.

use crate::config::{ClientConfig, PROGRESS_INTERVAL};
use crate::error::{Error, Result};
use crate::message::client_message;
use crate::stats::BenchmarkReport;
use crate::tuning;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Raw results of one benchmark loop.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRun {
    /// Round-trip latency per completed message, in microseconds, in send order.
    pub latencies_us: Vec<i64>,
    /// Bytes sent plus bytes received.
    pub total_bytes: u64,
    /// Wall time of the whole loop.
    pub elapsed: Duration,
}

impl BenchmarkRun {
    /// Aggregate statistics, or `None` if no round trip completed.
    pub fn report(&self) -> Option<BenchmarkReport> {
        BenchmarkReport::new(&self.latencies_us, self.total_bytes, self.elapsed)
    }
}

/// Benchmark client
pub struct Client {
    config: ClientConfig,
    stream: Option<TcpStream>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect to the server and tune the socket.
    pub async fn connect(&mut self) -> Result<()> {
        let addr = &self.config.server;
        info!("Connecting to {addr}...");

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::Connect(addr.clone(), e)),
            Err(_) => {
                return Err(Error::ConnectTimeout(
                    addr.clone(),
                    self.config.connect_timeout,
                ))
            }
        };

        tuning::apply(&stream, &self.config.tuning);
        info!("[CONNECTED] Successfully connected to server");

        self.stream = Some(stream);
        Ok(())
    }

    /// Run the send/receive loop.
    ///
    /// Stops early if the server closes the connection; samples collected
    /// up to that point are kept.
    pub async fn run_benchmark(&mut self) -> Result<BenchmarkRun> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let total = self.config.messages;
        let read_timeout = self.config.tuning.read_timeout;

        info!("TCP Client Benchmark (Rust)");
        info!("Sending {total} messages...");

        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut run = BenchmarkRun {
            latencies_us: Vec::with_capacity(total),
            ..Default::default()
        };
        let start = Instant::now();

        for i in 1..=total {
            let message = client_message(i, &self.config.client_id);

            let sent_at = Instant::now();
            stream.write_all(message.as_bytes()).await?;
            stream.flush().await?;

            let n = match read_timeout {
                Some(limit) => timeout(limit, stream.read(&mut buffer))
                    .await
                    .map_err(|_| Error::ReadTimeout(limit))??,
                None => stream.read(&mut buffer).await?,
            };
            let received_at = Instant::now();

            if n == 0 {
                error!("[ERROR] Connection closed at message {i}");
                break;
            }

            run.total_bytes += (message.len() + n) as u64;
            run.latencies_us
                .push((received_at - sent_at).as_micros() as i64);

            if i as u64 % PROGRESS_INTERVAL == 0 {
                info!("[PROGRESS] Sent/Received {i}/{total} messages");
            }
        }

        run.elapsed = start.elapsed();
        Ok(run)
    }

    /// Close the connection. Does nothing if already closed.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                error!(error = %e, "[ERROR] Error closing connection");
            }
            info!("[DISCONNECTED] Connection closed");
        } else {
            debug!("Disconnect requested while not connected");
        }
    }
}
