//! Benchmark client entry point.
//!
//! Exits with status 1 if the connection or the run fails.

use tcp_echo_bench::client::Client;
use tcp_echo_bench::config::{ClientConfig, CONNECT_SETTLE, DISCONNECT_LINGER};
use tracing::error;

#[tokio::main]
async fn main() {
    let config = ClientConfig::load();
    tcp_echo_bench::init_logging(&config.log_level);

    let mut client = Client::new(config);
    if let Err(e) = client.connect().await {
        error!("[ERROR] {e}");
        std::process::exit(1);
    }

    // Let the connection settle before measuring.
    tokio::time::sleep(CONNECT_SETTLE).await;

    let run = match client.run_benchmark().await {
        Ok(run) => run,
        Err(e) => {
            error!("[ERROR] {e}");
            client.disconnect().await;
            std::process::exit(1);
        }
    };

    if let Some(report) = run.report() {
        println!("\n{report}");
    }

    tokio::time::sleep(DISCONNECT_LINGER).await;
    client.disconnect().await;
}
