//! Socket tuning applied to freshly established connections.
//!
//! Each option is set independently. A rejected option is logged and the
//! rest are still applied; tuning never fails the connection. Afterwards
//! the effective values are read back for the log.

use crate::config::TuningParams;
use socket2::SockRef;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Option values read back from the socket after tuning.
///
/// A field is `None` when the option was not part of the preset or could
/// not be queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedTuning {
    pub nodelay: Option<bool>,
    pub send_buffer_size: Option<usize>,
    pub recv_buffer_size: Option<usize>,
    pub keepalive: Option<bool>,
    pub reuse_address: Option<bool>,
    pub read_timeout: Option<Duration>,
}

/// Apply `params` to `stream` and report the resulting values.
pub fn apply(stream: &TcpStream, params: &TuningParams) -> AppliedTuning {
    apply_to(SockRef::from(stream), params)
}

fn apply_to(socket: SockRef<'_>, params: &TuningParams) -> AppliedTuning {
    check("TCP_NODELAY", socket.set_nodelay(params.nodelay));
    check(
        "SO_SNDBUF",
        socket.set_send_buffer_size(params.send_buffer_size),
    );
    check(
        "SO_RCVBUF",
        socket.set_recv_buffer_size(params.recv_buffer_size),
    );
    if let Some(keepalive) = params.keepalive {
        check("SO_KEEPALIVE", socket.set_keepalive(keepalive));
    }
    if let Some(reuse) = params.reuse_address {
        check("SO_REUSEADDR", socket.set_reuse_address(reuse));
    }
    if let Some(timeout) = params.read_timeout {
        check("SO_RCVTIMEO", socket.set_read_timeout(Some(timeout)));
    }

    let applied = AppliedTuning {
        nodelay: socket.nodelay().ok(),
        send_buffer_size: socket.send_buffer_size().ok(),
        recv_buffer_size: socket.recv_buffer_size().ok(),
        keepalive: params
            .keepalive
            .and_then(|_| socket.keepalive().ok()),
        reuse_address: params
            .reuse_address
            .and_then(|_| socket.reuse_address().ok()),
        read_timeout: params
            .read_timeout
            .and_then(|_| socket.read_timeout().ok().flatten()),
    };

    info!("[INFO] Socket optimizations applied:\n{applied}");
    applied
}

/// Log a rejected option. Returns whether it was applied.
fn check(option: &'static str, result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(option, error = %e, "[WARNING] Some optimizations failed");
            false
        }
    }
}

impl fmt::Display for AppliedTuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn line<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            label: &str,
            value: Option<T>,
            unit: &str,
        ) -> fmt::Result {
            match value {
                Some(value) => writeln!(f, "  - {label}: {value}{unit}"),
                None => Ok(()),
            }
        }

        line(f, "TcpNoDelay", self.nodelay, "")?;
        line(f, "SendBufferSize", self.send_buffer_size, " bytes")?;
        line(f, "ReceiveBufferSize", self.recv_buffer_size, " bytes")?;
        line(f, "KeepAlive", self.keepalive, "")?;
        line(f, "ReuseAddress", self.reuse_address, "")?;
        line(f, "SoTimeout", self.read_timeout.map(|t| t.as_millis()), " ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_apply_server_preset() {
        let (_client, accepted) = connected_pair().await;
        let applied = apply(&accepted, &TuningParams::server());

        assert_eq!(applied.nodelay, Some(true));
        assert_eq!(applied.keepalive, Some(true));
        assert_eq!(applied.reuse_address, Some(true));
        assert_eq!(applied.read_timeout, None);
        // The kernel may round the requested size up.
        assert!(applied.send_buffer_size.unwrap() >= 32768);
        assert!(applied.recv_buffer_size.unwrap() >= 32768);
    }

    #[tokio::test]
    async fn test_apply_client_preset() {
        let (client, _accepted) = connected_pair().await;
        let applied = apply(&client, &TuningParams::client());

        assert_eq!(applied.nodelay, Some(true));
        assert_eq!(applied.keepalive, None);
        assert_eq!(applied.reuse_address, None);
        assert_eq!(applied.read_timeout, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_check_reports_rejection() {
        assert!(check("TCP_NODELAY", Ok(())));
        let rejected = io::Error::new(io::ErrorKind::Unsupported, "not supported");
        assert!(!check("TCP_NODELAY", Err(rejected)));
    }

    #[test]
    fn test_rejected_option_does_not_stop_tuning() {
        // TCP_NODELAY is rejected on a UDP socket; the remaining options
        // must still be applied.
        let udp = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let applied = apply_to(SockRef::from(&udp), &TuningParams::server());

        assert_eq!(applied.nodelay, None);
        assert!(applied.send_buffer_size.unwrap() >= 32768);
        assert!(applied.recv_buffer_size.unwrap() >= 32768);
        assert_eq!(applied.reuse_address, Some(true));
    }

    #[test]
    fn test_display_skips_unset() {
        let applied = AppliedTuning {
            nodelay: Some(true),
            send_buffer_size: Some(32768),
            read_timeout: Some(Duration::from_millis(5000)),
            ..Default::default()
        };
        assert_eq!(
            applied.to_string(),
            "  - TcpNoDelay: true\n  - SendBufferSize: 32768 bytes\n  - SoTimeout: 5000 ms\n"
        );
    }
}
