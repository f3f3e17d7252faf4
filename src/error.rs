//! Error types shared by the client and server.

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a benchmark run or a server session
#[derive(Debug)]
pub enum Error {
    /// The server refused or could not be reached.
    Connect(String, io::Error),
    /// The connect attempt did not complete in time.
    ConnectTimeout(String, Duration),
    /// No response arrived within the read timeout.
    ReadTimeout(Duration),
    /// A benchmark was started without a connection.
    NotConnected,
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Connect(addr, e) => write!(f, "Failed to connect to {addr}: {e}"),
            Error::ConnectTimeout(addr, timeout) => {
                write!(
                    f,
                    "Connection to {addr} timed out after {} ms",
                    timeout.as_millis()
                )
            }
            Error::ReadTimeout(timeout) => {
                write!(f, "No response within {} ms", timeout.as_millis())
            }
            Error::NotConnected => write!(f, "Not connected to server"),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connect(_, e) | Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::ConnectTimeout("127.0.0.1:8888".to_string(), Duration::from_secs(5));
        assert_eq!(
            err.to_string(),
            "Connection to 127.0.0.1:8888 timed out after 5000 ms"
        );
        assert_eq!(Error::NotConnected.to_string(), "Not connected to server");
    }

    #[test]
    fn test_io_source() {
        let err: Error = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&Error::NotConnected).is_none());
    }
}
