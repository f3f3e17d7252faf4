//! Echo message format.
//!
//! Messages are unframed UTF-8 text. One read is treated as one message,
//! which only holds while messages are short and the connection carries a
//! single outstanding request:
//!
//! ```text
//! Request:  Message #<n> from <client-id> client
//! Response: <request text> [Server Echo - Msg#<count> - Time:<epoch-ms>]
//! ```

use bytes::{BufMut, BytesMut};

const SUFFIX_START: &str = " [Server Echo - Msg#";
const TIME_LABEL: &str = " - Time:";

/// Parts of a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoParts<'a> {
    /// The text the client originally sent.
    pub original: &'a str,
    /// Per-connection message counter, starting at 1.
    pub count: u64,
    /// Server wall clock in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Build the text of the `n`th client message.
pub fn client_message(n: usize, client_id: &str) -> String {
    format!("Message #{n} from {client_id} client")
}

/// Build the response to one read.
///
/// Invalid UTF-8 in `received` is replaced rather than rejected.
pub fn echo_response(received: &[u8], count: u64, timestamp_ms: i64) -> BytesMut {
    let text = String::from_utf8_lossy(received);
    let suffix = format!("{SUFFIX_START}{count}{TIME_LABEL}{timestamp_ms}]");

    let mut response = BytesMut::with_capacity(text.len() + suffix.len());
    response.put_slice(text.as_bytes());
    response.put_slice(suffix.as_bytes());
    response
}

/// Split a response back into the original text and the server metadata.
///
/// Returns `None` if the response does not end with an echo suffix.
pub fn parse_echo(response: &str) -> Option<EchoParts<'_>> {
    let body = response.strip_suffix(']')?;
    let start = body.rfind(SUFFIX_START)?;
    let (original, meta) = body.split_at(start);
    let meta = &meta[SUFFIX_START.len()..];

    let (count, timestamp) = meta.split_once(TIME_LABEL)?;

    Some(EchoParts {
        original,
        count: count.parse().ok()?,
        timestamp_ms: timestamp.parse().ok()?,
    })
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
