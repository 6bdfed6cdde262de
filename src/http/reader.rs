//! Request head accumulation
//!
//! Reads from the client until the blank line ending the header block shows
//! up, the peer closes, the deadline passes, or the size limit is hit. The
//! caller decides what an incomplete head means; the reader only reports why
//! it stopped.

use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

/// Marks the end of the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Default deadline for receiving a complete request head.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on buffered request-head bytes.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 1024;

/// Why accumulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The header terminator was received
    Complete,
    /// The peer closed its side (zero-byte read)
    Closed,
    /// The deadline elapsed first
    TimedOut,
    /// The size limit was reached without a terminator
    TooLarge,
}

/// Bytes received for one request head.
#[derive(Debug)]
pub struct RawRequest {
    buffer: BytesMut,
    head_len: Option<usize>,
    pub outcome: ReadOutcome,
}

impl RawRequest {
    pub fn is_complete(&self) -> bool {
        self.outcome == ReadOutcome::Complete
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes received, including anything after the terminator.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// The header block up to and including the terminator, or everything
    /// received when the terminator never arrived.
    pub fn head_bytes(&self) -> &[u8] {
        match self.head_len {
            Some(len) => &self.buffer[..len],
            None => &self.buffer[..],
        }
    }

    /// The header block as text; invalid UTF-8 is replaced.
    pub fn head_text(&self) -> String {
        String::from_utf8_lossy(self.head_bytes()).into_owned()
    }
}

/// Limits applied while reading a request head.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_READ_TIMEOUT,
            max_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Accumulates a request head from `stream`.
///
/// The timeout is one deadline for the whole head, not per read, so a client
/// trickling bytes cannot hold the connection open past it. I/O errors other
/// than the timeout are returned to the caller.
pub async fn read_request_head<R>(stream: &mut R, limits: ReadLimits) -> std::io::Result<RawRequest>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + limits.timeout;
    let mut buffer = BytesMut::with_capacity(READ_CHUNK * 4);
    let mut temp = [0u8; READ_CHUNK];

    let outcome = loop {
        if let Some(end) = find_headers_end(&buffer) {
            let head_len = end + HEADER_TERMINATOR.len();
            return Ok(RawRequest {
                buffer,
                head_len: Some(head_len),
                outcome: ReadOutcome::Complete,
            });
        }

        if buffer.len() >= limits.max_bytes {
            break ReadOutcome::TooLarge;
        }

        let want = READ_CHUNK.min(limits.max_bytes - buffer.len());
        let n = match timeout_at(deadline, stream.read(&mut temp[..want])).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Ok(Err(e)) => return Err(e),
            Err(_) => break ReadOutcome::TimedOut,
        };

        if n == 0 {
            break ReadOutcome::Closed;
        }

        buffer.extend_from_slice(&temp[..n]);
    };

    Ok(RawRequest {
        buffer,
        head_len: None,
        outcome,
    })
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}
