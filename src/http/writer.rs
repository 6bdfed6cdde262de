use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::http::response::{Response, StatusCode};

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}

/// Writes a 200 response echoing `version`. Returns whether it was fully sent.
///
/// Failures are logged and swallowed; the peer may already be gone.
pub async fn write_success<W>(stream: &mut W, version: &str, content_type: &str, body: Vec<u8>) -> bool
where
    W: AsyncWrite + Unpin,
{
    let response = Response::success(version, content_type, body);
    send(stream, &response).await
}

/// Writes an HTTP/1.1 error response. Returns whether it was fully sent.
///
/// Failures are logged and swallowed; sending an error must never fail the
/// connection task.
pub async fn write_error<W>(stream: &mut W, status: StatusCode) -> bool
where
    W: AsyncWrite + Unpin,
{
    let response = Response::error(status);
    send(stream, &response).await
}

async fn send<W>(stream: &mut W, response: &Response) -> bool
where
    W: AsyncWrite + Unpin,
{
    let mut writer = ResponseWriter::new(response);
    match writer.write_to_stream(stream).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                status = response.status.as_u16(),
                unsent = writer.remaining(),
                error = %e,
                "Failed to write response"
            );
            false
        }
    }
}
