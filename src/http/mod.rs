//! HTTP protocol implementation.
//!
//! This module implements the reduced HTTP/1.1 subset the server speaks: one
//! GET per connection, no request bodies, `Connection: close` on every
//! response.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection state machine driving one request to close
//! - **`reader`**: Accumulates the request head under a deadline and size limit
//! - **`parser`**: Splits the request head into method, target and version
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: Extension whitelist and MIME type lookup
//!
//! # Connection State Machine
//!
//! ```text
//!   ReadingHeaders ─► Parsing ─► ValidatingMethod ─► ResolvingPath
//!                        │              │                  │
//!                        │ 400          │ 405              │ 400
//!                        ▼              ▼                  ▼
//!                   ┌──────────────────────────────────────────┐
//!                   │             ErrorResponding              │
//!                   └──────────────────────────────────────────┘
//!                        ▲              ▲                  ▲
//!                        │ 403          │ 404              │ 500
//!   CheckingExtension ───┘  CheckingExistence ──┘  Serving ─┘
//!
//!   Serving (200) ─► Closed        ErrorResponding ─► Closed
//! ```
//!
//! Every path ends in `Closed`, where the stream is shut down once.
//!
//! # Example
//!
//! ```ignore
//! use staticd::http::connection::Connection;
//! use staticd::http::reader::ReadLimits;
//!
//! let (socket, peer) = listener.accept().await?;
//! let conn = Connection::new(socket, peer.to_string(), files.clone(), ReadLimits::default());
//! tokio::spawn(conn.run());
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
