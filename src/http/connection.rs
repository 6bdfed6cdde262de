use std::io::ErrorKind;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::parser::parse_request_head;
use crate::http::reader::{RawRequest, ReadLimits, read_request_head};
use crate::http::request::{Method, Request};
use crate::http::response::StatusCode;
use crate::http::writer::{write_error, write_success};
use crate::static_files::{Candidate, ResolvedPath, StaticFiles};

/// Handles exactly one request on one connection, then closes it.
pub struct Connection<S> {
    stream: S,
    peer: String,
    files: Arc<StaticFiles>,
    limits: ReadLimits,
    state: ConnectionState,
}

pub enum ConnectionState {
    ReadingHeaders,
    Parsing(RawRequest),
    ValidatingMethod(Request),
    ResolvingPath(Request),
    CheckingExtension(Request, Candidate),
    CheckingExistence(Request, ResolvedPath),
    Serving(Request, ResolvedPath),
    ErrorResponding(StatusCode),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>, files: Arc<StaticFiles>, limits: ReadLimits) -> Self {
        Self {
            stream,
            peer: peer.into(),
            files,
            limits,
            state: ConnectionState::ReadingHeaders,
        }
    }

    /// Drives the connection to `Closed`.
    ///
    /// Returns the status of the response that was attempted, or `None` when
    /// the transport failed before anything could be sent. The stream is shut
    /// down exactly once, whichever path was taken.
    pub async fn run(mut self) -> Option<StatusCode> {
        let mut responded = None;

        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::ReadingHeaders => self.read().await,

                ConnectionState::Parsing(raw) => {
                    if !raw.is_complete() {
                        debug!(peer = %self.peer, outcome = ?raw.outcome, bytes = raw.len(), "Incomplete request head");
                        ConnectionState::ErrorResponding(StatusCode::BadRequest)
                    } else {
                        match parse_request_head(&raw.head_text()) {
                            Ok(request) => ConnectionState::ValidatingMethod(request),
                            Err(e) => {
                                warn!(peer = %self.peer, error = %e, "Rejected request");
                                ConnectionState::ErrorResponding(e.status())
                            }
                        }
                    }
                }

                ConnectionState::ValidatingMethod(request) => {
                    if request.method == Method::GET {
                        ConnectionState::ResolvingPath(request)
                    } else {
                        warn!(
                            peer = %self.peer,
                            method = request.method.as_str(),
                            target = %request.target,
                            user_agent = request.user_agent(),
                            "Method not allowed"
                        );
                        ConnectionState::ErrorResponding(StatusCode::MethodNotAllowed)
                    }
                }

                ConnectionState::ResolvingPath(request) => {
                    match self.files.locate(&request.target).await {
                        Ok(candidate) => ConnectionState::CheckingExtension(request, candidate),
                        Err(e) => {
                            warn!(peer = %self.peer, target = %request.target, error = %e, "Rejected path");
                            ConnectionState::ErrorResponding(e.status())
                        }
                    }
                }

                ConnectionState::CheckingExtension(request, candidate) => {
                    match self.files.check_extension(candidate) {
                        Ok(resolved) => ConnectionState::CheckingExistence(request, resolved),
                        Err(e) => {
                            warn!(peer = %self.peer, target = %request.target, error = %e, "Forbidden extension");
                            ConnectionState::ErrorResponding(e.status())
                        }
                    }
                }

                ConnectionState::CheckingExistence(request, resolved) => {
                    match self.files.check_exists(&resolved).await {
                        Ok(()) => ConnectionState::Serving(request, resolved),
                        Err(e) => {
                            debug!(peer = %self.peer, target = %request.target, error = %e, "File unavailable");
                            ConnectionState::ErrorResponding(e.status())
                        }
                    }
                }

                ConnectionState::Serving(request, resolved) => {
                    match self.files.read(&resolved).await {
                        Ok(body) => {
                            let len = body.len();
                            responded = Some(StatusCode::Ok);
                            if write_success(&mut self.stream, &request.version, &resolved.content_type, body).await {
                                info!(
                                    peer = %self.peer,
                                    path = %resolved.url_path,
                                    status = 200,
                                    bytes = len,
                                    user_agent = request.user_agent(),
                                    "Served file"
                                );
                            }
                            ConnectionState::Closed
                        }
                        Err(e) => {
                            warn!(peer = %self.peer, path = %resolved.url_path, error = %e, "Failed to read file");
                            ConnectionState::ErrorResponding(e.status())
                        }
                    }
                }

                ConnectionState::ErrorResponding(status) => {
                    responded = Some(status);
                    if write_error(&mut self.stream, status).await {
                        info!(peer = %self.peer, status = status.as_u16(), "Sent error response");
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        self.close().await;
        responded
    }

    async fn read(&mut self) -> ConnectionState {
        match read_request_head(&mut self.stream, self.limits).await {
            Ok(raw) => ConnectionState::Parsing(raw),
            Err(e) if is_disconnect(e.kind()) => {
                debug!(peer = %self.peer, error = %e, "Peer disconnected while reading");
                ConnectionState::Closed
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "I/O error while reading request");
                ConnectionState::ErrorResponding(StatusCode::InternalServerError)
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Shutdown failed");
        }
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}
