use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::reader::ReadLimits;
use crate::http::response::StatusCode;
use crate::static_files::StaticFiles;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Stops a running [`Listener`] from accepting new connections.
///
/// Cloneable and safe to use from any task, including a signal handler,
/// while the accept loop is blocked. In-flight connections are not
/// cancelled.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// How many connections may be handled at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// One task per accepted connection, no limit
    Unbounded,
    /// Wait for a free slot before accepting the next connection
    Bounded(usize),
}

impl AdmissionPolicy {
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) if n > 0 => AdmissionPolicy::Bounded(n),
            _ => AdmissionPolicy::Unbounded,
        }
    }
}

pub struct Listener {
    listener: TcpListener,
    files: Arc<StaticFiles>,
    limits: ReadLimits,
    policy: AdmissionPolicy,
    shutdown: ShutdownHandle,
}

impl Listener {
    /// Binds the configured address. Failure here is fatal to startup.
    pub async fn bind(cfg: &Config, shutdown: ShutdownHandle) -> anyhow::Result<Self> {
        let addr = cfg.server.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        info!(
            addr = %listener.local_addr()?,
            root = %cfg.static_files.document_root.display(),
            "Listening"
        );

        Ok(Self {
            listener,
            files: Arc::new(StaticFiles::from_config(&cfg.static_files)),
            limits: ReadLimits {
                timeout: cfg.server.read_timeout(),
                max_bytes: cfg.server.max_request_bytes,
            },
            policy: AdmissionPolicy::from_limit(cfg.server.max_connections),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until stopped, then waits for in-flight
    /// connections to finish.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut stop = self.shutdown.subscribe();
        let limiter = match self.policy {
            AdmissionPolicy::Bounded(n) => Some(Arc::new(Semaphore::new(n))),
            AdmissionPolicy::Unbounded => None,
        };
        let mut tasks = JoinSet::new();

        loop {
            while let Some(res) = tasks.try_join_next() {
                log_task_result(res);
            }

            let permit = match &limiter {
                Some(sem) => tokio::select! {
                    biased;
                    _ = stopped(&mut stop) => break,
                    permit = sem.clone().acquire_owned() => Some(permit?),
                },
                None => None,
            };

            let accepted = tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                res = self.listener.accept() => res,
            };

            match accepted {
                Ok((socket, peer)) => {
                    info!("Accepted connection from {}", peer);

                    let conn = Connection::new(socket, peer.to_string(), self.files.clone(), self.limits);
                    tasks.spawn(async move {
                        let _permit = permit;
                        conn.run().await
                    });
                }
                Err(_) if self.shutdown.is_stopped() => break,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::select! {
                        biased;
                        _ = stopped(&mut stop) => break,
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                    }
                }
            }
        }

        drop(self.listener);
        info!(in_flight = tasks.len(), "Stopped accepting connections");

        while let Some(res) = tasks.join_next().await {
            log_task_result(res);
        }

        Ok(())
    }
}

/// Logs a connection task that panicked or was cancelled. Returns whether the
/// task finished normally.
fn log_task_result(res: Result<Option<StatusCode>, JoinError>) -> bool {
    match res {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Connection task failed");
            false
        }
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Binds using `cfg` and serves until `shutdown` is stopped.
pub async fn run(cfg: &Config, shutdown: ShutdownHandle) -> anyhow::Result<()> {
    Listener::bind(cfg, shutdown).await?.run().await
}
