use staticd::config::Config;
use staticd::server::{self, ShutdownHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let shutdown = ShutdownHandle::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal.stop();
        }
    });

    server::run(&cfg, shutdown).await
}
