use std::path::PathBuf;
use std::sync::Arc;

use pollqt::{
    Dispatcher, FileTokenStore, JsonLinesSink, LineProtocolSink, PollError, Poller, PollerConfig,
};
use pollqt_http::ReqwestTransport;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const WORKDIR_ENV: &str = "POLLQT_WORKDIR";

fn workdir() -> PathBuf {
    if let Some(dir) = std::env::var_os(WORKDIR_ENV) {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".pollqt")
}

async fn load_config(workdir: &std::path::Path) -> Result<PollerConfig, PollError> {
    let path = workdir.join("config.json");
    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|e| PollError::InvalidArg(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PollerConfig::default()),
        Err(e) => Err(PollError::InvalidArg(format!("{}: {e}", path.display()))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,pollqt=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();

    let workdir = workdir();
    let cfg = load_config(&workdir).await?;
    tracing::info!(workdir = %workdir.display(), "starting pollqt");

    let poller = Poller::builder()
        .config(cfg)
        .transport(Arc::new(ReqwestTransport::new()?))
        .token_store(Arc::new(FileTokenStore::new(workdir.join("token.json"))))
        .build()
        .await?;

    let dispatcher = Dispatcher::new()
        .with_deduplicated_sink(Arc::new(JsonLinesSink::new(workdir.join("out"))))
        .with_deduplicated_sink(Arc::new(LineProtocolSink::stdout()));

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; shutting down");
        }
        on_signal.cancel();
    });

    poller.run(&dispatcher, shutdown).await?;
    Ok(())
}
