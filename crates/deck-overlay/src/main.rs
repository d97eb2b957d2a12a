use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use deck_overlay::backend::SearchProvider;
use deck_overlay::clipboard::SystemClipboard;
use deck_overlay::embed::LogEmbedSink;
use deck_overlay::engine::Engine;
use deck_overlay::event::EngineEvent;
use deck_overlay::http::{self, HttpState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = deck_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("deck-overlay.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress
    // noisy connection-level DEBUG from HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("deck-overlay log: {}", log_path.display());

    tracing::info!("deck-overlay starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = deck_proto::config::Config::load().unwrap_or_default();

    // ── Engine event queue (HTTP + capability tasks → engine) ────────────────
    let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(1024);

    // ── Page snapshot channel (engine → HTTP inspection) ─────────────────────
    let (snapshot_tx, snapshot_rx) = watch::channel(serde_json::Value::Null);

    // ── Build engine ─────────────────────────────────────────────────────────
    let engine = Engine::new(
        &config,
        event_tx.clone(),
        snapshot_tx,
        Box::new(LogEmbedSink),
        Arc::new(SystemClipboard),
    );

    // ── HTTP server ──────────────────────────────────────────────────────────
    http::start_server(
        config.http.bind_address.clone(),
        config.http.port,
        HttpState {
            event_tx,
            snapshot_rx,
            provider: SearchProvider::new(&config.search),
        },
    );

    // ── Run engine loop ──────────────────────────────────────────────────────
    engine.run(event_rx).await;

    Ok(())
}
