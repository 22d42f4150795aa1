//! Overlay Studio
//!
//! Serves the overlay editor control API, mirrors overlays to the remote
//! store, and drives a headless stream session.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlay_studio::{
    config::AppConfig,
    manipulation::ManipulationController,
    overlay::{OverlayStore, Size},
    protocol::Settings,
    stream::{HeadlessElement, ManifestProbeFactory, StreamSession},
    sync::{HealthMonitor, HttpRemote, SyncEngine},
    ui::{AppState, WebServer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Overlay Studio");

    let config = AppConfig::load()?;
    if AppConfig::path().is_some_and(|path| !path.exists()) {
        match AppConfig::default().save() {
            Ok(path) => tracing::info!("Wrote default config to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write default config: {}", e),
        }
    }
    tracing::info!("Remote API: {}", config.remote.base_url);

    // Remote + store
    let remote = Arc::new(HttpRemote::new(&config.remote)?);
    let store = Arc::new(OverlayStore::new());
    let sync = Arc::new(SyncEngine::new(store.clone(), remote.clone()));

    match sync.refresh().await {
        Ok(count) => tracing::info!("Loaded {} overlays", count),
        Err(e) => tracing::warn!("Failed to load overlays; using local state: {}", e),
    }

    let mut settings = match sync.fetch_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings; using defaults: {}", e);
            Settings {
                volume: config.stream.volume,
                auto_play: config.stream.auto_play,
                ..Settings::default()
            }
        }
    };

    // Stream session
    let factory = Arc::new(ManifestProbeFactory::new(Duration::from_secs(
        config.remote.request_timeout_secs,
    ))?);
    let mut session = StreamSession::new(factory, &config.stream);
    let mut engine_events = session
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("engine event stream already taken"))?;
    session.mount_element(Box::new(HeadlessElement::new()));
    session.apply_settings(&settings);
    if session.current_url().is_none() {
        session.set_source(&config.stream.default_url);
    }
    settings.stream_url = session.current_url().unwrap_or_default().to_string();
    let session = Arc::new(Mutex::new(session));

    // Connectivity probe
    let health = HealthMonitor::start(
        remote,
        Duration::from_secs(config.remote.health_interval_secs),
    );

    // Control API
    let controller =
        ManipulationController::new(Size::new(config.canvas.width, config.canvas.height));
    let state = Arc::new(AppState::new(
        sync.clone(),
        controller,
        session.clone(),
        settings,
        Some(health),
    ));
    let web_server = WebServer::new(config.ui.clone(), state);
    let _web_handle = web_server.start_background();

    tracing::info!(
        "Control API available at http://{}:{}",
        config.ui.bind_address,
        config.ui.http_port
    );

    // Main loop: feed engine callbacks into the session until shutdown
    loop {
        tokio::select! {
            Some((id, event)) = engine_events.recv() => {
                session.lock().handle_engine_event(id, event);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    session.lock().teardown();
    sync.flush().await;

    Ok(())
}
