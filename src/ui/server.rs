//! Control API server

use axum::{
    http::Method,
    routing::{get, post, put},
    Router,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::config::UiConfig;
use crate::error::Result;
use crate::manipulation::ManipulationController;
use crate::overlay::store::OverlayStore;
use crate::protocol::Settings;
use crate::stream::StreamSession;
use crate::sync::{HealthMonitor, SyncEngine};
use crate::ui::handlers;

/// Shared state behind every handler
pub struct AppState {
    pub sync: Arc<SyncEngine>,
    pub controller: Mutex<ManipulationController>,
    pub session: Arc<Mutex<StreamSession>>,
    pub settings: RwLock<Settings>,
    pub health: Option<HealthMonitor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        sync: Arc<SyncEngine>,
        controller: ManipulationController,
        session: Arc<Mutex<StreamSession>>,
        settings: Settings,
        health: Option<HealthMonitor>,
    ) -> Self {
        Self {
            sync,
            controller: Mutex::new(controller),
            session,
            settings: RwLock::new(settings),
            health,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<OverlayStore> {
        self.sync.store()
    }
}

/// HTTP control server
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: UiConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn router(state: Arc<AppState>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers(Any);

        Router::new()
            .route("/api/status", get(handlers::get_status))
            // Overlays
            .route(
                "/api/overlays",
                get(handlers::list_overlays).post(handlers::create_overlay),
            )
            .route("/api/overlays/refresh", post(handlers::refresh_overlays))
            .route(
                "/api/overlays/:id",
                get(handlers::get_overlay)
                    .patch(handlers::update_overlay)
                    .delete(handlers::delete_overlay),
            )
            .route("/api/overlays/:id/reload", post(handlers::reload_overlay))
            .route("/api/overlays/:id/handles", get(handlers::get_handles))
            .route(
                "/api/overlays/:id/resource-failed",
                post(handlers::mark_resource_failed),
            )
            .route("/api/selection", put(handlers::set_selection))
            .route("/api/render", get(handlers::get_render))
            // Gestures
            .route("/api/canvas", put(handlers::set_canvas))
            .route("/api/gestures/press", post(handlers::gesture_press))
            .route("/api/gestures/move", post(handlers::gesture_move))
            .route("/api/gestures/release", post(handlers::gesture_release))
            .route("/api/gestures/cancel", post(handlers::gesture_cancel))
            // Stream
            .route("/api/stream", get(handlers::get_stream))
            .route("/api/stream/source", put(handlers::set_stream_source))
            .route("/api/stream/play", post(handlers::play_stream))
            .route("/api/stream/pause", post(handlers::pause_stream))
            .route("/api/stream/toggle", post(handlers::toggle_stream))
            .route("/api/stream/volume", put(handlers::set_volume))
            .route("/api/stream/mute", post(handlers::set_mute))
            .route("/api/stream/pointer", post(handlers::stream_pointer))
            // Settings
            .route(
                "/api/settings",
                get(handlers::get_settings).put(handlers::update_settings),
            )
            .layer(cors)
            .with_state(state)
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Control API listening on http://{}", addr);

        axum::serve(listener, Self::router(self.state)).await?;
        Ok(())
    }

    pub fn start_background(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                tracing::error!("Control API stopped: {}", e);
            }
        })
    }
}
