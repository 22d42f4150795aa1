//! HTTP API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GestureError;
use crate::manipulation::{Corner, GestureFrame, GestureOutcome};
use crate::overlay::model::{Overlay, Position, Size};
use crate::overlay::store::OverlayMutations;
use crate::protocol::{ApiResponse, OverlayDraft, OverlayPatch, Settings, SettingsPatch};
use crate::stream::{PlaybackState, SessionSnapshot};
use crate::sync::SyncStats;
use crate::ui::server::AppState;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn fail<T>(status: StatusCode, msg: impl Into<String>) -> Reply<T> {
    (status, Json(ApiResponse::error(msg)))
}

fn not_found<T>(id: &str) -> Reply<T> {
    fail(StatusCode::NOT_FOUND, format!("Overlay not found: {}", id))
}

/// System status
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioStatus {
    pub overlay_count: usize,
    pub selected: Option<String>,
    /// `None` until the first probe completes, or when probing is disabled
    pub remote_connected: Option<bool>,
    pub sync: SyncStats,
    pub playback: PlaybackState,
    pub uptime_seconds: u64,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Reply<StudioStatus> {
    let remote_connected = state
        .health
        .as_ref()
        .filter(|h| h.probes() > 0)
        .map(|h| h.is_connected());

    ok(StudioStatus {
        overlay_count: state.store().len(),
        selected: state.sync.selected_id(),
        remote_connected,
        sync: state.sync.stats(),
        playback: state.session.lock().state(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

pub async fn list_overlays(State(state): State<Arc<AppState>>) -> Reply<Vec<Overlay>> {
    ok(state.store().list())
}

pub async fn get_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<Overlay> {
    match state.store().get(&id) {
        Some(overlay) => ok(overlay),
        None => not_found(&id),
    }
}

pub async fn create_overlay(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<OverlayDraft>,
) -> Reply<Overlay> {
    match state.sync.add(draft) {
        Ok(id) => match state.store().get(&id) {
            Some(overlay) => (StatusCode::CREATED, Json(ApiResponse::ok(overlay))),
            None => not_found(&id),
        },
        Err(e) => fail(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn update_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<OverlayPatch>,
) -> Reply<Overlay> {
    let patch = state.controller.lock().guard_patch(&id, patch);
    if state.sync.update(&id, patch).is_none() {
        return not_found(&id);
    }
    match state.store().get(&id) {
        Some(overlay) => ok(overlay),
        None => not_found(&id),
    }
}

pub async fn delete_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<()> {
    {
        let mut controller = state.controller.lock();
        if controller.is_locked(&id) {
            controller.cancel();
        }
    }
    match state.sync.remove(&id) {
        Some(_) => ok(()),
        None => not_found(&id),
    }
}

/// Replace the local collection with the remote one
pub async fn refresh_overlays(State(state): State<Arc<AppState>>) -> Reply<Vec<Overlay>> {
    state.controller.lock().cancel();
    match state.sync.refresh().await {
        Ok(_) => ok(state.store().list()),
        Err(e) => {
            tracing::warn!("Failed to load overlays; using local state: {}", e);
            fail(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

pub async fn reload_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<Overlay> {
    match state.sync.reload(&id).await {
        Ok(true) => match state.store().get(&id) {
            Some(overlay) => ok(overlay),
            None => not_found(&id),
        },
        Ok(false) => not_found(&id),
        Err(e) => fail(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

pub async fn get_handles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<Vec<Corner>> {
    if !state.store().contains(&id) {
        return not_found(&id);
    }
    let handles = state.controller.lock().handles(state.sync.as_ref(), &id);
    ok(handles.to_vec())
}

/// The image behind an overlay failed to render
pub async fn mark_resource_failed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<()> {
    if !state.store().contains(&id) {
        return not_found(&id);
    }
    state.store().mark_resource_failed(&id);
    ok(())
}

#[derive(Deserialize)]
pub struct SelectionRequest {
    pub id: Option<String>,
}

pub async fn set_selection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectionRequest>,
) -> Reply<Option<String>> {
    if state.sync.select(req.id.as_deref()) {
        ok(state.sync.selected_id())
    } else {
        not_found(req.id.as_deref().unwrap_or_default())
    }
}

/// Overlays to paint, with any in-progress drag applied
pub async fn get_render(State(state): State<Arc<AppState>>) -> Reply<Vec<Overlay>> {
    if !state.settings.read().overlays_enabled {
        return ok(Vec::new());
    }

    let mut overlays = state.store().render_order();
    let transient = state
        .controller
        .lock()
        .transient_position()
        .map(|(id, position)| (id.to_string(), position));
    if let Some((id, position)) = transient {
        if let Some(overlay) = overlays.iter_mut().find(|o| o.id == id) {
            overlay.position = position;
        }
    }
    ok(overlays)
}

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

fn gesture_status(err: &GestureError) -> StatusCode {
    match err {
        GestureError::Busy(_) | GestureError::NoActiveGesture => StatusCode::CONFLICT,
        GestureError::UnknownOverlay(_) => StatusCode::NOT_FOUND,
        GestureError::HandleUnavailable(_) => StatusCode::BAD_REQUEST,
    }
}

pub async fn set_canvas(State(state): State<Arc<AppState>>, Json(size): Json<Size>) -> Reply<Size> {
    let mut controller = state.controller.lock();
    controller.set_container(size);
    ok(controller.container())
}

#[derive(Deserialize)]
pub struct PressRequest {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Set when the press lands on a resize handle
    #[serde(default)]
    pub corner: Option<Corner>,
}

pub async fn gesture_press(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PressRequest>,
) -> Reply<()> {
    let pointer = Position::new(req.x, req.y);
    let mut controller = state.controller.lock();
    let result = match req.corner {
        Some(corner) => controller.press_handle(state.sync.as_ref(), &req.id, corner, pointer),
        None => controller.press(state.sync.as_ref(), &req.id, pointer),
    };
    match result {
        Ok(()) => ok(()),
        Err(e) => fail(gesture_status(&e), e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct PointerRequest {
    pub x: f64,
    pub y: f64,
}

pub async fn gesture_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PointerRequest>,
) -> Reply<Option<GestureFrame>> {
    let frame = state
        .controller
        .lock()
        .pointer_move(state.sync.as_ref(), Position::new(req.x, req.y));
    ok(frame)
}

pub async fn gesture_release(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PointerRequest>,
) -> Reply<GestureOutcome> {
    let result = state
        .controller
        .lock()
        .release(state.sync.as_ref(), Position::new(req.x, req.y));
    match result {
        Ok(outcome) => ok(outcome),
        Err(e) => fail(gesture_status(&e), e.to_string()),
    }
}

pub async fn gesture_cancel(State(state): State<Arc<AppState>>) -> Reply<Option<String>> {
    ok(state.controller.lock().cancel())
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

pub async fn get_stream(State(state): State<Arc<AppState>>) -> Reply<SessionSnapshot> {
    ok(state.session.lock().snapshot())
}

#[derive(Deserialize)]
pub struct SourceRequest {
    pub url: String,
}

pub async fn set_stream_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceRequest>,
) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    if session.set_source(&req.url) {
        if let Some(url) = session.current_url() {
            state.settings.write().stream_url = url.to_string();
        }
    }
    ok(session.snapshot())
}

pub async fn play_stream(State(state): State<Arc<AppState>>) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    match session.play() {
        Ok(()) => ok(session.snapshot()),
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

pub async fn pause_stream(State(state): State<Arc<AppState>>) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    session.pause();
    ok(session.snapshot())
}

pub async fn toggle_stream(State(state): State<Arc<AppState>>) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    match session.toggle_playback() {
        Ok(()) => ok(session.snapshot()),
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct VolumeRequest {
    pub volume: f32,
}

pub async fn set_volume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VolumeRequest>,
) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    session.set_volume(req.volume);
    ok(session.snapshot())
}

/// Set mute explicitly, or toggle when `muted` is omitted
#[derive(Deserialize, Default)]
pub struct MuteRequest {
    #[serde(default)]
    pub muted: Option<bool>,
}

pub async fn set_mute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MuteRequest>,
) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    match req.muted {
        Some(muted) => session.set_muted(muted),
        None => {
            session.toggle_mute();
        }
    }
    ok(session.snapshot())
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Move,
    Leave,
}

#[derive(Deserialize)]
pub struct StreamPointerRequest {
    pub event: PointerKind,
}

pub async fn stream_pointer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StreamPointerRequest>,
) -> Reply<SessionSnapshot> {
    let mut session = state.session.lock();
    match req.event {
        PointerKind::Move => session.pointer_move(),
        PointerKind::Leave => session.pointer_leave(),
    }
    ok(session.snapshot())
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Reply<Settings> {
    ok(state.settings.read().clone())
}

/// Apply locally first, then persist; a failed save is only logged
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Reply<Settings> {
    let settings = {
        let mut settings = state.settings.write();
        settings.apply(patch.clone());
        settings.clone()
    };

    {
        let mut session = state.session.lock();
        if patch.volume.is_some() {
            session.set_volume(settings.volume);
        }
        if patch.auto_play.is_some() {
            session.set_auto_play(settings.auto_play);
        }
        if patch.stream_url.is_some() {
            session.set_source(&settings.stream_url);
        }
    }

    if let Err(e) = state.sync.save_settings(&settings.echo(&patch)).await {
        tracing::warn!("Failed to save settings: {}", e);
    }
    ok(settings)
}
