//! Control API handlers driven directly with in-memory fakes

mod common;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parking_lot::Mutex;
use std::sync::Arc;

use common::{Call, MediaLog, MockRemote, RecordingElement, RecordingFactory};
use overlay_studio::config::StreamConfig;
use overlay_studio::manipulation::ManipulationController;
use overlay_studio::overlay::{OverlayStore, Size};
use overlay_studio::protocol::{Settings, SettingsPatch};
use overlay_studio::stream::{EngineEvent, PlaybackState, StreamSession};
use overlay_studio::sync::SyncEngine;
use overlay_studio::ui::handlers;
use overlay_studio::ui::AppState;

const STREAM: &str = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";

fn app(remote: &Arc<MockRemote>, log: &Arc<MediaLog>) -> Arc<AppState> {
    let sync = Arc::new(SyncEngine::new(Arc::new(OverlayStore::new()), remote.clone()));
    let mut session = StreamSession::new(RecordingFactory::new(log.clone()), &StreamConfig::default());
    session.mount_element(RecordingElement::new(log.clone()));

    Arc::new(AppState::new(
        sync,
        ManipulationController::new(Size::new(1280.0, 720.0)),
        Arc::new(Mutex::new(session)),
        Settings::default(),
        None,
    ))
}

#[tokio::test]
async fn test_update_settings_saves_normalized_values() {
    let remote = MockRemote::new();
    let log = MediaLog::new();
    let state = app(&remote, &log);

    let (status, Json(reply)) = handlers::update_settings(
        State(state.clone()),
        Json(SettingsPatch {
            volume: Some(3.5),
            ..SettingsPatch::default()
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply.data.map(|s| s.volume), Some(1.0));
    assert_eq!(state.session.lock().volume(), 1.0);
    assert_eq!(
        remote.calls(),
        vec![Call::UpdateSettings(SettingsPatch {
            volume: Some(1.0),
            ..SettingsPatch::default()
        })]
    );
}

#[tokio::test]
async fn test_update_settings_forwards_auto_play() {
    let remote = MockRemote::new();
    let log = MediaLog::new();
    let state = app(&remote, &log);

    handlers::update_settings(
        State(state.clone()),
        Json(SettingsPatch {
            stream_url: Some(STREAM.to_string()),
            auto_play: Some(true),
            ..SettingsPatch::default()
        }),
    )
    .await;

    let mut session = state.session.lock();
    assert_eq!(session.state(), PlaybackState::Loading);
    let id = session.attachment_id().unwrap();
    session.handle_engine_event(id, EngineEvent::ManifestParsed);
    assert_eq!(session.state(), PlaybackState::Playing);
    assert!(state.settings.read().auto_play);
}
