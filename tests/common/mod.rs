//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use overlay_studio::error::{PlaybackError, SyncError};
use overlay_studio::overlay::Overlay;
use overlay_studio::protocol::{OverlayPatch, Settings, SettingsPatch};
use overlay_studio::stream::{
    AttachmentId, EngineEventSender, EngineFactory, MediaElement, MediaEngine,
};
use overlay_studio::sync::RemoteApi;

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// Request seen by [`MockRemote`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Get(String),
    /// Id the client sent with the create
    Create(String),
    Update(String, OverlayPatch),
    Delete(String),
    GetSettings,
    UpdateSettings(SettingsPatch),
    Health,
}

/// In-memory remote authority with switchable failures
#[derive(Default)]
pub struct MockRemote {
    pub overlays: Mutex<Vec<Overlay>>,
    pub settings: Mutex<Settings>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    pub fail_list: AtomicBool,
    pub fail_creates: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn updates(&self) -> Vec<(String, OverlayPatch)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(id, patch) => Some((id, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn seed(&self, overlay: Overlay) {
        self.overlays.lock().push(overlay);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check(flag: &AtomicBool) -> Result<(), SyncError> {
        if flag.load(Ordering::SeqCst) {
            Err(SyncError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn list_overlays(&self) -> Result<Vec<Overlay>, SyncError> {
        self.record(Call::List);
        Self::check(&self.fail_list)?;
        Ok(self.overlays.lock().clone())
    }

    async fn get_overlay(&self, id: &str) -> Result<Overlay, SyncError> {
        self.record(Call::Get(id.to_string()));
        self.overlays
            .lock()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| SyncError::Rejected("Overlay not found".to_string()))
    }

    async fn create_overlay(&self, overlay: &Overlay) -> Result<Overlay, SyncError> {
        self.record(Call::Create(overlay.id.clone()));
        Self::check(&self.fail_creates)?;
        let mut created = overlay.clone();
        created.id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.overlays.lock().push(created.clone());
        Ok(created)
    }

    async fn update_overlay(&self, id: &str, patch: &OverlayPatch) -> Result<Overlay, SyncError> {
        self.record(Call::Update(id.to_string(), patch.clone()));
        Self::check(&self.fail_updates)?;
        let mut overlays = self.overlays.lock();
        let overlay = overlays
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| SyncError::Rejected("Overlay not found".to_string()))?;
        if let Some(content) = &patch.content {
            overlay.content = content.clone();
        }
        if let Some(position) = patch.position {
            overlay.position = position;
        }
        if let Some(size) = patch.size {
            overlay.size = size;
        }
        Ok(overlay.clone())
    }

    async fn delete_overlay(&self, id: &str) -> Result<(), SyncError> {
        self.record(Call::Delete(id.to_string()));
        Self::check(&self.fail_deletes)?;
        self.overlays.lock().retain(|o| o.id != id);
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings, SyncError> {
        self.record(Call::GetSettings);
        Ok(self.settings.lock().clone())
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, SyncError> {
        self.record(Call::UpdateSettings(patch.clone()));
        let mut settings = self.settings.lock();
        settings.apply(patch.clone());
        Ok(settings.clone())
    }

    async fn health(&self) -> Result<(), SyncError> {
        self.record(Call::Health);
        Ok(())
    }
}

/// Remote-shaped overlay record
pub fn remote_overlay(id: &str, content: &str) -> Overlay {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "type": "text",
        "content": content,
        "position": {"x": 10, "y": 10},
        "size": {"width": 200, "height": 80},
        "style": {},
        "visible": true,
        "zIndex": 1,
        "createdAt": "2024-05-01T12:00:00"
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Ordered record of media calls plus live-engine accounting
#[derive(Default)]
pub struct MediaLog {
    entries: Mutex<Vec<String>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
    pub refuse_play: AtomicBool,
}

impl MediaLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Engine lifecycle entries only
    pub fn engine_entries(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with("attach") || e.starts_with("destroy"))
            .collect()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }
}

pub struct RecordingFactory {
    log: Arc<MediaLog>,
    adaptive: bool,
}

impl RecordingFactory {
    pub fn new(log: Arc<MediaLog>) -> Arc<Self> {
        Arc::new(Self { log, adaptive: true })
    }

    /// Factory for a platform without an adaptive engine
    pub fn native_only(log: Arc<MediaLog>) -> Arc<Self> {
        Arc::new(Self {
            log,
            adaptive: false,
        })
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&self, id: AttachmentId, _events: EngineEventSender) -> Option<Box<dyn MediaEngine>> {
        if !self.adaptive {
            return None;
        }
        Some(Box::new(RecordingEngine {
            id,
            log: self.log.clone(),
            loaded: false,
        }))
    }
}

pub struct RecordingEngine {
    id: AttachmentId,
    log: Arc<MediaLog>,
    loaded: bool,
}

impl MediaEngine for RecordingEngine {
    fn load(&mut self, url: &str, _element: &mut dyn MediaElement) -> Result<(), PlaybackError> {
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live.fetch_max(live, Ordering::SeqCst);
        self.loaded = true;
        self.log.push(format!("attach {} {}", self.id, url));
        Ok(())
    }

    fn destroy(&mut self) {
        if self.loaded {
            self.log.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.log.push(format!("destroy {}", self.id));
    }
}

pub struct RecordingElement {
    log: Arc<MediaLog>,
}

impl RecordingElement {
    pub fn new(log: Arc<MediaLog>) -> Box<Self> {
        Box::new(Self { log })
    }
}

impl MediaElement for RecordingElement {
    fn set_source(&mut self, url: &str) {
        self.log.push(format!("src {}", url));
    }

    fn clear_source(&mut self) {
        self.log.push("clear".to_string());
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.log.refuse_play.load(Ordering::SeqCst) {
            return Err(PlaybackError::PlayRejected("not allowed".to_string()));
        }
        self.log.push("play".to_string());
        Ok(())
    }

    fn pause(&mut self) {
        self.log.push("pause".to_string());
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.push(format!("volume {}", volume));
    }
}
