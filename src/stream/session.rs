//! Stream playback session
//!
//! ```text
//!   idle ──set_source──► loading ──manifest parsed──► paused ⇄ playing
//!                           │                            │        │
//!                           └─────── fatal error ───────►└► error ◄┘
//! ```
//!
//! Any state goes back to `loading` when a new URL is supplied. `error` is
//! left only that way.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::StreamConfig;
use crate::error::PlaybackError;
use crate::protocol::Settings;
use crate::stream::controls::ControlsTimer;
use crate::stream::engine::{
    AttachmentId, ElementEvent, EngineAttachment, EngineEvent, EngineEventReceiver,
    EngineEventSender, EngineFactory, MediaElement,
};
use crate::stream::source::{normalize_url, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_url: Option<String>,
    pub source_kind: Option<SourceKind>,
    pub state: PlaybackState,
    pub error: Option<String>,
    pub volume: f32,
    pub muted: bool,
    pub effective_volume: f32,
    pub controls_visible: bool,
    pub play_control_visible: bool,
    pub attachment: Option<AttachmentId>,
}

/// One media element, at most one engine, and the playback state around them
pub struct StreamSession {
    factory: Arc<dyn EngineFactory>,
    element: Option<Box<dyn MediaElement>>,
    attachment: Option<EngineAttachment>,
    next_attachment: u64,

    current_url: Option<String>,
    state: PlaybackState,
    error: Option<PlaybackError>,
    /// Play as soon as the source is ready
    wants_play: bool,

    volume: f32,
    muted: bool,
    controls: ControlsTimer,

    events_tx: EngineEventSender,
    events_rx: Option<EngineEventReceiver>,
}

impl StreamSession {
    pub fn new(factory: Arc<dyn EngineFactory>, config: &StreamConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            factory,
            element: None,
            attachment: None,
            next_attachment: 0,
            current_url: None,
            state: PlaybackState::Idle,
            error: None,
            wants_play: config.auto_play,
            volume: clamp_volume(config.volume),
            muted: false,
            controls: ControlsTimer::new(Duration::from_millis(config.controls_hide_ms)),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Take the engine event stream; whoever drives the session feeds each
    /// event back through [`handle_engine_event`](Self::handle_engine_event)
    pub fn take_events(&mut self) -> Option<EngineEventReceiver> {
        self.events_rx.take()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        self.error.as_ref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Volume actually applied to the element
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn attachment_id(&self) -> Option<AttachmentId> {
        self.attachment.as_ref().map(EngineAttachment::id)
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    /// Large centre play button
    pub fn play_control_visible(&self) -> bool {
        matches!(self.state, PlaybackState::Idle | PlaybackState::Paused)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_url: self.current_url.clone(),
            source_kind: self.current_url.as_deref().map(SourceKind::classify),
            state: self.state,
            error: self.error.as_ref().map(ToString::to_string),
            volume: self.volume,
            muted: self.muted,
            effective_volume: self.effective_volume(),
            controls_visible: self.controls_visible(),
            play_control_visible: self.play_control_visible(),
            attachment: self.attachment_id(),
        }
    }

    /// Bind the video surface; a pending source starts loading on it
    pub fn mount_element(&mut self, element: Box<dyn MediaElement>) {
        self.release_engine();
        self.element = Some(element);
        self.apply_volume();
        if self.current_url.is_some() {
            self.load();
        }
    }

    /// Switch to a new source.
    ///
    /// Blank input is ignored. Resubmitting the current URL is a no-op unless
    /// the session is in `error`, where it retries.
    pub fn set_source(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_url(raw) else {
            return false;
        };
        if self.current_url.as_deref() == Some(url) && self.state != PlaybackState::Error {
            return false;
        }

        tracing::info!("Switching stream source to {}", url);
        self.current_url = Some(url.to_string());
        self.load();
        true
    }

    /// Apply persisted settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_volume(settings.volume);
        self.wants_play = settings.auto_play;
        self.set_source(&settings.stream_url);
    }

    /// Whether the next source to become ready starts playing on its own.
    /// Has no effect on a stream that is already playing.
    pub fn set_auto_play(&mut self, auto_play: bool) {
        if self.state != PlaybackState::Playing {
            self.wants_play = auto_play;
        }
    }

    fn load(&mut self) {
        // Destroy-before-replace
        self.release_engine();
        self.error = None;
        self.state = PlaybackState::Loading;
        self.controls.show();

        let Some(url) = self.current_url.clone() else {
            self.state = PlaybackState::Idle;
            return;
        };
        let Some(element) = self.element.as_mut() else {
            tracing::debug!("No media element yet; {} will load once mounted", url);
            return;
        };

        match SourceKind::classify(&url) {
            SourceKind::Adaptive => {
                self.next_attachment += 1;
                let id = AttachmentId(self.next_attachment);
                match self.factory.create(id, self.events_tx.clone()) {
                    Some(engine) => {
                        let mut attachment = EngineAttachment::new(id, engine);
                        let loaded = attachment.load(&url, element.as_mut());
                        // Kept even on failure so the guard destroys it in fail()
                        self.attachment = Some(attachment);
                        match loaded {
                            Ok(()) => tracing::debug!("Engine {} loading {}", id, url),
                            Err(e) => self.fail(e),
                        }
                    }
                    None => {
                        tracing::debug!("Adaptive engine unavailable; playing {} natively", url);
                        element.set_source(&url);
                        self.source_ready();
                    }
                }
            }
            SourceKind::Direct => {
                element.set_source(&url);
                self.source_ready();
            }
        }
    }

    fn source_ready(&mut self) {
        if self.wants_play {
            self.start_playback();
        } else {
            self.state = PlaybackState::Paused;
            self.controls.show();
        }
    }

    fn start_playback(&mut self) {
        let Some(element) = self.element.as_mut() else {
            return;
        };
        match element.play() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                self.wants_play = true;
                self.controls.arm();
            }
            Err(e) => {
                let reason = match e {
                    PlaybackError::PlayRejected(reason) => reason,
                    other => other.to_string(),
                };
                self.fail(PlaybackError::PlayRejected(reason));
            }
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        tracing::warn!("Playback failed: {}", error);
        self.release_engine();
        self.state = PlaybackState::Error;
        self.error = Some(error);
        self.wants_play = false;
        self.controls.show();
    }

    fn release_engine(&mut self) {
        // Dropping the guard destroys the engine
        self.attachment = None;
    }

    /// Feed an engine callback; events from replaced engines are ignored
    pub fn handle_engine_event(&mut self, id: AttachmentId, event: EngineEvent) -> bool {
        if self.attachment_id() != Some(id) {
            tracing::debug!("Ignoring {:?} from stale engine {}", event, id);
            return false;
        }

        match event {
            EngineEvent::ManifestParsed => {
                if self.state == PlaybackState::Loading {
                    self.source_ready();
                }
            }
            EngineEvent::Error { fatal: true, detail } => {
                self.fail(PlaybackError::Fatal(detail));
            }
            EngineEvent::Error { fatal: false, detail } => {
                tracing::debug!("Recoverable stream error on {}: {}", id, detail);
            }
        }
        true
    }

    /// Feed a media element callback
    pub fn handle_element_event(&mut self, event: ElementEvent) {
        match (event, self.state) {
            (ElementEvent::Played, PlaybackState::Paused) => {
                self.state = PlaybackState::Playing;
                self.wants_play = true;
                self.controls.arm();
            }
            (ElementEvent::Paused, PlaybackState::Playing) => {
                self.state = PlaybackState::Paused;
                self.wants_play = false;
                self.controls.show();
            }
            (ElementEvent::Error, state) if state != PlaybackState::Idle => {
                self.fail(PlaybackError::Element);
            }
            _ => {}
        }
    }

    /// Start or request playback.
    ///
    /// While loading, the request is remembered and honoured once the source
    /// is ready.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Error => Err(self
                .error
                .clone()
                .unwrap_or_else(|| PlaybackError::Fatal("stream failed".to_string()))),
            PlaybackState::Idle | PlaybackState::Loading => {
                self.wants_play = true;
                Ok(())
            }
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                if self.element.is_none() {
                    return Err(PlaybackError::NoElement);
                }
                self.start_playback();
                match &self.error {
                    Some(e) => Err(e.clone()),
                    None => Ok(()),
                }
            }
        }
    }

    pub fn pause(&mut self) {
        self.wants_play = false;
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(element) = self.element.as_mut() {
            element.pause();
        }
        self.state = PlaybackState::Paused;
        self.controls.show();
    }

    pub fn toggle_playback(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Set volume in `[0, 1]`; any audible level also unmutes
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        if self.volume > 0.0 {
            self.muted = false;
        }
        self.apply_volume();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_volume();
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    fn apply_volume(&mut self) {
        let effective = self.effective_volume();
        if let Some(element) = self.element.as_mut() {
            element.set_volume(effective);
        }
    }

    /// Pointer moved over the surface
    pub fn pointer_move(&mut self) {
        if self.state == PlaybackState::Playing {
            self.controls.arm();
        } else {
            self.controls.show();
        }
    }

    /// Pointer left the surface
    pub fn pointer_leave(&mut self) {
        if self.state == PlaybackState::Playing {
            self.controls.hide_now();
        }
    }

    /// Release the engine and timers and detach the element
    pub fn teardown(&mut self) {
        self.release_engine();
        self.controls.cancel();
        if let Some(mut element) = self.element.take() {
            element.pause();
            element.clear_source();
        }
        self.state = PlaybackState::Idle;
        self.error = None;
        self.wants_play = false;
        tracing::info!("Stream session torn down");
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        crate::constants::DEFAULT_VOLUME
    }
}
