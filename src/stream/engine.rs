//! Media engine seams
//!
//! A [`MediaEngine`] turns a manifest into decoded media on a
//! [`MediaElement`]. Engines are created per source by an [`EngineFactory`]
//! and owned through an [`EngineAttachment`], which destroys the engine when
//! it goes out of scope. Holding at most one attachment therefore means at
//! most one live engine.

use std::fmt;
use tokio::sync::mpsc;

use crate::error::PlaybackError;

/// Generation number of an engine attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous engine callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Manifest loaded; playback can begin
    ManifestParsed,
    Error { fatal: bool, detail: String },
}

/// Callbacks raised by the media element itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    Played,
    Paused,
    Error,
}

/// Where engines deliver their events, tagged with the attachment they belong to
pub type EngineEventSender = mpsc::UnboundedSender<(AttachmentId, EngineEvent)>;
pub type EngineEventReceiver = mpsc::UnboundedReceiver<(AttachmentId, EngineEvent)>;

/// The video surface media is rendered into
pub trait MediaElement: Send {
    /// Point the element at a URL for native playback
    fn set_source(&mut self, url: &str);

    fn clear_source(&mut self);

    /// Start playback; may be refused
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn set_volume(&mut self, volume: f32);
}

/// Adaptive-streaming engine bound to one source
pub trait MediaEngine: Send {
    /// Begin loading `url` and attach to `element`
    fn load(&mut self, url: &str, element: &mut dyn MediaElement) -> Result<(), PlaybackError>;

    /// Release decoder resources; called exactly once
    fn destroy(&mut self);
}

/// Creates engines for adaptive sources
pub trait EngineFactory: Send + Sync {
    /// `None` when adaptive playback is unsupported and the element should
    /// play the URL natively
    fn create(&self, id: AttachmentId, events: EngineEventSender) -> Option<Box<dyn MediaEngine>>;
}

/// Scoped ownership of a live engine
pub struct EngineAttachment {
    id: AttachmentId,
    engine: Box<dyn MediaEngine>,
}

impl EngineAttachment {
    pub fn new(id: AttachmentId, engine: Box<dyn MediaEngine>) -> Self {
        Self { id, engine }
    }

    pub fn id(&self) -> AttachmentId {
        self.id
    }

    pub fn load(&mut self, url: &str, element: &mut dyn MediaElement) -> Result<(), PlaybackError> {
        self.engine.load(url, element)
    }
}

impl Drop for EngineAttachment {
    fn drop(&mut self) {
        tracing::debug!("Destroying media engine {}", self.id);
        self.engine.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEngine(Arc<AtomicUsize>);

    impl MediaEngine for CountingEngine {
        fn load(&mut self, _url: &str, _element: &mut dyn MediaElement) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn destroy(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_attachment_destroys_on_drop() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let attachment =
            EngineAttachment::new(AttachmentId(1), Box::new(CountingEngine(destroyed.clone())));
        assert_eq!(attachment.id(), AttachmentId(1));
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        drop(attachment);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
