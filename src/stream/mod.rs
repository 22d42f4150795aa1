//! Stream playback: source classification, engine seams, session state machine

pub mod controls;
pub mod engine;
pub mod headless;
pub mod session;
pub mod source;

pub use controls::ControlsTimer;
pub use engine::{
    AttachmentId, ElementEvent, EngineAttachment, EngineEvent, EngineEventReceiver,
    EngineEventSender, EngineFactory, MediaElement, MediaEngine,
};
pub use headless::{HeadlessElement, ManifestProbeFactory};
pub use session::{PlaybackState, SessionSnapshot, StreamSession};
pub use source::SourceKind;
