//! # Overlay Studio
//!
//! Livestream overlay editor core: text and image overlays positioned over a
//! streaming video surface, kept in sync with a remote store.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                              OPERATOR INPUT                              │
//! │   pointer press / move / release          add / edit / delete / refresh  │
//! └──────────────┬───────────────────────────────────────────┬───────────────┘
//!                │                                           │
//!                ▼                                           │
//! ┌──────────────────────────────┐                           │
//! │ ManipulationController       │                           │
//! │ (manipulation)               │                           │
//! │  select │ drag │ resize      │                           │
//! │         ▼                    │                           │
//! │  GeometryConstraints         │                           │
//! │  (overlay::geometry)         │                           │
//! └──────────────┬───────────────┘                           │
//!                │  OverlayMutations                         │
//!                ▼                                           ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ SyncEngine (sync::engine)                                                │
//! │   1. apply to OverlayStore (overlay::store)  ──► StoreEvent broadcast    │
//! │   2. spawn remote call (fire-and-forget)                                 │
//! └──────────────────────────────────────┬───────────────────────────────────┘
//!                                        │ RemoteApi (sync::remote)
//!                                        ▼
//!                         ┌──────────────────────────────┐
//!                         │  Remote CRUD authority       │
//!                         │  /overlays /settings /health │
//!                         └──────────────────────────────┘
//!
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ StreamSession (stream::session)                                          │
//! │   idle ─► loading ─► playing ⇄ paused                                    │
//! │              │            └──────┬─────► error                           │
//! │              └───────────────────┘                                       │
//! │   EngineAttachment: destroy-before-replace, released on drop             │
//! │   ControlsTimer: auto-hide while playing                                 │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod manipulation;
pub mod overlay;
pub mod protocol;
pub mod stream;
pub mod sync;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Overlay width bounds in pixels
    pub const MIN_WIDTH: f64 = 50.0;
    pub const MAX_WIDTH: f64 = 800.0;

    /// Overlay height bounds in pixels
    pub const MIN_HEIGHT: f64 = 30.0;
    pub const MAX_HEIGHT: f64 = 600.0;

    /// Font size bounds
    pub const MIN_FONT_SIZE: f64 = 10.0;
    pub const MAX_FONT_SIZE: f64 = 120.0;

    /// Prefix marking ids generated locally rather than issued by the remote
    pub const LOCAL_ID_PREFIX: &str = "local-";

    /// Default remote API base URL
    pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

    /// Default control API port
    pub const DEFAULT_HTTP_PORT: u16 = 8090;

    /// Pointer inactivity before controls hide while playing
    pub const CONTROLS_HIDE_MS: u64 = 3000;

    /// Connectivity probe interval
    pub const HEALTH_INTERVAL_SECS: u64 = 30;

    /// Default playback volume
    pub const DEFAULT_VOLUME: f32 = 0.8;

    /// Default container size when none is reported
    pub const DEFAULT_CANVAS_WIDTH: f64 = 1280.0;
    pub const DEFAULT_CANVAS_HEIGHT: f64 = 720.0;

    /// Capacity of the store event broadcast channel
    pub const STORE_EVENT_CAPACITY: usize = 256;
}
