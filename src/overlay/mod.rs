//! Overlay state model
//!
//! Entities, the pure geometry constraints that keep them valid, and the
//! in-memory store that owns them.

pub mod geometry;
pub mod model;
pub mod store;

pub use model::{Overlay, OverlayKind, OverlayStyle, Position, Size};
pub use store::{OverlayMutations, OverlayStore, StoreEvent};
