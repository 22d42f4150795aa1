//! Remote persistence: REST client, optimistic sync engine, health probe

pub mod engine;
pub mod health;
pub mod remote;

pub use engine::{SyncEngine, SyncStats};
pub use health::HealthMonitor;
pub use remote::{HttpRemote, RemoteApi};
