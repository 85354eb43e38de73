//! Streaming decoder for a 4-channel serial telemetry link.
//!
//! Bytes from a [`drivers::ByteSource`] are reassembled into 16-byte frames,
//! decoded into [`drivers::Sample`]s and kept in a bounded per-channel history
//! that display code can autoscale against.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod types;

pub use config::{ScopeConfig, SourceConfig};
pub use engine::{spawn_session, SessionHandle};
pub use types::{ScopeMessage, StreamState};
