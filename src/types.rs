// src/types.rs
use serde::{Deserialize, Serialize};

use crate::drivers::{DisplayRange, Sample, WindowsSnapshot};

/// Bytes in one wire frame.
pub const FRAME_SIZE: usize = CHANNEL_COUNT * BYTES_PER_CHANNEL;
pub const CHANNEL_COUNT: usize = 4;
pub const BYTES_PER_CHANNEL: usize = 4;
/// Default history length per channel.
pub const WINDOW_CAPACITY: usize = 20;
/// Upper bound of the display axis (2^32).
pub const Y_MAX: f64 = 4_294_967_296.0;
pub const AUTOSCALE_PAD_RATIO: f64 = 0.05;
pub const AUTOSCALE_MIN_PAD: f64 = 1.0;

/// Lifecycle of a single read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    /// Constructed, not yet started.
    Open,
    Reading,
    /// The source signalled end of stream.
    Closed,
    Errored,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Closed | StreamState::Errored | StreamState::Cancelled
        )
    }
}

impl Default for StreamState {
    fn default() -> Self {
        StreamState::Open
    }
}

// 后台发给显示层的消息
#[derive(Clone, Debug)]
pub enum ScopeMessage {
    Log(String),
    Status(StreamState),
    DataPacket {
        sample: Sample,
        ranges: [DisplayRange; CHANNEL_COUNT],
        snapshot: WindowsSnapshot,
    },
    Error { message: String, fatal: bool },
}
