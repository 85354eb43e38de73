//! Wire codec for the fixed 16-byte telemetry frame.
//!
//! Layout: four unsigned 32-bit channel values, little-endian, at offsets
//! 0/4/8/12. There is no header, checksum or delimiter.
use serde::{Deserialize, Serialize};
use crate::drivers::error::{ScopeError, ScopeResult};
use crate::types::{BYTES_PER_CHANNEL, CHANNEL_COUNT, FRAME_SIZE};
pub type RawFrame = [u8; FRAME_SIZE];
/// Validated channel index in `0..CHANNEL_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);
impl ChannelId {
    pub const ALL: [ChannelId; CHANNEL_COUNT] =
        [ChannelId(0), ChannelId(1), ChannelId(2), ChannelId(3)];
    pub fn new(index: usize) -> ScopeResult<Self> {
        if index < CHANNEL_COUNT {
            Ok(ChannelId(index as u8))
        } else {
            Err(ScopeError::InvalidChannel(index))
        }
    }
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
impl TryFrom<usize> for ChannelId {
    type Error = ScopeError;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        ChannelId::new(value)
    }
}
/// One decoded reading across all channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    ch0: u32,
    ch1: u32,
    ch2: u32,
    ch3: u32,
}
impl Sample {
    pub fn new(ch0: u32, ch1: u32, ch2: u32, ch3: u32) -> Self {
        Self { ch0, ch1, ch2, ch3 }
    }
    pub fn from_channels(values: [u32; CHANNEL_COUNT]) -> Self {
        let [ch0, ch1, ch2, ch3] = values;
        Self { ch0, ch1, ch2, ch3 }
    }
    pub fn ch0(&self) -> u32 {
        self.ch0
    }
    pub fn ch1(&self) -> u32 {
        self.ch1
    }
    pub fn ch2(&self) -> u32 {
        self.ch2
    }
    pub fn ch3(&self) -> u32 {
        self.ch3
    }
    pub fn get(&self, channel: ChannelId) -> u32 {
        self.channels()[channel.index()]
    }
    pub fn channels(&self) -> [u32; CHANNEL_COUNT] {
        [self.ch0, self.ch1, self.ch2, self.ch3]
    }
}
/// Stateless frame codec.
pub struct PacketCodec;
impl PacketCodec {
    /// Decode a block that must be exactly `FRAME_SIZE` bytes long.
    ///
    /// Wrong lengths are reported instead of panicking; the assembler never
    /// produces them, so an error here points at the caller.
    pub fn decode(block: &[u8]) -> ScopeResult<Sample> {
        let frame: &RawFrame = match block.len() {
            FRAME_SIZE => block
                .try_into()
                .map_err(|_| ScopeError::FrameTooShort {
                    expected: FRAME_SIZE,
                    actual: block.len(),
                })?,
            n if n < FRAME_SIZE => {
                return Err(ScopeError::FrameTooShort {
                    expected: FRAME_SIZE,
                    actual: n,
                })
            }
            n => {
                return Err(ScopeError::FrameTooLong {
                    expected: FRAME_SIZE,
                    actual: n,
                })
            }
        };
        Ok(Self::decode_frame(frame))
    }
    pub fn decode_frame(frame: &RawFrame) -> Sample {
        let mut values = [0u32; CHANNEL_COUNT];
        for (value, bytes) in values
            .iter_mut()
            .zip(frame.chunks_exact(BYTES_PER_CHANNEL))
        {
            *value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Sample::from_channels(values)
    }
    pub fn encode(sample: &Sample) -> RawFrame {
        let mut frame = [0u8; FRAME_SIZE];
        for (slot, value) in frame
            .chunks_exact_mut(BYTES_PER_CHANNEL)
            .zip(sample.channels())
        {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        frame
    }
}
