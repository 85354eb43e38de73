use std::collections::VecDeque;
use crate::drivers::codec::{ChannelId, Sample};
use crate::drivers::ScopeError;
use crate::types::{CHANNEL_COUNT, WINDOW_CAPACITY};
/// Fixed-capacity FIFO history for one channel, oldest value first.
#[derive(Clone, Debug)]
pub struct SlidingWindowBuffer {
    values: VecDeque<u32>,
    capacity: usize,
}
impl SlidingWindowBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, ScopeError> {
        if capacity == 0 {
            return Err(ScopeError::InvalidCapacity);
        }
        Ok(Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        })
    }
    pub fn push(&mut self, value: u32) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }
    /// Exactly `capacity` slots; slots past the current length are `None`.
    pub fn snapshot(&self) -> Vec<Option<u32>> {
        (0..self.capacity)
            .map(|i| self.values.get(i).copied())
            .collect()
    }
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }
    pub fn latest(&self) -> Option<u32> {
        self.values.back().copied()
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
impl Default for SlidingWindowBuffer {
    fn default() -> Self {
        Self {
            values: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
            capacity: WINDOW_CAPACITY,
        }
    }
}
/// Immutable copy of every channel window, safe to hand to other threads.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowsSnapshot {
    pub capacity: usize,
    pub channels: [Vec<Option<u32>>; CHANNEL_COUNT], // channel -> slots
}
impl WindowsSnapshot {
    pub fn channel(&self, channel: ChannelId) -> &[Option<u32>] {
        &self.channels[channel.index()]
    }
}
/// One window per channel, owned by the read loop that fills them.
#[derive(Clone, Debug, Default)]
pub struct ChannelWindows {
    per_channel: [SlidingWindowBuffer; CHANNEL_COUNT],
}
impl ChannelWindows {
    pub fn with_capacity(capacity: usize) -> Result<Self, ScopeError> {
        Ok(Self {
            per_channel: [
                SlidingWindowBuffer::with_capacity(capacity)?,
                SlidingWindowBuffer::with_capacity(capacity)?,
                SlidingWindowBuffer::with_capacity(capacity)?,
                SlidingWindowBuffer::with_capacity(capacity)?,
            ],
        })
    }
    pub fn push_sample(&mut self, sample: &Sample) {
        for (window, value) in self.per_channel.iter_mut().zip(sample.channels()) {
            window.push(value);
        }
    }
    pub fn window(&self, channel: ChannelId) -> &SlidingWindowBuffer {
        &self.per_channel[channel.index()]
    }
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &SlidingWindowBuffer)> + '_ {
        ChannelId::ALL.into_iter().zip(self.per_channel.iter())
    }
    pub fn capacity(&self) -> usize {
        self.per_channel[0].capacity()
    }
    pub fn snapshot(&self) -> WindowsSnapshot {
        WindowsSnapshot {
            capacity: self.capacity(),
            channels: [
                self.per_channel[0].snapshot(),
                self.per_channel[1].snapshot(),
                self.per_channel[2].snapshot(),
                self.per_channel[3].snapshot(),
            ],
        }
    }
}
