use bytes::{Bytes, BytesMut};
use crate::types::FRAME_SIZE;
/// Reassembles arbitrarily sized chunks into `FRAME_SIZE` blocks.
///
/// The stream is assumed to start on a frame boundary; there is no marker to
/// resynchronise on if it does not.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    carry: BytesMut,
}
impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            carry: BytesMut::with_capacity(FRAME_SIZE * 4),
        }
    }
    /// Append `chunk` and yield every complete frame now available, in order.
    ///
    /// Frames not pulled from the iterator stay buffered and come out first
    /// on the next call.
    pub fn feed<'a>(&'a mut self, chunk: &[u8]) -> impl Iterator<Item = Bytes> + 'a {
        self.carry.extend_from_slice(chunk);
        std::iter::from_fn(move || {
            if self.carry.len() >= FRAME_SIZE {
                Some(self.carry.split_to(FRAME_SIZE).freeze())
            } else {
                None
            }
        })
    }
    /// Bytes held back waiting for the rest of their frame.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
    /// Remove whatever is buffered, e.g. a partial frame at end of stream.
    pub fn take_remainder(&mut self) -> Option<Bytes> {
        if self.carry.is_empty() {
            None
        } else {
            Some(self.carry.split().freeze())
        }
    }
}
