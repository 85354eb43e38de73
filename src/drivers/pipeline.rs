use std::sync::Arc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use crate::drivers::assembler::FrameAssembler;
use crate::drivers::buffer::ChannelWindows;
use crate::drivers::codec::{PacketCodec, Sample};
use crate::drivers::error::{ScopeError, ScopeResult};
use crate::drivers::source::ByteSource;
use crate::types::StreamState;
/// Shared view of a controller's state, readable from callbacks and other tasks.
#[derive(Clone, Debug, Default)]
pub struct StateHandle(Arc<RwLock<StreamState>>);
impl StateHandle {
    pub fn get(&self) -> StreamState {
        *self.0.read()
    }
    fn set(&self, state: StreamState) {
        *self.0.write() = state;
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub chunks_read: u64,
    pub bytes_read: u64,
    pub frames_decoded: u64,
    pub decode_errors: u64,
}
/// Drives read → reassemble → decode → window → callbacks for one byte source.
///
/// A controller runs at most once; construct a new one to reconnect.
pub struct ReadLoopController {
    assembler: FrameAssembler,
    windows: ChannelWindows,
    state: StateHandle,
    stats: LoopStats,
}
impl ReadLoopController {
    pub fn new() -> Self {
        Self {
            assembler: FrameAssembler::new(),
            windows: ChannelWindows::default(),
            state: StateHandle::default(),
            stats: LoopStats::default(),
        }
    }
    pub fn with_window_capacity(capacity: usize) -> ScopeResult<Self> {
        Ok(Self {
            windows: ChannelWindows::with_capacity(capacity)?,
            ..Self::new()
        })
    }
    pub fn state(&self) -> StreamState {
        self.state.get()
    }
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }
    pub fn windows(&self) -> &ChannelWindows {
        &self.windows
    }
    pub fn stats(&self) -> LoopStats {
        self.stats
    }
    /// Run the loop until end of stream, a fatal source error or cancellation.
    ///
    /// Returns the terminal state. `on_error` gets per-frame decode failures
    /// (the loop keeps going) and at most one fatal source failure, after the
    /// state has already moved to `Errored`. Cancellation is silent.
    pub async fn start<S, F, E>(
        &mut self,
        source: &mut S,
        mut on_sample: F,
        mut on_error: E,
        cancel: CancellationToken,
    ) -> ScopeResult<StreamState>
    where
        S: ByteSource + ?Sized,
        F: FnMut(&Sample, &ChannelWindows),
        E: FnMut(&ScopeError),
    {
        let current = self.state();
        if current != StreamState::Open {
            return Err(ScopeError::AlreadyStarted { state: current });
        }
        self.transition(StreamState::Reading);
        let terminal = 'read: loop {
            if cancel.is_cancelled() {
                break StreamState::Cancelled;
            }
            // Only the token ends the loop in `Cancelled`.
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'read StreamState::Cancelled,
                chunk = source.next_chunk() => chunk,
            };
            match pulled {
                Ok(Some(chunk)) => {
                    self.stats.chunks_read += 1;
                    self.stats.bytes_read += chunk.len() as u64;
                    log::debug!(
                        "chunk of {} bytes ({} carried)",
                        chunk.len(),
                        self.assembler.pending()
                    );
                    let frames: Vec<_> = self.assembler.feed(&chunk).collect();
                    for frame in frames {
                        self.dispatch_block(&frame, &mut on_sample, &mut on_error);
                    }
                }
                Ok(None) => {
                    if let Some(tail) = self.assembler.take_remainder() {
                        log::warn!(
                            "end of stream with {} trailing bytes of a partial frame, discarded",
                            tail.len()
                        );
                    }
                    break StreamState::Closed;
                }
                Err(e) => {
                    log::error!("byte source failed: {e}");
                    self.transition(StreamState::Errored);
                    on_error(&e);
                    break StreamState::Errored;
                }
            }
        };
        if self.state() != terminal {
            self.transition(terminal);
        }
        Ok(terminal)
    }
    /// Give up before the loop ever ran, e.g. when the source could not be opened.
    pub(crate) fn fail(&mut self, error: &ScopeError) {
        log::error!("read loop failed before start: {error}");
        if !self.state().is_terminal() {
            self.transition(StreamState::Errored);
        }
    }
    fn dispatch_block<F, E>(&mut self, block: &[u8], on_sample: &mut F, on_error: &mut E)
    where
        F: FnMut(&Sample, &ChannelWindows),
        E: FnMut(&ScopeError),
    {
        match PacketCodec::decode(block) {
            Ok(sample) => {
                self.windows.push_sample(&sample);
                self.stats.frames_decoded += 1;
                on_sample(&sample, &self.windows);
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                log::warn!("dropping undecodable block: {e}");
                on_error(&e);
            }
        }
    }
    fn transition(&self, next: StreamState) {
        log::info!("read loop {:?} -> {:?}", self.state(), next);
        self.state.set(next);
    }
}
impl Default for ReadLoopController {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Debug for ReadLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadLoopController")
            .field("state", &self.state())
            .field("window_capacity", &self.windows.capacity())
            .field("pending", &self.assembler.pending())
            .field("stats", &self.stats)
            .finish()
    }
}
#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use bytes::Bytes;
    use super::*;
    use crate::drivers::codec::ChannelId;
    use crate::drivers::source::{ChannelSource, ScriptedSource};
    use crate::types::WINDOW_CAPACITY;
    fn frames(samples: &[Sample]) -> Vec<u8> {
        samples
            .iter()
            .flat_map(|s| PacketCodec::encode(s).to_vec())
            .collect()
    }
    #[tokio::test]
    async fn decodes_split_chunks_in_order() {
        let samples = [Sample::new(1, 2, 3, 4), Sample::new(5, 6, 7, 8)];
        let bytes = frames(&samples);
        let mut source = ScriptedSource::new(vec![bytes[..10].to_vec(), bytes[10..].to_vec()]);
        let mut controller = ReadLoopController::new();
        let mut seen = Vec::new();
        let mut errors = 0;
        let state = controller
            .start(
                &mut source,
                |s, _| seen.push(*s),
                |_| errors += 1,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(state, StreamState::Closed);
        assert_eq!(controller.state(), StreamState::Closed);
        assert_eq!(seen, samples.to_vec());
        assert_eq!(errors, 0);
        let stats = controller.stats();
        assert_eq!(stats.chunks_read, 2);
        assert_eq!(stats.bytes_read, 32);
        assert_eq!(stats.frames_decoded, 2);
    }
    #[tokio::test]
    async fn windows_are_updated_before_the_sample_callback() {
        let samples: Vec<Sample> = (0..25u32).map(|i| Sample::new(i, 0, 0, 0)).collect();
        let mut source = ScriptedSource::new(vec![frames(&samples)]);
        let mut controller = ReadLoopController::new();
        let mut latest = Vec::new();
        controller
            .start(
                &mut source,
                |s, windows| {
                    let ch0 = ChannelId::new(0).unwrap();
                    assert_eq!(windows.window(ch0).latest(), Some(s.ch0()));
                    latest.push(windows.window(ch0).len());
                },
                |_| {},
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(latest.last(), Some(&WINDOW_CAPACITY));
        let ch0 = ChannelId::new(0).unwrap();
        let kept: Vec<u32> = controller.windows().window(ch0).iter().collect();
        assert_eq!(kept, (5..25).collect::<Vec<u32>>());
    }
    #[tokio::test]
    async fn source_failure_is_reported_once_and_ends_errored() {
        let mut source = ScriptedSource::new(vec![frames(&[Sample::new(9, 9, 9, 9)])])
            .then_fail(io::Error::new(io::ErrorKind::ConnectionReset, "link dropped"));
        let mut controller = ReadLoopController::new();
        let handle = controller.state_handle();
        let mut fatal_states = Vec::new();
        let mut samples = 0;
        let state = controller
            .start(
                &mut source,
                |_, _| samples += 1,
                |e| fatal_states.push((e.is_fatal(), handle.get())),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(state, StreamState::Errored);
        assert_eq!(samples, 1);
        assert_eq!(fatal_states, vec![(true, StreamState::Errored)]);
    }
    struct AbortingSource;
    #[async_trait::async_trait]
    impl ByteSource for AbortingSource {
        async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>> {
            Err(ScopeError::Cancelled)
        }
    }
    #[tokio::test]
    async fn source_reporting_cancelled_without_token_ends_errored() {
        let mut controller = ReadLoopController::new();
        let handle = controller.state_handle();
        let mut reported = Vec::new();
        let token = CancellationToken::new();
        let state = controller
            .start(
                &mut AbortingSource,
                |_, _| {},
                |e| reported.push((e.is_fatal(), handle.get())),
                token.clone(),
            )
            .await
            .unwrap();
        assert!(!token.is_cancelled());
        assert_eq!(state, StreamState::Errored);
        assert_eq!(reported, vec![(true, StreamState::Errored)]);
    }
    #[test]
    fn fail_before_start_marks_errored() {
        let mut controller = ReadLoopController::new();
        controller.fail(&ScopeError::Serial("no such port".into()));
        assert_eq!(controller.state(), StreamState::Errored);
        controller.fail(&ScopeError::Serial("again".into()));
        assert_eq!(controller.state(), StreamState::Errored);
    }
    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut controller = ReadLoopController::new();
        let mut source = ScriptedSource::new(Vec::<Vec<u8>>::new());
        controller
            .start(&mut source, |_, _| {}, |_| {}, CancellationToken::new())
            .await
            .unwrap();
        let again = controller
            .start(&mut source, |_, _| {}, |_| {}, CancellationToken::new())
            .await;
        assert!(matches!(
            again,
            Err(ScopeError::AlreadyStarted {
                state: StreamState::Closed
            })
        ));
    }
    #[tokio::test]
    async fn pre_cancelled_token_reads_nothing() {
        let mut source = ScriptedSource::new(vec![frames(&[Sample::new(1, 1, 1, 1)])]);
        let mut controller = ReadLoopController::new();
        let token = CancellationToken::new();
        token.cancel();
        let mut samples = 0;
        let state = controller
            .start(&mut source, |_, _| samples += 1, |_| {}, token)
            .await
            .unwrap();
        assert_eq!(state, StreamState::Cancelled);
        assert_eq!(samples, 0);
    }
    #[tokio::test]
    async fn cancellation_interrupts_a_pending_read() {
        let (tx, mut source) = ChannelSource::new(8);
        let token = CancellationToken::new();
        let delivered = std::sync::Arc::new(AtomicUsize::new(0));
        let errors = std::sync::Arc::new(AtomicUsize::new(0));
        let loop_token = token.clone();
        let loop_delivered = delivered.clone();
        let loop_errors = errors.clone();
        let task = tokio::spawn(async move {
            let mut controller = ReadLoopController::new();
            let state = controller
                .start(
                    &mut source,
                    move |_, _| {
                        loop_delivered.fetch_add(1, Ordering::SeqCst);
                    },
                    move |_| {
                        loop_errors.fetch_add(1, Ordering::SeqCst);
                    },
                    loop_token,
                )
                .await
                .unwrap();
            (state, controller.state())
        });
        // Nothing has been sent, so the loop is parked in the pull.
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let _ = tx
            .send(Ok(Bytes::from(frames(&[Sample::new(1, 2, 3, 4)]))))
            .await;
        let (returned, observed) = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop did not observe cancellation")
            .unwrap();
        assert_eq!(returned, StreamState::Cancelled);
        assert_eq!(observed, StreamState::Cancelled);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }
    #[test]
    fn short_block_does_not_stop_later_frames() {
        let mut controller = ReadLoopController::new();
        let mut seen = Vec::new();
        let mut errors = Vec::new();
        let good = PacketCodec::encode(&Sample::new(4, 3, 2, 1));
        {
            let mut on_sample = |s: &Sample, _: &ChannelWindows| seen.push(*s);
            let mut on_error = |e: &ScopeError| errors.push(e.to_string());
            controller.dispatch_block(&good[..9], &mut on_sample, &mut on_error);
            controller.dispatch_block(&good, &mut on_sample, &mut on_error);
        }
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("too short"));
        assert_eq!(seen, vec![Sample::new(4, 3, 2, 1)]);
        assert_eq!(controller.stats().decode_errors, 1);
        assert_eq!(controller.stats().frames_decoded, 1);
    }
    #[tokio::test]
    async fn trailing_partial_frame_is_discarded_at_close() {
        let mut bytes = frames(&[Sample::new(1, 1, 1, 1)]);
        bytes.extend_from_slice(&[0xAA; 5]);
        let mut source = ScriptedSource::new(vec![bytes]);
        let mut controller = ReadLoopController::new();
        let mut samples = 0;
        let mut errors = 0;
        let state = controller
            .start(&mut source, |_, _| samples += 1, |_| errors += 1, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state, StreamState::Closed);
        assert_eq!((samples, errors), (1, 0));
    }
}
