use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io;
use std::time::Duration;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use crate::drivers::codec::{PacketCodec, Sample};
use crate::drivers::error::ScopeResult;
use crate::types::FRAME_SIZE;
/// Asynchronous supplier of raw byte chunks.
///
/// `Ok(None)` marks end of stream. `next_chunk` must be cancel-safe: the read
/// loop drops an in-flight call when it is cancelled, and no data that was
/// not yet returned may be lost by that.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>>;
}
/// Adapts any tokio reader (serial port, TCP stream, duplex pipe).
pub struct ReaderSource<R> {
    reader: R,
    buf: BytesMut,
    read_size: usize,
}
impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, 256)
    }
    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        let read_size = read_size.max(1);
        Self {
            reader,
            buf: BytesMut::with_capacity(read_size),
            read_size,
        }
    }
    pub fn into_inner(self) -> R {
        self.reader
    }
}
#[async_trait]
impl<R: AsyncRead + Unpin + Send> ByteSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>> {
        self.buf.clear();
        self.buf.reserve(self.read_size);
        loop {
            match self.reader.read_buf(&mut self.buf).await {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(self.buf.split().freeze())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}
pub type SerialSource = ReaderSource<SerialStream>;
/// Open a serial port as a byte source.
pub fn open_serial(settings: &SerialSettings) -> ScopeResult<SerialSource> {
    log::info!(
        "Opening serial port: {} at {} baud",
        settings.port,
        settings.baud_rate
    );
    let stream = tokio_serial::new(&settings.port, settings.baud_rate).open_native_async()?;
    Ok(ReaderSource::new(stream))
}
/// Chunks pushed from elsewhere through a channel. Dropping every sender ends the stream.
pub struct ChannelSource {
    rx: mpsc::Receiver<io::Result<Bytes>>,
}
impl ChannelSource {
    pub fn new(buffer: usize) -> (mpsc::Sender<io::Result<Bytes>>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}
#[async_trait]
impl ByteSource for ChannelSource {
    async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ScriptedSource {
    queue: VecDeque<io::Result<Bytes>>,
}
impl ScriptedSource {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            queue: chunks.into_iter().map(|c| Ok(c.into())).collect(),
        }
    }
    /// Queue a failure after the chunks already scripted.
    pub fn then_fail(mut self, error: io::Error) -> Self {
        self.queue.push_back(Err(error));
        self
    }
}
#[async_trait]
impl ByteSource for ScriptedSource {
    async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>> {
        match self.queue.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub interval_ms: u64,
    /// Largest chunk handed out; frames are split at random points below it.
    pub max_chunk: usize,
    pub seed: Option<u64>,
    /// Stop after this many frames; `None` runs until cancelled.
    pub frame_limit: Option<u64>,
}
impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5,
            max_chunk: 24,
            seed: None,
            frame_limit: None,
        }
    }
}
/// Hardware-free source: one sine-like frame per tick, re-chunked at random
/// sizes so the assembler sees realistic split boundaries.
pub struct SimulatedSource {
    settings: SimulationSettings,
    tick: Option<Interval>,
    rng: StdRng,
    pending: BytesMut,
    phase: f64,
    frames_emitted: u64,
}
impl SimulatedSource {
    pub fn new(settings: SimulationSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            tick: None,
            rng,
            pending: BytesMut::with_capacity(FRAME_SIZE * 2),
            phase: 0.0,
            frames_emitted: 0,
        }
    }
    fn next_sample(&mut self) -> Sample {
        self.phase += 0.1;
        let mut values = [0u32; 4];
        for (i, value) in values.iter_mut().enumerate() {
            let wave = (self.phase * (i as f64 * 0.5 + 1.0) + i as f64 * PI / 4.0).sin();
            let noise: f64 = self.rng.gen_range(-0.02..0.02);
            let scaled = (wave + noise + 1.0) * 0.5 * f64::from(u32::MAX);
            *value = scaled.clamp(0.0, f64::from(u32::MAX)) as u32;
        }
        Sample::from_channels(values)
    }
    fn limit_reached(&self) -> bool {
        self.settings
            .frame_limit
            .map_or(false, |limit| self.frames_emitted >= limit)
    }
}
#[async_trait]
impl ByteSource for SimulatedSource {
    async fn next_chunk(&mut self) -> ScopeResult<Option<Bytes>> {
        if self.pending.is_empty() {
            if self.limit_reached() {
                return Ok(None);
            }
            let period = Duration::from_millis(self.settings.interval_ms.max(1));
            // Created on first use so construction does not need a runtime.
            let tick = self.tick.get_or_insert_with(|| {
                let mut tick = interval(period);
                tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                tick
            });
            tick.tick().await;
            let sample = self.next_sample();
            self.pending.extend_from_slice(&PacketCodec::encode(&sample));
            self.frames_emitted += 1;
        }
        let max = self.settings.max_chunk.max(1).min(self.pending.len());
        let take = self.rng.gen_range(1..=max);
        Ok(Some(self.pending.split_to(take).freeze()))
    }
}
