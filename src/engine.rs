// src/engine.rs
use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ScopeConfig, SourceConfig};
use crate::drivers::{
    open_serial, AutoscaleCalculator, ByteSource, ChannelId, DisplayRange, ReadLoopController,
    SimulatedSource, StateHandle,
};
use crate::types::{ScopeMessage, StreamState};

/// A running connection. Dropping the handle does not stop the loop; call
/// [`disconnect`](Self::disconnect).
pub struct SessionHandle {
    cancel: CancellationToken,
    state: StateHandle,
    task: JoinHandle<Result<StreamState>>,
}

impl SessionHandle {
    /// User-initiated disconnect: the loop ends in `Cancelled` without an error message.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    pub async fn join(self) -> Result<StreamState> {
        self.task.await.context("session task panicked")?
    }
}

/// Open the configured source and run one read loop on the current runtime,
/// forwarding everything it produces to `tx`.
pub fn spawn_session(config: ScopeConfig, tx: UnboundedSender<ScopeMessage>) -> Result<SessionHandle> {
    config.validate().context("invalid scope configuration")?;
    let mut controller = ReadLoopController::with_window_capacity(config.window_capacity)?;
    let cancel = CancellationToken::new();
    let state = controller.state_handle();
    let loop_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        let mut source: Box<dyn ByteSource> = match &config.source {
            SourceConfig::Serial(settings) => match open_serial(settings) {
                Ok(source) => Box::new(source),
                Err(e) => {
                    controller.fail(&e);
                    let e = anyhow::Error::new(e)
                        .context(format!("failed to open {}", settings.port));
                    tx.send(ScopeMessage::Error {
                        message: format!("{e:#}"),
                        fatal: true,
                    })
                    .ok();
                    tx.send(ScopeMessage::Status(controller.state())).ok();
                    return Err(e);
                }
            },
            SourceConfig::Simulation(settings) => Box::new(SimulatedSource::new(settings.clone())),
        };
        tx.send(ScopeMessage::Log(format!("Connected ({:?})", config.source)))
            .ok();

        let autoscale = config.autoscale;
        let sample_tx = tx.clone();
        let error_tx = tx.clone();
        let mut announced = false;
        let terminal = controller
            .start(
                &mut *source,
                move |sample, windows| {
                    // The loop is already `Reading` once a sample arrives.
                    if !announced {
                        announced = true;
                        sample_tx.send(ScopeMessage::Status(StreamState::Reading)).ok();
                    }
                    let ranges: [DisplayRange; 4] = ChannelId::ALL
                        .map(|ch| AutoscaleCalculator::range(windows.window(ch), autoscale));
                    sample_tx
                        .send(ScopeMessage::DataPacket {
                            sample: *sample,
                            ranges,
                            snapshot: windows.snapshot(),
                        })
                        .ok();
                },
                move |e| {
                    error_tx
                        .send(ScopeMessage::Error {
                            message: e.to_string(),
                            fatal: e.is_fatal(),
                        })
                        .ok();
                },
                loop_cancel,
            )
            .await?;

        let stats = controller.stats();
        tx.send(ScopeMessage::Log(format!(
            "Stream ended: {} frames from {} bytes, {} decode errors",
            stats.frames_decoded, stats.bytes_read, stats.decode_errors
        )))
        .ok();
        tx.send(ScopeMessage::Status(terminal)).ok();
        Ok(terminal)
    });

    Ok(SessionHandle {
        cancel,
        state,
        task,
    })
}
