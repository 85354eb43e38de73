// src/main.rs
use anyhow::{Context, Result};
use serialscope::drivers::ChannelId;
use serialscope::{engine, ScopeConfig, ScopeMessage};
use tokio::sync::mpsc;

fn report(message: ScopeMessage) {
    match message {
        ScopeMessage::Log(line) => log::info!("{line}"),
        ScopeMessage::Status(state) => log::info!("status: {state:?}"),
        ScopeMessage::DataPacket { sample, ranges, .. } => {
            let line = ChannelId::ALL
                .iter()
                .map(|ch| {
                    let range = ranges[ch.index()];
                    format!(
                        "ch{}={} [{:.0}, {:.0}]",
                        ch.index(),
                        sample.get(*ch),
                        range.low,
                        range.high
                    )
                })
                .collect::<Vec<_>>()
                .join("  ");
            log::info!("{line}");
        }
        ScopeMessage::Error { message, fatal } => {
            if fatal {
                log::error!("{message}");
            } else {
                log::warn!("{message}");
            }
        }
    }
}

// 入口函数
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => ScopeConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => ScopeConfig::default(),
    };
    log::info!("starting with {config:?}");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = engine::spawn_session(config, tx)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Ctrl+C received, disconnecting");
                session.disconnect();
                break;
            }
            message = rx.recv() => match message {
                Some(message) => report(message),
                None => break,
            },
        }
    }

    let state = session.join().await?;
    while let Ok(message) = rx.try_recv() {
        report(message);
    }
    log::info!("session finished in state {state:?}");
    Ok(())
}
