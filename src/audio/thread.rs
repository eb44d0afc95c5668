//! The engine thread.
//!
//! The output device and the [`EngineCore`] live on one dedicated thread that
//! runs a current-thread tokio runtime. Commands arrive over a channel and run
//! to completion one at a time. Fetches run as spawned tasks and come back as
//! messages tagged with their load generation, which is the only way engine
//! state changes between commands.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::library::Track;

use super::asset::DecodedAsset;
use super::clock::MonotonicClock;
use super::engine::{EngineCore, LoadStatus, LoadStep, LoadTicket, PlayStep};
use super::error::{EngineError, LoadError};
use super::events::EventBus;
use super::fetch::TrackFetcher;
use super::sink::AudioGraph;
use super::types::PlaybackHandle;

pub(super) type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

pub(super) enum EngineCmd {
    Load { track: Track, reply: Reply<()> },
    Play { track: Track, reply: Reply<()> },
    Pause { reply: Reply<()> },
    Resume { reply: Reply<()> },
    Stop { reply: Reply<()> },
    Seek { time: f64, reply: Reply<()> },
    SetVolume { volume: f32, reply: Reply<()> },
    ToggleMute { reply: Reply<bool> },
    FrequencyData { reply: Reply<Vec<u8>> },
    Quit { fade_out: Duration },
}

type LoadDone = (LoadTicket, Result<DecodedAsset, LoadError>);

pub(super) struct ThreadConfig {
    pub events: EventBus,
    pub playback: PlaybackHandle,
    pub clock: MonotonicClock,
    pub initial_volume: f32,
    pub tick_interval: Duration,
}

/// Start the engine thread. Returns once the graph is open, or with the
/// reason it could not be.
pub(super) fn spawn_engine_thread<G, F>(
    make_graph: F,
    fetcher: Arc<dyn TrackFetcher>,
    rx: mpsc::UnboundedReceiver<EngineCmd>,
    config: ThreadConfig,
) -> Result<JoinHandle<()>, EngineError>
where
    G: AudioGraph + 'static,
    F: FnOnce() -> Result<G, EngineError> + Send + 'static,
{
    let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

    let handle = thread::Builder::new()
        .name("encore-audio".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(EngineError::Output(e.to_string())));
                    return;
                }
            };
            let graph = match make_graph() {
                Ok(graph) => graph,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let core = EngineCore::new(
                graph,
                config.clock,
                config.events,
                config.playback,
                config.initial_volume,
            );
            let _ = ready_tx.send(Ok(()));
            runtime.block_on(run(core, fetcher, rx, config.tick_interval));
        })
        .map_err(|e| EngineError::Output(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(EngineError::Closed)
        }
    }
}

async fn run<G: AudioGraph>(
    mut core: EngineCore<G>,
    fetcher: Arc<dyn TrackFetcher>,
    mut rx: mpsc::UnboundedReceiver<EngineCmd>,
    tick_interval: Duration,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<LoadDone>();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Callers waiting on a load, keyed by the generation that will settle them.
    let mut waiting: Vec<(u64, Reply<()>)> = Vec::new();

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("engine handle dropped");
                    break;
                };
                match cmd {
                    EngineCmd::Load { track, reply } => match core.load(&track) {
                        Ok(LoadStep::Resident) => {
                            let _ = reply.send(Ok(()));
                        }
                        Ok(LoadStep::Pending(generation)) => waiting.push((generation, reply)),
                        Ok(LoadStep::Fetch(ticket)) => {
                            waiting.push((ticket.generation, reply));
                            spawn_fetch(fetcher.clone(), ticket, done_tx.clone());
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    },
                    EngineCmd::Play { track, reply } => match core.play(track) {
                        Ok(PlayStep::Started) => {
                            let _ = reply.send(Ok(()));
                        }
                        Ok(PlayStep::Fetch(ticket)) => {
                            waiting.push((ticket.generation, reply));
                            spawn_fetch(fetcher.clone(), ticket, done_tx.clone());
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    },
                    EngineCmd::Pause { reply } => {
                        core.pause();
                        let _ = reply.send(Ok(()));
                    }
                    EngineCmd::Resume { reply } => {
                        let _ = reply.send(core.resume());
                    }
                    EngineCmd::Stop { reply } => {
                        core.stop();
                        let _ = reply.send(Ok(()));
                    }
                    EngineCmd::Seek { time, reply } => {
                        let _ = reply.send(core.seek(time));
                    }
                    EngineCmd::SetVolume { volume, reply } => {
                        core.set_volume(volume);
                        let _ = reply.send(Ok(()));
                    }
                    EngineCmd::ToggleMute { reply } => {
                        let _ = reply.send(Ok(core.toggle_mute()));
                    }
                    EngineCmd::FrequencyData { reply } => {
                        let _ = reply.send(Ok(core.frequency_data()));
                    }
                    EngineCmd::Quit { fade_out } => {
                        core.shutdown(fade_out);
                        break;
                    }
                }
            }
            Some((ticket, outcome)) = done_rx.recv() => {
                let generation = ticket.generation;
                match core.finish_load(ticket, outcome) {
                    Ok(LoadStatus::Ready) => settle(&mut waiting, generation, Ok(())),
                    Ok(LoadStatus::Stale) => {}
                    Err(e) => settle(&mut waiting, generation, Err(e)),
                }
            }
            _ = ticker.tick() => core.tick(),
        }

        settle_superseded(&mut waiting, core.generation());
    }

    for (_, reply) in waiting.drain(..) {
        let _ = reply.send(Err(EngineError::Closed));
    }
    debug!("engine thread exiting");
}

fn spawn_fetch(
    fetcher: Arc<dyn TrackFetcher>,
    ticket: LoadTicket,
    done: mpsc::UnboundedSender<LoadDone>,
) {
    tokio::spawn(async move {
        let outcome = match fetcher.fetch(&ticket.track.url).await {
            Ok(bytes) => {
                let id = ticket.track.id.clone();
                tokio::task::spawn_blocking(move || DecodedAsset::decode(&id, bytes))
                    .await
                    .unwrap_or_else(|e| {
                        error!("decode task failed: {e}");
                        Err(LoadError::Decode(e.to_string()))
                    })
            }
            Err(e) => Err(e),
        };
        let _ = done.send((ticket, outcome));
    });
}

fn settle(waiting: &mut Vec<(u64, Reply<()>)>, generation: u64, result: Result<(), EngineError>) {
    let (ready, rest): (Vec<_>, Vec<_>) = waiting.drain(..).partition(|(g, _)| *g == generation);
    *waiting = rest;
    for (_, reply) in ready {
        let _ = reply.send(result.clone());
    }
}

/// Resolve every caller whose load was overtaken by a newer generation.
fn settle_superseded(waiting: &mut Vec<(u64, Reply<()>)>, latest: u64) {
    if waiting.iter().all(|(g, _)| *g == latest) {
        return;
    }
    let (stale, rest): (Vec<_>, Vec<_>) = waiting.drain(..).partition(|(g, _)| *g != latest);
    *waiting = rest;
    for (generation, reply) in stale {
        debug!(generation, latest, "request superseded");
        let _ = reply.send(Err(EngineError::Superseded));
    }
}
