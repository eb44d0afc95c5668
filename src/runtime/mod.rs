use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::AudioEngine;
use crate::coordinator::EndedSignal;
use crate::library::Catalog;

mod event_loop;
mod settings;
mod startup;
mod status;


pub async fn run() -> anyhow::Result<()> {
    let settings = settings::load_settings();
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--print-config") {
        println!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let catalog = Catalog::new(&settings.catalog).context("building catalog client")?;
    let tracks = startup::tracks_from_args(&catalog, &args);
    if tracks.is_empty() {
        bail!("usage: encore [--print-config] <track-id | url>...");
    }

    let engine = Arc::new(
        AudioEngine::spawn(Arc::new(catalog.fetcher()), &settings.engine)
            .context("starting audio engine")?,
    );
    let ended = EndedSignal::attach(engine.events());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let _status_sub = engine.subscribe_all(move |e| {
        let _ = event_tx.send(e.clone());
    });

    let mut coordinator = startup::build_coordinator(engine.clone(), catalog, &settings);
    info!(tracks = tracks.len(), "starting playback");
    coordinator.set_playlist(tracks);
    if let Err(e) = coordinator.play_next().await {
        warn!("could not start playback: {e}");
    }

    enable_raw_mode()?;
    let keys = spawn_key_reader();
    let run_result =
        event_loop::run(&mut coordinator, &settings.controls, keys, ended, event_rx).await;
    disable_raw_mode()?;
    println!();

    engine.shutdown(settings.engine.quit_fade_out()).await;
    run_result.map_err(Into::into)
}

/// Forward terminal key events into the async loop until the receiver goes away.
fn spawn_key_reader() -> mpsc::UnboundedReceiver<event::KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if tx.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("reading terminal input failed: {e}");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("polling terminal input failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}
