use std::sync::Arc;

use crate::audio::AudioEngine;
use crate::config;
use crate::coordinator::PlaybackCoordinator;
use crate::library::{Catalog, Track};

/// Turn command-line arguments into a playlist.
///
/// `http(s)://` arguments are streamed as they are; anything else is a catalog
/// track id. Flags are skipped.
pub fn tracks_from_args(catalog: &Catalog, args: &[String]) -> Vec<Track> {
    args.iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty() && !a.starts_with("--"))
        .map(|a| {
            if a.starts_with("http://") || a.starts_with("https://") {
                let name = a
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(a);
                Track::new(a, a).with_title(name)
            } else {
                catalog.track(a)
            }
        })
        .collect()
}

pub fn build_coordinator(
    engine: Arc<AudioEngine>,
    catalog: Catalog,
    settings: &config::Settings,
) -> PlaybackCoordinator<AudioEngine> {
    PlaybackCoordinator::new(engine, &settings.playback).with_counter(Arc::new(catalog))
}
