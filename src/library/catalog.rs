use reqwest::Client;
use tracing::{debug, warn};

use crate::audio::{HttpFetcher, LoadError};
use crate::config::CatalogSettings;

use super::model::Track;

/// Receives a notification every time a track actually starts playing.
///
/// Implementations must return immediately and never fail the caller; the
/// count is best-effort.
pub trait PlayCounter: Send + Sync {
    fn record_play(&self, track_id: &str);
}

/// HTTP client for the catalog/stream service.
#[derive(Debug, Clone)]
pub struct Catalog {
    client: Client,
    settings: CatalogSettings,
}

impl Catalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn stream_url(&self, track_id: &str) -> String {
        join_url(&self.settings.base_url, &self.settings.stream_path, track_id)
    }

    pub fn play_count_url(&self, track_id: &str) -> String {
        join_url(
            &self.settings.base_url,
            &self.settings.play_count_path,
            track_id,
        )
    }

    /// A track streamed from this catalog.
    pub fn track(&self, track_id: &str) -> Track {
        Track::new(track_id, self.stream_url(track_id))
    }

    /// A fetcher sharing this catalog's connection pool and timeout.
    pub fn fetcher(&self) -> HttpFetcher {
        HttpFetcher::new(self.client.clone())
    }
}

impl PlayCounter for Catalog {
    fn record_play(&self, track_id: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(track_id, "no async runtime available, play count skipped");
            return;
        };

        let url = self.play_count_url(track_id);
        let client = self.client.clone();
        let track_id = track_id.to_string();
        runtime.spawn(async move {
            match client.post(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(track_id = %track_id, "play count recorded");
                }
                Ok(resp) => {
                    warn!(track_id = %track_id, status = %resp.status(), "play count rejected");
                }
                Err(err) => {
                    warn!(track_id = %track_id, error = %err, "play count request failed");
                }
            }
        });
    }
}

pub(super) fn join_url(base: &str, path: &str, track_id: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    if path.is_empty() {
        format!("{base}/{track_id}")
    } else {
        format!("{base}/{path}/{track_id}")
    }
}
