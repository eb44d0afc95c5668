use async_trait::async_trait;
use tracing::debug;

use super::error::LoadError;

/// Retrieves the complete encoded payload for a track URL.
#[async_trait]
pub trait TrackFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Fetches audio over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        debug!(url, "fetching audio");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;
        if body.is_empty() {
            return Err(LoadError::Empty);
        }
        debug!(url, bytes = body.len(), "audio fetched");
        Ok(body.to_vec())
    }
}
