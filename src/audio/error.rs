use thiserror::Error;

use crate::library::Track;

/// Why a track's audio could not be made resident.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("network error while fetching audio: {0}")]
    Network(String),

    #[error("audio request failed with HTTP status {0}")]
    Status(u16),

    #[error("audio payload is empty")]
    Empty,

    #[error("failed to decode audio: {0}")]
    Decode(String),
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The track is missing its id or source URL. Raised before any I/O.
    #[error("invalid track: {0}")]
    InvalidTrack(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// The operation needs a decoded asset and none is resident.
    #[error("no audio is loaded")]
    NoAsset,

    /// A newer `play`, `load` or `stop` took over before this request finished.
    #[error("request superseded by a newer one")]
    Superseded,

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("audio engine has shut down")]
    Closed,
}

/// Reject a track that has no id or no source URL.
pub fn validate_track(track: &Track) -> Result<(), EngineError> {
    if track.id.trim().is_empty() {
        return Err(EngineError::InvalidTrack("track has no id".into()));
    }
    if track.url.trim().is_empty() {
        return Err(EngineError::InvalidTrack(format!(
            "track {} has no source url",
            track.id
        )));
    }
    Ok(())
}
