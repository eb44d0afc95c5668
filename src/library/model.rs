use serde::{Deserialize, Serialize};

/// A playable item.
///
/// `id` and `url` are what the engine needs; the rest is display metadata the
/// engine never looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artwork: Option<String>,
}

impl Track {
    /// Create a track whose title defaults to its id.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            url: url.into(),
            artist: None,
            artwork: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// `"Artist - Title"`, or just the title when there is no artist.
    pub fn display(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{} - {}", a, self.title.trim()),
            _ => self.title.trim().to_string(),
        }
    }

    /// Same track identity, regardless of metadata.
    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }
}
