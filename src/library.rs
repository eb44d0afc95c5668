//! Tracks and the catalog service they come from.
//!
//! The catalog serves raw audio bytes for the engine and receives a
//! best-effort play-count bump whenever a track starts.

mod catalog;
mod model;

pub use catalog::{Catalog, PlayCounter};
pub use model::Track;
