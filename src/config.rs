//! Configuration loader and schema types.
//!
//! Settings are layered from environment variables, an optional TOML file
//! and struct defaults. See [`Settings`] for the precedence rules.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
