//! Desktop clock that follows the Spotify player: current track, album art, a
//! background that drifts through the artwork's colors, and transport controls.

pub mod api;
pub mod artwork;
pub mod config;
pub mod error;
pub mod icons;
pub mod palette;
pub mod schedule;
pub mod snapshot;
pub mod transport;
pub mod widget;
pub mod worker;

pub use error::{Result, WidgetError};
