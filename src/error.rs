use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WidgetError>;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("missing environment variable {0}")]
    MissingCredential(&'static str),

    #[error("Spotify authorization failed: {0}")]
    Auth(String),

    #[error("{op} request failed: {message}")]
    Api { op: &'static str, message: String },

    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("icon {name} could not be loaded from {}: {message}", .path.display())]
    MissingIcon {
        name: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("no track is currently active")]
    NoActiveTrack,
}

impl WidgetError {
    pub fn api(op: &'static str, err: impl std::fmt::Display) -> Self {
        WidgetError::Api {
            op,
            message: err.to_string(),
        }
    }
}
