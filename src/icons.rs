use std::path::Path;

use tracing::debug;

use crate::{
    artwork::DisplayBitmap,
    error::{Result, WidgetError},
};

/// Transport button images. All four must load before the window opens.
#[derive(Debug, Clone)]
pub struct IconSet {
    pub play: DisplayBitmap,
    pub pause: DisplayBitmap,
    pub next: DisplayBitmap,
    pub previous: DisplayBitmap,
}

impl IconSet {
    pub fn load(dir: &Path) -> Result<Self> {
        let icons = Self {
            play: load_icon(dir, "play.png")?,
            pause: load_icon(dir, "pause.png")?,
            next: load_icon(dir, "next.png")?,
            previous: load_icon(dir, "prev.png")?,
        };
        debug!(dir = %dir.display(), "transport icons loaded");
        Ok(icons)
    }
}

fn load_icon(dir: &Path, name: &'static str) -> Result<DisplayBitmap> {
    let path = dir.join(name);
    let image = image::open(&path).map_err(|err| WidgetError::MissingIcon {
        name,
        path: path.clone(),
        message: err.to_string(),
    })?;
    Ok(image.to_rgba8().into())
}
