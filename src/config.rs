use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

use crate::error::WidgetError;

const MIN_PERIOD_MS: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub window: WindowConfig,
    pub timing: TimingConfig,
    pub artwork: ArtworkConfig,
    pub ui: UiConfig,
    pub spotify: SpotifyConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.extend(candidate_paths(&current_dir));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.extend(candidate_paths(dir));
            }
        }

        for path in candidates {
            if path.exists() {
                return Self::from_path(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }
}

fn candidate_paths(dir: &Path) -> [PathBuf; 3] {
    [
        dir.join("config.toml"),
        dir.join("config").join("config.toml"),
        dir.join("config").join("widget.toml"),
    ]
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
    pub always_on_top: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Spotify Clock".to_string(),
            width: 320.0,
            height: 600.0,
            x: 100.0,
            y: 100.0,
            always_on_top: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub color_interval_ms: u64,
    pub fade_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            color_interval_ms: 1000,
            fade_ms: 800,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn color_interval(&self) -> Duration {
        Duration::from_millis(self.color_interval_ms.max(MIN_PERIOD_MS))
    }

    /// Fades never outlast the color tick, otherwise every tick would restart mid-flight.
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms).min(self.color_interval())
    }
}

#[derive(Debug, Clone)]
pub struct ArtworkConfig {
    pub size: u32,
    pub palette_size: usize,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            size: 200,
            palette_size: 6,
        }
    }
}

impl ArtworkConfig {
    pub fn size(&self) -> u32 {
        self.size.clamp(32, 1024)
    }

    pub fn palette_size(&self) -> usize {
        self.palette_size.clamp(1, 16)
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub idle_text: String,
    pub assets_dir: PathBuf,
    pub clock_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            idle_text: "Nothing playing... 🎧".to_string(),
            assets_dir: PathBuf::from("assets"),
            clock_format: "%H:%M:%S".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub token_cache: PathBuf,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            token_cache: PathBuf::from(".spotify_token_cache.json"),
        }
    }
}

/// OAuth client settings, read from the process environment (and `.env` when present).
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl SpotifyCredentials {
    pub fn from_env() -> Result<Self, WidgetError> {
        if let Some(err) = env_file_problem(dotenvy::dotenv()) {
            warn!("Ignoring unreadable .env file: {err}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WidgetError> {
        let fetch = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(WidgetError::MissingCredential(key))
        };

        Ok(Self {
            client_id: fetch("CLIENT_ID")?,
            client_secret: fetch("CLIENT_SECRET")?,
            redirect_uri: fetch("REDIRECT_URI")?,
        })
    }
}

/// A missing .env file is fine, the variables may come from the shell.
fn env_file_problem(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(err) if err.not_found() => None,
        Err(err) => Some(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    window: WindowSection,
    #[serde(default)]
    timing: TimingSection,
    #[serde(default)]
    artwork: ArtworkSection,
    #[serde(default)]
    ui: UiSection,
    #[serde(default)]
    spotify: SpotifySection,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let window_defaults = WindowConfig::default();
        let timing_defaults = TimingConfig::default();
        let artwork_defaults = ArtworkConfig::default();
        let ui_defaults = UiConfig::default();
        let spotify_defaults = SpotifyConfig::default();

        Config {
            window: WindowConfig {
                title: value.window.title.unwrap_or(window_defaults.title),
                width: value.window.width.unwrap_or(window_defaults.width),
                height: value.window.height.unwrap_or(window_defaults.height),
                x: value.window.x.unwrap_or(window_defaults.x),
                y: value.window.y.unwrap_or(window_defaults.y),
                always_on_top: value
                    .window
                    .always_on_top
                    .unwrap_or(window_defaults.always_on_top),
            },
            timing: TimingConfig {
                poll_interval_ms: value
                    .timing
                    .poll_interval_ms
                    .unwrap_or(timing_defaults.poll_interval_ms),
                color_interval_ms: value
                    .timing
                    .color_interval_ms
                    .unwrap_or(timing_defaults.color_interval_ms),
                fade_ms: value.timing.fade_ms.unwrap_or(timing_defaults.fade_ms),
            },
            artwork: ArtworkConfig {
                size: value.artwork.size.unwrap_or(artwork_defaults.size),
                palette_size: value
                    .artwork
                    .palette_size
                    .unwrap_or(artwork_defaults.palette_size),
            },
            ui: UiConfig {
                idle_text: value.ui.idle_text.unwrap_or(ui_defaults.idle_text),
                assets_dir: value.ui.assets_dir.unwrap_or(ui_defaults.assets_dir),
                clock_format: value.ui.clock_format.unwrap_or(ui_defaults.clock_format),
            },
            spotify: SpotifyConfig {
                token_cache: value
                    .spotify
                    .token_cache
                    .unwrap_or(spotify_defaults.token_cache),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindowSection {
    title: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    x: Option<f32>,
    y: Option<f32>,
    always_on_top: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TimingSection {
    poll_interval_ms: Option<u64>,
    color_interval_ms: Option<u64>,
    fade_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtworkSection {
    size: Option<u32>,
    palette_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct UiSection {
    idle_text: Option<String>,
    assets_dir: Option<PathBuf>,
    clock_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifySection {
    token_cache: Option<PathBuf>,
}
