use std::{fmt::Write, time::Duration};

use chrono::{DateTime, Local};

use crate::{
    artwork::DisplayBitmap,
    config::UiConfig,
    palette::{PaletteCycler, Rgb},
    snapshot::{format_timestamp, TrackSnapshot},
    worker::PollOutcome,
};

const DEFAULT_CLOCK_FORMAT: &str = "%H:%M:%S";
const ZERO_TIME: &str = "0:00";

/// Everything the window shows, independent of the GUI toolkit.
pub struct WidgetState {
    pub clock: String,
    pub music_label: String,
    pub progress: f32,
    pub elapsed_label: String,
    pub total_label: String,
    pub track: Option<TrackSnapshot>,
    pub cycler: PaletteCycler,
    artwork: Option<DisplayBitmap>,
    artwork_revision: u64,
    idle_text: String,
    clock_format: String,
}

impl WidgetState {
    pub fn new(ui: &UiConfig, fade: Duration) -> Self {
        let mut state = Self {
            clock: String::new(),
            music_label: String::new(),
            progress: 0.0,
            elapsed_label: String::new(),
            total_label: String::new(),
            track: None,
            cycler: PaletteCycler::new(Rgb::WHITE, fade),
            artwork: None,
            artwork_revision: 0,
            idle_text: ui.idle_text.clone(),
            clock_format: ui.clock_format.clone(),
        };
        state.show_idle();
        state
    }

    pub fn is_playing(&self) -> bool {
        self.track.as_ref().is_some_and(|track| track.is_playing)
    }

    pub fn artwork(&self) -> Option<&DisplayBitmap> {
        self.artwork.as_ref()
    }

    /// Bumped whenever the artwork is replaced or cleared.
    pub fn artwork_revision(&self) -> u64 {
        self.artwork_revision
    }

    pub fn refresh_clock(&mut self, now: &DateTime<Local>) {
        let mut clock = String::new();
        if write!(clock, "{}", now.format(&self.clock_format)).is_err() {
            clock.clear();
            let _ = write!(clock, "{}", now.format(DEFAULT_CLOCK_FORMAT));
        }
        self.clock = clock;
    }

    pub fn apply_poll(&mut self, outcome: PollOutcome) {
        match outcome.track {
            Some(track) if track.is_playing => {
                if track.album_image_url.is_empty() {
                    self.clear_artwork();
                }
                self.show_track(track);
            }
            _ => self.show_idle(),
        }

        if let Some(update) = outcome.artwork {
            self.artwork = Some(update.bitmap);
            self.artwork_revision += 1;
            self.cycler.set_palette(update.palette);
        }
    }

    fn show_track(&mut self, track: TrackSnapshot) {
        self.music_label = track.music_label();
        self.progress = track.progress_fraction();
        self.elapsed_label = format_timestamp(track.progress_ms.min(track.duration_ms));
        self.total_label = format_timestamp(track.duration_ms);
        self.track = Some(track);
    }

    fn show_idle(&mut self) {
        self.music_label = self.idle_text.clone();
        self.progress = 0.0;
        self.elapsed_label = ZERO_TIME.to_string();
        self.total_label = ZERO_TIME.to_string();
        self.track = None;
        self.clear_artwork();
    }

    /// The palette is kept so the background keeps cycling.
    fn clear_artwork(&mut self) {
        if self.artwork.take().is_some() {
            self.artwork_revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::artwork::ArtworkUpdate;

    fn state() -> WidgetState {
        WidgetState::new(&UiConfig::default(), Duration::from_millis(800))
    }

    fn track(progress_ms: u64, duration_ms: u64) -> TrackSnapshot {
        TrackSnapshot {
            is_playing: true,
            title: "Song".into(),
            artist_names: vec!["Artist".into()],
            album_image_url: "https://img/a".into(),
            progress_ms,
            duration_ms,
            ..Default::default()
        }
    }

    fn artwork(palette: Vec<Rgb>) -> ArtworkUpdate {
        ArtworkUpdate {
            url: "https://img/a".into(),
            bitmap: DisplayBitmap {
                width: 1,
                height: 1,
                rgba: vec![1, 2, 3, 255],
            },
            palette,
        }
    }

    #[test]
    fn playing_track_fills_labels_and_progress() {
        let mut state = state();
        state.apply_poll(PollOutcome {
            track: Some(track(65_000, 200_000)),
            artwork: None,
        });

        assert_eq!(state.music_label, "🎶 Song - Artist");
        assert_eq!(state.progress, 0.325);
        assert_eq!(state.elapsed_label, "1:05");
        assert_eq!(state.total_label, "3:20");
        assert!(state.is_playing());
    }

    #[test]
    fn no_session_resets_to_idle() {
        let mut state = state();
        state.apply_poll(PollOutcome {
            track: Some(track(100_000, 200_000)),
            artwork: Some(artwork(vec![Rgb::new(1, 2, 3)])),
        });
        assert!(state.artwork().is_some());

        state.apply_poll(PollOutcome::default());
        assert_eq!(state.music_label, "Nothing playing... 🎧");
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.elapsed_label, "0:00");
        assert_eq!(state.total_label, "0:00");
        assert!(state.artwork().is_none());
        assert!(!state.is_playing());
    }

    #[test]
    fn paused_track_shows_idle() {
        let mut state = state();
        let mut paused = track(10_000, 20_000);
        paused.is_playing = false;
        state.apply_poll(PollOutcome {
            track: Some(paused),
            artwork: None,
        });
        assert_eq!(state.music_label, "Nothing playing... 🎧");
        assert_eq!(state.progress, 0.0);
    }

    #[test]
    fn missing_artwork_update_keeps_previous_artwork_and_palette() {
        let mut state = state();
        let palette = vec![Rgb::new(10, 20, 30), Rgb::new(40, 50, 60)];
        state.apply_poll(PollOutcome {
            track: Some(track(0, 1_000)),
            artwork: Some(artwork(palette.clone())),
        });
        let revision = state.artwork_revision();

        state.apply_poll(PollOutcome {
            track: Some(track(500, 1_000)),
            artwork: None,
        });
        assert_eq!(state.artwork_revision(), revision);
        assert!(state.artwork().is_some());
        assert_eq!(state.cycler.palette(), palette.as_slice());
    }

    #[test]
    fn track_without_artwork_clears_the_previous_cover() {
        let mut state = state();
        let palette = vec![Rgb::new(10, 20, 30)];
        state.apply_poll(PollOutcome {
            track: Some(track(0, 1_000)),
            artwork: Some(artwork(palette.clone())),
        });
        let revision = state.artwork_revision();

        let mut bare = track(0, 90_000);
        bare.title = "Interlude".into();
        bare.album_image_url.clear();
        state.apply_poll(PollOutcome {
            track: Some(bare),
            artwork: None,
        });
        assert_eq!(state.music_label, "🎶 Interlude - Artist");
        assert!(state.artwork().is_none());
        assert_eq!(state.artwork_revision(), revision + 1);
        assert_eq!(state.cycler.palette(), palette.as_slice());
    }

    #[test]
    fn inconsistent_duration_does_not_divide_by_zero() {
        let mut state = state();
        state.apply_poll(PollOutcome {
            track: Some(track(5_000, 0)),
            artwork: None,
        });
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.elapsed_label, "0:00");
    }

    #[test]
    fn clock_uses_configured_format() {
        let mut state = state();
        let noon = Local.with_ymd_and_hms(2024, 5, 17, 12, 3, 9).unwrap();
        state.refresh_clock(&noon);
        assert_eq!(state.clock, "12:03:09");
    }
}
