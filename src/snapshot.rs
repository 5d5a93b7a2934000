use rspotify::model::{CurrentlyPlayingContext, PlayableItem};

/// One read of the remote playback state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackSnapshot {
    pub is_playing: bool,
    pub title: String,
    pub artist_names: Vec<String>,
    pub album: String,
    pub album_image_url: String,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

impl TrackSnapshot {
    /// Elapsed share of the track in `[0, 1]`. The remote state can briefly
    /// report a zero duration, which maps to no progress.
    pub fn progress_fraction(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }

    pub fn artists(&self) -> String {
        self.artist_names.join(", ")
    }

    pub fn music_label(&self) -> String {
        if self.artist_names.is_empty() {
            format!("🎶 {}", self.title)
        } else {
            format!("🎶 {} - {}", self.title, self.artists())
        }
    }

    pub fn from_context(context: CurrentlyPlayingContext) -> Option<Self> {
        let progress_ms = context
            .progress
            .map(|progress| progress.num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        let snapshot = match context.item? {
            PlayableItem::Track(track) => TrackSnapshot {
                is_playing: context.is_playing,
                title: track.name,
                artist_names: track.artists.into_iter().map(|artist| artist.name).collect(),
                album: track.album.name,
                album_image_url: track
                    .album
                    .images
                    .into_iter()
                    .next()
                    .map(|image| image.url)
                    .unwrap_or_default(),
                progress_ms,
                duration_ms: track.duration.num_milliseconds().max(0) as u64,
            },
            PlayableItem::Episode(episode) => TrackSnapshot {
                is_playing: context.is_playing,
                title: episode.name,
                artist_names: vec![episode.show.publisher],
                album: episode.show.name,
                album_image_url: episode
                    .images
                    .into_iter()
                    .next()
                    .map(|image| image.url)
                    .unwrap_or_default(),
                progress_ms,
                duration_ms: episode.duration.num_milliseconds().max(0) as u64,
            },
        };

        Some(snapshot)
    }
}

pub fn format_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
