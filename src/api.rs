use chrono::TimeDelta;
use rspotify::{
    model::AdditionalType, prelude::*, scopes, AuthCodeSpotify, Config as RspotifyConfig,
    Credentials, OAuth,
};
use tracing::{debug, info, warn};

use crate::{
    config::{SpotifyConfig, SpotifyCredentials},
    error::{Result, WidgetError},
    snapshot::TrackSnapshot,
};

/// Remote playback service. Every call blocks until the service answers.
pub trait PlaybackApi {
    /// `Ok(None)` means no active session, which is not an error.
    fn now_playing(&self) -> Result<Option<TrackSnapshot>>;
    fn pause(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
    fn next_track(&self) -> Result<()>;
    fn previous_track(&self) -> Result<()>;
    fn seek(&self, position_ms: u64) -> Result<()>;
}

pub struct SpotifyApi {
    client: AuthCodeSpotify,
}

impl SpotifyApi {
    /// Authorizes against Spotify, reusing the cached token when there is one and
    /// otherwise prompting on the terminal for the redirect URL.
    pub fn connect(credentials: &SpotifyCredentials, config: &SpotifyConfig) -> Result<Self> {
        let creds = Credentials::new(&credentials.client_id, &credentials.client_secret);
        let oauth = OAuth {
            redirect_uri: credentials.redirect_uri.clone(),
            scopes: scopes!(
                "user-read-playback-state",
                "user-read-currently-playing",
                "user-modify-playback-state"
            ),
            ..Default::default()
        };
        let client_config = RspotifyConfig {
            token_cached: true,
            token_refreshing: true,
            cache_path: config.token_cache.clone(),
            ..Default::default()
        };

        let client = AuthCodeSpotify::with_config(creds, oauth, client_config);
        let url = client
            .get_authorize_url(false)
            .map_err(|e| WidgetError::Auth(e.to_string()))?;
        client
            .prompt_for_token(&url)
            .map_err(|e| WidgetError::Auth(e.to_string()))?;

        info!(cache = %config.token_cache.display(), "Spotify session authorized");
        Ok(Self { client })
    }
}

impl PlaybackApi for SpotifyApi {
    fn now_playing(&self) -> Result<Option<TrackSnapshot>> {
        let context = self
            .client
            .current_playing(None, Some(&[AdditionalType::Track, AdditionalType::Episode]))
            .map_err(|e| WidgetError::api("now playing", e))?;
        Ok(context.and_then(TrackSnapshot::from_context))
    }

    fn pause(&self) -> Result<()> {
        self.client
            .pause_playback(None)
            .map_err(|e| WidgetError::api("pause", e))
    }

    fn resume(&self) -> Result<()> {
        self.client
            .resume_playback(None, None)
            .map_err(|e| WidgetError::api("resume", e))
    }

    fn next_track(&self) -> Result<()> {
        self.client
            .next_track(None)
            .map_err(|e| WidgetError::api("next track", e))
    }

    fn previous_track(&self) -> Result<()> {
        self.client
            .previous_track(None)
            .map_err(|e| WidgetError::api("previous track", e))
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        let position = TimeDelta::milliseconds(position_ms.min(i64::MAX as u64) as i64);
        self.client
            .seek_track(position, None)
            .map_err(|e| WidgetError::api("seek", e))
    }
}

impl<T: PlaybackApi + ?Sized> PlaybackApi for std::sync::Arc<T> {
    fn now_playing(&self) -> Result<Option<TrackSnapshot>> {
        (**self).now_playing()
    }

    fn pause(&self) -> Result<()> {
        (**self).pause()
    }

    fn resume(&self) -> Result<()> {
        (**self).resume()
    }

    fn next_track(&self) -> Result<()> {
        (**self).next_track()
    }

    fn previous_track(&self) -> Result<()> {
        (**self).previous_track()
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        (**self).seek(position_ms)
    }
}

/// Reads the current track, logging and swallowing failures. The next poll is the retry.
pub fn fetch_track(api: &dyn PlaybackApi) -> Option<TrackSnapshot> {
    match api.now_playing() {
        Ok(Some(track)) => {
            debug!(title = %track.title, playing = track.is_playing, "fetched playback state");
            Some(track)
        }
        Ok(None) => None,
        Err(err) => {
            warn!("Failed to fetch playback state: {err}");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        NowPlaying,
        Pause,
        Resume,
        Next,
        Previous,
        Seek(u64),
    }

    /// Scripted stand-in for the Spotify client. Unscripted reads return `fallback`.
    #[derive(Default)]
    pub struct FakeApi {
        pub responses: Mutex<VecDeque<Result<Option<TrackSnapshot>>>>,
        pub fallback: Option<TrackSnapshot>,
        pub calls: Mutex<Vec<Call>>,
        pub fail_commands: bool,
    }

    impl FakeApi {
        pub fn playing(track: TrackSnapshot) -> Self {
            Self {
                fallback: Some(track),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn script(&self, response: Result<Option<TrackSnapshot>>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn command(&self, call: Call, op: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail_commands {
                Err(WidgetError::api(op, "rejected"))
            } else {
                Ok(())
            }
        }
    }

    impl PlaybackApi for FakeApi {
        fn now_playing(&self) -> Result<Option<TrackSnapshot>> {
            self.calls.lock().unwrap().push(Call::NowPlaying);
            let scripted = self.responses.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        fn pause(&self) -> Result<()> {
            self.command(Call::Pause, "pause")
        }

        fn resume(&self) -> Result<()> {
            self.command(Call::Resume, "resume")
        }

        fn next_track(&self) -> Result<()> {
            self.command(Call::Next, "next track")
        }

        fn previous_track(&self) -> Result<()> {
            self.command(Call::Previous, "previous track")
        }

        fn seek(&self, position_ms: u64) -> Result<()> {
            self.command(Call::Seek(position_ms), "seek")
        }
    }
}
