use tracing::{info, warn};

use crate::{
    api::PlaybackApi,
    error::{Result, WidgetError},
};

/// A user request from the widget buttons or the progress slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    /// Pause when the service reports playback, otherwise resume.
    TogglePlayPause,
    Next,
    Previous,
    /// Fraction of the current track's duration, `0.0..=1.0`.
    Seek(f32),
}

impl PlaybackCommand {
    /// The progress slider runs from 0 to 100.
    pub fn seek_from_slider(value: f32) -> Self {
        PlaybackCommand::Seek(value / 100.0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackCommand::Play => "play",
            PlaybackCommand::Pause => "pause",
            PlaybackCommand::TogglePlayPause => "play/pause",
            PlaybackCommand::Next => "next track",
            PlaybackCommand::Previous => "previous track",
            PlaybackCommand::Seek(_) => "seek",
        }
    }
}

/// The remote call a command ended up issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    Pause,
    Resume,
    Next,
    Previous,
    Seek { position_ms: u64 },
}

pub fn seek_target_ms(fraction: f32, duration_ms: u64) -> u64 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0) as f64
    } else {
        0.0
    };
    (fraction * duration_ms as f64).round() as u64
}

/// Issues the command against the service. Toggle and seek read the current state
/// first so they act on the track that is playing right now.
pub fn dispatch(api: &dyn PlaybackApi, command: PlaybackCommand) -> Result<ApiCall> {
    let call = match command {
        PlaybackCommand::Play => ApiCall::Resume,
        PlaybackCommand::Pause => ApiCall::Pause,
        PlaybackCommand::Next => ApiCall::Next,
        PlaybackCommand::Previous => ApiCall::Previous,
        PlaybackCommand::TogglePlayPause => match api.now_playing()? {
            Some(track) if track.is_playing => ApiCall::Pause,
            _ => ApiCall::Resume,
        },
        PlaybackCommand::Seek(fraction) => {
            let track = api.now_playing()?.ok_or(WidgetError::NoActiveTrack)?;
            ApiCall::Seek {
                position_ms: seek_target_ms(fraction, track.duration_ms),
            }
        }
    };

    match call {
        ApiCall::Pause => api.pause()?,
        ApiCall::Resume => api.resume()?,
        ApiCall::Next => api.next_track()?,
        ApiCall::Previous => api.previous_track()?,
        ApiCall::Seek { position_ms } => api.seek(position_ms)?,
    }

    Ok(call)
}

/// Fire-and-forget wrapper: the next poll shows the outcome, failures only reach the log.
pub fn execute(api: &dyn PlaybackApi, command: PlaybackCommand) -> Option<ApiCall> {
    match dispatch(api, command) {
        Ok(call) => {
            info!(command = command.name(), ?call, "playback command sent");
            Some(call)
        }
        Err(err) => {
            warn!("{} failed: {err}", command.name());
            None
        }
    }
}
