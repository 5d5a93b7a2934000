use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
};

use tracing::{debug, warn};

use crate::{
    api::{fetch_track, PlaybackApi},
    artwork::{ArtworkProcessor, ArtworkUpdate},
    snapshot::TrackSnapshot,
    transport::{self, ApiCall, PlaybackCommand},
};

/// Result of one poll: the track (if any) and new artwork when the album changed.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    pub track: Option<TrackSnapshot>,
    pub artwork: Option<ArtworkUpdate>,
}

/// Owns the API client and the artwork processor; every network call goes through here.
pub struct Poller {
    api: Box<dyn PlaybackApi + Send>,
    artwork: ArtworkProcessor,
}

impl Poller {
    pub fn new(api: Box<dyn PlaybackApi + Send>, artwork: ArtworkProcessor) -> Self {
        Self { api, artwork }
    }

    pub fn poll(&mut self) -> PollOutcome {
        let track = fetch_track(self.api.as_ref());
        let artwork = match &track {
            Some(track) if track.is_playing => self.artwork.process(&track.album_image_url),
            _ => {
                // Idle clears the artwork on screen, so the album must be fetched again.
                self.artwork.reset();
                None
            }
        };
        PollOutcome { track, artwork }
    }

    pub fn execute(&self, command: PlaybackCommand) -> Option<ApiCall> {
        transport::execute(self.api.as_ref(), command)
    }
}

enum WorkerRequest {
    Poll,
    Command(PlaybackCommand),
    Shutdown,
}

/// Background thread running a [`Poller`]. Requests are served one at a time in order.
pub struct PollWorker {
    request_tx: Option<Sender<WorkerRequest>>,
    outcome_rx: Option<Receiver<PollOutcome>>,
}

impl PollWorker {
    /// `notify` runs after each poll result is sent, typically to wake the GUI.
    pub fn spawn(mut poller: Poller, notify: impl Fn() + Send + 'static) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        thread::Builder::new()
            .name("playback-poller".into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    match request {
                        WorkerRequest::Poll => {
                            if outcome_tx.send(poller.poll()).is_err() {
                                break;
                            }
                            notify();
                        }
                        WorkerRequest::Command(command) => {
                            poller.execute(command);
                        }
                        WorkerRequest::Shutdown => break,
                    }
                }
                debug!("poller thread stopped");
            })
            .map(|_| Self {
                request_tx: Some(request_tx),
                outcome_rx: Some(outcome_rx),
            })
            .unwrap_or_else(|err| {
                warn!("Failed to start poller thread: {err}");
                Self {
                    request_tx: None,
                    outcome_rx: None,
                }
            })
    }

    pub fn is_alive(&self) -> bool {
        self.request_tx.is_some()
    }

    /// Returns false once the worker is gone.
    pub fn request_poll(&mut self) -> bool {
        self.send(WorkerRequest::Poll)
    }

    pub fn send_command(&mut self, command: PlaybackCommand) -> bool {
        self.send(WorkerRequest::Command(command))
    }

    /// Next finished poll, if one is waiting.
    pub fn try_recv(&mut self) -> Option<PollOutcome> {
        let rx = self.outcome_rx.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("poller thread exited");
                self.outcome_rx = None;
                self.request_tx = None;
                None
            }
        }
    }

    fn send(&mut self, request: WorkerRequest) -> bool {
        let Some(tx) = self.request_tx.as_ref() else {
            return false;
        };
        if tx.send(request).is_err() {
            self.request_tx = None;
            return false;
        }
        true
    }
}

impl Drop for PollWorker {
    fn drop(&mut self) {
        if let Some(tx) = self.request_tx.take() {
            let _ = tx.send(WorkerRequest::Shutdown);
        }
    }
}
