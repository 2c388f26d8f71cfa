use crate::audio::{LoadToken, PlaybackEvent, PlaybackEventKind, PlaybackHandle};
use crate::model::SongId;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Draws made by a shuffle pick before a repeat of the current song is accepted.
pub const SHUFFLE_ATTEMPTS: usize = 5;

/// Owns the playback handle and the state describing what it is doing.
///
/// The current song is held by id only; the song itself lives in the catalog.
#[derive(Debug)]
pub struct Transport {
    handle: Box<dyn PlaybackHandle>,
    current: Option<SongId>,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    shuffle: bool,
    token: LoadToken,
    ended: Option<LoadToken>,
    rng: SmallRng,
}

impl Transport {
    pub fn new(handle: Box<dyn PlaybackHandle>) -> Self {
        Self::with_rng(handle, SmallRng::from_os_rng())
    }

    pub fn with_rng(handle: Box<dyn PlaybackHandle>, rng: SmallRng) -> Self {
        Self {
            handle,
            current: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            shuffle: false,
            token: LoadToken::default(),
            ended: None,
            rng,
        }
    }

    pub fn current(&self) -> Option<&SongId> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn token(&self) -> LoadToken {
        self.token
    }

    pub fn handle(&self) -> &dyn PlaybackHandle {
        self.handle.as_ref()
    }

    /// Points the handle at a new source and starts it from zero.
    ///
    /// Transport state is updated before the handle is touched, so a handle
    /// failure still leaves `id` as the current song.
    pub fn start(&mut self, id: &SongId, url: &str) -> Result<()> {
        self.token = self.token.next();
        self.current = Some(id.clone());
        self.is_playing = true;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.ended = None;

        self.handle.load(url, self.token)?;
        self.handle.play()
    }

    /// Pauses or resumes in place. Returns the new playing flag, or `None`
    /// when nothing is loaded.
    pub fn toggle(&mut self) -> Option<Result<bool>> {
        self.current.as_ref()?;

        if self.is_playing {
            self.handle.pause();
            self.is_playing = false;
            return Some(Ok(false));
        }

        self.is_playing = true;
        Some(self.handle.play().map(|()| true))
    }

    pub fn seek(&mut self, seconds: f64) -> bool {
        if self.current.is_none() || !seconds.is_finite() {
            return false;
        }

        let mut target = seconds.max(0.0);
        if self.duration > 0.0 {
            target = target.min(self.duration);
        }
        self.handle.seek(target);
        self.current_time = target;
        true
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Returns to idle. Any event still in flight for the old source is
    /// ignored afterwards.
    pub fn stop(&mut self) {
        if self.current.take().is_some() {
            self.handle.pause();
        }
        self.token = self.token.next();
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.ended = None;
    }

    /// Applies an event from the handle and returns it when it is current.
    ///
    /// Events for a replaced source, and repeated `Ended` signals for the same
    /// source, are dropped.
    pub fn accept(&mut self, event: PlaybackEvent) -> Option<PlaybackEventKind> {
        if self.current.is_none() || event.token != self.token {
            tracing::debug!(?event, "ignoring stale playback event");
            return None;
        }

        match event.kind {
            PlaybackEventKind::TimeUpdate(seconds) => {
                self.current_time = seconds;
            }
            PlaybackEventKind::DurationChange(seconds) => {
                self.duration = seconds;
            }
            PlaybackEventKind::Ended => {
                if self.ended == Some(event.token) {
                    return None;
                }
                self.ended = Some(event.token);
                self.is_playing = false;
            }
        }
        Some(event.kind)
    }

    pub fn drain_handle_events(&mut self) -> Vec<PlaybackEvent> {
        self.handle.drain_events()
    }

    /// Picks a random index in `0..len`, redrawing up to `SHUFFLE_ATTEMPTS`
    /// times while it lands on `avoid`. Small catalogs may still repeat.
    pub fn random_index(&mut self, len: usize, avoid: Option<usize>) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let mut pick = self.rng.random_range(0..len);
        if let Some(avoid) = avoid {
            let mut attempt = 0;
            while pick == avoid && attempt < SHUFFLE_ATTEMPTS {
                pick = self.rng.random_range(0..len);
                attempt += 1;
            }
        }
        Some(pick)
    }
}
