use anyhow::Result;
use std::fmt;
use std::time::Instant;

/// Identifies one `load` of the playback handle. Events carrying an older
/// token belong to a source that has since been replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEventKind {
    TimeUpdate(f64),
    DurationChange(f64),
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackEvent {
    pub token: LoadToken,
    pub kind: PlaybackEventKind,
}

impl PlaybackEvent {
    pub fn new(token: LoadToken, kind: PlaybackEventKind) -> Self {
        Self { token, kind }
    }
}

/// The host's native playback element. Exactly one exists per core; its
/// source is redirected for every new song rather than recreated.
///
/// Decoding failures are the host's concern: a handle may accept a source it
/// later cannot play and simply never report a duration.
pub trait PlaybackHandle: fmt::Debug {
    fn load(&mut self, url: &str, token: LoadToken) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    /// Events observed since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<PlaybackEvent>;
}

/// Handle with no audio output. Position follows the wall clock while
/// playing, and it never learns a duration or reports a natural end.
#[derive(Debug, Default)]
pub struct NullPlaybackHandle {
    source: Option<String>,
    token: LoadToken,
    paused: bool,
    started_at: Option<Instant>,
    offset: f64,
    last_reported: Option<f64>,
}

impl NullPlaybackHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn position(&self) -> f64 {
        let mut position = self.offset;
        if !self.paused
            && self.source.is_some()
            && let Some(started_at) = self.started_at
        {
            position += started_at.elapsed().as_secs_f64();
        }
        position
    }
}

impl PlaybackHandle for NullPlaybackHandle {
    fn load(&mut self, url: &str, token: LoadToken) -> Result<()> {
        self.source = Some(url.to_string());
        self.token = token;
        self.paused = true;
        self.started_at = None;
        self.offset = 0.0;
        self.last_reported = None;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.source.is_none() {
            anyhow::bail!("no source loaded");
        }
        if self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.started_at = None;
        self.paused = true;
    }

    fn seek(&mut self, seconds: f64) {
        self.offset = seconds.max(0.0);
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
    }

    fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        if self.source.is_none() {
            return Vec::new();
        }

        let position = self.position();
        if self.last_reported == Some(position) {
            return Vec::new();
        }
        self.last_reported = Some(position);
        vec![PlaybackEvent::new(
            self.token,
            PlaybackEventKind::TimeUpdate(position),
        )]
    }
}
