//! Gapless scheduling of model speech on an output clock.

use crate::error::LiveError;
use crate::session::AudioChunk;

/// Tracks where the next chunk of speech should start.
///
/// Each chunk starts at `max(now, cursor)` and pushes the cursor forward by
/// its duration, so chunks play back to back without overlapping and a late
/// chunk starts immediately instead of in the past.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackScheduler {
    cursor: f64,
}

impl PlaybackScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start time for a chunk of `duration` seconds given the output clock `now`.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = self.cursor.max(now);
        self.cursor = start + duration;
        start
    }

    /// End time of everything scheduled so far.
    #[must_use]
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0.0;
    }
}

/// An audio sink with its own clock, in seconds.
pub trait AudioOutput: Send {
    fn current_time(&self) -> f64;

    /// Queue `chunk` to start at `at` on this output's clock.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Output`] when the device rejects the chunk.
    fn play_at(&mut self, chunk: &AudioChunk, at: f64) -> Result<(), LiveError>;

    /// Cancel every chunk queued but not yet finished.
    fn stop_all(&mut self);

    /// Release the device. Called once at teardown after [`stop_all`](Self::stop_all).
    fn close(&mut self) {}
}
