// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clock driving scene animation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default animation length in seconds
pub const DEFAULT_LENGTH: f64 = 20.0;

/// Longest animation the clock accepts, in seconds
pub const MAX_LENGTH: f64 = 1_000_000.0;

/// Invalid persisted clock state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    /// Length is negative, not finite or above [`MAX_LENGTH`]
    #[error("invalid animation length: {0}")]
    InvalidLength(f64),

    /// Time lies outside `[0, length]`
    #[error("animation time {time} is outside 0..={length}")]
    TimeOutOfRange {
        /// Stored time
        time: f64,
        /// Stored length
        length: f64,
    },
}

/// Something that can be re-sampled at a point in time
pub trait Animate {
    /// Write every animated property for `time`
    fn animate(&mut self, time: f64);
}

/// Global playback state of a document.
///
/// `time` stays within `[0, length]`: advancing out of range either wraps
/// (when looping) or clamps and pauses. Every time change re-samples the
/// scene passed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClockRecord")]
pub struct AnimationClock {
    time: f64,
    length: f64,
    /// Whether playback wraps around at either end
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Whether `tick` is ignored
    #[serde(skip)]
    pub paused: bool,
}

#[derive(Deserialize)]
struct ClockRecord {
    time: f64,
    length: f64,
    #[serde(rename = "loop")]
    looping: bool,
}

impl TryFrom<ClockRecord> for AnimationClock {
    type Error = ClockError;

    fn try_from(record: ClockRecord) -> Result<Self, Self::Error> {
        if !(0.0..=MAX_LENGTH).contains(&record.length) {
            return Err(ClockError::InvalidLength(record.length));
        }
        if !(0.0..=record.length).contains(&record.time) {
            return Err(ClockError::TimeOutOfRange {
                time: record.time,
                length: record.length,
            });
        }
        Ok(Self {
            time: record.time,
            length: record.length,
            looping: record.looping,
            paused: true,
        })
    }
}

/// Bring `length` into `[0, MAX_LENGTH]`, using `fallback` when it is NaN
fn sanitize_length(length: f64, fallback: f64) -> f64 {
    if length.is_nan() {
        fallback
    } else {
        length.clamp(0.0, MAX_LENGTH)
    }
}

impl AnimationClock {
    /// Create a paused, non-looping clock at time zero.
    ///
    /// `length` is clamped into `[0, MAX_LENGTH]`; NaN gives [`DEFAULT_LENGTH`].
    pub fn new(length: f64) -> Self {
        Self {
            time: 0.0,
            length: sanitize_length(length, DEFAULT_LENGTH),
            looping: false,
            paused: true,
        }
    }

    /// Current playback time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Animation length in seconds
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Change the length, pull the time back into range, then re-sample.
    ///
    /// Negative lengths become zero and long ones [`MAX_LENGTH`]; NaN keeps
    /// the current length.
    pub fn set_length(&mut self, length: f64, scene: &mut impl Animate) {
        self.length = sanitize_length(length, self.length);
        self.time = self.time.min(self.length);
        scene.animate(self.time);
    }

    /// Jump to `time` if it lies within `[0, length]`, then re-sample.
    ///
    /// Out-of-range times leave the clock where it was.
    pub fn set_time(&mut self, time: f64, scene: &mut impl Animate) {
        if (0.0..=self.length).contains(&time) {
            self.time = time;
        }
        scene.animate(self.time);
    }

    /// Move by `delta` seconds, wrapping or clamping at the ends, then re-sample
    pub fn advance(&mut self, delta: f64, scene: &mut impl Animate) {
        if delta.is_finite() {
            self.time += delta;
        }

        if self.time > self.length {
            if self.looping && self.length > 0.0 {
                self.time = self.time.rem_euclid(self.length);
            } else {
                self.time = self.length;
                self.paused |= !self.looping;
            }
        } else if self.time < 0.0 {
            if self.looping && self.length > 0.0 {
                self.time = self.time.rem_euclid(self.length);
            } else {
                self.time = 0.0;
                self.paused |= !self.looping;
            }
        }

        scene.animate(self.time);
    }

    /// Advance by `delta` unless paused
    pub fn tick(&mut self, delta: f64, scene: &mut impl Animate) {
        if !self.paused {
            self.advance(delta, scene);
        }
    }

    /// Resume playback
    pub fn play(&mut self) {
        self.paused = false;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        self.paused = !self.paused;
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self, scene: &mut impl Animate) {
        self.paused = true;
        self.set_time(0.0, scene);
    }

    /// Frame number containing the current time
    pub fn time_to_frame(&self, fps: f64) -> u64 {
        (self.time * fps).floor() as u64
    }

    /// Start time of `frame`
    pub fn frame_to_time(frame: u64, fps: f64) -> f64 {
        frame as f64 / fps
    }

    /// Number of frames needed to cover the whole length, both ends included
    pub fn frame_count(&self, fps: f64) -> u64 {
        (self.length * fps).floor() as u64 + 1
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH)
    }
}
