// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe animation primitives for the Kite editor.
//!
//! This crate provides:
//! - Easing functions with a name registry for persistence
//! - Time-ordered keyframe tracks with bracket lookup
//! - Eased interpolation between instants
//! - The playback clock that drives re-sampling
//!
//! It knows nothing about nodes: anything implementing [`Animate`] can be
//! driven by the clock.

pub mod clock;
pub mod easing;
pub mod keyframe;
pub mod track;

pub use clock::{Animate, AnimationClock, ClockError};
pub use easing::{Easing, EasingError};
pub use keyframe::{Bracket, Instant, Interpolate, ScalarInstant, Vec2Instant};
pub use track::{KeyFrame, Track, TrackInstant, TrackKind};
