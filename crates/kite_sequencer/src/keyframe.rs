// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe instants and interpolation between them.

use crate::easing::Easing;
use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single keyframe: a value pinned to a time, eased towards the next one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instant<V> {
    /// Time in seconds
    pub time: f64,
    /// Value at this instant
    pub value: V,
    /// Easing applied on the way to the next instant
    pub easing: Easing,
}

/// Instant on a position, scale or pivot track
pub type Vec2Instant = Instant<Vec2>;

/// Instant on a rotation track (radians)
pub type ScalarInstant = Instant<f64>;

impl<V> Instant<V> {
    /// Create a linear instant
    pub fn new(time: f64, value: V) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    /// Set the easing
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

// Persisted as a `(time, value, easing-name)` tuple.
impl<V: Serialize> Serialize for Instant<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.time, &self.value, self.easing).serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Instant<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (time, value, easing) = <(f64, V, Easing)>::deserialize(deserializer)?;
        Ok(Self {
            time,
            value,
            easing,
        })
    }
}

/// Values that can be eased between two instants
pub trait Interpolate: Copy {
    /// Blend `from` towards `to` by an already-eased factor
    fn interpolate(from: Self, to: Self, eased: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(from: Self, to: Self, eased: f64) -> Self {
        lerp(from, to, eased)
    }
}

impl Interpolate for Vec2 {
    fn interpolate(from: Self, to: Self, eased: f64) -> Self {
        Vec2::new(
            lerp(f64::from(from.x), f64::from(to.x), eased) as f32,
            lerp(f64::from(from.y), f64::from(to.y), eased) as f32,
        )
    }
}

/// Linear interpolation between two scalars
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Map `value` from `[min, max]` onto `[0, 1]`
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    (value - min) / (max - min)
}

/// The pair of instants surrounding a query time
#[derive(Debug, Clone, Copy)]
pub struct Bracket<'a, V> {
    /// Last instant at or before the query time
    pub prev: &'a Instant<V>,
    /// First instant after the query time, or `prev` again past the end
    pub next: &'a Instant<V>,
}

impl<V: Interpolate> Bracket<'_, V> {
    /// Whether both ends sit on the same time
    pub fn is_degenerate(&self) -> bool {
        self.prev.time == self.next.time
    }

    /// Interpolated value at `time`, eased with `prev`'s easing
    pub fn sample(&self, time: f64) -> V {
        if self.is_degenerate() {
            return self.next.value;
        }

        let t = normalize(time, self.prev.time, self.next.time);
        V::interpolate(self.prev.value, self.next.value, self.prev.easing.apply(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_bracket_is_exact() {
        let prev = ScalarInstant::new(0.0, 0.0);
        let next = ScalarInstant::new(10.0, 100.0);
        let bracket = Bracket {
            prev: &prev,
            next: &next,
        };

        assert_eq!(bracket.sample(0.0), 0.0);
        assert_eq!(bracket.sample(5.0), 50.0);
        assert_eq!(bracket.sample(10.0), 100.0);
    }

    #[test]
    fn test_degenerate_bracket_takes_next() {
        let prev = Vec2Instant::new(2.0, Vec2::new(1.0, 1.0));
        let next = Vec2Instant::new(2.0, Vec2::new(7.0, -3.0));
        let bracket = Bracket {
            prev: &prev,
            next: &next,
        };

        assert!(bracket.is_degenerate());
        assert_eq!(bracket.sample(2.0), Vec2::new(7.0, -3.0));
    }

    #[test]
    fn test_prev_easing_drives_both_axes() {
        let prev = Vec2Instant::new(0.0, Vec2::ZERO).with_easing(Easing::Quad);
        let next = Vec2Instant::new(1.0, Vec2::new(8.0, -4.0)).with_easing(Easing::Circ);
        let bracket = Bracket {
            prev: &prev,
            next: &next,
        };

        assert_eq!(bracket.sample(0.5), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_instant_persists_as_tuple() {
        let instant = ScalarInstant::new(1.5, 0.25).with_easing(Easing::Cubic);
        let text = ron::to_string(&instant).unwrap();
        assert_eq!(text, "(1.5,0.25,\"Cubic\")");

        let bad = ron::from_str::<ScalarInstant>("(1.5,0.25,\"Elastic\")");
        assert!(bad.is_err());
    }
}
