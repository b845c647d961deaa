// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe tracks and the per-node set of transform tracks.

use crate::keyframe::{Bracket, Instant, ScalarInstant, Vec2Instant};
use glam::Vec2;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Time-ordered instants for one animatable property.
///
/// Instants are kept in non-decreasing time order by every method that
/// adds to the track. Two instants may share a time; lookups and removals
/// then act on the first of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<V> {
    instants: Vec<Instant<V>>,
}

impl<V> Track<V> {
    /// Create an empty track
    pub fn new() -> Self {
        Self {
            instants: Vec::new(),
        }
    }

    /// Insert an instant after any existing instants at the same time
    pub fn insert(&mut self, instant: Instant<V>) {
        let position = self.instants.partition_point(|existing| existing.time <= instant.time);
        self.instants.insert(position, instant);
    }

    /// Insert an instant before any existing instants at the same time.
    ///
    /// Undoes a [`Track::remove`].
    pub fn insert_first(&mut self, instant: Instant<V>) {
        let position = self.instants.partition_point(|existing| existing.time < instant.time);
        self.instants.insert(position, instant);
    }

    /// Remove the first instant at exactly `time`
    pub fn remove(&mut self, time: f64) -> Option<Instant<V>> {
        let idx = self.instants.iter().position(|instant| instant.time == time)?;
        Some(self.instants.remove(idx))
    }

    /// Remove the last instant at exactly `time`.
    ///
    /// Undoes a [`Track::insert`].
    pub fn remove_last(&mut self, time: f64) -> Option<Instant<V>> {
        let idx = self.instants.iter().rposition(|instant| instant.time == time)?;
        Some(self.instants.remove(idx))
    }

    /// First instant at exactly `time`
    pub fn instant_at(&self, time: f64) -> Option<&Instant<V>> {
        self.instants.iter().find(|instant| instant.time == time)
    }

    /// Mutable access to the first instant at exactly `time`.
    ///
    /// Only the value and easing should be edited through this; moving an
    /// instant in time goes through `remove` + `insert`.
    pub fn instant_at_mut(&mut self, time: f64) -> Option<&mut Instant<V>> {
        self.instants.iter_mut().find(|instant| instant.time == time)
    }

    /// Instants surrounding `time`.
    ///
    /// `None` before the first instant (or on an empty track). At or past
    /// the last instant both ends are the last instant.
    pub fn lookup_bracket(&self, time: f64) -> Option<Bracket<'_, V>> {
        debug_assert!(self.is_ordered(), "keyframe track is not ordered by time");

        let next_idx = self.instants.partition_point(|instant| instant.time <= time);
        if next_idx == 0 {
            return None;
        }

        let prev = &self.instants[next_idx - 1];
        let next = self.instants.get(next_idx).unwrap_or(prev);
        Some(Bracket { prev, next })
    }

    /// Whether the instants are in non-decreasing time order
    pub fn is_ordered(&self) -> bool {
        self.instants.windows(2).all(|pair| pair[0].time <= pair[1].time)
    }

    /// Time of the last instant, or zero
    pub fn duration(&self) -> f64 {
        self.instants.last().map_or(0.0, |instant| instant.time)
    }

    /// Number of instants
    pub fn len(&self) -> usize {
        self.instants.len()
    }

    /// Whether the track has no instants
    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    /// Iterate instants in time order
    pub fn iter(&self) -> impl Iterator<Item = &Instant<V>> {
        self.instants.iter()
    }

    /// All instants in time order
    pub fn instants(&self) -> &[Instant<V>] {
        &self.instants
    }
}

impl<V> Default for Track<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> Serialize for Track<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.instants.serialize(serializer)
    }
}

// A track read from disk must already be ordered; sampling relies on it.
impl<'de, V: Deserialize<'de>> Deserialize<'de> for Track<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let instants = Vec::<Instant<V>>::deserialize(deserializer)?;
        let track = Self { instants };
        if !track.is_ordered() {
            return Err(D::Error::custom("keyframe track is not ordered by time"));
        }
        Ok(track)
    }
}

/// Which transform property a track animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// Node position
    Position,
    /// Node scale
    Scale,
    /// Node rotation (radians)
    Rotation,
    /// Rotation pivot offset
    Pivot,
}

impl TrackKind {
    /// All track kinds
    pub const ALL: [TrackKind; 4] = [
        TrackKind::Position,
        TrackKind::Scale,
        TrackKind::Rotation,
        TrackKind::Pivot,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
            Self::Pivot => "pivot",
        }
    }
}

/// An instant tagged with the track it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackInstant {
    /// Position key
    Position(Vec2Instant),
    /// Scale key
    Scale(Vec2Instant),
    /// Rotation key
    Rotation(ScalarInstant),
    /// Pivot key
    Pivot(Vec2Instant),
}

impl TrackInstant {
    /// Track this instant goes to
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Position(_) => TrackKind::Position,
            Self::Scale(_) => TrackKind::Scale,
            Self::Rotation(_) => TrackKind::Rotation,
            Self::Pivot(_) => TrackKind::Pivot,
        }
    }

    /// Time of the wrapped instant
    pub fn time(&self) -> f64 {
        match self {
            Self::Position(i) | Self::Scale(i) | Self::Pivot(i) => i.time,
            Self::Rotation(i) => i.time,
        }
    }
}

/// The four transform tracks of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    /// Position track
    pub position: Track<Vec2>,
    /// Scale track
    pub scale: Track<Vec2>,
    /// Rotation track (radians)
    pub rotation: Track<f64>,
    /// Rotation pivot track
    pub pivot: Track<Vec2>,
}

impl KeyFrame {
    /// Create a keyframe set with empty tracks
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tagged instant into its track
    pub fn insert(&mut self, instant: TrackInstant) {
        match instant {
            TrackInstant::Position(i) => self.position.insert(i),
            TrackInstant::Scale(i) => self.scale.insert(i),
            TrackInstant::Rotation(i) => self.rotation.insert(i),
            TrackInstant::Pivot(i) => self.pivot.insert(i),
        }
    }

    /// Insert a tagged instant before same-time instants of its track
    pub fn insert_first(&mut self, instant: TrackInstant) {
        match instant {
            TrackInstant::Position(i) => self.position.insert_first(i),
            TrackInstant::Scale(i) => self.scale.insert_first(i),
            TrackInstant::Rotation(i) => self.rotation.insert_first(i),
            TrackInstant::Pivot(i) => self.pivot.insert_first(i),
        }
    }

    /// Remove the first instant at exactly `time` from the given track
    pub fn remove(&mut self, kind: TrackKind, time: f64) -> Option<TrackInstant> {
        match kind {
            TrackKind::Position => self.position.remove(time).map(TrackInstant::Position),
            TrackKind::Scale => self.scale.remove(time).map(TrackInstant::Scale),
            TrackKind::Rotation => self.rotation.remove(time).map(TrackInstant::Rotation),
            TrackKind::Pivot => self.pivot.remove(time).map(TrackInstant::Pivot),
        }
    }

    /// Remove the last instant at exactly `time` from the given track
    pub fn remove_last(&mut self, kind: TrackKind, time: f64) -> Option<TrackInstant> {
        match kind {
            TrackKind::Position => self.position.remove_last(time).map(TrackInstant::Position),
            TrackKind::Scale => self.scale.remove_last(time).map(TrackInstant::Scale),
            TrackKind::Rotation => self.rotation.remove_last(time).map(TrackInstant::Rotation),
            TrackKind::Pivot => self.pivot.remove_last(time).map(TrackInstant::Pivot),
        }
    }

    /// First instant at exactly `time` on the given track
    pub fn instant_at(&self, kind: TrackKind, time: f64) -> Option<TrackInstant> {
        match kind {
            TrackKind::Position => self.position.instant_at(time).copied().map(TrackInstant::Position),
            TrackKind::Scale => self.scale.instant_at(time).copied().map(TrackInstant::Scale),
            TrackKind::Rotation => self.rotation.instant_at(time).copied().map(TrackInstant::Rotation),
            TrackKind::Pivot => self.pivot.instant_at(time).copied().map(TrackInstant::Pivot),
        }
    }

    /// Number of instants on the given track
    pub fn track_len(&self, kind: TrackKind) -> usize {
        match kind {
            TrackKind::Position => self.position.len(),
            TrackKind::Scale => self.scale.len(),
            TrackKind::Rotation => self.rotation.len(),
            TrackKind::Pivot => self.pivot.len(),
        }
    }

    /// Whether every track is empty
    pub fn is_empty(&self) -> bool {
        TrackKind::ALL.into_iter().all(|kind| self.track_len(kind) == 0)
    }

    /// Latest instant time over all tracks
    pub fn duration(&self) -> f64 {
        self.position
            .duration()
            .max(self.scale.duration())
            .max(self.rotation.duration())
            .max(self.pivot.duration())
    }
}
