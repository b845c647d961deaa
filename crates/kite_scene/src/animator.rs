// SPDX-License-Identifier: MIT OR Apache-2.0
//! Writes keyframed values into node transforms.

use crate::node::Node;
use crate::tree::NodeTree;
use kite_sequencer::{Animate, Interpolate, Track};

/// Set the node's transform to its tracks' values at `time`.
///
/// A track with no key at or before `time` leaves its field alone.
pub fn sample(node: &mut Node, time: f64) {
    let keyframe = &node.keyframe;
    sample_track(&keyframe.position, time, &mut node.position);
    sample_track(&keyframe.scale, time, &mut node.scale);
    sample_track(&keyframe.rotation, time, &mut node.rotation);
    sample_track(&keyframe.pivot, time, &mut node.rotation_pivot);
}

fn sample_track<V: Interpolate>(track: &Track<V>, time: f64, field: &mut V) {
    if let Some(bracket) = track.lookup_bracket(time) {
        *field = bracket.sample(time);
    }
}

impl Animate for NodeTree {
    fn animate(&mut self, time: f64) {
        self.for_each_mut(|_, node| sample(node, time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use kite_sequencer::{AnimationClock, Easing, ScalarInstant, TrackInstant, Vec2Instant};

    #[test]
    fn test_sample_interpolates_each_track() {
        let mut node = Node::new("Sprite");
        node.keyframe.insert(TrackInstant::Position(Vec2Instant::new(0.0, Vec2::ZERO)));
        node.keyframe.insert(TrackInstant::Position(Vec2Instant::new(10.0, Vec2::new(100.0, -50.0))));
        node.keyframe.insert(TrackInstant::Rotation(
            ScalarInstant::new(0.0, 0.0).with_easing(Easing::Quad),
        ));
        node.keyframe.insert(TrackInstant::Rotation(ScalarInstant::new(10.0, 4.0)));

        sample(&mut node, 5.0);

        assert_eq!(node.position, Vec2::new(50.0, -25.0));
        assert_eq!(node.rotation, 1.0);
    }

    #[test]
    fn test_sample_before_first_key_leaves_field() {
        let mut node = Node::new("Sprite");
        node.scale = Vec2::new(3.0, 3.0);
        node.keyframe.insert(TrackInstant::Scale(Vec2Instant::new(2.0, Vec2::ONE)));

        sample(&mut node, 1.0);
        assert_eq!(node.scale, Vec2::new(3.0, 3.0));

        sample(&mut node, 7.0);
        assert_eq!(node.scale, Vec2::ONE);
    }

    #[test]
    fn test_clock_drives_whole_tree() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let parent = tree.add_child(root, "Parent", None);
        let child = tree.add_child(parent, "Child", None);
        for handle in [parent, child] {
            tree.insert_key(handle, TrackInstant::Pivot(Vec2Instant::new(0.0, Vec2::ZERO)), None);
            tree.insert_key(handle, TrackInstant::Pivot(Vec2Instant::new(4.0, Vec2::new(8.0, 0.0))), None);
        }
        let mut clock = AnimationClock::new(4.0);

        clock.set_time(1.0, &mut tree);

        assert_eq!(tree.node(parent).rotation_pivot, Vec2::new(2.0, 0.0));
        assert_eq!(tree.node(child).rotation_pivot, Vec2::new(2.0, 0.0));
    }
}
