// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversible scene edits.
//!
//! Each variant holds exactly what it needs to replay or undo one edit on a
//! [`NodeTree`]. Replays go through the tree's primitives without a history,
//! so applying an action never records another one.

use crate::node::{NodeHandle, NodeValue};
use crate::tree::NodeTree;
use kite_sequencer::TrackInstant;
use std::collections::HashSet;

/// A recorded scene edit
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A node was attached under `parent`
    AddNode {
        /// Parent the node was appended to
        parent: NodeHandle,
        /// The added node
        node: NodeHandle,
    },
    /// A node was detached from `parent`
    RemoveNode {
        /// Former parent
        parent: NodeHandle,
        /// The removed node
        node: NodeHandle,
        /// Child index before removal
        index: usize,
    },
    /// A node moved to another parent
    ReparentNode {
        /// The moved node
        node: NodeHandle,
        /// Parent before the move
        old_parent: NodeHandle,
        /// Child index before the move
        old_index: usize,
        /// Name before the move
        old_name: String,
        /// Parent after the move
        new_parent: NodeHandle,
        /// Name after the move, after collision renaming
        new_name: String,
    },
    /// Two siblings swapped places
    ReorderNode {
        /// Common parent
        parent: NodeHandle,
        /// First index
        old_index: usize,
        /// Second index
        new_index: usize,
    },
    /// A node was renamed
    RenameNode {
        /// The renamed node
        node: NodeHandle,
        /// Name before
        old_name: String,
        /// Name after
        new_name: String,
    },
    /// One property changed value
    MemberEdit {
        /// The edited node
        node: NodeHandle,
        /// Value before
        old: NodeValue,
        /// Value after
        new: NodeValue,
    },
    /// A key was inserted
    KeyframeInsert {
        /// The keyed node
        node: NodeHandle,
        /// The inserted key
        instant: TrackInstant,
    },
    /// A key was removed
    KeyframeRemove {
        /// The keyed node
        node: NodeHandle,
        /// The removed key
        instant: TrackInstant,
    },
    /// Several edits undone and redone as one
    Group(Vec<Action>),
}

impl Action {
    /// Perform the edit
    pub fn apply(&self, tree: &mut NodeTree) {
        match self {
            Self::AddNode { parent, node } => tree.attach(*parent, *node),
            Self::RemoveNode { node, .. } => tree.detach(*node),
            Self::ReparentNode {
                node,
                new_parent,
                new_name,
                ..
            } => tree.relink(*node, *new_parent, None, new_name.clone()),
            Self::ReorderNode {
                parent,
                old_index,
                new_index,
            } => tree.reorder_child(*parent, *old_index, *new_index, None),
            Self::RenameNode { node, new_name, .. } => tree.rename(*node, new_name, None),
            Self::MemberEdit { node, new, .. } => {
                tree.set_property(*node, new.clone(), None);
            }
            Self::KeyframeInsert { node, instant } => {
                tree.insert_key(*node, *instant, None);
            }
            Self::KeyframeRemove { node, instant } => {
                tree.remove_key(*node, instant.kind(), instant.time(), None);
            }
            Self::Group(actions) => {
                for action in actions {
                    action.apply(tree);
                }
            }
        }
    }

    /// Undo the edit
    pub fn revert(&self, tree: &mut NodeTree) {
        match self {
            Self::AddNode { node, .. } => tree.detach(*node),
            Self::RemoveNode { parent, node, index } => tree.attach_at(*parent, *node, *index),
            Self::ReparentNode {
                node,
                old_parent,
                old_index,
                old_name,
                ..
            } => tree.relink(*node, *old_parent, Some(*old_index), old_name.clone()),
            Self::ReorderNode {
                parent,
                old_index,
                new_index,
            } => tree.reorder_child(*parent, *new_index, *old_index, None),
            Self::RenameNode { node, old_name, .. } => tree.rename(*node, old_name, None),
            Self::MemberEdit { node, old, .. } => {
                tree.set_property(*node, old.clone(), None);
            }
            Self::KeyframeInsert { node, instant } => {
                tree.node_mut(*node).keyframe.remove_last(instant.kind(), instant.time());
            }
            Self::KeyframeRemove { node, instant } => tree.node_mut(*node).keyframe.insert_first(*instant),
            Self::Group(actions) => {
                for action in actions.iter().rev() {
                    action.revert(tree);
                }
            }
        }
    }

    /// Short label for menus and logs
    pub fn description(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "Add node",
            Self::RemoveNode { .. } => "Remove node",
            Self::ReparentNode { .. } => "Reparent node",
            Self::ReorderNode { .. } => "Reorder node",
            Self::RenameNode { .. } => "Rename node",
            Self::MemberEdit { .. } => "Edit property",
            Self::KeyframeInsert { .. } => "Insert key",
            Self::KeyframeRemove { .. } => "Remove key",
            Self::Group(_) => "Edit group",
        }
    }

    /// Add every node this action refers to
    pub fn collect_nodes(&self, out: &mut HashSet<NodeHandle>) {
        match self {
            Self::AddNode { parent, node } | Self::RemoveNode { parent, node, .. } => {
                out.insert(*parent);
                out.insert(*node);
            }
            Self::ReparentNode {
                node,
                old_parent,
                new_parent,
                ..
            } => {
                out.extend([*node, *old_parent, *new_parent]);
            }
            Self::ReorderNode { parent, .. } => {
                out.insert(*parent);
            }
            Self::RenameNode { node, .. }
            | Self::MemberEdit { node, .. }
            | Self::KeyframeInsert { node, .. }
            | Self::KeyframeRemove { node, .. } => {
                out.insert(*node);
            }
            Self::Group(actions) => {
                for action in actions {
                    action.collect_nodes(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use kite_sequencer::{TrackKind, Vec2Instant};

    #[test]
    fn test_remove_revert_restores_index() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "A", None);
        let b = tree.add_child(root, "B", None);
        tree.add_child(root, "C", None);

        tree.remove_child(root, 1, None);
        let action = Action::RemoveNode {
            parent: root,
            node: b,
            index: 1,
        };
        action.revert(&mut tree);

        assert_eq!(tree.child(root, 0), Some(a));
        assert_eq!(tree.child(root, 1), Some(b));
        assert_eq!(tree.node(b).index(), 1);
        assert_eq!(tree.node(tree.child(root, 2).unwrap()).index(), 2);

        action.apply(&mut tree);
        assert_eq!(tree.node(root).child_count(), 2);
    }

    #[test]
    fn test_group_reverts_in_reverse_order() {
        let mut tree = NodeTree::new();
        let node = tree.add_child(tree.root(), "Sprite", None);
        let first = Vec2::new(1.0, 0.0);
        let second = Vec2::new(2.0, 0.0);

        tree.set_property(node, NodeValue::Position(first), None);
        tree.set_property(node, NodeValue::Position(second), None);
        let group = Action::Group(vec![
            Action::MemberEdit {
                node,
                old: NodeValue::Position(Vec2::ZERO),
                new: NodeValue::Position(first),
            },
            Action::MemberEdit {
                node,
                old: NodeValue::Position(first),
                new: NodeValue::Position(second),
            },
        ]);

        group.revert(&mut tree);
        assert_eq!(tree.node(node).position, Vec2::ZERO);

        group.apply(&mut tree);
        assert_eq!(tree.node(node).position, second);
    }

    #[test]
    fn test_keyframe_actions_mirror() {
        let mut tree = NodeTree::new();
        let node = tree.add_child(tree.root(), "Sprite", None);
        let instant = TrackInstant::Scale(Vec2Instant::new(2.0, Vec2::splat(3.0)));
        let insert = Action::KeyframeInsert { node, instant };

        insert.apply(&mut tree);
        assert_eq!(tree.node(node).keyframe.instant_at(TrackKind::Scale, 2.0), Some(instant));

        insert.revert(&mut tree);
        assert!(tree.node(node).keyframe.is_empty());
    }

    #[test]
    fn test_keyframe_undo_with_equal_times() {
        let mut tree = NodeTree::new();
        let node = tree.add_child(tree.root(), "Sprite", None);
        let first = TrackInstant::Scale(Vec2Instant::new(1.0, Vec2::ONE));
        let second = TrackInstant::Scale(Vec2Instant::new(1.0, Vec2::splat(2.0)));
        tree.insert_key(node, first, None);
        let before = tree.node(node).keyframe.clone();

        let insert = Action::KeyframeInsert { node, instant: second };
        insert.apply(&mut tree);
        insert.revert(&mut tree);
        assert_eq!(tree.node(node).keyframe, before);

        insert.apply(&mut tree);
        let both = tree.node(node).keyframe.clone();
        let removed = tree.remove_key(node, TrackKind::Scale, 1.0, None).unwrap();
        assert_eq!(removed, first);
        Action::KeyframeRemove { node, instant: removed }.revert(&mut tree);
        assert_eq!(tree.node(node).keyframe, both);
    }

    #[test]
    fn test_collect_nodes_walks_groups() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "A", None);
        let b = tree.add_child(root, "B", None);
        let group = Action::Group(vec![
            Action::AddNode { parent: root, node: a },
            Action::RenameNode {
                node: b,
                old_name: "B".into(),
                new_name: "C".into(),
            },
        ]);

        let mut nodes = HashSet::new();
        group.collect_nodes(&mut nodes);

        assert_eq!(nodes, HashSet::from([root, a, b]));
    }
}
