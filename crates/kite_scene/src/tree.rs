// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node tree: an arena of nodes hanging off a permanent root.
//!
//! Every mutation takes an optional [`History`]. Passing one records the
//! inverse [`Action`]; actions replay the same primitives with `None`, so
//! undo and redo never record anything themselves.
//!
//! Removed nodes are unlinked but stay in the arena so an action can
//! re-attach them later. [`NodeTree::purge_detached`] drops the ones no
//! action refers to any more.

use crate::action::Action;
use crate::history::History;
use crate::node::{next_name, Node, NodeHandle, NodeValue};
use crate::selection::Selection;
use kite_sequencer::{TrackInstant, TrackKind};
use slotmap::SlotMap;
use std::cell::Cell;
use std::collections::HashSet;

/// Name given to the root of a new tree
pub const ROOT_NAME: &str = "Root";

/// Scene hierarchy with selection
#[derive(Debug)]
pub struct NodeTree {
    pub(crate) nodes: SlotMap<NodeHandle, Node>,
    pub(crate) root: NodeHandle,
    pub(crate) selection: Selection,
    walk_depth: Cell<u32>,
}

impl Clone for NodeTree {
    /// Copies nodes and selection; the copy is never mid-traversal
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            selection: self.selection.clone(),
            walk_depth: Cell::new(0),
        }
    }
}

/// Marks a traversal in progress for as long as it lives
pub(crate) struct WalkGuard<'a> {
    depth: &'a Cell<u32>,
}

impl Drop for WalkGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl NodeTree {
    /// Create a tree holding only the root
    pub fn new() -> Self {
        Self::with_root(Node::new(ROOT_NAME))
    }

    pub(crate) fn with_root(mut root: Node) -> Self {
        root.parent = None;
        root.index = 0;
        root.children.clear();
        root.selected = false;

        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            selection: Selection::new(),
            walk_depth: Cell::new(0),
        }
    }

    /// The root node, present for the tree's whole life
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Look up a node
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Look up a node mutably.
    ///
    /// Only the public transform and presentation fields are reachable this
    /// way; such edits are not recorded.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Node behind a handle that must be live
    pub fn node(&self, handle: NodeHandle) -> &Node {
        match self.nodes.get(handle) {
            Some(node) => node,
            None => panic!("stale node handle {handle:?}"),
        }
    }

    /// Mutable node behind a handle that must be live
    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut Node {
        match self.nodes.get_mut(handle) {
            Some(node) => node,
            None => panic!("stale node handle {handle:?}"),
        }
    }

    /// Whether the handle refers to a stored node, attached or not
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    /// Number of nodes reachable from the root, root included
    pub fn len(&self) -> usize {
        self.pre_order(self.root).len()
    }

    /// Never true: the root is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of nodes stored, including detached ones kept for undo
    pub fn stored_len(&self) -> usize {
        self.nodes.len()
    }

    /// Child of `parent` at `idx`
    pub fn child(&self, parent: NodeHandle, idx: usize) -> Option<NodeHandle> {
        self.get(parent)?.children.get(idx).copied()
    }

    /// Child of `parent` called `name`
    pub fn find_child(&self, parent: NodeHandle, name: &str) -> Option<NodeHandle> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, handle: NodeHandle) -> bool {
        let mut current = handle;
        loop {
            if current == self.root {
                return true;
            }
            match self.get(current).and_then(Node::parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` lies on the parent chain of `node`
    pub fn is_descendant_of(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = self.get(node).and_then(Node::parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.node(handle).parent;
        }
        false
    }

    /// Whether no child of `parent` is called `name`
    pub fn child_name_available(&self, parent: NodeHandle, name: &str) -> bool {
        self.find_child(parent, name).is_none()
    }

    /// Next free sibling name derived from `name`, always bumping its number
    pub fn next_child_name(&self, parent: NodeHandle, name: &str) -> String {
        next_name(name, |candidate| !self.child_name_available(parent, candidate))
    }

    fn unique_child_name(&self, parent: NodeHandle, name: &str) -> String {
        if self.child_name_available(parent, name) {
            name.to_string()
        } else {
            self.next_child_name(parent, name)
        }
    }

    /// Whether a traversal is currently running
    pub fn is_walking(&self) -> bool {
        self.walk_depth.get() != 0
    }

    pub(crate) fn begin_walk(&self) -> WalkGuard<'_> {
        self.walk_depth.set(self.walk_depth.get() + 1);
        WalkGuard {
            depth: &self.walk_depth,
        }
    }

    fn assert_not_walking(&self) {
        assert!(
            !self.is_walking(),
            "structural mutation of the node tree during a traversal"
        );
    }

    fn expect_child(&self, parent: NodeHandle, idx: usize) -> NodeHandle {
        let count = self.node(parent).children.len();
        match self.child(parent, idx) {
            Some(child) => child,
            None => panic!("child index {idx} out of range for a node with {count} children"),
        }
    }

    // === Structural edits ===

    /// Add a new child called `name`, renamed if a sibling already uses it
    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        name: &str,
        history: Option<&mut History>,
    ) -> NodeHandle {
        self.assert_not_walking();

        let name = self.unique_child_name(parent, name);
        let node = self.nodes.insert(Node::new(name));
        self.push_child(parent, node);
        tracing::debug!("Added node {:?} under {:?}", self.node(node).name, self.node(parent).name);

        if let Some(history) = history {
            history.push(Action::AddNode { parent, node });
        }
        node
    }

    /// Append a deep copy of the child at `idx`, keyframes and descendants included
    pub fn duplicate_child(
        &mut self,
        parent: NodeHandle,
        idx: usize,
        history: Option<&mut History>,
    ) -> NodeHandle {
        self.assert_not_walking();

        let source = self.expect_child(parent, idx);
        let copy = self.clone_subtree(source);
        let name = self.next_child_name(parent, &self.node(source).name);
        self.node_mut(copy).name = name;
        self.push_child(parent, copy);
        tracing::debug!("Duplicated {:?} as {:?}", self.node(source).name, self.node(copy).name);

        if let Some(history) = history {
            history.push(Action::AddNode {
                parent,
                node: copy,
            });
        }
        copy
    }

    /// Detach the child at `idx`; it and its descendants leave the selection
    pub fn remove_child(
        &mut self,
        parent: NodeHandle,
        idx: usize,
        history: Option<&mut History>,
    ) -> NodeHandle {
        self.assert_not_walking();

        let node = self.expect_child(parent, idx);
        self.unlink(node);
        self.deselect_subtree(node);
        tracing::debug!("Removed node {:?}", self.node(node).name);

        if let Some(history) = history {
            history.push(Action::RemoveNode {
                parent,
                node,
                index: idx,
            });
        }
        node
    }

    /// Move `node` under `new_parent`.
    ///
    /// Returns `false` without touching anything when `new_parent` is the
    /// current parent, `node` itself or one of its descendants, or when
    /// `node` has no parent.
    pub fn reparent(
        &mut self,
        node: NodeHandle,
        new_parent: NodeHandle,
        history: Option<&mut History>,
    ) -> bool {
        self.assert_not_walking();

        let Some(old_parent) = self.node(node).parent else {
            return false;
        };
        if old_parent == new_parent || node == new_parent || self.is_descendant_of(new_parent, node) {
            return false;
        }

        let old_index = self.node(node).index;
        let old_name = self.node(node).name.clone();
        let new_name = self.unique_child_name(new_parent, &old_name);

        self.relink(node, new_parent, None, new_name.clone());
        tracing::debug!("Reparented {:?} under {:?}", new_name, self.node(new_parent).name);

        if let Some(history) = history {
            history.push(Action::ReparentNode {
                node,
                old_parent,
                old_index,
                old_name,
                new_parent,
                new_name,
            });
        }
        true
    }

    /// Swap the children at `old_idx` and `new_idx`
    pub fn reorder_child(
        &mut self,
        parent: NodeHandle,
        old_idx: usize,
        new_idx: usize,
        history: Option<&mut History>,
    ) {
        self.assert_not_walking();

        let count = self.node(parent).children.len();
        assert!(
            old_idx < count && new_idx < count,
            "reorder {old_idx} <-> {new_idx} out of range for a node with {count} children"
        );

        self.node_mut(parent).children.swap(old_idx, new_idx);
        self.reindex_children(parent);
        tracing::debug!("Swapped children {old_idx} and {new_idx} of {:?}", self.node(parent).name);

        if let Some(history) = history {
            history.push(Action::ReorderNode {
                parent,
                old_index: old_idx,
                new_index: new_idx,
            });
        }
    }

    /// Rename unconditionally; sibling collisions are the caller's concern
    pub fn rename(&mut self, node: NodeHandle, name: &str, history: Option<&mut History>) {
        let old_name = std::mem::replace(&mut self.node_mut(node).name, name.to_string());
        tracing::debug!("Renamed {old_name:?} to {name:?}");

        if let Some(history) = history {
            history.push(Action::RenameNode {
                node,
                old_name,
                new_name: name.to_string(),
            });
        }
    }

    // === Property and keyframe edits ===

    /// Set one property, returning the previous value
    pub fn set_property(
        &mut self,
        node: NodeHandle,
        value: NodeValue,
        history: Option<&mut History>,
    ) -> NodeValue {
        let old = self.node_mut(node).set(value.clone());

        if let Some(history) = history {
            history.push(Action::MemberEdit {
                node,
                old: old.clone(),
                new: value,
            });
        }
        old
    }

    /// Insert a key into the node's matching track.
    ///
    /// Keys at a non-finite time are refused and nothing is recorded.
    pub fn insert_key(
        &mut self,
        node: NodeHandle,
        instant: TrackInstant,
        history: Option<&mut History>,
    ) -> bool {
        if !instant.time().is_finite() {
            tracing::warn!("Refused key at non-finite time {} on {:?}", instant.time(), self.node(node).name);
            return false;
        }
        self.node_mut(node).keyframe.insert(instant);

        if let Some(history) = history {
            history.push(Action::KeyframeInsert { node, instant });
        }
        true
    }

    /// Remove the first key at exactly `time` from one of the node's tracks
    pub fn remove_key(
        &mut self,
        node: NodeHandle,
        kind: TrackKind,
        time: f64,
        history: Option<&mut History>,
    ) -> Option<TrackInstant> {
        let instant = self.node_mut(node).keyframe.remove(kind, time)?;

        if let Some(history) = history {
            history.push(Action::KeyframeRemove { node, instant });
        }
        Some(instant)
    }

    /// Key all four tracks at the node's current values
    pub fn save_all_properties(&mut self, node: NodeHandle, time: f64, history: Option<&mut History>) {
        let keys = self.node(node).key_all_properties(time);
        for instant in keys {
            self.node_mut(node).keyframe.insert(instant);
        }

        if let Some(history) = history {
            let actions = keys
                .into_iter()
                .map(|instant| Action::KeyframeInsert { node, instant })
                .collect();
            history.push(Action::Group(actions));
        }
    }

    // === Primitives shared with actions ===

    /// Append a detached node, renaming it on collision
    pub(crate) fn attach(&mut self, parent: NodeHandle, node: NodeHandle) {
        self.assert_not_walking();

        let name = self.unique_child_name(parent, &self.node(node).name);
        self.node_mut(node).name = name;
        self.push_child(parent, node);
    }

    /// Insert a detached node at `index` without renaming
    pub(crate) fn attach_at(&mut self, parent: NodeHandle, node: NodeHandle, index: usize) {
        self.assert_not_walking();

        let children = &mut self.node_mut(parent).children;
        assert!(index <= children.len(), "insert index {index} out of range");
        children.insert(index, node);
        self.node_mut(node).parent = Some(parent);
        self.reindex_children(parent);
    }

    /// Detach a node from wherever it is and re-attach it under `parent`
    pub(crate) fn relink(&mut self, node: NodeHandle, parent: NodeHandle, index: Option<usize>, name: String) {
        self.assert_not_walking();

        self.unlink(node);
        self.node_mut(node).name = name;
        match index {
            Some(index) => self.attach_at(parent, node, index),
            None => self.push_child(parent, node),
        }
    }

    /// Detach `node` and deselect its subtree
    pub(crate) fn detach(&mut self, node: NodeHandle) {
        self.assert_not_walking();

        self.unlink(node);
        self.deselect_subtree(node);
    }

    fn push_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        let parent_node = self.node_mut(parent);
        parent_node.children.push(child);
        let index = parent_node.children.len() - 1;

        let child_node = self.node_mut(child);
        child_node.parent = Some(parent);
        child_node.index = index;
    }

    fn unlink(&mut self, node: NodeHandle) {
        let Some(parent) = self.node(node).parent else {
            return;
        };
        let index = self.node(node).index;

        let siblings = &mut self.node_mut(parent).children;
        assert_eq!(siblings.get(index), Some(&node), "node index out of sync with its parent");
        siblings.remove(index);
        self.reindex_children(parent);

        let node = self.node_mut(node);
        node.parent = None;
        node.index = 0;
    }

    fn reindex_children(&mut self, parent: NodeHandle) {
        let children = self.node(parent).children.clone();
        for (index, child) in children.into_iter().enumerate() {
            self.node_mut(child).index = index;
        }
    }

    fn clone_subtree(&mut self, source: NodeHandle) -> NodeHandle {
        let mut copy = self.node(source).clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        copy.selected = false;

        let handle = self.nodes.insert(copy);
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.push_child(handle, child_copy);
        }
        handle
    }

    /// Drop stored nodes that are neither attached nor part of a subtree
    /// containing one of `keep`. Returns how many were dropped.
    pub fn purge_detached(&mut self, keep: &HashSet<NodeHandle>) -> usize {
        self.assert_not_walking();

        let mut live: HashSet<NodeHandle> = self.pre_order(self.root).into_iter().collect();
        for &handle in keep {
            if !self.contains(handle) || live.contains(&handle) {
                continue;
            }
            let mut top = handle;
            while let Some(parent) = self.node(top).parent {
                top = parent;
            }
            live.extend(self.pre_order(top));
        }

        let before = self.nodes.len();
        self.nodes.retain(|handle, _| live.contains(&handle));
        let purged = before - self.nodes.len();
        if purged > 0 {
            tracing::debug!("Purged {purged} detached nodes");
        }
        purged
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use kite_sequencer::{ScalarInstant, Vec2Instant};

    fn names(tree: &NodeTree, parent: NodeHandle) -> Vec<String> {
        tree.node(parent)
            .children()
            .iter()
            .map(|&child| tree.node(child).name().to_string())
            .collect()
    }

    fn assert_indices_contiguous(tree: &NodeTree, parent: NodeHandle) {
        for (expected, &child) in tree.node(parent).children().iter().enumerate() {
            assert_eq!(tree.node(child).index(), expected);
            assert_eq!(tree.node(child).parent(), Some(parent));
        }
    }

    #[test]
    fn test_add_child_renames_on_collision() {
        let mut tree = NodeTree::new();
        let root = tree.root();

        tree.add_child(root, "Layer", None);
        tree.add_child(root, "Layer", None);
        tree.add_child(root, "Layer", None);

        assert_eq!(names(&tree, root), ["Layer", "Layer1", "Layer2"]);
        assert_indices_contiguous(&tree, root);
    }

    #[test]
    fn test_remove_child_reindexes_and_deselects() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "A", None);
        let b = tree.add_child(root, "B", None);
        let b_child = tree.add_child(b, "Inner", None);
        tree.add_child(root, "C", None);
        tree.add_selection(b_child);
        tree.add_selection(a);

        let removed = tree.remove_child(root, 1, None);

        assert_eq!(removed, b);
        assert_eq!(names(&tree, root), ["A", "C"]);
        assert_indices_contiguous(&tree, root);
        assert!(!tree.is_attached(b_child));
        assert!(!tree.node(b_child).is_selected());
        assert_eq!(tree.selection().len(), 1);
        assert!(tree.contains(b));
    }

    #[test]
    fn test_duplicate_copies_subtree_and_keys() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let sprite = tree.add_child(root, "Sprite", None);
        tree.add_child(sprite, "Shadow", None);
        tree.insert_key(sprite, TrackInstant::Rotation(ScalarInstant::new(1.0, 2.0)), None);
        tree.new_selection(sprite);

        let copy = tree.duplicate_child(root, 0, None);

        assert_eq!(names(&tree, root), ["Sprite", "Sprite1"]);
        assert!(!tree.node(copy).is_selected());
        assert_eq!(tree.node(copy).keyframe, tree.node(sprite).keyframe);
        assert_eq!(names(&tree, copy), ["Shadow"]);

        let shadow_copy = tree.node(copy).children()[0];
        assert_ne!(shadow_copy, tree.node(sprite).children()[0]);
        assert_eq!(tree.node(shadow_copy).parent(), Some(copy));
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let parent = tree.add_child(root, "Parent", None);
        let child = tree.add_child(parent, "Child", None);
        let grandchild = tree.add_child(child, "Grandchild", None);
        let mut history = History::new();

        assert!(!tree.reparent(parent, grandchild, Some(&mut history)));
        assert!(!tree.reparent(parent, parent, Some(&mut history)));
        assert!(!tree.reparent(child, parent, Some(&mut history)));
        assert!(!tree.reparent(root, parent, Some(&mut history)));

        assert!(history.is_empty());
        assert_eq!(tree.node(grandchild).parent(), Some(child));
        assert_eq!(tree.node(parent).parent(), Some(root));
    }

    #[test]
    fn test_reparent_renames_and_reindexes() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let left = tree.add_child(root, "Left", None);
        let right = tree.add_child(root, "Right", None);
        tree.add_child(left, "Item", None);
        let moving = tree.add_child(right, "Item", None);
        tree.add_child(right, "Other", None);

        assert!(tree.reparent(moving, left, None));

        assert_eq!(names(&tree, left), ["Item", "Item1"]);
        assert_eq!(names(&tree, right), ["Other"]);
        assert_indices_contiguous(&tree, left);
        assert_indices_contiguous(&tree, right);
    }

    #[test]
    fn test_reorder_swaps() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        for name in ["A", "B", "C"] {
            tree.add_child(root, name, None);
        }

        tree.reorder_child(root, 0, 2, None);

        assert_eq!(names(&tree, root), ["C", "B", "A"]);
        assert_indices_contiguous(&tree, root);
    }

    #[test]
    fn test_rename_and_reorder_are_recorded() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "A", None);
        tree.add_child(root, "B", None);
        let mut history = History::new();

        tree.rename(a, "First", Some(&mut history));
        tree.reorder_child(root, 0, 1, Some(&mut history));
        assert_eq!(names(&tree, root), ["B", "First"]);

        history.undo(&mut tree).unwrap();
        history.undo(&mut tree).unwrap();
        assert_eq!(names(&tree, root), ["A", "B"]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_remove_out_of_range_is_fatal() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.remove_child(root, 0, None);
    }

    #[test]
    #[should_panic(expected = "during a traversal")]
    fn test_structural_edit_during_walk_is_fatal() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.walk_depth.set(1);
        tree.add_child(root, "Late", None);
    }

    #[test]
    fn test_walk_guard_unwinds() {
        let tree = NodeTree::new();
        {
            let _outer = tree.begin_walk();
            let _inner = tree.begin_walk();
            assert!(tree.is_walking());
        }
        assert!(!tree.is_walking());
    }

    #[test]
    fn test_clone_taken_during_walk_is_editable() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.add_child(root, "Sprite", None);

        let mut copies = Vec::new();
        tree.for_each(|_, _| copies.push(tree.clone()));

        assert_eq!(copies.len(), 2);
        let mut copy = copies.remove(0);
        assert!(!copy.is_walking());
        copy.add_child(root, "Late", None);
        assert_eq!(names(&copy, root), ["Sprite", "Late"]);
        assert_eq!(names(&tree, root), ["Sprite"]);
    }

    #[test]
    fn test_non_finite_key_is_refused() {
        let mut tree = NodeTree::new();
        let sprite = tree.add_child(tree.root(), "Sprite", None);
        let mut history = History::new();

        let key = |time| TrackInstant::Rotation(ScalarInstant::new(time, 1.0));

        assert!(!tree.insert_key(sprite, key(f64::NAN), Some(&mut history)));
        assert!(!tree.insert_key(sprite, key(f64::INFINITY), Some(&mut history)));
        assert!(tree.insert_key(sprite, key(1.0), Some(&mut history)));

        assert_eq!(history.len(), 1);
        assert_eq!(tree.node(sprite).keyframe.track_len(TrackKind::Rotation), 1);
    }

    #[test]
    fn test_save_all_properties_keys_every_track() {
        let mut tree = NodeTree::new();
        let sprite = tree.add_child(tree.root(), "Sprite", None);
        tree.node_mut(sprite).position = Vec2::new(4.0, 2.0);
        let mut history = History::new();

        tree.save_all_properties(sprite, 1.5, Some(&mut history));

        let keyframe = &tree.node(sprite).keyframe;
        assert_eq!(
            keyframe.instant_at(TrackKind::Position, 1.5),
            Some(TrackInstant::Position(Vec2Instant::new(1.5, Vec2::new(4.0, 2.0))))
        );
        for kind in TrackKind::ALL {
            assert_eq!(keyframe.track_len(kind), 1);
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_purge_keeps_referenced_subtrees() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let kept = tree.add_child(root, "Kept", None);
        let kept_child = tree.add_child(kept, "KeptChild", None);
        let dropped = tree.add_child(root, "Dropped", None);
        tree.remove_child(root, 1, None);
        tree.remove_child(root, 0, None);

        let purged = tree.purge_detached(&HashSet::from([kept_child]));

        assert_eq!(purged, 1);
        assert!(tree.contains(kept));
        assert!(tree.contains(kept_child));
        assert!(!tree.contains(dropped));
        assert_eq!(tree.stored_len(), 3);
    }
}
