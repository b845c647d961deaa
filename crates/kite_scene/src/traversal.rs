// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tree walks, draw order and picking.
//!
//! Draw order ascends by layer; within a layer it follows tree order, with
//! siblings by index and an ancestor before its descendants. The topmost
//! node under the cursor is the last one in that order.

use crate::node::{Node, NodeHandle};
use crate::tree::NodeTree;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

/// What the renderer needs to draw one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    /// Node name
    pub name: String,
    /// Draw-order layer
    pub layer: i32,
    /// Position in scene units
    pub position: Vec2,
    /// Scale per axis
    pub scale: Vec2,
    /// Rotation in radians
    pub rotation: f64,
    /// Rotation pivot in scene coordinates
    pub pivot: Vec2,
    /// Texture reference
    pub texture: Option<String>,
}

impl RenderItem {
    fn from_node(node: &Node) -> Self {
        Self {
            name: node.name().to_string(),
            layer: node.layer,
            position: node.position,
            scale: node.scale,
            rotation: node.rotation,
            pivot: node.pivot_position(),
            texture: node.texture.clone(),
        }
    }
}

impl NodeTree {
    /// Handles of `from` and its descendants, parents before children
    pub fn pre_order(&self, from: NodeHandle) -> Vec<NodeHandle> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(handle) = stack.pop() {
            order.push(handle);
            stack.extend(self.node(handle).children.iter().rev().copied());
        }
        order
    }

    /// Handles of `from` and its descendants, children before parents
    pub fn post_order(&self, from: NodeHandle) -> Vec<NodeHandle> {
        let mut order = Vec::new();
        let mut stack = vec![(from, false)];
        while let Some((handle, expanded)) = stack.pop() {
            if expanded {
                order.push(handle);
            } else {
                stack.push((handle, true));
                stack.extend(self.node(handle).children.iter().rev().map(|&child| (child, false)));
            }
        }
        order
    }

    /// Visit every attached node depth-first, parents first
    pub fn for_each(&self, mut f: impl FnMut(NodeHandle, &Node)) {
        let _walk = self.begin_walk();
        for handle in self.pre_order(self.root) {
            f(handle, self.node(handle));
        }
    }

    /// Visit every attached node depth-first with mutable access to its data
    pub fn for_each_mut(&mut self, mut f: impl FnMut(NodeHandle, &mut Node)) {
        for handle in self.pre_order(self.root) {
            f(handle, self.node_mut(handle));
        }
    }

    /// Visit nodes front to back of the draw order: layers ascending, pre-order within a layer
    pub fn for_each_by_layer_ascending(&self, mut f: impl FnMut(NodeHandle, &Node)) {
        let _walk = self.begin_walk();
        for handle in self.draw_order() {
            f(handle, self.node(handle));
        }
    }

    /// Visit layers descending, post-order within a layer
    pub fn for_each_by_layer_descending(&self, mut f: impl FnMut(NodeHandle, &Node)) {
        let _walk = self.begin_walk();
        let mut order = self.post_order(self.root);
        order.sort_by_key(|&handle| Reverse(self.node(handle).layer));
        for handle in order {
            f(handle, self.node(handle));
        }
    }

    /// Attached nodes in ascending draw order
    pub fn draw_order(&self) -> Vec<NodeHandle> {
        let mut order = self.pre_order(self.root);
        order.sort_by_key(|&handle| self.node(handle).layer);
        order
    }

    /// Compare two nodes by draw order
    pub fn compare_draw_order(&self, a: NodeHandle, b: NodeHandle) -> Ordering {
        let (node_a, node_b) = (self.node(a), self.node(b));
        node_a
            .layer
            .cmp(&node_b.layer)
            .then_with(|| self.index_path(a).cmp(&self.index_path(b)))
    }

    // Child indices from the top of the node's tree down to the node. An
    // ancestor's path is a prefix of its descendants' paths, so it sorts first.
    fn index_path(&self, handle: NodeHandle) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            path.push(self.node(current).index);
            current = parent;
        }
        path.reverse();
        path
    }

    /// The candidate drawn on top
    pub fn pick_topmost(&self, candidates: impl IntoIterator<Item = NodeHandle>) -> Option<NodeHandle> {
        candidates
            .into_iter()
            .max_by(|&a, &b| self.compare_draw_order(a, b))
    }

    /// Topmost textured node for which `hit` returns true
    pub fn node_at(&self, mut hit: impl FnMut(&Node) -> bool) -> Option<NodeHandle> {
        let mut candidates = Vec::new();
        self.for_each(|handle, node| {
            if node.texture.is_some() && hit(node) {
                candidates.push(handle);
            }
        });
        self.pick_topmost(candidates)
    }

    /// Whether any node on `layer` has a texture
    pub fn layer_has_texture(&self, layer: i32) -> bool {
        let mut found = false;
        self.for_each(|_, node| found |= node.layer == layer && node.texture.is_some());
        found
    }

    /// Visible nodes in the order they are painted
    pub fn render_list(&self) -> Vec<RenderItem> {
        let mut items = Vec::new();
        self.for_each_by_layer_descending(|_, node| {
            if node.visible {
                items.push(RenderItem::from_node(node));
            }
        });
        items
    }
}
