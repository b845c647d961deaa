// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node selection.
//!
//! The selection list and each node's `selected` flag are changed together
//! through [`NodeTree`] so the two never disagree.

use crate::node::NodeHandle;
use crate::tree::NodeTree;
use indexmap::IndexSet;

/// Selected nodes in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: IndexSet<NodeHandle>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a node is selected
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains(&node)
    }

    /// Number of selected nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing is selected
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate in selection order
    pub fn iter(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes.iter().copied()
    }

    /// The most recently selected node
    pub fn primary(&self) -> Option<NodeHandle> {
        self.nodes.last().copied()
    }

    /// Copy the selection out, e.g. before mutating the tree
    pub fn to_vec(&self) -> Vec<NodeHandle> {
        self.nodes.iter().copied().collect()
    }
}

impl NodeTree {
    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Deselect everything
    pub fn reset_selection(&mut self) {
        for handle in self.selection.nodes.drain(..) {
            if let Some(node) = self.nodes.get_mut(handle) {
                node.selected = false;
            }
        }
    }

    /// Replace the selection with a single node
    pub fn new_selection(&mut self, node: NodeHandle) {
        self.reset_selection();
        self.add_selection(node);
    }

    /// Add a node to the selection; already selected nodes stay put
    pub fn add_selection(&mut self, node: NodeHandle) {
        self.node_mut(node).selected = true;
        self.selection.nodes.insert(node);
    }

    /// Remove a node from the selection
    pub fn sub_selection(&mut self, node: NodeHandle) {
        self.node_mut(node).selected = false;
        self.selection.nodes.shift_remove(&node);
    }

    /// Flip a node's selection state
    pub fn invert_selection(&mut self, node: NodeHandle) {
        if self.node(node).selected {
            self.sub_selection(node);
        } else {
            self.add_selection(node);
        }
    }

    pub(crate) fn deselect_subtree(&mut self, node: NodeHandle) {
        for handle in self.pre_order(node) {
            if self.node(handle).selected {
                self.sub_selection(handle);
            }
        }
    }
}
