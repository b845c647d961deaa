// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo history.
//!
//! Actions sit in one list with a cursor on the last applied one. Undo
//! reverts at the cursor and steps back; redo steps forward and applies.
//! Pushing discards everything after the cursor.

use crate::action::Action;
use crate::node::NodeHandle;
use crate::tree::NodeTree;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Default maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Actions that can be undone
    pub undo_count: usize,
    /// Actions that can be redone
    pub redo_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug, Clone)]
pub struct History {
    actions: VecDeque<Action>,
    /// Index of the last applied action; `None` when nothing is applied
    cursor: Option<usize>,
    max_length: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_length(MAX_HISTORY)
    }

    /// Create with custom maximum length
    pub fn with_max_length(max_length: usize) -> Self {
        assert!(max_length > 0, "history length must be at least one");
        Self {
            actions: VecDeque::new(),
            cursor: None,
            max_length,
        }
    }

    /// Record an action that has already been performed
    pub fn push(&mut self, action: Action) {
        if matches!(&action, Action::Group(actions) if actions.is_empty()) {
            return;
        }

        let kept = self.undo_depth();
        if kept < self.actions.len() {
            tracing::debug!("Discarding {} redoable actions", self.actions.len() - kept);
            self.actions.truncate(kept);
        }

        tracing::debug!("Recorded: {}", action.description());
        self.actions.push_back(action);

        // Enforce history limit
        while self.actions.len() > self.max_length {
            self.actions.pop_front();
        }
        self.cursor = Some(self.actions.len() - 1);
    }

    /// Revert the last applied action
    pub fn undo(&mut self, tree: &mut NodeTree) -> Result<()> {
        let cursor = self.cursor.ok_or(HistoryError::NothingToUndo)?;
        let action = &self.actions[cursor];

        tracing::debug!("Undo: {}", action.description());
        action.revert(tree);
        self.cursor = cursor.checked_sub(1);
        Ok(())
    }

    /// Re-apply the next undone action
    pub fn redo(&mut self, tree: &mut NodeTree) -> Result<()> {
        let next = self.undo_depth();
        let action = self.actions.get(next).ok_or(HistoryError::NothingToRedo)?;

        tracing::debug!("Redo: {}", action.description());
        action.apply(tree);
        self.cursor = Some(next);
        Ok(())
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.undo_depth() < self.actions.len()
    }

    /// Number of actions that can be undone
    pub fn undo_depth(&self) -> usize {
        self.cursor.map_or(0, |cursor| cursor + 1)
    }

    /// Number of actions that can be redone
    pub fn redo_depth(&self) -> usize {
        self.actions.len() - self.undo_depth()
    }

    /// Total recorded actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Index of the last applied action
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Maximum number of kept actions
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.actions.clear();
        self.cursor = None;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_depth(),
            redo_count: self.redo_depth(),
            max_depth: self.max_length,
        }
    }

    /// Get description of next undo action
    pub fn undo_description(&self) -> Option<&'static str> {
        self.cursor.map(|cursor| self.actions[cursor].description())
    }

    /// Get description of next redo action
    pub fn redo_description(&self) -> Option<&'static str> {
        self.actions.get(self.undo_depth()).map(Action::description)
    }

    /// Every node some recorded action refers to
    pub fn referenced_nodes(&self) -> HashSet<NodeHandle> {
        let mut nodes = HashSet::new();
        for action in &self.actions {
            action.collect_nodes(&mut nodes);
        }
        nodes
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
