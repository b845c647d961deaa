// SPDX-License-Identifier: MIT OR Apache-2.0
//! An open project: tree, history and clock edited together.
//!
//! All edits made through [`Document`] are recorded. After each recorded
//! edit, nodes that are detached and no longer referenced by any action are
//! dropped from the arena.

use crate::action::Action;
use crate::history::{self, History};
use crate::node::{NodeHandle, NodeProperty, NodeValue};
use crate::project::{self, ProjectFile, ProjectHeader, ProjectPreferences, PROJECT_FORMAT_VERSION};
use crate::tree::NodeTree;
use kite_sequencer::{AnimationClock, TrackInstant, TrackKind};
use std::path::{Path, PathBuf};

/// Editing session for one project
#[derive(Debug, Clone)]
pub struct Document {
    header: ProjectHeader,
    preferences: ProjectPreferences,
    tree: NodeTree,
    history: History,
    clock: AnimationClock,
    dirty: bool,
}

impl Document {
    /// Create an empty project
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, max_history: usize) -> Self {
        let header = ProjectHeader::new(name, path);
        tracing::info!("Created new project: {}", header.name);
        Self {
            header,
            preferences: ProjectPreferences::default(),
            tree: NodeTree::new(),
            history: History::with_max_length(max_history),
            clock: AnimationClock::default(),
            dirty: false,
        }
    }

    /// Project identity
    pub fn header(&self) -> &ProjectHeader {
        &self.header
    }

    /// Project settings
    pub fn preferences(&self) -> &ProjectPreferences {
        &self.preferences
    }

    /// Project settings, for editing
    pub fn preferences_mut(&mut self) -> &mut ProjectPreferences {
        self.dirty = true;
        &mut self.preferences
    }

    /// The node tree
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// The node tree for unrecorded edits, such as a drag in progress
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        self.dirty = true;
        &mut self.tree
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Playback clock
    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    /// Check for unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn recorded(&mut self) {
        self.dirty = true;
        let referenced = self.history.referenced_nodes();
        self.tree.purge_detached(&referenced);
    }

    // === Recorded edits ===

    /// Add a child node
    pub fn add_node(&mut self, parent: NodeHandle, name: &str) -> NodeHandle {
        let node = self.tree.add_child(parent, name, Some(&mut self.history));
        self.recorded();
        node
    }

    /// Duplicate a node next to itself; the root cannot be duplicated
    pub fn duplicate_node(&mut self, node: NodeHandle) -> Option<NodeHandle> {
        let parent = self.tree.node(node).parent()?;
        let index = self.tree.node(node).index();
        let copy = self.tree.duplicate_child(parent, index, Some(&mut self.history));
        self.recorded();
        Some(copy)
    }

    /// Remove a node and its subtree; returns `false` for the root
    pub fn remove_node(&mut self, node: NodeHandle) -> bool {
        let Some(parent) = self.tree.node(node).parent() else {
            return false;
        };
        let index = self.tree.node(node).index();
        self.tree.remove_child(parent, index, Some(&mut self.history));
        self.recorded();
        true
    }

    /// Move a node under another parent
    pub fn reparent(&mut self, node: NodeHandle, new_parent: NodeHandle) -> bool {
        let moved = self.tree.reparent(node, new_parent, Some(&mut self.history));
        if moved {
            self.recorded();
        }
        moved
    }

    /// Swap two children of `parent`
    pub fn reorder(&mut self, parent: NodeHandle, old_idx: usize, new_idx: usize) {
        self.tree
            .reorder_child(parent, old_idx, new_idx, Some(&mut self.history));
        self.recorded();
    }

    /// Rename a node
    pub fn rename(&mut self, node: NodeHandle, name: &str) {
        self.tree.rename(node, name, Some(&mut self.history));
        self.recorded();
    }

    /// Set one property
    pub fn set_property(&mut self, node: NodeHandle, value: NodeValue) {
        self.tree.set_property(node, value, Some(&mut self.history));
        self.recorded();
    }

    /// Insert a key; keys at a non-finite time are refused
    pub fn insert_key(&mut self, node: NodeHandle, instant: TrackInstant) -> bool {
        let inserted = self.tree.insert_key(node, instant, Some(&mut self.history));
        if inserted {
            self.recorded();
        }
        inserted
    }

    /// Remove a key
    pub fn remove_key(&mut self, node: NodeHandle, kind: TrackKind, time: f64) -> Option<TrackInstant> {
        let removed = self.tree.remove_key(node, kind, time, Some(&mut self.history))?;
        self.recorded();
        Some(removed)
    }

    /// Key all four tracks of a node at the current time
    pub fn save_all_properties(&mut self, node: NodeHandle) {
        let time = self.clock.time();
        self.tree.save_all_properties(node, time, Some(&mut self.history));
        self.recorded();
    }

    /// Remove every selected node as one undoable step.
    ///
    /// The root is skipped, as are nodes already removed along with a
    /// selected ancestor. Returns how many nodes were removed.
    pub fn delete_selected(&mut self) -> usize {
        let mut actions = Vec::new();
        for node in self.tree.selection().to_vec() {
            if !self.tree.is_attached(node) {
                continue;
            }
            let Some(parent) = self.tree.node(node).parent() else {
                continue;
            };
            let index = self.tree.node(node).index();
            self.tree.remove_child(parent, index, None);
            actions.push(Action::RemoveNode { parent, node, index });
        }

        let removed = actions.len();
        tracing::info!("Deleting {} nodes", removed);
        if removed > 0 {
            self.history.push(Action::Group(actions));
            self.recorded();
        }
        removed
    }

    /// Current values of `property` on `nodes`, taken before a drag
    pub fn snapshot(&self, nodes: &[NodeHandle], property: NodeProperty) -> Vec<(NodeHandle, NodeValue)> {
        nodes
            .iter()
            .map(|&node| (node, self.tree.node(node).get(property)))
            .collect()
    }

    /// Record a finished drag as one undoable step.
    ///
    /// `before` holds the values from [`Document::snapshot`]; the nodes'
    /// current values are the new ones. Unchanged values are left out.
    pub fn commit_edits(&mut self, before: Vec<(NodeHandle, NodeValue)>) {
        let actions: Vec<Action> = before
            .into_iter()
            .filter_map(|(node, old)| {
                let new = self.tree.node(node).get(old.property());
                (new != old).then_some(Action::MemberEdit { node, old, new })
            })
            .collect();

        if !actions.is_empty() {
            self.history.push(Action::Group(actions));
            self.recorded();
        }
    }

    /// Undo the last recorded edit
    pub fn undo(&mut self) -> history::Result<()> {
        self.history.undo(&mut self.tree)?;
        self.dirty = true;
        Ok(())
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> history::Result<()> {
        self.history.redo(&mut self.tree)?;
        self.dirty = true;
        Ok(())
    }

    /// Forget all recorded edits
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.tree.purge_detached(&Default::default());
    }

    // === Playback ===

    /// Jump to a time and re-sample
    pub fn set_time(&mut self, time: f64) {
        self.clock.set_time(time, &mut self.tree);
    }

    /// Move the clock and re-sample
    pub fn advance(&mut self, delta: f64) {
        self.clock.advance(delta, &mut self.tree);
    }

    /// Per-frame update
    pub fn tick(&mut self, delta: f64) {
        self.clock.tick(delta, &mut self.tree);
    }

    /// Start playback
    pub fn play(&mut self) {
        self.clock.play();
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        self.clock.toggle_playback();
    }

    /// Pause and rewind
    pub fn stop(&mut self) {
        self.clock.stop(&mut self.tree);
    }

    /// Change the animation length, keeping the time within it
    pub fn set_length(&mut self, length: f64) {
        self.clock.set_length(length, &mut self.tree);
        self.dirty = true;
    }

    /// Turn looping on or off
    pub fn set_looping(&mut self, looping: bool) {
        self.clock.looping = looping;
        self.dirty = true;
    }

    // === Persistence ===

    /// Plain data for saving
    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            version: PROJECT_FORMAT_VERSION,
            header: self.header.clone(),
            preferences: self.preferences.clone(),
            root: self.tree.to_record(),
            animation: self.clock.clone(),
        }
    }

    /// Open a loaded project with an empty history
    pub fn from_project(file: ProjectFile, max_history: usize) -> Self {
        Self {
            header: file.header,
            preferences: file.preferences,
            tree: NodeTree::from_record(&file.root),
            history: History::with_max_length(max_history),
            clock: file.animation,
            dirty: false,
        }
    }

    /// Load a project and stamp its access time
    pub fn load(path: &Path, max_history: usize) -> project::Result<Self> {
        let file = ProjectFile::load(path)?;
        let mut document = Self::from_project(file, max_history);
        document.header.path = path.to_path_buf();
        document.header.touch();

        tracing::info!("Opened project: {} at {:?}", document.header.name, path);
        Ok(document)
    }

    /// Save to the header's path
    pub fn save(&mut self) -> project::Result<()> {
        self.to_project().save(&self.header.path)?;
        self.dirty = false;

        tracing::info!("Saved project to {:?}", self.header.path);
        Ok(())
    }

    /// Save under a new path, which becomes the project's path
    pub fn save_as(&mut self, path: &Path) -> project::Result<()> {
        let previous = std::mem::replace(&mut self.header.path, path.to_path_buf());
        if let Err(err) = self.save() {
            self.header.path = previous;
            return Err(err);
        }
        Ok(())
    }
}
