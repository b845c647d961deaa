// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph for the Kite animation editor.
//!
//! This crate provides:
//! - An arena-backed node tree with sibling-unique names
//! - Layered draw order, picking and render lists
//! - Keyframe sampling driven by the playback clock
//! - Reversible actions and a bounded undo/redo history
//! - Project files and the [`Document`] editing session
//!
//! ## Architecture
//!
//! Nodes live in a [`slotmap`] arena and refer to each other by
//! [`NodeHandle`]. Removed nodes stay in the arena while an action may
//! bring them back, so handles held by the history stay valid.

pub mod action;
pub mod animator;
pub mod document;
pub mod history;
pub mod node;
pub mod project;
pub mod selection;
pub mod traversal;
pub mod tree;

pub use action::Action;
pub use document::Document;
pub use history::{History, HistoryError, HistoryStats, MAX_HISTORY};
pub use node::{next_name, Node, NodeHandle, NodeProperty, NodeValue};
pub use project::{NodeRecord, ProjectError, ProjectFile, ProjectFormat, ProjectHeader, ProjectPreferences};
pub use selection::Selection;
pub use traversal::RenderItem;
pub use tree::NodeTree;
