// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene nodes and their editable properties.

use glam::Vec2;
use kite_sequencer::{KeyFrame, ScalarInstant, TrackInstant, Vec2Instant};
use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// Generation-checked handle to a node in a [`NodeTree`](crate::tree::NodeTree)
    pub struct NodeHandle;
}

/// A sprite node in the scene tree.
///
/// Hierarchy fields (`parent`, `index`, `children`, `name`, `selected`) are
/// owned by the tree and only change through its methods, so sibling
/// names stay unique and the selection list stays in sync. Transform and
/// presentation fields are plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) index: usize,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) name: String,
    pub(crate) selected: bool,

    /// Whether the renderer draws this node
    pub visible: bool,
    /// Position in scene units
    pub position: Vec2,
    /// Scale factor per axis
    pub scale: Vec2,
    /// Rotation in radians
    pub rotation: f64,
    /// Rotation pivot, relative to `position`
    pub rotation_pivot: Vec2,
    /// Draw-order group
    pub layer: i32,
    /// Texture reference, resolved by the renderer
    pub texture: Option<String>,
    /// Animation tracks
    pub keyframe: KeyFrame,
}

impl Node {
    /// Create a detached node with default transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parent: None,
            index: 0,
            children: Vec::new(),
            name: name.into(),
            selected: false,
            visible: true,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            rotation_pivot: Vec2::ZERO,
            layer: 0,
            texture: None,
            keyframe: KeyFrame::new(),
        }
    }

    /// Node name, unique among its siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the parent's child list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parent handle; `None` for the root and for detached nodes
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Children in sibling order
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether the node has no parent
    pub fn is_rootless(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the node is in the tree's selection
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Rotation pivot in scene coordinates
    pub fn pivot_position(&self) -> Vec2 {
        self.position + self.rotation_pivot
    }

    /// Read one editable property
    pub fn get(&self, property: NodeProperty) -> NodeValue {
        match property {
            NodeProperty::Visible => NodeValue::Visible(self.visible),
            NodeProperty::Position => NodeValue::Position(self.position),
            NodeProperty::Scale => NodeValue::Scale(self.scale),
            NodeProperty::Rotation => NodeValue::Rotation(self.rotation),
            NodeProperty::RotationPivot => NodeValue::RotationPivot(self.rotation_pivot),
            NodeProperty::Layer => NodeValue::Layer(self.layer),
            NodeProperty::Texture => NodeValue::Texture(self.texture.clone()),
        }
    }

    /// Write one editable property, returning the previous value
    pub fn set(&mut self, value: NodeValue) -> NodeValue {
        let old = self.get(value.property());
        match value {
            NodeValue::Visible(v) => self.visible = v,
            NodeValue::Position(v) => self.position = v,
            NodeValue::Scale(v) => self.scale = v,
            NodeValue::Rotation(v) => self.rotation = v,
            NodeValue::RotationPivot(v) => self.rotation_pivot = v,
            NodeValue::Layer(v) => self.layer = v,
            NodeValue::Texture(v) => self.texture = v,
        }
        old
    }

    /// Linear keys capturing the current transform on all four tracks
    pub fn key_all_properties(&self, time: f64) -> [TrackInstant; 4] {
        [
            TrackInstant::Position(Vec2Instant::new(time, self.position)),
            TrackInstant::Scale(Vec2Instant::new(time, self.scale)),
            TrackInstant::Rotation(ScalarInstant::new(time, self.rotation)),
            TrackInstant::Pivot(Vec2Instant::new(time, self.rotation_pivot)),
        ]
    }
}

/// Editable node properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeProperty {
    /// Visibility flag
    Visible,
    /// Position
    Position,
    /// Scale
    Scale,
    /// Rotation (radians)
    Rotation,
    /// Rotation pivot offset
    RotationPivot,
    /// Draw-order layer
    Layer,
    /// Texture reference
    Texture,
}

/// A value for one editable node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    /// Visibility flag
    Visible(bool),
    /// Position
    Position(Vec2),
    /// Scale
    Scale(Vec2),
    /// Rotation (radians)
    Rotation(f64),
    /// Rotation pivot offset
    RotationPivot(Vec2),
    /// Draw-order layer
    Layer(i32),
    /// Texture reference
    Texture(Option<String>),
}

impl NodeValue {
    /// The property this value belongs to
    pub fn property(&self) -> NodeProperty {
        match self {
            Self::Visible(_) => NodeProperty::Visible,
            Self::Position(_) => NodeProperty::Position,
            Self::Scale(_) => NodeProperty::Scale,
            Self::Rotation(_) => NodeProperty::Rotation,
            Self::RotationPivot(_) => NodeProperty::RotationPivot,
            Self::Layer(_) => NodeProperty::Layer,
            Self::Texture(_) => NodeProperty::Texture,
        }
    }
}

/// Derive a name not rejected by `is_taken` by bumping a trailing number.
///
/// "Layer" becomes "Layer1", "Layer1" becomes "Layer2", "Take9" becomes
/// "Take10". Repeats until the candidate is free.
pub fn next_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = name.to_string();
    loop {
        let stem_len = candidate.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        candidate = if stem_len == candidate.len() {
            format!("{candidate}1")
        } else {
            let (stem, digits) = candidate.split_at(stem_len);
            format!("{stem}{}", increment_digits(digits))
        };

        if !is_taken(&candidate) {
            return candidate;
        }
    }
}

// Decimal increment on the digit string itself, so long suffixes never overflow.
fn increment_digits(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}
