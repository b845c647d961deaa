// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project files.
//!
//! A project holds a header, preferences, the whole node tree and the
//! animation clock. `.ron` files are written as pretty RON, `.kite` files
//! as bincode.

use crate::node::{Node, NodeHandle};
use crate::tree::NodeTree;
use glam::Vec2;
use kite_sequencer::{AnimationClock, KeyFrame};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Current project format version
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Extension of text projects
pub const RON_EXTENSION: &str = "ron";

/// Extension of binary projects
pub const BINARY_EXTENSION: &str = "kite";

/// Project file errors
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The RON text could not be parsed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// The project could not be written as RON
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),

    /// The binary encoding failed either way
    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),

    /// The file was written by a newer editor
    #[error("Project version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// The extension names no known format
    #[error("Unknown project extension: {0:?}")]
    UnknownExtension(PathBuf),
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    /// Pretty-printed RON
    Ron,
    /// bincode
    Binary,
}

impl ProjectFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(RON_EXTENSION) => Ok(Self::Ron),
            Some(BINARY_EXTENSION) => Ok(Self::Binary),
            _ => Err(ProjectError::UnknownExtension(path.to_path_buf())),
        }
    }
}

/// Identity of a project, also kept in the editor's recent list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHeader {
    /// Display name
    pub name: String,
    /// Where the project is saved
    pub path: PathBuf,
    /// Last time the project was opened, in seconds since the Unix epoch
    pub last_access: u64,
    /// Editor window size when last saved
    pub window_size: [u32; 2],
}

impl ProjectHeader {
    /// Create a header stamped with the current time
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            last_access: current_timestamp(),
            window_size: [1280, 720],
        }
    }

    /// Mark the project as opened now
    pub fn touch(&mut self) {
        self.last_access = current_timestamp();
    }
}

/// Per-project settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPreferences {
    /// Output frame size in pixels
    pub video_resolution: [u32; 2],
}

impl Default for ProjectPreferences {
    fn default() -> Self {
        Self {
            video_resolution: [1280, 720],
        }
    }
}

/// A node and its subtree as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name
    pub name: String,
    /// Visibility flag
    pub visible: bool,
    /// Position
    pub position: Vec2,
    /// Scale
    pub scale: Vec2,
    /// Rotation in radians
    pub rotation: f64,
    /// Rotation pivot offset
    pub rotation_pivot: Vec2,
    /// Draw-order layer
    pub layer: i32,
    /// Texture reference
    #[serde(default)]
    pub texture: Option<String>,
    /// Animation tracks
    #[serde(default)]
    pub keyframe: KeyFrame,
    /// Children in sibling order
    #[serde(default)]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    fn to_node(&self) -> Node {
        let mut node = Node::new(self.name.clone());
        node.visible = self.visible;
        node.position = self.position;
        node.scale = self.scale;
        node.rotation = self.rotation;
        node.rotation_pivot = self.rotation_pivot;
        node.layer = self.layer;
        node.texture = self.texture.clone();
        node.keyframe = self.keyframe.clone();
        node
    }
}

/// Everything saved for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Format version
    pub version: u32,
    /// Project identity
    pub header: ProjectHeader,
    /// Project settings
    #[serde(default)]
    pub preferences: ProjectPreferences,
    /// The root node and everything below it
    pub root: NodeRecord,
    /// Playback state
    pub animation: AnimationClock,
}

impl ProjectFile {
    /// Load a project, picking the format from the extension
    pub fn load(path: &Path) -> Result<Self> {
        let file: ProjectFile = match ProjectFormat::from_path(path)? {
            ProjectFormat::Ron => {
                let content = std::fs::read_to_string(path)?;
                ron::from_str(&content)?
            }
            ProjectFormat::Binary => {
                let bytes = std::fs::read(path)?;
                bincode::deserialize(&bytes)?
            }
        };

        // Version check
        if file.version > PROJECT_FORMAT_VERSION {
            return Err(ProjectError::UnsupportedVersion {
                found: file.version,
                supported: PROJECT_FORMAT_VERSION,
            });
        }

        Ok(file)
    }

    /// Save a project, picking the format from the extension
    pub fn save(&self, path: &Path) -> Result<()> {
        match ProjectFormat::from_path(path)? {
            ProjectFormat::Ron => {
                let config = ron::ser::PrettyConfig::default()
                    .struct_names(true)
                    .enumerate_arrays(false);
                let content = ron::ser::to_string_pretty(self, config)?;
                std::fs::write(path, content)?;
            }
            ProjectFormat::Binary => {
                let bytes = bincode::serialize(self)?;
                std::fs::write(path, bytes)?;
            }
        }
        Ok(())
    }
}

impl NodeTree {
    /// Snapshot the attached tree as plain records
    pub fn to_record(&self) -> NodeRecord {
        self.record_of(self.root)
    }

    fn record_of(&self, handle: NodeHandle) -> NodeRecord {
        let node = self.node(handle);
        NodeRecord {
            name: node.name.clone(),
            visible: node.visible,
            position: node.position,
            scale: node.scale,
            rotation: node.rotation,
            rotation_pivot: node.rotation_pivot,
            layer: node.layer,
            texture: node.texture.clone(),
            keyframe: node.keyframe.clone(),
            children: node.children.iter().map(|&child| self.record_of(child)).collect(),
        }
    }

    /// Rebuild a tree from records; duplicate sibling names get renamed
    pub fn from_record(record: &NodeRecord) -> Self {
        let mut tree = Self::with_root(record.to_node());
        let root = tree.root;
        tree.attach_records(root, &record.children);
        tree
    }

    fn attach_records(&mut self, parent: NodeHandle, records: &[NodeRecord]) {
        for record in records {
            let handle = self.nodes.insert(record.to_node());
            self.attach(parent, handle);
            self.attach_records(handle, &record.children);
        }
    }
}

/// Get current timestamp in seconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_sequencer::{Easing, ScalarInstant, TrackInstant, Vec2Instant};

    fn sample_project() -> ProjectFile {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let body = tree.add_child(root, "Body", None);
        let arm = tree.add_child(body, "Arm", None);
        tree.node_mut(arm).texture = Some("arm.png".into());
        tree.node_mut(arm).layer = -2;
        tree.insert_key(
            arm,
            TrackInstant::Rotation(ScalarInstant::new(0.0, 0.0).with_easing(Easing::Sine)),
            None,
        );
        tree.insert_key(arm, TrackInstant::Rotation(ScalarInstant::new(2.0, 1.5)), None);
        tree.insert_key(body, TrackInstant::Position(Vec2Instant::new(1.0, Vec2::new(3.0, 4.0))), None);

        ProjectFile {
            version: PROJECT_FORMAT_VERSION,
            header: ProjectHeader::new("Walk cycle", "walk.ron"),
            preferences: ProjectPreferences::default(),
            root: tree.to_record(),
            animation: AnimationClock::new(4.0),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kite_scene_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ProjectFormat::from_path(Path::new("a.ron")).unwrap(), ProjectFormat::Ron);
        assert_eq!(ProjectFormat::from_path(Path::new("a.kite")).unwrap(), ProjectFormat::Binary);
        assert!(matches!(
            ProjectFormat::from_path(Path::new("a.json")),
            Err(ProjectError::UnknownExtension(_))
        ));
    }

    #[test]
    fn test_ron_file_round_trip() {
        let project = sample_project();
        let path = temp_path("project.ron");

        project.save(&path).unwrap();
        let loaded = ProjectFile::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, project);
    }

    #[test]
    fn test_binary_file_round_trip() {
        let project = sample_project();
        let path = temp_path("project.kite");

        project.save(&path).unwrap();
        let loaded = ProjectFile::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.root, project.root);
        assert_eq!(loaded.animation.length(), 4.0);
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut project = sample_project();
        project.version = PROJECT_FORMAT_VERSION + 1;
        let path = temp_path("future.ron");

        project.save(&path).unwrap();
        let result = ProjectFile::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ProjectError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_clock_outside_length_fails_load() {
        let mut project = sample_project();
        project.animation.set_time(3.0, &mut NodeTree::new());
        let path = temp_path("late.ron");

        project.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap().replace("4.0", "2.0");
        std::fs::write(&path, text).unwrap();
        let result = ProjectFile::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ProjectError::RonParse(_))));
    }

    #[test]
    fn test_unknown_easing_fails_load() {
        let project = sample_project();
        let text = ron::to_string(&project).unwrap().replace("\"Sine\"", "\"Wobble\"");

        assert!(ron::from_str::<ProjectFile>(&text).is_err());
    }

    #[test]
    fn test_tree_rebuilt_from_record() {
        let project = sample_project();
        let tree = NodeTree::from_record(&project.root);

        let body = tree.find_child(tree.root(), "Body").unwrap();
        let arm = tree.find_child(body, "Arm").unwrap();
        assert_eq!(tree.node(arm).parent(), Some(body));
        assert_eq!(tree.node(arm).layer, -2);
        assert_eq!(tree.to_record(), project.root);
    }
}
