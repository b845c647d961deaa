// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command surface of the editor binary.

use crate::config::{ConfigError, EditorConfig};
use crate::export::{ExportError, ExportJob, JsonLinesSink, DEFAULT_FPS};
use glam::Vec2;
use kite_scene::{Document, NodeValue, ProjectError};
use kite_sequencer::{Easing, ScalarInstant, TrackInstant, Vec2Instant};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const USAGE: &str = "usage:
  kite_editor new <project> <name>
  kite_editor demo <project>
  kite_editor info <project>
  kite_editor export <project> <frames.jsonl> [fps]";

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad command line
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),

    /// Project file error
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Config file error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create an empty project
    New {
        /// Project file
        path: PathBuf,
        /// Project name
        name: String,
    },
    /// Create a small animated sample project
    Demo {
        /// Project file
        path: PathBuf,
    },
    /// Print a summary of a project
    Info {
        /// Project file
        path: PathBuf,
    },
    /// Export every frame's render list as JSON lines
    Export {
        /// Project file
        path: PathBuf,
        /// Output file
        output: PathBuf,
        /// Frames per second
        fps: f64,
    },
}

impl Command {
    /// Parse arguments, program name excluded
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, AppError> {
        let args: Vec<String> = args.into_iter().collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["new", path, name] => Ok(Self::New {
                path: PathBuf::from(path),
                name: (*name).to_string(),
            }),
            ["demo", path] => Ok(Self::Demo {
                path: PathBuf::from(path),
            }),
            ["info", path] => Ok(Self::Info {
                path: PathBuf::from(path),
            }),
            ["export", path, output] => Ok(Self::Export {
                path: PathBuf::from(path),
                output: PathBuf::from(output),
                fps: DEFAULT_FPS,
            }),
            ["export", path, output, fps] => Ok(Self::Export {
                path: PathBuf::from(path),
                output: PathBuf::from(output),
                fps: fps
                    .parse()
                    .map_err(|_| AppError::Usage(format!("invalid frame rate: {fps}")))?,
            }),
            [] => Err(AppError::Usage("missing command".to_string())),
            [command, ..] => Err(AppError::Usage(format!("unknown command or arguments: {command}"))),
        }
    }
}

/// Editor application
pub struct EditorApp {
    config: EditorConfig,
    config_path: PathBuf,
}

impl EditorApp {
    /// Load the config and build the app
    pub fn new(config_path: PathBuf) -> Result<Self, AppError> {
        let config = EditorConfig::load(&config_path)?;
        Ok(Self { config, config_path })
    }

    /// Run one command
    pub fn run(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::New { path, name } => {
                let mut document = Document::new(name, &path, self.config.max_history_length);
                document.save()?;
                self.remember(&document)?;
            }
            Command::Demo { path } => {
                let mut document = demo_document(&path, self.config.max_history_length);
                document.save()?;
                self.remember(&document)?;
            }
            Command::Info { path } => {
                let document = self.open(&path)?;
                println!("{}", describe(&document));
            }
            Command::Export { path, output, fps } => {
                let document = self.open(&path)?;
                let sink = JsonLinesSink::create(&output)?;
                let job = ExportJob::spawn(
                    document.tree().clone(),
                    document.clock().clone(),
                    fps,
                    Box::new(sink),
                );

                while job.is_running() {
                    std::thread::sleep(Duration::from_millis(100));
                    let progress = job.state().progress();
                    tracing::debug!("Exported {}/{} frames", progress.frames_done, progress.total_frames);
                }

                let summary = job.wait()?;
                println!("Wrote {} frames to {}", summary.frames, output.display());
            }
        }
        Ok(())
    }

    fn open(&mut self, path: &Path) -> Result<Document, AppError> {
        let document = Document::load(path, self.config.max_history_length)?;
        self.remember(&document)?;
        Ok(document)
    }

    fn remember(&mut self, document: &Document) -> Result<(), AppError> {
        self.config.record_recent(document.header());
        self.config.save(&self.config_path)?;
        Ok(())
    }
}

/// A small swinging-arm scene, built through recorded edits
pub fn demo_document(path: &Path, max_history: usize) -> Document {
    let mut document = Document::new("Demo", path, max_history);
    document.set_length(2.0);
    document.set_looping(true);

    let root = document.tree().root();
    let body = document.add_node(root, "Body");
    document.set_property(body, NodeValue::Texture(Some("body.png".to_string())));
    document.insert_key(body, TrackInstant::Position(Vec2Instant::new(0.0, Vec2::ZERO)));
    document.insert_key(
        body,
        TrackInstant::Position(Vec2Instant::new(2.0, Vec2::new(120.0, 0.0)).with_easing(Easing::Sine)),
    );

    let arm = document.add_node(body, "Arm");
    document.set_property(arm, NodeValue::Texture(Some("arm.png".to_string())));
    document.set_property(arm, NodeValue::Layer(1));
    document.set_property(arm, NodeValue::RotationPivot(Vec2::new(0.0, 16.0)));
    document.insert_key(
        arm,
        TrackInstant::Rotation(ScalarInstant::new(0.0, -0.5).with_easing(Easing::Quad)),
    );
    document.insert_key(arm, TrackInstant::Rotation(ScalarInstant::new(1.0, 0.5)));
    document.insert_key(arm, TrackInstant::Rotation(ScalarInstant::new(2.0, -0.5)));

    document.add_node(root, "Shadow");
    document
}

/// Multi-line summary of a document
pub fn describe(document: &Document) -> String {
    let header = document.header();
    let clock = document.clock();
    let mut lines = vec![
        format!("Project: {}", header.name),
        format!("Path: {}", header.path.display()),
        format!(
            "Animation: {}s{}",
            clock.length(),
            if clock.looping { ", looping" } else { "" }
        ),
        format!("Nodes: {}", document.tree().len()),
    ];

    let tree = document.tree();
    tree.for_each(|handle, node| {
        let mut depth = 0;
        let mut current = node.parent();
        while let Some(parent) = current {
            depth += 1;
            current = tree.node(parent).parent();
        }
        let keys = node.keyframe.duration();
        let mut line = format!("{}{} (layer {})", "  ".repeat(depth), node.name(), node.layer);
        if !node.keyframe.is_empty() {
            line.push_str(&format!(", keyed to {keys}s"));
        }
        if handle == tree.root() {
            line.push_str(", root");
        }
        lines.push(line);
    });

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| (*arg).to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(args(&["new", "a.ron", "Walk"])).unwrap(),
            Command::New {
                path: PathBuf::from("a.ron"),
                name: "Walk".to_string(),
            }
        );
        assert_eq!(
            Command::parse(args(&["export", "a.kite", "out.jsonl", "30"])).unwrap(),
            Command::Export {
                path: PathBuf::from("a.kite"),
                output: PathBuf::from("out.jsonl"),
                fps: 30.0,
            }
        );
        assert!(matches!(
            Command::parse(args(&["export", "a.kite", "out.jsonl", "fast"])),
            Err(AppError::Usage(_))
        ));
        assert!(matches!(Command::parse(args(&[])), Err(AppError::Usage(_))));
        assert!(matches!(Command::parse(args(&["frobnicate"])), Err(AppError::Usage(_))));
    }

    #[test]
    fn test_demo_is_undoable() {
        let mut document = demo_document(Path::new("demo.ron"), 100);
        assert_eq!(document.tree().len(), 4);

        while document.undo().is_ok() {}

        assert_eq!(document.tree().len(), 1);
        assert!(document.tree().node(document.tree().root()).keyframe.is_empty());
    }

    #[test]
    fn test_describe_lists_nodes() {
        let document = demo_document(Path::new("demo.ron"), 100);
        let text = describe(&document);

        assert!(text.contains("Project: Demo"));
        assert!(text.contains("Nodes: 4"));
        assert!(text.contains("    Arm (layer 1), keyed to 2s"));
    }

    #[test]
    fn test_new_info_and_export_commands() {
        let dir = std::env::temp_dir().join(format!("kite_app_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let project = dir.join("demo.kite");
        let output = dir.join("frames.jsonl");
        let mut app = EditorApp::new(dir.join("config.json")).unwrap();

        app.run(Command::Demo { path: project.clone() }).unwrap();
        app.run(Command::Info { path: project.clone() }).unwrap();
        app.run(Command::Export {
            path: project.clone(),
            output: output.clone(),
            fps: 10.0,
        })
        .unwrap();

        let frames = std::fs::read_to_string(&output).unwrap();
        let config = EditorConfig::load(&dir.join("config.json")).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(frames.lines().count(), 21);
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].path, project);
    }
}
