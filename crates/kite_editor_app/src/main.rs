// SPDX-License-Identifier: MIT OR Apache-2.0
//! Kite - 2D keyframe animation editor
//!
//! Command-line front end over the editing core:
//! - Project creation and a sample scene
//! - Project summaries
//! - Frame export on a worker thread
//!
//! ## Architecture
//!
//! Scene editing, undo/redo and persistence live in `kite_scene`; easing,
//! tracks and the playback clock live in `kite_sequencer`. This binary adds
//! logging, the editor config and the export worker.

mod app;
mod config;
mod export;

use app::{Command, EditorApp};
use config::EditorConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("kite_editor_app=debug".parse().unwrap())
        .add_directive("kite_scene=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("Editor panicked: {info}");
    }));

    tracing::info!("Starting Kite Editor v{}", env!("CARGO_PKG_VERSION"));

    let result = Command::parse(std::env::args().skip(1))
        .and_then(|command| EditorApp::new(EditorConfig::default_path())?.run(command));

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
