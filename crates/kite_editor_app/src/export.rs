// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame export.
//!
//! This module handles:
//! - Sampling the animation frame by frame on a worker thread
//! - Writing each frame's render list to a [`FrameSink`]
//! - Progress reporting, preview of the latest frame and cancellation

use kite_scene::{NodeTree, RenderItem};
use kite_sequencer::{Animate, AnimationClock};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Default export frame rate
pub const DEFAULT_FPS: f64 = 24.0;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame rate is not a positive number
    #[error("Invalid frame rate: {0}")]
    InvalidFps(f64),

    /// The export was cancelled
    #[error("Export cancelled")]
    Cancelled,

    /// The worker thread panicked
    #[error("Export worker panicked")]
    WorkerPanicked,
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// One sampled frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame number, starting at zero
    pub index: u64,
    /// Animation time of the frame
    pub time: f64,
    /// Visible nodes in paint order
    pub items: Vec<RenderItem>,
}

/// Destination for exported frames
pub trait FrameSink: Send {
    /// Write one frame
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush after the last frame
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per frame, one frame per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Take the writer back
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create or truncate a file
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Export progress snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Frames written so far
    pub frames_done: u64,
    /// Frames in the whole export
    pub total_frames: u64,
    /// Whether the worker has stopped
    pub complete: bool,
}

impl ExportProgress {
    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 1.0;
        }
        self.frames_done as f64 / self.total_frames as f64
    }
}

/// State shared between the worker and its handle
pub struct ExportState {
    frames_done: AtomicU64,
    total_frames: AtomicU64,
    cancelled: AtomicBool,
    complete: AtomicBool,
    latest: parking_lot::Mutex<Option<Frame>>,
}

impl ExportState {
    /// Create state for a new export
    pub fn new() -> Self {
        Self {
            frames_done: AtomicU64::new(0),
            total_frames: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            latest: parking_lot::Mutex::new(None),
        }
    }

    /// Ask the worker to stop before its next frame
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Current progress
    pub fn progress(&self) -> ExportProgress {
        ExportProgress {
            frames_done: self.frames_done.load(Ordering::Relaxed),
            total_frames: self.total_frames.load(Ordering::Relaxed),
            complete: self.complete.load(Ordering::Relaxed),
        }
    }

    /// The most recently written frame, for preview
    pub fn latest_frame(&self) -> Option<Frame> {
        self.latest.lock().clone()
    }
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Frames written
    pub frames: u64,
    /// Frame rate used
    pub fps: f64,
    /// Wall-clock time spent
    pub elapsed_secs: f64,
}

/// Sample every frame of `clock`'s range from `tree` into `sink`.
///
/// Cancellation is checked before each frame.
pub fn export_frames(
    tree: &mut NodeTree,
    clock: &AnimationClock,
    fps: f64,
    sink: &mut dyn FrameSink,
    state: &ExportState,
) -> Result<ExportSummary> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(ExportError::InvalidFps(fps));
    }

    let start_time = std::time::Instant::now();
    let total = clock.frame_count(fps);
    state.total_frames.store(total, Ordering::Relaxed);
    tracing::info!("Exporting {} frames at {} fps", total, fps);

    for index in 0..total {
        if state.is_cancelled() {
            tracing::info!("Export cancelled after {} frames", index);
            return Err(ExportError::Cancelled);
        }

        let time = AnimationClock::frame_to_time(index, fps).min(clock.length());
        tree.animate(time);
        let frame = Frame {
            index,
            time,
            items: tree.render_list(),
        };

        sink.write_frame(&frame)?;
        *state.latest.lock() = Some(frame);
        state.frames_done.store(index + 1, Ordering::Relaxed);
    }
    sink.finish()?;

    let elapsed_secs = start_time.elapsed().as_secs_f64();
    tracing::info!("Export completed in {:.2}s", elapsed_secs);

    Ok(ExportSummary {
        frames: total,
        fps,
        elapsed_secs,
    })
}

/// A running export
pub struct ExportJob {
    state: Arc<ExportState>,
    join: Option<JoinHandle<Result<ExportSummary>>>,
}

impl ExportJob {
    /// Start exporting on a worker thread.
    ///
    /// The worker owns `tree`, so the caller keeps editing its own copy.
    pub fn spawn(mut tree: NodeTree, clock: AnimationClock, fps: f64, mut sink: Box<dyn FrameSink>) -> Self {
        let state = Arc::new(ExportState::new());
        let worker_state = Arc::clone(&state);

        let join = thread::spawn(move || {
            let result = export_frames(&mut tree, &clock, fps, sink.as_mut(), &worker_state);
            worker_state.complete.store(true, Ordering::Relaxed);
            result
        });

        Self {
            state,
            join: Some(join),
        }
    }

    /// Shared state, for progress and preview
    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Check if the worker is still running
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Ask the worker to stop
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Wait for the worker and return its result
    pub fn wait(mut self) -> Result<ExportSummary> {
        match self.join.take() {
            Some(join) => join.join().map_err(|_| ExportError::WorkerPanicked)?,
            None => Err(ExportError::WorkerPanicked),
        }
    }
}

impl Drop for ExportJob {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            self.state.cancel();
            if join.join().is_err() {
                tracing::warn!("Export worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use kite_sequencer::{TrackInstant, Vec2Instant};

    struct CollectSink {
        frames: Arc<parking_lot::Mutex<Vec<Frame>>>,
    }

    impl FrameSink for CollectSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            self.frames.lock().push(frame.clone());
            Ok(())
        }
    }

    struct CancellingSink {
        state: Arc<ExportState>,
        after: u64,
    }

    impl FrameSink for CancellingSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            if frame.index + 1 == self.after {
                self.state.cancel();
            }
            Ok(())
        }
    }

    fn animated_tree() -> NodeTree {
        let mut tree = NodeTree::new();
        let sprite = tree.add_child(tree.root(), "Sprite", None);
        tree.insert_key(sprite, TrackInstant::Position(Vec2Instant::new(0.0, Vec2::ZERO)), None);
        tree.insert_key(sprite, TrackInstant::Position(Vec2Instant::new(1.0, Vec2::new(4.0, 0.0))), None);
        tree
    }

    #[test]
    fn test_worker_samples_every_frame() {
        let frames = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = CollectSink {
            frames: Arc::clone(&frames),
        };

        let job = ExportJob::spawn(animated_tree(), AnimationClock::new(1.0), 4.0, Box::new(sink));
        let summary = job.wait().unwrap();

        let frames = frames.lock();
        assert_eq!(summary.frames, 5);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2].time, 0.5);
        let sprite = frames[2].items.iter().find(|item| item.name == "Sprite").unwrap();
        assert_eq!(sprite.position, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_cancel_stops_between_frames() {
        let state = Arc::new(ExportState::new());
        let mut sink = CancellingSink {
            state: Arc::clone(&state),
            after: 2,
        };

        let result = export_frames(&mut animated_tree(), &AnimationClock::new(1.0), 10.0, &mut sink, &state);

        assert!(matches!(result, Err(ExportError::Cancelled)));
        let progress = state.progress();
        assert_eq!(progress.frames_done, 2);
        assert_eq!(progress.total_frames, 11);
        assert_eq!(state.latest_frame().map(|frame| frame.index), Some(1));
    }

    #[test]
    fn test_json_lines_output() {
        let state = ExportState::new();
        let mut sink = JsonLinesSink::new(Vec::new());

        export_frames(&mut animated_tree(), &AnimationClock::new(1.0), 2.0, &mut sink, &state).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let last: Frame = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last.time, 1.0);
        assert_eq!(state.progress().fraction(), 1.0);
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let state = ExportState::new();
        let mut sink = JsonLinesSink::new(Vec::new());

        let result = export_frames(&mut NodeTree::new(), &AnimationClock::new(1.0), 0.0, &mut sink, &state);

        assert!(matches!(result, Err(ExportError::InvalidFps(_))));
    }
}
