//! Per-chunk progress reporting for the batch driver.
//!
//! Observers only watch; nothing they do can change what gets encoded.

use indicatif::{ProgressBar, ProgressStyle};

/// Snapshot handed to observers after each chunk completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// 1-based index of the chunk that just finished.
    pub chunk: usize,
    pub chunks: usize,
    /// Records encoded so far, including this chunk.
    pub done: usize,
    pub total: usize,
}

impl ChunkProgress {
    /// Fraction of records encoded, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_chunk(&self, progress: ChunkProgress);

    fn on_finish(&self) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_chunk(&self, _progress: ChunkProgress) {}
}

/// Terminal progress bar, cleared when encoding finishes.
pub struct ProgressBarObserver {
    pb: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {pos}/{len} {msg} ({eta})")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        Self { pb }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_start(&self, total: usize) {
        self.pb.set_length(total as u64);
    }

    fn on_chunk(&self, progress: ChunkProgress) {
        self.pb.set_position(progress.done as u64);
        self.pb.set_message(format!(
            "chunk {}/{} ({:.0}%)",
            progress.chunk,
            progress.chunks,
            progress.fraction() * 100.0
        ));
        tracing::trace!(
            chunk = progress.chunk,
            chunks = progress.chunks,
            done = progress.done,
            "chunk encoded"
        );
    }

    fn on_finish(&self) {
        self.pb.finish_and_clear();
    }
}
