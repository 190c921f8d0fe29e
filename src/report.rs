//! CLI output formatting for the scan service.
//!
//! The scanner never prints. It emits [`ScanEvent`]s over an mpsc channel
//! and a printer thread (owned by the binary) renders them, so generation
//! workers are never blocked on a slow terminal and tests can assert on
//! events instead of captured stdout.
//!
//! Each event has a pure `format_event` rendering (returns lines, no I/O)
//! and a `print_event` wrapper that writes to stdout.
//!
//! ```text
//! ==> Generating thumbnails for 12 pending images
//!     IMG_0001.jpg: 3 thumbs
//!     IMG_0002.jpg: up to date
//!     DSC_4411.nef: skipped (no backend for this format)
//!     IMG_0003.jpg: failed (Processing failed: ...)
//! Completed thumbnail batch (12 images, 33 thumbs in 4.2s, 1 skipped, 1 failed)
//! ```

use crate::executor::SkipReason;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Progress notifications emitted by the scanner.
#[derive(Debug)]
pub enum ScanEvent {
    /// The service was started with generation disabled.
    Disabled,
    BatchStarted {
        pending: usize,
    },
    ItemCompleted {
        path: PathBuf,
        renditions_written: usize,
    },
    /// Empty plan: everything already fresh.
    ItemUpToDate {
        path: PathBuf,
    },
    ItemSkipped {
        path: PathBuf,
        reason: SkipReason,
    },
    ItemFailed {
        path: PathBuf,
        error: String,
    },
    /// Batch attempted and markers written.
    BatchFinished(BatchSummary),
    /// A whole cycle fault (backlog query or marker write); the loop
    /// sleeps and retries.
    CycleFault {
        error: String,
    },
}

/// Status summary for one completed batch — the only user-visible signal
/// of steady-state progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub images: usize,
    pub completed: usize,
    pub renditions_written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed thumbnail batch ({} images, {} thumbs in {:.1}s",
            self.images,
            self.renditions_written,
            self.elapsed.as_secs_f64()
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, ")")
    }
}

/// Short display name for a source path: just the filename.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Render an event as output lines. Pure — no I/O.
pub fn format_event(event: &ScanEvent) -> Vec<String> {
    match event {
        ScanEvent::Disabled => vec!["Thumbnail generation is disabled.".to_string()],
        ScanEvent::BatchStarted { pending } => {
            vec![format!(
                "==> Generating thumbnails for {pending} pending image{}",
                if *pending == 1 { "" } else { "s" }
            )]
        }
        ScanEvent::ItemCompleted {
            path,
            renditions_written,
        } => vec![format!(
            "    {}: {} thumb{}",
            file_label(path),
            renditions_written,
            if *renditions_written == 1 { "" } else { "s" }
        )],
        ScanEvent::ItemUpToDate { path } => {
            vec![format!("    {}: up to date", file_label(path))]
        }
        ScanEvent::ItemSkipped { path, reason } => {
            vec![format!("    {}: skipped ({reason})", file_label(path))]
        }
        ScanEvent::ItemFailed { path, error } => {
            vec![format!("    {}: failed ({error})", file_label(path))]
        }
        ScanEvent::BatchFinished(summary) => vec![summary.to_string()],
        ScanEvent::CycleFault { error } => {
            vec![format!("Scan cycle failed: {error}; retrying after sleep")]
        }
    }
}

/// Print an event to stdout.
pub fn print_event(event: &ScanEvent) {
    for line in format_event(event) {
        println!("{line}");
    }
}
