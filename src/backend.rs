//! Pixel-processing backend trait and shared types.
//!
//! The [`RenditionBackend`] trait is the boundary between the planning
//! side of the service (which decides *which* renditions a source needs)
//! and the pixel side (which decodes, resizes, and encodes). A backend is
//! handed the effective source path and the full set of targets for one
//! source item and must attempt every target in the call.
//!
//! The production implementation is
//! [`ImageBackend`](crate::image_backend::ImageBackend) — pure Rust via
//! the `image` crate. Backends are shared singletons across concurrent
//! workers, so implementations must be safe to invoke in parallel on
//! distinct files.

use crate::sizes::RenditionSpec;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// One rendition to produce: where the file goes and what size it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionTarget {
    pub path: PathBuf,
    pub spec: RenditionSpec,
}

/// Result of one [`RenditionBackend::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutput {
    /// Number of rendition files written.
    pub renditions_written: usize,
    /// Content hash of the source the renditions were decoded from.
    pub source_hash: String,
}

/// Trait for thumbnail generation backends.
///
/// The contract: attempt every target in the call; a failure on any
/// target is reported as a failure of the whole call (there is no
/// per-target completion tracking above this boundary).
pub trait RenditionBackend: Send + Sync {
    /// File extensions this backend can decode, lowercase, without dots.
    fn supported_extensions(&self) -> &[&'static str];

    /// Produce every rendition in `targets` from `source`.
    fn generate(
        &self,
        source: &Path,
        targets: &[RenditionTarget],
    ) -> Result<GenerateOutput, BackendError>;
}
