//! Shared test utilities for the thumb-mill test suite.
//!
//! Freshness logic compares file modification times, so these helpers
//! set mtimes explicitly instead of relying on sleep-based ordering.

use crate::store::{ImageId, SourceRecord};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// A `SystemTime` lying `secs` seconds in the past.
pub(crate) fn secs_ago(secs: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(secs)
}

/// Set a file's modification time explicitly.
pub(crate) fn set_mtime(path: &Path, time: SystemTime) {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .unwrap_or_else(|e| panic!("open {} for mtime: {e}", path.display()));
    file.set_modified(time)
        .unwrap_or_else(|e| panic!("set mtime on {}: {e}", path.display()));
}

/// Write a real `width`×`height` image at `path` (format from extension),
/// creating parent directories, and stamp it with `mtime`.
pub(crate) fn write_image(path: &Path, width: u32, height: u32, mtime: SystemTime) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::from_pixel(width, height, image::Rgb([90, 90, 180]))
        .save(path)
        .unwrap_or_else(|e| panic!("write image {}: {e}", path.display()));
    set_mtime(path, mtime);
}

/// A pending [`SourceRecord`] for an on-disk file, mtime read from disk.
pub(crate) fn record_for(id: ImageId, path: &Path) -> SourceRecord {
    SourceRecord {
        id,
        path: path.to_path_buf(),
        folder: path.parent().unwrap().to_path_buf(),
        modified: std::fs::metadata(path).unwrap().modified().unwrap(),
        thumbs_generated: None,
        hash: None,
    }
}
