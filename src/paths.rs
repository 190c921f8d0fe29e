//! Centralized thumbnail path derivation.
//!
//! Every rendition's location is a pure function of the source path, the
//! size category, the configured roots, and the layout mode. Nothing else
//! in the codebase builds thumbnail paths by hand — planning for both the
//! batch and on-demand cases goes through [`thumb_path`].
//!
//! ## Standard layout
//!
//! The thumbnail root mirrors the library hierarchy relative to the
//! pictures root. The extension is forced to `.JPG` (renditions are always
//! JPEG) unless the source extension is already `jpg`/`JPG`, in which case
//! it is kept verbatim:
//!
//! ```text
//! pictures/2023/Trip/IMG_0001.NEF
//!   → thumbs/2023/Trip/IMG_0001_m.JPG
//! pictures/2023/Trip/beach.jpg
//!   → thumbs/2023/Trip/beach_s.jpg
//! ```
//!
//! ## Device layout
//!
//! NAS photo-station devices keep thumbnails in an `@eaDir` sibling
//! directory next to the source, with fixed per-size filenames. The
//! mirrored hierarchy and both roots are ignored:
//!
//! ```text
//! pictures/2023/Trip/IMG_0001.NEF
//!   → pictures/2023/Trip/@eaDir/IMG_0001.NEF/SYNOPHOTO_THUMB_M.jpg
//! ```

use crate::sizes::SizeCategory;
use std::path::{Path, PathBuf};

/// Filesystem convention for placing generated renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Mirror the library hierarchy under the thumbnail root.
    Standard,
    /// Device convention: `@eaDir` sibling directory, fixed filenames.
    Device,
}

/// Directory name used by the device layout.
const DEVICE_THUMB_DIR: &str = "@eaDir";

/// Compute the rendition path for a source image and size.
///
/// Pure: identical inputs always yield identical output, and distinct
/// (source, category) pairs never collide.
pub fn thumb_path(
    source: &Path,
    category: SizeCategory,
    pictures_root: &Path,
    thumbnail_root: &Path,
    layout: Layout,
) -> PathBuf {
    match layout {
        Layout::Device => device_thumb_path(source, category),
        Layout::Standard => standard_thumb_path(source, category, pictures_root, thumbnail_root),
    }
}

fn standard_thumb_path(
    source: &Path,
    category: SizeCategory,
    pictures_root: &Path,
    thumbnail_root: &Path,
) -> PathBuf {
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    // Sources outside the pictures root keep their full parent path so
    // they still land somewhere deterministic under the thumb root.
    let relative = parent.strip_prefix(pictures_root).unwrap_or(parent);

    let base = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    // Renditions are JPEG. Keep the source extension only when it is
    // already jpg (in whatever case the source spells it).
    let ext = match source.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("jpg") => e.to_string(),
        _ => "JPG".to_string(),
    };

    thumbnail_root
        .join(relative)
        .join(format!("{}_{}.{}", base, category.suffix(), ext))
}

fn device_thumb_path(source: &Path, category: SizeCategory) -> PathBuf {
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    let file_name = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    parent
        .join(DEVICE_THUMB_DIR)
        .join(file_name)
        .join(format!(
            "SYNOPHOTO_THUMB_{}.jpg",
            category.suffix().to_ascii_uppercase()
        ))
}
