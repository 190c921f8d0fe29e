//! Pure Rust rendition backend — zero external dependencies.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Bounded resize | `image::DynamicImage::resize` with `Lanczos3` |
//! | Aspect crop | `image::DynamicImage::resize_to_fill` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Source content hash | `sha2` SHA-256 over the raw file bytes |
//! | Dimension probe | `ImageReader::into_dimensions` (header only) |

use crate::backend::{BackendError, GenerateOutput, RenditionBackend, RenditionTarget};
use crate::sizes::RenditionSpec;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Extensions whose decoders are compiled in and known to work.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// JPEG encoding quality for all renditions.
const JPEG_QUALITY: u8 = 90;

/// Read an image's pixel dimensions from its header without decoding.
///
/// The format is sniffed from the file's magic bytes, not its extension,
/// so a truncated or garbage file yields `None` rather than a bogus size.
pub fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Pure Rust backend using the `image` crate ecosystem.
pub struct ImageBackend;

impl ImageBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale `img` down to fit the spec, or crop-and-fill for crop specs.
/// Never upscales: a source already inside the bounds is encoded as-is.
fn render(img: &DynamicImage, spec: &RenditionSpec) -> DynamicImage {
    if spec.crop_to_aspect {
        img.resize_to_fill(spec.max_width, spec.max_height, FilterType::Lanczos3)
    } else if img.width() <= spec.max_width && img.height() <= spec.max_height {
        img.clone()
    } else {
        img.resize(spec.max_width, spec.max_height, FilterType::Lanczos3)
    }
}

impl RenditionBackend for ImageBackend {
    fn supported_extensions(&self) -> &[&'static str] {
        SUPPORTED_EXTENSIONS
    }

    fn generate(
        &self,
        source: &Path,
        targets: &[RenditionTarget],
    ) -> Result<GenerateOutput, BackendError> {
        let bytes = std::fs::read(source)?;
        let source_hash = format!("{:x}", Sha256::digest(&bytes));

        let img = image::load_from_memory(&bytes).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to decode {}: {}",
                source.display(),
                e
            ))
        })?;

        let mut renditions_written = 0;
        for target in targets {
            // JPEG has no alpha channel.
            let rendition = render(&img, &target.spec).to_rgb8();

            let file = File::create(&target.path)?;
            let writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            rendition.write_with_encoder(encoder).map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to encode {}: {}",
                    target.path.display(),
                    e
                ))
            })?;
            renditions_written += 1;
        }

        Ok(GenerateOutput {
            renditions_written,
            source_hash,
        })
    }
}
