//! Rendition size specifications.
//!
//! A [`RenditionSpec`] describes *what* a rendition is — its maximum
//! dimensions, whether it is center-cropped, whether the batch scanner
//! generates it — not how the pixels are produced. The stock table in
//! [`stock_specs`] matches the sizes photo-station style consumers expect.
//!
//! Declaration order in the spec table is significant: when the planner
//! looks for a smaller existing rendition to reuse as a decode source, it
//! takes the first fresh source-reusable entry in table order.

/// Named size buckets for generated renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SizeCategory {
    ExtraLarge,
    Large,
    Big,
    Medium,
    Preview,
    Small,
}

impl SizeCategory {
    /// Short filename suffix for this size (`IMG_0001_m.JPG` etc).
    ///
    /// `Preview` has no short code and uses the spelled-out fallback.
    pub fn suffix(self) -> &'static str {
        match self {
            SizeCategory::ExtraLarge => "xl",
            SizeCategory::Large => "l",
            SizeCategory::Big => "b",
            SizeCategory::Medium => "m",
            SizeCategory::Small => "s",
            SizeCategory::Preview => "PREVIEW",
        }
    }
}

/// Static description of one rendition size.
///
/// `max_width`/`max_height` are *maximums* — a generated file may be
/// smaller (aspect-preserving fit), so freshness checks compare with `<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub category: SizeCategory,
    pub max_width: u32,
    pub max_height: u32,
    /// Crop to the spec's exact aspect ratio instead of fitting inside it.
    pub crop_to_aspect: bool,
    /// A fresh rendition of this size may replace the original as the
    /// decode source when generating smaller sizes.
    pub use_as_source: bool,
    /// Generated by the background scan. Non-eligible sizes are only
    /// produced on demand at an explicit size.
    pub batch_eligible: bool,
}

/// The stock spec table, in alt-source preference order.
pub fn stock_specs() -> &'static [RenditionSpec] {
    static SPECS: [RenditionSpec; 6] = [
        RenditionSpec {
            category: SizeCategory::ExtraLarge,
            max_width: 2000,
            max_height: 2000,
            crop_to_aspect: false,
            use_as_source: true,
            batch_eligible: false,
        },
        RenditionSpec {
            category: SizeCategory::Large,
            max_width: 800,
            max_height: 800,
            crop_to_aspect: false,
            use_as_source: true,
            batch_eligible: true,
        },
        RenditionSpec {
            category: SizeCategory::Big,
            max_width: 640,
            max_height: 640,
            crop_to_aspect: false,
            use_as_source: false,
            batch_eligible: false,
        },
        RenditionSpec {
            category: SizeCategory::Medium,
            max_width: 320,
            max_height: 320,
            crop_to_aspect: false,
            use_as_source: false,
            batch_eligible: true,
        },
        RenditionSpec {
            category: SizeCategory::Preview,
            max_width: 160,
            max_height: 120,
            crop_to_aspect: true,
            use_as_source: false,
            batch_eligible: false,
        },
        RenditionSpec {
            category: SizeCategory::Small,
            max_width: 120,
            max_height: 120,
            crop_to_aspect: true,
            use_as_source: false,
            batch_eligible: true,
        },
    ];
    &SPECS
}

/// Look up a spec by category within a spec table.
pub fn spec_for(specs: &[RenditionSpec], category: SizeCategory) -> Option<&RenditionSpec> {
    specs.iter().find(|s| s.category == category)
}
