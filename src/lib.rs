//! # Thumb Mill
//!
//! A background thumbnail service for photo libraries. The library on
//! disk is the data source: a catalog records which source images still
//! need renditions, a scan loop drains that backlog in batches, and a
//! bounded worker pool decodes each source once and writes every
//! missing size from it.
//!
//! # Architecture: Plan, Generate, Mark
//!
//! Each scan cycle moves one batch of pending images through three
//! steps:
//!
//! ```text
//! 1. Plan      catalog → targets      (which renditions are stale?)
//! 2. Generate  source  → renditions   (decode once, resize per size)
//! 3. Mark      batch   → catalog      (one completion write per batch)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Idempotence**: planning against what is on disk means a crashed
//!   or interrupted run costs nothing — the next cycle regenerates only
//!   what is actually missing or stale.
//! - **Failure isolation**: generation failures are per item; one
//!   corrupt photo never stalls the batch, and the item simply stays in
//!   the backlog.
//! - **Write batching**: completion markers land in a single store
//!   write per batch, not one per image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sizes`] | The stock rendition table: categories, pixel bounds, crop and reuse flags |
//! | [`paths`] | Pure path derivation for both the standard mirror layout and the NAS `@eaDir` layout |
//! | [`planner`] | Per-source staleness check — decides which renditions need regenerating and picks an already-fresh rendition as an alternate decode source |
//! | [`backend`] | The [`backend::RenditionBackend`] trait between planning and pixels |
//! | [`image_backend`] | The stock backend: pure-Rust decode, resize, and JPEG encode via the `image` crate |
//! | [`selector`] | Extension-keyed backend registry with lazy singleton construction |
//! | [`executor`] | Bounded rayon pool running one batch with per-item outcomes |
//! | [`store`] | The backlog: pending queries, batched completion markers, rescan operations, library sync |
//! | [`scanner`] | The long-running loop tying fetch, generate, and mark together |
//! | [`report`] | Event formatting for the CLI printer thread |
//! | [`config`] | `thumb-mill.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Freshness Lives on Disk, Not in the Catalog
//!
//! A rendition is fresh when the file exists, is newer than its source,
//! and its pixel dimensions fit the size's bounds — all checked against
//! the filesystem at plan time. The catalog's completion marker only
//! gates *whether* an image is looked at; it never substitutes for the
//! disk check. Deleting a thumbnail file and nulling the marker is all
//! it takes to regenerate it.
//!
//! ## Decode the Smallest Fresh Rendition
//!
//! Full-resolution decodes dominate generation cost. When a larger
//! rendition flagged as reusable is already fresh, the planner hands it
//! to the backend as the decode source for the smaller stale sizes.
//! Downscaling from an 800px JPEG instead of a 40MP original is not
//! visually distinguishable at thumbnail sizes and is much cheaper.
//!
//! ## One Backend Call per Source
//!
//! The backend receives the full set of stale targets for a source in a
//! single call, so the source is decoded exactly once per cycle no
//! matter how many sizes are missing.
//!
//! ## Pure-Rust Imaging
//!
//! Decode and encode go through the `image` crate — no ImageMagick, no
//! system codecs. Formats the crate cannot decode simply have no stock
//! backend; those files stay pending and are skipped each cycle, so
//! adding a RAW-capable backend later picks them up with no migration.

pub mod backend;
pub mod config;
pub mod executor;
pub mod image_backend;
pub mod paths;
pub mod planner;
pub mod report;
pub mod scanner;
pub mod selector;
pub mod sizes;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
