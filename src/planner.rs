//! Thumbnail planning: decide which renditions a source needs.
//!
//! For each batch-eligible size the planner derives the target path and
//! checks whether the rendition on disk is still *fresh*. A target is
//! fresh when all three hold:
//!
//! 1. the file exists,
//! 2. its modification time is strictly newer than the source's, and
//! 3. its actual pixel dimensions fit within the spec's maximums
//!    (renditions are aspect-preserving, so they may be smaller).
//!
//! Anything else — including a target whose header cannot be read — goes
//! into the plan for (re)generation. Probing reads only header metadata,
//! never a full decode.
//!
//! While checking, the planner remembers the first fresh target whose
//! spec is source-reusable, in spec declaration order. That file becomes
//! the plan's alternate source: decoding an existing 800px rendition to
//! produce a 120px one is much cheaper than decoding a 40MB original.

use crate::backend::RenditionTarget;
use crate::config::ServiceConfig;
use crate::image_backend::probe_dimensions;
use crate::paths::thumb_path;
use crate::sizes::{RenditionSpec, SizeCategory, spec_for, stock_specs};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Everything one source item needs generated, plus the cheapest way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub targets: Vec<RenditionTarget>,
    /// A fresh smaller rendition to decode instead of the original.
    pub alt_source: Option<PathBuf>,
}

impl GenerationPlan {
    /// An up-to-date source produces an empty plan: nothing to do, but
    /// the item is still eligible for its completion marker.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The path the backend should decode for this plan.
    pub fn effective_source<'a>(&'a self, original: &'a Path) -> &'a Path {
        self.alt_source.as_deref().unwrap_or(original)
    }
}

/// Computes [`GenerationPlan`]s against a configured spec table.
pub struct Planner {
    config: ServiceConfig,
    specs: Vec<RenditionSpec>,
}

impl Planner {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_specs(config, stock_specs().to_vec())
    }

    /// A planner over a custom spec table (declaration order is the
    /// alt-source preference order).
    pub fn with_specs(config: ServiceConfig, specs: Vec<RenditionSpec>) -> Self {
        Self { config, specs }
    }

    pub fn specs(&self) -> &[RenditionSpec] {
        &self.specs
    }

    /// Derived rendition path for a source and size.
    pub fn target_path(&self, source: &Path, category: SizeCategory) -> PathBuf {
        thumb_path(
            source,
            category,
            &self.config.pictures_root,
            &self.config.thumbnail_root,
            self.config.layout(),
        )
    }

    /// Plan the batch-eligible renditions for one source.
    ///
    /// `force` regenerates everything regardless of freshness (and skips
    /// alt-source selection — there is nothing trustworthy to reuse).
    pub fn plan(&self, source: &Path, force: bool) -> io::Result<GenerationPlan> {
        let source_modified = std::fs::metadata(source)?.modified()?;

        let mut targets = Vec::new();
        let mut alt_source = None;

        for spec in self.specs.iter().filter(|s| s.batch_eligible) {
            let target = self.target_path(source, spec.category);
            ensure_parent_dir(&target)?;

            if !force && is_fresh(&target, source_modified, spec) {
                if alt_source.is_none() && spec.use_as_source {
                    alt_source = Some(target);
                }
                continue;
            }

            targets.push(RenditionTarget {
                path: target,
                spec: *spec,
            });
        }

        Ok(GenerationPlan {
            targets,
            alt_source,
        })
    }

    /// Degenerate one-entry plan for on-demand generation at an explicit
    /// size, bypassing freshness checks. Sizes outside the spec table
    /// yield an empty plan.
    pub fn plan_single(
        &self,
        source: &Path,
        category: SizeCategory,
    ) -> io::Result<GenerationPlan> {
        let mut targets = Vec::new();
        if let Some(spec) = spec_for(&self.specs, category) {
            let target = self.target_path(source, category);
            ensure_parent_dir(&target)?;
            targets.push(RenditionTarget {
                path: target,
                spec: *spec,
            });
        }
        Ok(GenerationPlan {
            targets,
            alt_source: None,
        })
    }
}

/// Idempotent, race-tolerant directory creation for a target file.
fn ensure_parent_dir(target: &Path) -> io::Result<()> {
    match target.parent() {
        Some(dir) => std::fs::create_dir_all(dir),
        None => Ok(()),
    }
}

/// The three-clause freshness check. Unreadable target metadata counts
/// as stale, forcing regeneration.
fn is_fresh(target: &Path, source_modified: SystemTime, spec: &RenditionSpec) -> bool {
    let Ok(metadata) = std::fs::metadata(target) else {
        return false;
    };
    let Ok(target_modified) = metadata.modified() else {
        return false;
    };
    if target_modified <= source_modified {
        return false;
    }
    match probe_dimensions(target) {
        Some((width, height)) => width <= spec.max_width && height <= spec.max_height,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizes::SizeCategory::*;
    use crate::test_helpers::{secs_ago, set_mtime, write_image};
    use tempfile::TempDir;

    fn spec(
        category: SizeCategory,
        max: u32,
        use_as_source: bool,
        batch_eligible: bool,
    ) -> RenditionSpec {
        RenditionSpec {
            category,
            max_width: max,
            max_height: max,
            crop_to_aspect: false,
            use_as_source,
            batch_eligible,
        }
    }

    /// Planner over a small three-size table: Large (reusable), Medium
    /// (reusable), Small — all batch-eligible.
    fn test_planner(tmp: &TempDir) -> Planner {
        let config = ServiceConfig {
            pictures_root: tmp.path().join("pics"),
            thumbnail_root: tmp.path().join("thumbs"),
            ..Default::default()
        };
        Planner::with_specs(
            config,
            vec![
                spec(Large, 80, true, true),
                spec(Medium, 32, true, true),
                spec(Small, 12, false, true),
            ],
        )
    }

    fn source_image(tmp: &TempDir) -> PathBuf {
        let source = tmp.path().join("pics/trip/IMG_0001.jpg");
        write_image(&source, 200, 150, secs_ago(3600));
        source
    }

    /// Write a fresh in-spec rendition at the derived target path.
    fn write_fresh_target(planner: &Planner, source: &Path, category: SizeCategory, dim: u32) {
        let target = planner.target_path(source, category);
        write_image(&target, dim, dim, secs_ago(60));
    }

    #[test]
    fn cold_start_plans_every_batch_size() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        let plan = planner.plan(&source, false).unwrap();
        let categories: Vec<_> = plan.targets.iter().map(|t| t.spec.category).collect();
        assert_eq!(categories, vec![Large, Medium, Small]);
        assert_eq!(plan.alt_source, None);
        assert_eq!(plan.effective_source(&source), source.as_path());
    }

    #[test]
    fn planning_creates_target_directories() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        let plan = planner.plan(&source, false).unwrap();
        for target in &plan.targets {
            assert!(target.path.parent().unwrap().is_dir());
        }
    }

    #[test]
    fn warm_rerun_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);
        write_fresh_target(&planner, &source, Small, 12);

        let plan = planner.plan(&source, false).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn partial_staleness_plans_only_missing_size() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);
        // Small was deleted externally — never written.

        let plan = planner.plan(&source, false).unwrap();
        let categories: Vec<_> = plan.targets.iter().map(|t| t.spec.category).collect();
        assert_eq!(categories, vec![Small]);

        // The fresh Large rendition becomes the decode source.
        assert_eq!(
            plan.alt_source.as_deref(),
            Some(planner.target_path(&source, Large).as_path())
        );
        assert_eq!(
            plan.effective_source(&source),
            planner.target_path(&source, Large).as_path()
        );
    }

    #[test]
    fn alt_source_prefers_declaration_order_not_size() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        // Both reusable sizes are fresh; Medium is smaller but Large is
        // declared first.
        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);

        let plan = planner.plan(&source, false).unwrap();
        assert_eq!(
            plan.alt_source.as_deref(),
            Some(planner.target_path(&source, Large).as_path())
        );
    }

    #[test]
    fn touched_source_invalidates_everything() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);
        write_fresh_target(&planner, &source, Small, 12);

        // Advance the source past every rendition. Dimensions still match.
        set_mtime(&source, SystemTime::now());

        let plan = planner.plan(&source, false).unwrap();
        assert_eq!(plan.targets.len(), 3);
        assert_eq!(plan.alt_source, None);
    }

    #[test]
    fn oversized_target_is_stale() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Small, 12);
        // A Medium rendition bigger than its 32px cap.
        write_fresh_target(&planner, &source, Medium, 48);

        let plan = planner.plan(&source, false).unwrap();
        let categories: Vec<_> = plan.targets.iter().map(|t| t.spec.category).collect();
        assert_eq!(categories, vec![Medium]);
    }

    #[test]
    fn unreadable_target_is_stale() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);
        // Corrupt Small: right place, right mtime, garbage bytes.
        let small = planner.target_path(&source, Small);
        std::fs::create_dir_all(small.parent().unwrap()).unwrap();
        std::fs::write(&small, b"truncated garbage").unwrap();
        set_mtime(&small, secs_ago(60));

        let plan = planner.plan(&source, false).unwrap();
        let categories: Vec<_> = plan.targets.iter().map(|t| t.spec.category).collect();
        assert_eq!(categories, vec![Small]);
    }

    #[test]
    fn force_replans_everything_without_alt_source() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        write_fresh_target(&planner, &source, Large, 80);
        write_fresh_target(&planner, &source, Medium, 30);
        write_fresh_target(&planner, &source, Small, 12);

        let plan = planner.plan(&source, true).unwrap();
        assert_eq!(plan.targets.len(), 3);
        assert_eq!(plan.alt_source, None);
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let missing = tmp.path().join("pics/gone.jpg");
        assert!(planner.plan(&missing, false).is_err());
    }

    #[test]
    fn single_size_plan_bypasses_freshness() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        // Fresh Medium already on disk — planned anyway.
        write_fresh_target(&planner, &source, Medium, 30);

        let plan = planner.plan_single(&source, Medium).unwrap();
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].spec.category, Medium);
        assert_eq!(plan.alt_source, None);

        // Unknown size for this table → empty plan.
        let none = planner.plan_single(&source, ExtraLarge).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn older_target_is_stale_even_with_matching_dimensions() {
        let tmp = TempDir::new().unwrap();
        let planner = test_planner(&tmp);
        let source = source_image(&tmp);

        let target = planner.target_path(&source, Large);
        // In-spec dimensions but older than the source.
        write_image(&target, 80, 60, secs_ago(7200));

        let plan = planner.plan(&source, false).unwrap();
        assert!(
            plan.targets
                .iter()
                .any(|t| t.spec.category == Large)
        );
    }
}
