//! Parallel batch execution with a resource-aware worker bound.
//!
//! Each source item in a batch is an independent unit of work: plan,
//! resolve the effective decode source, pick a backend, generate. Items
//! fan out across an owned rayon pool sized by
//! [`ServiceConfig::worker_count`] — never thread-per-item, because every
//! worker may hold a full-resolution decode in memory at once.
//!
//! Failure domains are isolated per item. A fault is captured in that
//! item's [`Outcome`]; it never cancels siblings, and the batch always
//! runs to completion before control returns to the discovery loop for
//! the batch-level marker write.

use crate::backend::BackendError;
use crate::config::ServiceConfig;
use crate::planner::Planner;
use crate::selector::BackendRegistry;
use crate::store::SourceRecord;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Faults that leave an item stale for retry on a later cycle.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Why an item was passed over without being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source file is gone from disk.
    MissingSource,
    /// No registered backend claims the source's extension.
    NoBackend,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSource => write!(f, "source file missing"),
            SkipReason::NoBackend => write!(f, "no backend for this format"),
        }
    }
}

/// Result of attempting one source item.
///
/// Only `Completed` items receive completion markers. Skipped and failed
/// items stay pending and are naturally re-fetched by later scans.
#[derive(Debug)]
pub enum Outcome {
    /// Every planned rendition was attempted and written. An up-to-date
    /// item completes with zero renditions and no hash.
    Completed {
        hash: Option<String>,
        renditions_written: usize,
    },
    Skipped(SkipReason),
    Failed(ItemError),
}

/// One record's outcome, paired back to the record it came from.
#[derive(Debug)]
pub struct ItemResult {
    pub record: SourceRecord,
    pub outcome: Outcome,
}

/// Runs batches of per-item generation on a bounded worker pool.
pub struct Executor {
    planner: Planner,
    registry: Arc<BackendRegistry>,
    pool: rayon::ThreadPool,
}

impl Executor {
    /// Pool size comes from the config the planner was built with.
    pub fn new(
        config: &ServiceConfig,
        planner: Planner,
        registry: Arc<BackendRegistry>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::with_worker_count(planner, registry, config.worker_count())
    }

    /// Executor with an explicit worker bound.
    pub fn with_worker_count(
        planner: Planner,
        registry: Arc<BackendRegistry>,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("thumb-worker-{i}"))
            .build()?;
        Ok(Self {
            planner,
            registry,
            pool,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every item in the batch to completion and collect outcomes.
    /// No ordering guarantee across items; results come back in input
    /// order regardless of finish order.
    pub fn execute_batch(&self, records: &[SourceRecord], force: bool) -> Vec<ItemResult> {
        self.pool.install(|| {
            records
                .par_iter()
                .map(|record| ItemResult {
                    record: record.clone(),
                    outcome: self.generate_item(record, force),
                })
                .collect()
        })
    }

    /// The per-item pipeline. Every fault is absorbed into the outcome.
    fn generate_item(&self, record: &SourceRecord, force: bool) -> Outcome {
        if !record.path.exists() {
            return Outcome::Skipped(SkipReason::MissingSource);
        }

        let plan = match self.planner.plan(&record.path, force) {
            Ok(plan) => plan,
            Err(e) => return Outcome::Failed(e.into()),
        };

        if plan.is_empty() {
            return Outcome::Completed {
                hash: None,
                renditions_written: 0,
            };
        }

        // Select by the effective source: when a fresh rendition stands
        // in for the original, its (always decodable) extension is what
        // matters.
        let source = plan.effective_source(&record.path).to_path_buf();
        let Some(backend) = self.registry.select_for(&source) else {
            return Outcome::Skipped(SkipReason::NoBackend);
        };

        match backend.generate(&source, &plan.targets) {
            Ok(output) => Outcome::Completed {
                hash: Some(output.source_hash),
                renditions_written: output.renditions_written,
            },
            Err(e) => Outcome::Failed(e.into()),
        }
    }
}
