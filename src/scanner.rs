//! The background scan loop.
//!
//! Each cycle pulls one batch of pending sources from the backlog,
//! hands it to the executor, and records the finished batch with a
//! single marker write. Completion is recorded per attempt, not per
//! success: a batch whose items all failed still gets no markers for
//! those items, so they return on a later cycle, while completed items
//! leave the backlog for good.
//!
//! Pacing: a full batch that marked at least one item means more work
//! is probably waiting, so the next cycle starts immediately. A short
//! batch, or a batch where nothing completed, means the backlog is
//! drained down to unprocessable items and the loop idles for the
//! configured interval before polling again.

use crate::config::ServiceConfig;
use crate::executor::{Executor, Outcome};
use crate::planner::Planner;
use crate::report::{BatchSummary, ScanEvent};
use crate::selector::BackendRegistry;
use crate::store::{BacklogStore, CompletionUpdate, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Granularity of shutdown checks while idling between cycles.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct Scanner {
    store: Arc<dyn BacklogStore>,
    executor: Executor,
    config: ServiceConfig,
    events: Option<mpsc::Sender<ScanEvent>>,
}

impl Scanner {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn BacklogStore>,
        registry: Arc<BackendRegistry>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let planner = Planner::new(config.clone());
        let executor = Executor::new(&config, planner, registry)?;
        Ok(Self {
            store,
            executor,
            config,
            events: None,
        })
    }

    /// Report progress over a channel. Events are best-effort: a gone
    /// receiver never stops the scan.
    pub fn with_events(mut self, events: mpsc::Sender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Run one scan cycle: fetch, generate, persist. The returned
    /// summary carries how many items were fetched (`images`) and how
    /// many actually received markers (`completed`) — callers deciding
    /// whether to keep cycling must look at `completed`, since skipped
    /// items stay in the backlog and are fetched again.
    pub fn run_cycle(&self) -> Result<BatchSummary, StoreError> {
        let batch = self.store.query_pending(self.config.batch_size)?;
        if batch.is_empty() {
            return Ok(BatchSummary::default());
        }
        let fetched = batch.len();
        self.emit(ScanEvent::BatchStarted { pending: fetched });

        let started = Instant::now();
        let results = self.executor.execute_batch(&batch, false);

        let mut summary = BatchSummary {
            images: fetched,
            ..Default::default()
        };
        let completed_at = SystemTime::now();
        let mut updates = Vec::new();

        for result in results {
            match result.outcome {
                Outcome::Completed {
                    hash,
                    renditions_written,
                } => {
                    summary.completed += 1;
                    summary.renditions_written += renditions_written;
                    if renditions_written == 0 {
                        self.emit(ScanEvent::ItemUpToDate {
                            path: result.record.path.clone(),
                        });
                    } else {
                        self.emit(ScanEvent::ItemCompleted {
                            path: result.record.path.clone(),
                            renditions_written,
                        });
                    }
                    updates.push(CompletionUpdate {
                        id: result.record.id,
                        completed_at,
                        hash,
                    });
                }
                Outcome::Skipped(reason) => {
                    summary.skipped += 1;
                    self.emit(ScanEvent::ItemSkipped {
                        path: result.record.path.clone(),
                        reason,
                    });
                }
                Outcome::Failed(error) => {
                    summary.failed += 1;
                    self.emit(ScanEvent::ItemFailed {
                        path: result.record.path.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        // One write for the whole batch. Skipped and failed items get no
        // marker and stay pending.
        self.store.batch_mark_complete(&updates)?;

        summary.elapsed = started.elapsed();
        self.emit(ScanEvent::BatchFinished(summary.clone()));
        Ok(summary)
    }

    /// Run cycles until the backlog stops shrinking, then return.
    ///
    /// A short fetch means the backlog fits in one batch; a cycle with
    /// no completions means everything left is unprocessable right now
    /// (skipped or failing items). Either way another cycle would fetch
    /// the same records, so stop — this is what keeps a library full of
    /// unclaimed formats from spinning a drain forever.
    pub fn drain(&self) -> Result<(), StoreError> {
        loop {
            let summary = self.run_cycle()?;
            if needs_idle_sleep(summary.images, self.config.batch_size) || summary.completed == 0 {
                return Ok(());
            }
        }
    }

    /// Run cycles until `shutdown` is set.
    pub fn run(&self, shutdown: &AtomicBool) {
        if !self.config.generation_enabled {
            self.emit(ScanEvent::Disabled);
            return;
        }
        while !shutdown.load(Ordering::Relaxed) {
            match self.run_cycle() {
                Ok(summary)
                    if !needs_idle_sleep(summary.images, self.config.batch_size)
                        && summary.completed > 0 =>
                {
                    // A full batch that made progress: keep draining
                    // without pausing.
                }
                Ok(_) => self.idle_sleep(shutdown),
                Err(error) => {
                    self.emit(ScanEvent::CycleFault {
                        error: error.to_string(),
                    });
                    self.idle_sleep(shutdown);
                }
            }
        }
    }

    fn idle_sleep(&self, shutdown: &AtomicBool) {
        let deadline = Instant::now() + self.config.scan_interval();
        while Instant::now() < deadline && !shutdown.load(Ordering::Relaxed) {
            std::thread::sleep(SHUTDOWN_POLL.min(deadline - Instant::now()));
        }
    }
}

/// A batch shorter than the fetch limit means the backlog is drained
/// down to items this cycle could not complete; idle before retrying
/// them instead of spinning.
fn needs_idle_sleep(fetched: usize, batch_size: usize) -> bool {
    fetched < batch_size
}
