//! Backlog store: the record of which sources still need thumbnails.
//!
//! The scanner only ever talks to the [`BacklogStore`] trait. A source
//! item is *pending* while its `thumbs_generated` marker is unset; the
//! marker (plus a content hash) is written in one batched update after a
//! whole batch has been attempted. An operator re-enters items into the
//! backlog by nulling their markers via the rescan operations.
//!
//! [`MemoryStore`] is the in-process implementation behind the CLI: a
//! JSON catalog snapshot on disk, refreshed from the library by
//! [`MemoryStore::sync_with_library`], which plays the ingestion role —
//! new files enter pending, files whose modification time advanced past
//! the recorded one are re-flagged, vanished files are dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// Name of the catalog snapshot file.
const CATALOG_FILENAME: &str = ".thumb-mill-catalog.json";

/// Version of the catalog format. Bump to invalidate existing catalogs
/// when the record shape changes (markers reset, generation re-runs —
/// safe, because regeneration is idempotent).
const CATALOG_VERSION: u32 = 1;

/// Extensions that count as library images when syncing the catalog.
/// Deliberately wider than what the stock backend can decode — files no
/// backend claims stay pending and are skipped each scan.
const LIBRARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "nef", "cr2", "arw", "dng", "orf",
];

pub type ImageId = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Catalog error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One source image as the backlog sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: ImageId,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// The source's parent folder (rescan granularity).
    pub folder: PathBuf,
    /// File last-modified time as of the last catalog sync.
    pub modified: SystemTime,
    /// Completion marker: set once generation has been attempted for
    /// every batch-eligible size. Unset means pending.
    pub thumbs_generated: Option<SystemTime>,
    /// Content hash of the source, recorded on successful generation.
    pub hash: Option<String>,
}

/// One entry of the batched completion write.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionUpdate {
    pub id: ImageId,
    pub completed_at: SystemTime,
    pub hash: Option<String>,
}

/// The scanner's view of the record store.
///
/// The scanner is the single writer of completion markers; the rescan
/// operations exist for operator tooling and are never called from the
/// scan loop itself.
pub trait BacklogStore: Send + Sync {
    /// Up to `limit` pending records, most recently modified first.
    fn query_pending(&self, limit: usize) -> Result<Vec<SourceRecord>, StoreError>;

    /// Set completion markers and hashes for a finished batch in one write.
    fn batch_mark_complete(&self, updates: &[CompletionUpdate]) -> Result<(), StoreError>;

    /// Null the completion markers for specific images. Returns how many
    /// records were flagged.
    fn mark_for_rescan(&self, ids: &[ImageId]) -> Result<usize, StoreError>;

    /// Null the completion markers for every image in a folder.
    fn mark_folder_for_rescan(&self, folder: &Path) -> Result<usize, StoreError>;
}

/// Counts from one catalog sync pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added: usize,
    pub refreshed: usize,
    pub removed: usize,
    pub total: usize,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images ({} new, {} touched, {} gone)",
            self.total, self.added, self.refreshed, self.removed
        )
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    records: Vec<SourceRecord>,
}

/// In-process backlog store with a JSON catalog snapshot.
pub struct MemoryStore {
    records: Mutex<Vec<SourceRecord>>,
    /// When set, completion batches write the snapshot back to disk so
    /// markers survive a restart of a long-running service.
    catalog_dir: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            catalog_dir: None,
        }
    }

    /// Snapshot the catalog into `dir` after every completion batch.
    pub fn persist_to(mut self, dir: &Path) -> Self {
        self.catalog_dir = Some(dir.to_path_buf());
        self
    }

    /// Load the catalog from a directory. A missing, corrupt, or
    /// version-mismatched snapshot yields an empty store — markers are
    /// lost and generation re-runs, which is safe.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CATALOG_FILENAME);
        let records = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<CatalogFile>(&content).ok())
            .filter(|catalog| catalog.version == CATALOG_VERSION)
            .map(|catalog| catalog.records)
            .unwrap_or_default();
        Self {
            records: Mutex::new(records),
            catalog_dir: None,
        }
    }

    /// Save the catalog snapshot into a directory.
    pub fn save(&self, dir: &Path) -> Result<(), StoreError> {
        let catalog = CatalogFile {
            version: CATALOG_VERSION,
            records: self.records.lock().unwrap().clone(),
        };
        let json = serde_json::to_string_pretty(&catalog)?;
        std::fs::write(dir.join(CATALOG_FILENAME), json)?;
        Ok(())
    }

    /// Path of the snapshot file within a catalog directory.
    pub fn catalog_path(dir: &Path) -> PathBuf {
        dir.join(CATALOG_FILENAME)
    }

    /// Walk the library and reconcile the catalog with what is on disk.
    pub fn sync_with_library(&self, pictures_root: &Path) -> Result<SyncStats, StoreError> {
        let mut stats = SyncStats::default();
        let mut records = self.records.lock().unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut next_id = records.iter().map(|r| r.id + 1).max().unwrap_or(1);

        for entry in WalkDir::new(pictures_root)
            .into_iter()
            .filter_entry(|e| e.file_name() != "@eaDir")
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if !is_library_image(entry.path()) {
                continue;
            }
            let modified = entry.metadata().map_err(io::Error::from)?.modified()?;
            let path = entry.path().to_path_buf();
            seen.insert(path.clone());

            match records.iter_mut().find(|r| r.path == path) {
                Some(record) => {
                    if modified > record.modified {
                        record.modified = modified;
                        record.thumbs_generated = None;
                        stats.refreshed += 1;
                    }
                }
                None => {
                    records.push(SourceRecord {
                        id: next_id,
                        folder: path.parent().unwrap_or(pictures_root).to_path_buf(),
                        path,
                        modified,
                        thumbs_generated: None,
                        hash: None,
                    });
                    next_id += 1;
                    stats.added += 1;
                }
            }
        }

        let before = records.len();
        records.retain(|r| seen.contains(&r.path));
        stats.removed = before - records.len();
        stats.total = records.len();
        Ok(stats)
    }

    #[cfg(test)]
    pub fn insert(&self, record: SourceRecord) {
        self.records.lock().unwrap().push(record);
    }

    #[cfg(test)]
    pub fn get(&self, id: ImageId) -> Option<SourceRecord> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_library_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            LIBRARY_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl BacklogStore for MemoryStore {
    fn query_pending(&self, limit: usize) -> Result<Vec<SourceRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut pending: Vec<SourceRecord> = records
            .iter()
            .filter(|r| r.thumbs_generated.is_none())
            .cloned()
            .collect();
        // Most recently touched first — recent imports and edits are the
        // items a user is most likely waiting on.
        pending.sort_by(|a, b| b.modified.cmp(&a.modified));
        pending.truncate(limit);
        Ok(pending)
    }

    fn batch_mark_complete(&self, updates: &[CompletionUpdate]) -> Result<(), StoreError> {
        {
            let mut records = self.records.lock().unwrap();
            for update in updates {
                if let Some(record) = records.iter_mut().find(|r| r.id == update.id) {
                    record.thumbs_generated = Some(update.completed_at);
                    if update.hash.is_some() {
                        record.hash = update.hash.clone();
                    }
                }
            }
        }
        if let Some(dir) = &self.catalog_dir {
            self.save(dir)?;
        }
        Ok(())
    }

    fn mark_for_rescan(&self, ids: &[ImageId]) -> Result<usize, StoreError> {
        let mut records = self.records.lock().unwrap();
        let mut flagged = 0;
        for record in records.iter_mut() {
            if ids.contains(&record.id) && record.thumbs_generated.is_some() {
                record.thumbs_generated = None;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    fn mark_folder_for_rescan(&self, folder: &Path) -> Result<usize, StoreError> {
        let mut records = self.records.lock().unwrap();
        let mut flagged = 0;
        for record in records.iter_mut() {
            if record.folder == folder && record.thumbs_generated.is_some() {
                record.thumbs_generated = None;
                flagged += 1;
            }
        }
        Ok(flagged)
    }
}
