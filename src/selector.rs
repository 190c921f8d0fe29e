//! Backend registry: maps file extensions to rendition backends.
//!
//! Each registration pairs a capability set (the extensions a backend
//! claims) with a factory. Registration order is the priority order —
//! when several backends claim the same extension, the first registered
//! wins. Lookup is case-insensitive and tolerant of a leading dot.
//!
//! Backend instances are created lazily on first selection and memoized
//! behind a [`OnceLock`], so one instance per registration is shared by
//! every concurrent worker. Factories receive the registry's asset root:
//! backends that need supplementary files at creation (overlay fonts and
//! the like) locate them under it; the stock backend ignores it.
//!
//! No registration claiming an extension means the file cannot be
//! processed — [`BackendRegistry::select`] returns `None` and the caller
//! skips the item rather than treating it as an error.

use crate::backend::RenditionBackend;
use crate::image_backend::ImageBackend;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

type BackendFactory = Box<dyn Fn(Option<&Path>) -> Arc<dyn RenditionBackend> + Send + Sync>;

struct Registration {
    /// Lowercase extensions without dots.
    extensions: Vec<String>,
    factory: BackendFactory,
    instance: OnceLock<Arc<dyn RenditionBackend>>,
}

/// Priority-ordered registry of rendition backends.
pub struct BackendRegistry {
    asset_root: Option<PathBuf>,
    registrations: Vec<Registration>,
}

impl BackendRegistry {
    /// An empty registry. Most callers want [`BackendRegistry::stock`].
    pub fn new() -> Self {
        Self {
            asset_root: None,
            registrations: Vec::new(),
        }
    }

    /// Registry with the pure-Rust image backend registered.
    pub fn stock() -> Self {
        let mut registry = Self::new();
        registry.register(
            &["jpg", "jpeg", "png", "tif", "tiff", "webp"],
            |_assets| Arc::new(ImageBackend::new()),
        );
        registry
    }

    /// Base path for supplementary backend assets, handed to factories.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Register a backend for a set of extensions. Earlier registrations
    /// take priority over later ones for overlapping extensions.
    pub fn register<F>(&mut self, extensions: &[&str], factory: F)
    where
        F: Fn(Option<&Path>) -> Arc<dyn RenditionBackend> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            factory: Box::new(factory),
            instance: OnceLock::new(),
        });
    }

    /// Find a backend that can process files with the given extension.
    ///
    /// Returns `None` when no registration claims the extension; the item
    /// cannot be processed and should be skipped, not failed.
    pub fn select(&self, extension: &str) -> Option<Arc<dyn RenditionBackend>> {
        let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
        self.registrations
            .iter()
            .find(|r| r.extensions.iter().any(|e| *e == wanted))
            .map(|r| {
                r.instance
                    .get_or_init(|| (r.factory)(self.asset_root.as_deref()))
                    .clone()
            })
    }

    /// Select a backend for a source file, by its extension.
    pub fn select_for(&self, source: &Path) -> Option<Arc<dyn RenditionBackend>> {
        let ext = source.extension().and_then(|e| e.to_str())?;
        self.select(ext)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::stock()
    }
}
