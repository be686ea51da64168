//! Shell icon images with a bounded cache.
//!
//! Keys follow how the shell assigns icons:
//! - directories and files with per-file icons (shortcuts, executables,
//!   icon files, URL shortcuts, screen savers) are keyed by full path
//! - every other file is keyed by its lowercase extension, since all files
//!   of one type share an icon
//!
//! Each key carries a size suffix. Failed extractions are cached as `None`
//! so a broken file is not retried on every hover.
//!
//! Eviction is insertion-ordered: once `capacity` keys are stored, the
//! oldest inserted key goes, whether or not it was looked up recently.

#[cfg(windows)]
pub mod shell;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::{Mutex, RwLock};

use crate::config::IconCacheConfig;
use crate::error::DeskPeekResult;

#[cfg(windows)]
pub use shell::ShellIconSource;

/// Extensions whose files carry their own icon.
const PER_FILE_ICON_EXTENSIONS: &[&str] = &["lnk", "exe", "ico", "url", "scr"];

/// What an icon source is asked to extract.
#[derive(Debug, Clone, Copy)]
pub struct IconRequest<'a> {
    pub path: &'a Path,
    pub is_directory: bool,
    pub large: bool,
    /// The icon depends on the file itself; when false, the source may look
    /// it up from the extension alone without touching the file.
    pub read_file: bool,
}

/// Produces icon bitmaps.
pub trait IconSource: Send + Sync {
    fn extract(&self, request: &IconRequest<'_>) -> DeskPeekResult<RgbaImage>;
}

fn has_per_file_icon(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| PER_FILE_ICON_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Cache key for an icon lookup.
pub fn cache_key(path: &Path, is_directory: bool, large: bool) -> String {
    let size = if large { "L" } else { "S" };

    if is_directory {
        return format!("dir:{}:{}", path.display(), size);
    }
    if has_per_file_icon(path) {
        return format!("file:{}:{}", path.display(), size);
    }

    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| ".file".to_string());
    format!("{}:{}", ext, size)
}

/// Bounded icon cache in front of an [`IconSource`].
pub struct IconCache<S: IconSource> {
    source: S,
    capacity: usize,
    large_by_default: bool,
    entries: RwLock<HashMap<String, Option<Arc<RgbaImage>>>>,
    insertion_order: Mutex<VecDeque<String>>,
}

impl<S: IconSource> IconCache<S> {
    pub fn new(source: S, config: &IconCacheConfig) -> Self {
        let mut config = config.clone();
        config.validate();

        Self {
            source,
            capacity: config.capacity,
            large_by_default: config.large_icons,
            entries: RwLock::new(HashMap::with_capacity(config.capacity)),
            insertion_order: Mutex::new(VecDeque::with_capacity(config.capacity)),
        }
    }

    /// Icon for `path`, extracting on a miss.
    pub fn get_icon(&self, path: &Path, is_directory: bool, large: bool) -> Option<Arc<RgbaImage>> {
        let key = cache_key(path, is_directory, large);

        if let Some(entry) = self.entries.read().get(&key) {
            return entry.clone();
        }

        let request = IconRequest {
            path,
            is_directory,
            large,
            read_file: is_directory || has_per_file_icon(path),
        };
        let image = match self.source.extract(&request) {
            Ok(image) => Some(Arc::new(image)),
            Err(e) => {
                log::debug!("[ICONS] No icon for {}: {}", path.display(), e);
                None
            }
        };

        self.insert(key, image.clone());
        image
    }

    /// Icon at the configured default size.
    pub fn icon_for(&self, path: &Path, is_directory: bool) -> Option<Arc<RgbaImage>> {
        self.get_icon(path, is_directory, self.large_by_default)
    }

    fn insert(&self, key: String, image: Option<Arc<RgbaImage>>) {
        let mut order = self.insertion_order.lock();
        let mut entries = self.entries.write();

        // Another thread extracted the same key first.
        if entries.contains_key(&key) {
            return;
        }

        entries.insert(key.clone(), image);
        order.push_back(key);

        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                entries.remove(&oldest);
                log::trace!("[ICONS] Evicted {}", oldest);
            }
        }
    }

    /// Drop every cached icon.
    pub fn clear(&self) {
        let mut order = self.insertion_order.lock();
        self.entries.write().clear();
        order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, path: &Path, is_directory: bool, large: bool) -> bool {
        self.entries
            .read()
            .contains_key(&cache_key(path, is_directory, large))
    }
}

impl<S: IconSource + 'static> IconCache<S> {
    /// `get_icon` with extraction moved to the blocking pool, so a cold
    /// lookup never runs on the caller's task.
    pub async fn get_icon_async(
        self: &Arc<Self>,
        path: PathBuf,
        is_directory: bool,
        large: bool,
    ) -> Option<Arc<RgbaImage>> {
        let key = cache_key(&path, is_directory, large);
        if let Some(entry) = self.entries.read().get(&key) {
            return entry.clone();
        }

        let cache = Arc::clone(self);
        match tokio::task::spawn_blocking(move || cache.get_icon(&path, is_directory, large)).await {
            Ok(image) => image,
            Err(e) => {
                log::warn!("[ICONS] Icon extraction task failed: {}", e);
                None
            }
        }
    }
}
