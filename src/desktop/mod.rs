//! Desktop surface introspection.
//!
//! Reads icon geometry and labels out of the shell's desktop list control
//! (a window owned by another process) and publishes them as an
//! [`IndexTable`] mapping screen rectangles to filesystem paths.
//!
//! Refreshes are slow (tens of milliseconds) and belong on a background
//! worker. Point queries only read the published table and are cheap.

pub mod discovery;
mod names;
mod reader;
mod table;


use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DeskPeekError, DeskPeekResult};
use crate::platform::DesktopPlatform;
use crate::remote::ProcessHandle;

pub use names::{default_desktop_dirs, NameIndex};
pub use table::{IconRecord, IndexTable};

use reader::ItemReader;

/// Deepest window nesting inspected when checking surface membership.
const MAX_ANCESTOR_DEPTH: usize = 32;

/// Upper bound on records reserved up front; the item count comes from
/// another process.
const RESERVED_RECORDS: usize = 4096;

/// Owns the published index table for one desktop.
pub struct DesktopIntrospector<P: DesktopPlatform> {
    platform: P,
    table: RwLock<Arc<IndexTable>>,
    directories: Vec<PathBuf>,
}

impl<P: DesktopPlatform> DesktopIntrospector<P> {
    /// Introspector over the user and shared desktops.
    pub fn new(platform: P) -> Self {
        Self::with_directories(platform, default_desktop_dirs())
    }

    /// Introspector resolving labels against `directories`, in priority order.
    pub fn with_directories(platform: P, directories: Vec<PathBuf>) -> Self {
        Self {
            platform,
            table: RwLock::new(Arc::new(IndexTable::empty())),
            directories,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Rebuild the index table. Returns false (keeping the previous table)
    /// when the control is missing, empty, inaccessible, or nothing matched.
    pub fn refresh(&self) -> bool {
        match self.try_refresh() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("[INTROSPECT] Refresh failed: {}", e);
                false
            }
        }
    }

    /// Rebuild the index table, returning the number of records published.
    pub fn try_refresh(&self) -> DeskPeekResult<usize> {
        let list = discovery::find_list_control(&self.platform)?;
        let count = reader::item_count(&self.platform, list)?;
        let pid = self
            .platform
            .window_process_id(list)
            .ok_or_else(|| DeskPeekError::ListControlNotFound("list control has no owner".into()))?;

        let names = NameIndex::build(&self.directories);
        let process = ProcessHandle::open(&self.platform, pid)?;
        let mut reader = ItemReader::new(&self.platform, &process, list);

        let mut records = Vec::with_capacity(count.min(RESERVED_RECORDS));
        for index in 0..count as i32 {
            match reader.read_record(index, &names) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::trace!("[INTROSPECT] Skipping item {}: {}", index, e),
            }
        }
        drop(reader);

        if process.failed_releases() > 0 {
            log::debug!(
                "[INTROSPECT] {} remote buffers could not be freed",
                process.failed_releases()
            );
        }

        let table = IndexTable::new(list, records, names);
        if table.is_empty() {
            return Err(DeskPeekError::NoItemsMatched { count });
        }

        let published = table.len();
        let folders = table.records().iter().filter(|r| r.is_folder).count();
        *self.table.write() = Arc::new(table);

        log::info!(
            "[INTROSPECT] Indexed {} of {} desktop items ({} folders)",
            published,
            count,
            folders
        );
        Ok(published)
    }

    /// True when the window under the point is the list control or one of
    /// its descendants.
    pub fn is_point_on_surface(&self, x: i32, y: i32) -> bool {
        let Some(list) = self.table.read().list_control() else {
            return false;
        };

        let mut current = self.platform.window_from_point(x, y);
        for _ in 0..MAX_ANCESTOR_DEPTH {
            match current {
                Some(window) if window == list => return true,
                Some(window) => current = self.platform.parent_of(window),
                None => return false,
            }
        }
        false
    }

    /// First folder icon containing the point, if the point is on the desktop.
    pub fn icon_at(&self, x: i32, y: i32) -> Option<IconRecord> {
        if !self.is_point_on_surface(x, y) {
            return None;
        }
        self.table.read().folder_at(x, y).cloned()
    }

    /// Re-read the live bounds of `record` and compare with the cached ones.
    ///
    /// False when the bounds moved or the list control is gone. A read that
    /// merely fails (timeout, remote I/O) leaves the record unverified and
    /// counts as true.
    pub fn validate(&self, record: &IconRecord) -> bool {
        match self.try_validate(record) {
            Ok(same) => {
                if !same {
                    log::debug!(
                        "[INTROSPECT] Item {} ({}) moved since last refresh",
                        record.index,
                        record.name()
                    );
                }
                same
            }
            // The control is gone, so the cached geometry is too.
            Err(e @ DeskPeekError::ListControlNotFound(_)) => {
                log::debug!("[INTROSPECT] Validation of item {} failed: {}", record.index, e);
                false
            }
            Err(e) => {
                log::debug!(
                    "[INTROSPECT] Item {} could not be re-read, keeping it: {}",
                    record.index,
                    e
                );
                true
            }
        }
    }

    fn try_validate(&self, record: &IconRecord) -> DeskPeekResult<bool> {
        let list = self
            .table
            .read()
            .list_control()
            .ok_or_else(|| DeskPeekError::ListControlNotFound("no table published".into()))?;
        if !self.platform.is_window(list) {
            return Err(DeskPeekError::ListControlNotFound("list control destroyed".into()));
        }

        let pid = self
            .platform
            .window_process_id(list)
            .ok_or_else(|| DeskPeekError::ListControlNotFound("list control has no owner".into()))?;
        let process = ProcessHandle::open(&self.platform, pid)?;
        let live = ItemReader::new(&self.platform, &process, list).read_bounds(record.index)?;
        Ok(live == record.bounds)
    }

    /// Snapshot of the current table.
    pub fn icons(&self) -> Arc<IndexTable> {
        Arc::clone(&self.table.read())
    }

    pub fn icon_count(&self) -> usize {
        self.table.read().len()
    }

    /// True while the list control the table was read from still exists.
    pub fn is_control_alive(&self) -> bool {
        self.table
            .read()
            .list_control()
            .map(|list| self.platform.is_window(list))
            .unwrap_or(false)
    }
}
