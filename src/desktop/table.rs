//! Published snapshot of the desktop icon layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::names::NameIndex;
use crate::geometry::ScreenRect;
use crate::platform::WindowId;

/// One desktop icon resolved to a filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRecord {
    /// Position in the list control; stable only within one refresh.
    pub index: i32,
    pub file_path: PathBuf,
    /// Screen-space bounds of icon plus label.
    pub bounds: ScreenRect,
    pub is_folder: bool,
}

impl IconRecord {
    /// File name for display and logging.
    pub fn name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Same item as `other` (index and target path), regardless of bounds.
    pub fn same_item(&self, other: &IconRecord) -> bool {
        self.index == other.index && self.file_path == other.file_path
    }
}

/// Everything one refresh produced. Never mutated after publication; a
/// refresh builds a new table and swaps it in.
#[derive(Debug, Default)]
pub struct IndexTable {
    list_control: Option<WindowId>,
    records: Vec<IconRecord>,
    names: NameIndex,
}

impl IndexTable {
    /// Build a table. Records with improper bounds or an empty path are
    /// dropped; the rest are ordered by index.
    pub fn new(list_control: WindowId, mut records: Vec<IconRecord>, names: NameIndex) -> Self {
        records.retain(|r| r.bounds.is_proper() && !r.file_path.as_os_str().is_empty());
        records.sort_by_key(|r| r.index);
        Self {
            list_control: Some(list_control),
            records,
            names,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// List control the records were read from.
    pub fn list_control(&self) -> Option<WindowId> {
        self.list_control
    }

    pub fn records(&self) -> &[IconRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: i32) -> Option<&IconRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// First folder record (lowest index) whose bounds contain the point.
    pub fn folder_at(&self, x: i32, y: i32) -> Option<&IconRecord> {
        self.records
            .iter()
            .filter(|r| r.is_folder)
            .find(|r| r.bounds.contains(x, y))
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// Resolve a desktop label through this table's name index.
    pub fn resolve(&self, label: &str) -> Option<&Path> {
        self.names.resolve(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: i32, name: &str, bounds: ScreenRect, is_folder: bool) -> IconRecord {
        IconRecord {
            index,
            file_path: PathBuf::from(format!("C:/Users/me/Desktop/{}", name)),
            bounds,
            is_folder,
        }
    }

    #[test]
    fn test_new_drops_degenerate_records_and_sorts() {
        let table = IndexTable::new(
            WindowId(1),
            vec![
                record(2, "b", ScreenRect::new(0, 0, 10, 10), true),
                record(0, "a", ScreenRect::new(0, 0, 0, 10), true),
                record(1, "c", ScreenRect::new(0, 0, 10, 10), true),
                IconRecord {
                    index: 3,
                    file_path: PathBuf::new(),
                    bounds: ScreenRect::new(0, 0, 10, 10),
                    is_folder: true,
                },
            ],
            NameIndex::default(),
        );

        let indices: Vec<i32> = table.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_folder_at_skips_files_and_prefers_lowest_index() {
        let overlap = ScreenRect::new(0, 0, 50, 50);
        let table = IndexTable::new(
            WindowId(1),
            vec![
                record(0, "notes.txt", overlap, false),
                record(4, "Later", overlap, true),
                record(2, "Earlier", overlap, true),
            ],
            NameIndex::default(),
        );

        assert_eq!(table.folder_at(10, 10).map(|r| r.index), Some(2));
        assert!(table.folder_at(50, 10).is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = IndexTable::empty();
        assert!(table.is_empty());
        assert!(table.list_control().is_none());
        assert!(table.folder_at(0, 0).is_none());
    }

    #[test]
    fn test_same_item_ignores_bounds() {
        let a = record(3, "Projects", ScreenRect::new(0, 0, 10, 10), true);
        let mut b = a.clone();
        b.bounds = ScreenRect::new(100, 100, 110, 110);
        assert!(a.same_item(&b));
        b.index = 4;
        assert!(!a.same_item(&b));
    }
}
