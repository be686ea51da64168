//! Consumer-side helpers for the folder preview popup.
//!
//! Nothing here draws. A consumer reacting to `HoverEvent::Enter` lists the
//! folder, positions its popup with `place_popup` and registers
//! `hot_region` with the detector so moving onto the popup keeps it open.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeskPeekResult;
use crate::geometry::ScreenRect;

/// One row of a folder preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    /// Lowercased extension without the dot; `None` for folders.
    pub extension: Option<String>,
}

impl FolderEntry {
    fn from_path(path: PathBuf, is_dir: bool) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        let extension = if is_dir {
            None
        } else {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
        };
        Some(Self {
            name,
            path,
            is_dir,
            extension,
        })
    }
}

/// List `path` for the popup: folders first, then files, each by name
/// (case-insensitive), at most `max_items` entries.
///
/// A missing or unreadable folder yields an empty list.
pub fn list_folder(path: &Path, max_items: usize) -> Vec<FolderEntry> {
    match read_entries(path) {
        Ok(mut entries) => {
            entries.sort_by(compare_entries);
            entries.truncate(max_items);
            log::trace!(
                "[PREVIEW] Listed {} entries of {}",
                entries.len(),
                path.display()
            );
            entries
        }
        Err(e) => {
            log::debug!("[PREVIEW] Cannot list {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn read_entries(path: &Path) -> DeskPeekResult<Vec<FolderEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else { continue };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if let Some(item) = FolderEntry::from_path(entry.path(), is_dir) {
            entries.push(item);
        }
    }
    Ok(entries)
}

fn compare_entries(a: &FolderEntry, b: &FolderEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Position a `width` x `height` popup next to `icon`.
///
/// Prefers the right side of the icon, flips to the left when that would
/// cross the right edge of `work_area`, then keeps `gap` pixels from the
/// left, bottom and top edges.
pub fn place_popup(
    icon: &ScreenRect,
    work_area: &ScreenRect,
    width: u32,
    height: u32,
    gap: i32,
) -> ScreenRect {
    let w = width as i32;
    let h = height as i32;

    let mut left = icon.right + gap;
    let mut top = icon.top;

    if left + w > work_area.right {
        left = icon.left - w - gap;
    }
    if left < work_area.left {
        left = work_area.left + gap;
    }
    if top + h > work_area.bottom {
        top = work_area.bottom - h - gap;
    }
    if top < work_area.top {
        top = work_area.top + gap;
    }

    ScreenRect::from_xywh(left, top, width, height)
}

/// Area that counts as "still on the preview": icon and popup plus `margin`.
pub fn hot_region(icon: &ScreenRect, popup: &ScreenRect, margin: i32) -> ScreenRect {
    icon.union(popup).inflate(margin)
}

/// Work area of the monitor nearest to a screen point.
#[cfg(windows)]
pub fn work_area_at(x: i32, y: i32) -> Option<ScreenRect> {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::Graphics::Gdi::{
        GetMonitorInfoW, MonitorFromPoint, MONITORINFO, MONITOR_DEFAULTTONEAREST,
    };

    unsafe {
        let hmonitor = MonitorFromPoint(POINT { x, y }, MONITOR_DEFAULTTONEAREST);
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !GetMonitorInfoW(hmonitor, &mut info).as_bool() {
            return None;
        }
        let rc = info.rcWork;
        Some(ScreenRect::new(rc.left, rc.top, rc.right, rc.bottom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const SCREEN: ScreenRect = ScreenRect {
        left: 0,
        top: 0,
        right: 1920,
        bottom: 1040,
    };

    fn names(entries: &[FolderEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_list_folder_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        File::create(dir.path().join("A.md")).unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();

        let entries = list_folder(dir.path(), 20);
        assert_eq!(names(&entries), vec!["Alpha", "zeta", "A.md", "b.txt"]);
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].extension, None);
        assert_eq!(entries[2].extension.as_deref(), Some("md"));
    }

    #[test]
    fn test_list_folder_truncates() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            File::create(dir.path().join(format!("file{}.txt", i))).unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = list_folder(dir.path(), 3);
        assert_eq!(entries.len(), 3);
        // The folder survives truncation because it sorts first.
        assert_eq!(entries[0].name, "sub");
    }

    #[test]
    fn test_list_missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_folder(&dir.path().join("gone"), 20).is_empty());
    }

    #[test]
    fn test_popup_right_of_icon() {
        let icon = ScreenRect::new(100, 200, 180, 280);
        let popup = place_popup(&icon, &SCREEN, 320, 280, 8);
        assert_eq!(popup, ScreenRect::new(188, 200, 508, 480));
    }

    #[test]
    fn test_popup_flips_left_at_right_edge() {
        let icon = ScreenRect::new(1800, 100, 1880, 180);
        let popup = place_popup(&icon, &SCREEN, 320, 280, 8);
        assert_eq!(popup.left, 1800 - 320 - 8);
        assert_eq!(popup.right, 1800 - 8);
        assert!(popup.right <= icon.left);
    }

    #[test]
    fn test_popup_clamped_to_bottom() {
        let icon = ScreenRect::new(100, 950, 180, 1030);
        let popup = place_popup(&icon, &SCREEN, 320, 280, 8);
        assert_eq!(popup.bottom, 1040 - 8);
        assert_eq!(popup.height(), 280);
    }

    #[test]
    fn test_popup_clamped_to_left_on_narrow_area() {
        let narrow = ScreenRect::new(0, 0, 400, 1040);
        let icon = ScreenRect::new(100, 100, 180, 180);
        let popup = place_popup(&icon, &narrow, 320, 280, 8);
        assert_eq!(popup.left, 8);
    }

    #[test]
    fn test_hot_region_covers_icon_and_popup() {
        let icon = ScreenRect::new(100, 200, 180, 280);
        let popup = place_popup(&icon, &SCREEN, 320, 280, 8);
        let region = hot_region(&icon, &popup, 20);

        assert_eq!(region, ScreenRect::new(80, 180, 528, 500));
        // The gap between icon and popup is inside the region.
        assert!(region.contains_inclusive(184, 240));
    }
}
