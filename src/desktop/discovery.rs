//! Locate the list control that hosts the desktop icons.
//!
//! The icon view normally sits under the shell manager window. Wallpaper
//! utilities (and some shell versions) reparent it under one of the
//! auxiliary worker windows instead, so those are searched as a fallback.

use crate::error::{DeskPeekError, DeskPeekResult};
use crate::platform::protocol::{
    ICON_HOST_CLASS, LIST_CONTROL_CLASS, LIST_CONTROL_TITLE, SHELL_MANAGER_CLASS,
    WORKER_HOST_CLASS,
};
use crate::platform::{ShellWindows, WindowId};

/// Upper bound on worker windows inspected in one discovery pass.
const MAX_WORKER_WINDOWS: usize = 64;

/// Find the icon host window (`SHELLDLL_DefView`).
pub fn find_icon_host<S: ShellWindows + ?Sized>(shell: &S) -> Option<WindowId> {
    if let Some(manager) = shell.find_top_level(SHELL_MANAGER_CLASS, None) {
        if let Some(host) = shell.find_child(manager, ICON_HOST_CLASS, None) {
            return Some(host);
        }
        log::debug!("[INTROSPECT] Icon host not under shell manager, trying worker windows");
    }

    let mut after = None;
    for _ in 0..MAX_WORKER_WINDOWS {
        let worker = shell.find_top_level(WORKER_HOST_CLASS, after)?;
        if let Some(host) = shell.find_child(worker, ICON_HOST_CLASS, None) {
            log::debug!("[INTROSPECT] Icon host found under worker {:?}", worker);
            return Some(host);
        }
        after = Some(worker);
    }
    None
}

/// Find the desktop list control.
pub fn find_list_control<S: ShellWindows + ?Sized>(shell: &S) -> DeskPeekResult<WindowId> {
    let host = find_icon_host(shell)
        .ok_or_else(|| DeskPeekError::ListControlNotFound("no icon host window".into()))?;

    shell
        .find_child(host, LIST_CONTROL_CLASS, Some(LIST_CONTROL_TITLE))
        .ok_or_else(|| DeskPeekError::ListControlNotFound("no list control under icon host".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeShell;

    #[test]
    fn test_finds_control_under_shell_manager() {
        let shell = FakeShell::empty();
        assert_eq!(find_list_control(&shell).ok(), shell.list_control());
    }

    #[test]
    fn test_falls_back_to_worker_windows() {
        let shell = FakeShell::worker_hosted(&[]);
        let found = find_list_control(&shell).unwrap();
        assert_eq!(Some(found), shell.list_control());
    }

    #[test]
    fn test_missing_hierarchy_is_an_error() {
        let shell = FakeShell::without_list_control();
        assert!(matches!(
            find_list_control(&shell),
            Err(DeskPeekError::ListControlNotFound(_))
        ));
    }
}
