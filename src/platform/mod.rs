//! OS seam for the desktop introspector and the hover detector.
//!
//! Everything that touches the shell or another process goes through the
//! traits in this module:
//!
//! - `ShellWindows` - window hierarchy queries and message sending
//! - `ProcessMemory` - open a process, allocate/read/write/free its memory
//! - `PointerSource` - current pointer position
//!
//! The Win32 implementation lives in `win32` (Windows only). Tests use the
//! in-memory `fake` platform, which emulates the list-control protocol
//! against a simulated foreign address space.

pub mod protocol;

#[cfg(windows)]
pub mod win32;

#[cfg(test)]
pub(crate) mod fake;

use crate::geometry::ScreenPoint;

/// Opaque window identifier (an `HWND` value on Windows).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

impl WindowId {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Raw process handle value as handed out by `ProcessMemory::open_process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawProcess(pub isize);

/// An address inside another process's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteAddr(pub u64);

impl RemoteAddr {
    /// Address `bytes` past this one.
    pub fn offset(self, bytes: usize) -> Self {
        Self(self.0 + bytes as u64)
    }
}

/// Result of freeing remote memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    Released,
    /// The owning process has exited; its address space is already gone.
    ProcessGone,
    Failed,
}

/// Window hierarchy access.
pub trait ShellWindows {
    /// Find a top-level window by class, starting after `after` in z-order.
    fn find_top_level(&self, class: &str, after: Option<WindowId>) -> Option<WindowId>;

    /// Find the first child of `parent` with the given class (and title, if any).
    fn find_child(&self, parent: WindowId, class: &str, title: Option<&str>) -> Option<WindowId>;

    fn is_window(&self, window: WindowId) -> bool;

    /// Process id owning the window.
    fn window_process_id(&self, window: WindowId) -> Option<u32>;

    /// Send a message and wait (bounded) for the result.
    ///
    /// Returns `None` if the receiving thread is hung or the send timed out.
    fn send_message(&self, window: WindowId, message: u32, wparam: usize, lparam: isize)
        -> Option<isize>;

    /// Translate a client-area point of `window` to screen coordinates.
    fn client_to_screen(&self, window: WindowId, x: i32, y: i32) -> Option<(i32, i32)>;

    /// Deepest visible window under a screen point.
    fn window_from_point(&self, x: i32, y: i32) -> Option<WindowId>;

    /// Parent window, `None` for top-level windows.
    fn parent_of(&self, window: WindowId) -> Option<WindowId>;
}

/// Cross-process memory access.
///
/// Implementations only forward to the OS; ownership and release-once
/// semantics are enforced by the guards in `crate::remote`.
pub trait ProcessMemory {
    fn open_process(&self, pid: u32) -> Option<RawProcess>;

    fn close_process(&self, process: RawProcess);

    fn allocate(&self, process: RawProcess, size: usize) -> Option<RemoteAddr>;

    fn free(&self, process: RawProcess, addr: RemoteAddr) -> FreeOutcome;

    fn write(&self, process: RawProcess, addr: RemoteAddr, data: &[u8]) -> bool;

    fn read(&self, process: RawProcess, addr: RemoteAddr, buf: &mut [u8]) -> bool;
}

/// Everything the introspector needs from the OS.
pub trait DesktopPlatform: ShellWindows + ProcessMemory + Send + Sync {}

impl<T: ShellWindows + ProcessMemory + Send + Sync> DesktopPlatform for T {}

/// Current pointer position in physical screen coordinates.
pub trait PointerSource: Send + Sync {
    fn position(&self) -> Option<ScreenPoint>;
}
