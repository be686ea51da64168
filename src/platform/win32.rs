//! Win32 implementation of the platform seam.
//!
//! Message sends are bounded (`SMTO_ABORTIFHUNG`) so a hung shell costs at
//! most one timeout per query instead of blocking the caller.

use std::ffi::c_void;
use std::iter::once;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, FALSE, HANDLE, HWND, LPARAM, POINT, WPARAM};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Memory::{
    VirtualAllocEx, VirtualFreeEx, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowExW, GetAncestor, GetDesktopWindow, GetWindowThreadProcessId, IsWindow,
    SendMessageTimeoutW, WindowFromPoint, GA_PARENT, SMTO_ABORTIFHUNG, SMTO_BLOCK,
};

use super::{FreeOutcome, ProcessMemory, RawProcess, RemoteAddr, ShellWindows, WindowId};

/// Upper bound for one list-control query.
const SEND_TIMEOUT_MS: u32 = 100;

/// `GetExitCodeProcess` value for a running process.
const STILL_ACTIVE: u32 = 259;

fn hwnd(id: WindowId) -> HWND {
    HWND(id.0 as *mut c_void)
}

fn window_id(hwnd: HWND) -> Option<WindowId> {
    if hwnd.0.is_null() {
        None
    } else {
        Some(WindowId(hwnd.0 as isize))
    }
}

fn handle(process: RawProcess) -> HANDLE {
    HANDLE(process.0 as *mut c_void)
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

/// The live desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

impl ShellWindows for Win32Platform {
    fn find_top_level(&self, class: &str, after: Option<WindowId>) -> Option<WindowId> {
        let class = wide(class);
        let after = after.map(hwnd).unwrap_or_default();
        unsafe {
            FindWindowExW(HWND::default(), after, PCWSTR(class.as_ptr()), PCWSTR::null())
                .ok()
                .and_then(window_id)
        }
    }

    fn find_child(&self, parent: WindowId, class: &str, title: Option<&str>) -> Option<WindowId> {
        let class = wide(class);
        let title = title.map(wide);
        let title_ptr = title
            .as_ref()
            .map(|t| PCWSTR(t.as_ptr()))
            .unwrap_or(PCWSTR::null());
        unsafe {
            FindWindowExW(hwnd(parent), HWND::default(), PCWSTR(class.as_ptr()), title_ptr)
                .ok()
                .and_then(window_id)
        }
    }

    fn is_window(&self, window: WindowId) -> bool {
        !window.is_null() && unsafe { IsWindow(hwnd(window)).as_bool() }
    }

    fn window_process_id(&self, window: WindowId) -> Option<u32> {
        let mut pid = 0u32;
        let thread = unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut pid as *mut u32)) };
        (thread != 0 && pid != 0).then_some(pid)
    }

    fn send_message(
        &self,
        window: WindowId,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> Option<isize> {
        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(
                hwnd(window),
                message,
                WPARAM(wparam),
                LPARAM(lparam),
                SMTO_ABORTIFHUNG | SMTO_BLOCK,
                SEND_TIMEOUT_MS,
                Some(&mut result as *mut usize),
            )
        };

        if sent.0 == 0 {
            log::trace!("[REMOTE] Message {:#x} timed out or failed", message);
            None
        } else {
            Some(result as isize)
        }
    }

    fn client_to_screen(&self, window: WindowId, x: i32, y: i32) -> Option<(i32, i32)> {
        let mut point = POINT { x, y };
        let ok = unsafe { ClientToScreen(hwnd(window), &mut point).as_bool() };
        ok.then_some((point.x, point.y))
    }

    fn window_from_point(&self, x: i32, y: i32) -> Option<WindowId> {
        window_id(unsafe { WindowFromPoint(POINT { x, y }) })
    }

    fn parent_of(&self, window: WindowId) -> Option<WindowId> {
        let (parent, desktop) = unsafe { (GetAncestor(hwnd(window), GA_PARENT), GetDesktopWindow()) };
        if parent == desktop {
            None
        } else {
            window_id(parent)
        }
    }
}

impl ProcessMemory for Win32Platform {
    fn open_process(&self, pid: u32) -> Option<RawProcess> {
        let rights = PROCESS_VM_OPERATION
            | PROCESS_VM_READ
            | PROCESS_VM_WRITE
            | PROCESS_QUERY_LIMITED_INFORMATION;

        match unsafe { OpenProcess(rights, FALSE, pid) } {
            Ok(h) if !h.is_invalid() => Some(RawProcess(h.0 as isize)),
            Ok(_) => None,
            Err(e) => {
                log::debug!("[REMOTE] OpenProcess({}) failed: {}", pid, e);
                None
            }
        }
    }

    fn close_process(&self, process: RawProcess) {
        if let Err(e) = unsafe { CloseHandle(handle(process)) } {
            log::debug!("[REMOTE] CloseHandle failed: {}", e);
        }
    }

    fn allocate(&self, process: RawProcess, size: usize) -> Option<RemoteAddr> {
        let ptr = unsafe {
            VirtualAllocEx(
                handle(process),
                None,
                size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        (!ptr.is_null()).then(|| RemoteAddr(ptr as u64))
    }

    fn free(&self, process: RawProcess, addr: RemoteAddr) -> FreeOutcome {
        let h = handle(process);
        if unsafe { VirtualFreeEx(h, addr.0 as *mut c_void, 0, MEM_RELEASE) }.is_ok() {
            return FreeOutcome::Released;
        }

        let mut code = 0u32;
        match unsafe { GetExitCodeProcess(h, &mut code) } {
            Ok(()) if code != STILL_ACTIVE => FreeOutcome::ProcessGone,
            _ => FreeOutcome::Failed,
        }
    }

    fn write(&self, process: RawProcess, addr: RemoteAddr, data: &[u8]) -> bool {
        let mut written = 0usize;
        let ok = unsafe {
            WriteProcessMemory(
                handle(process),
                addr.0 as *const c_void,
                data.as_ptr() as *const c_void,
                data.len(),
                Some(&mut written as *mut usize),
            )
        }
        .is_ok();
        ok && written == data.len()
    }

    fn read(&self, process: RawProcess, addr: RemoteAddr, buf: &mut [u8]) -> bool {
        let mut read = 0usize;
        let ok = unsafe {
            ReadProcessMemory(
                handle(process),
                addr.0 as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                Some(&mut read as *mut usize),
            )
        }
        .is_ok();
        ok && read == buf.len()
    }
}
