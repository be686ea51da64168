//! In-memory shell used by the unit tests.
//!
//! Models a small window tree, one desktop list control with items, and a
//! foreign address space. `send_message` answers the list-view queries by
//! reading and writing that address space, exactly as the real control
//! would, so the reader's staging code is exercised byte-for-byte.

use std::collections::{BTreeMap, HashSet};

use parking_lot::{Mutex, MutexGuard};

use super::protocol::{
    ItemRect, ListItemW, ICON_HOST_CLASS, LIST_CONTROL_CLASS, LIST_CONTROL_TITLE, LVIR_BOUNDS,
    LVM_GETITEMCOUNT, LVM_GETITEMRECT, LVM_GETITEMTEXTW, SHELL_MANAGER_CLASS, WORKER_HOST_CLASS,
};
use super::{
    FreeOutcome, PointerSource, ProcessMemory, RawProcess, RemoteAddr, ShellWindows, WindowId,
};
use crate::geometry::ScreenPoint;

const SHELL_PID: u32 = 4242;
const OTHER_PID: u32 = 777;

/// Switches that make individual OS calls fail.
#[derive(Debug, Default)]
pub struct Failures {
    pub deny_open: bool,
    /// 1-based allocation call number that fails.
    pub fail_alloc_at: Option<usize>,
    pub fail_writes: bool,
    pub fail_reads: bool,
    /// Frees report the owning process as gone.
    pub process_exited: bool,
    /// `(message, item index)` pair answered with 0.
    pub fail_query: Option<(u32, i32)>,
    /// Every send times out.
    pub hung: bool,
    /// Answer to the item count query in place of the real one.
    pub reported_count: Option<isize>,
}

#[derive(Debug, Clone)]
struct FakeWindow {
    id: WindowId,
    class: String,
    title: String,
    parent: Option<WindowId>,
    pid: u32,
    alive: bool,
}

#[derive(Debug, Clone)]
struct FakeItem {
    label: String,
    rect: ItemRect,
}

#[derive(Debug, Default)]
struct FakeState {
    windows: Vec<FakeWindow>,
    next_window: isize,
    list_control: Option<WindowId>,
    items: Vec<FakeItem>,
    client_origin: (i32, i32),
    under_pointer: Option<Option<WindowId>>,

    allocations: BTreeMap<u64, Vec<u8>>,
    next_addr: u64,
    next_handle: isize,
    open: HashSet<isize>,

    alloc_calls: usize,
    free_calls: usize,
    close_calls: usize,
    sent: Vec<(u32, usize)>,
}

impl FakeState {
    fn add_window(&mut self, class: &str, title: &str, parent: Option<WindowId>, pid: u32) -> WindowId {
        self.next_window += 0x10;
        let id = WindowId(0x1000 + self.next_window);
        self.windows.push(FakeWindow {
            id,
            class: class.to_string(),
            title: title.to_string(),
            parent,
            pid,
            alive: true,
        });
        id
    }

    fn window(&self, id: WindowId) -> Option<&FakeWindow> {
        self.windows.iter().find(|w| w.id == id && w.alive)
    }

    /// Locate the allocation containing `addr` and the offset into it.
    fn resolve(&mut self, addr: u64, len: usize) -> Option<(&mut Vec<u8>, usize)> {
        let (&base, block) = self.allocations.range_mut(..=addr).next_back()?;
        let start = (addr - base) as usize;
        if start + len > block.len() {
            return None;
        }
        Some((block, start))
    }

    fn read_remote(&mut self, addr: u64, len: usize) -> Option<Vec<u8>> {
        let (block, start) = self.resolve(addr, len)?;
        Some(block[start..start + len].to_vec())
    }

    fn write_remote(&mut self, addr: u64, data: &[u8]) -> bool {
        match self.resolve(addr, data.len()) {
            Some((block, start)) => {
                block[start..start + data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    fn answer_rect(&mut self, index: usize, lparam: isize) -> isize {
        let Some(request) = self.read_remote(lparam as u64, std::mem::size_of::<ItemRect>()) else {
            return 0;
        };
        let request: ItemRect = bytemuck::pod_read_unaligned(&request);
        if request.left != LVIR_BOUNDS {
            return 0;
        }
        let Some(item) = self.items.get(index) else {
            return 0;
        };
        let rect = item.rect;
        if self.write_remote(lparam as u64, bytemuck::bytes_of(&rect)) {
            1
        } else {
            0
        }
    }

    fn answer_text(&mut self, index: usize, lparam: isize) -> isize {
        let Some(request) = self.read_remote(lparam as u64, std::mem::size_of::<ListItemW>()) else {
            return 0;
        };
        let request: ListItemW = bytemuck::pod_read_unaligned(&request);
        let Some(item) = self.items.get(index) else {
            return 0;
        };
        if request.text_max <= 0 {
            return 0;
        }

        let mut units: Vec<u16> = item.label.encode_utf16().collect();
        units.truncate(request.text_max as usize - 1);
        let written = units.len();
        units.push(0);

        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        if self.write_remote(request.text, &bytes) {
            written as isize
        } else {
            0
        }
    }
}

/// Simulated shell process plus window manager.
pub struct FakeShell {
    state: Mutex<FakeState>,
    failures: Mutex<Failures>,
}

impl FakeShell {
    fn blank() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_addr: 0x7ff0_0000_0000,
                next_handle: 0x40,
                client_origin: (0, 0),
                ..FakeState::default()
            }),
            failures: Mutex::new(Failures::default()),
        }
    }

    /// Standard hierarchy (shell manager -> icon host -> list control), no items.
    pub fn empty() -> Self {
        Self::with_items(&[])
    }

    /// Standard hierarchy with the given `(label, client rect)` items.
    pub fn with_items(items: &[(&str, ItemRect)]) -> Self {
        let shell = Self::blank();
        {
            let mut state = shell.state.lock();
            let progman = state.add_window(SHELL_MANAGER_CLASS, "Program Manager", None, SHELL_PID);
            let host = state.add_window(ICON_HOST_CLASS, "", Some(progman), SHELL_PID);
            let list = state.add_window(LIST_CONTROL_CLASS, LIST_CONTROL_TITLE, Some(host), SHELL_PID);
            state.list_control = Some(list);
        }
        shell.set_items(items);
        shell
    }

    /// Icon view reparented under the second worker host, the way wallpaper
    /// utilities leave it.
    pub fn worker_hosted(items: &[(&str, ItemRect)]) -> Self {
        let shell = Self::blank();
        {
            let mut state = shell.state.lock();
            state.add_window(SHELL_MANAGER_CLASS, "Program Manager", None, SHELL_PID);
            state.add_window(WORKER_HOST_CLASS, "", None, SHELL_PID);
            let worker = state.add_window(WORKER_HOST_CLASS, "", None, SHELL_PID);
            let host = state.add_window(ICON_HOST_CLASS, "", Some(worker), SHELL_PID);
            let list = state.add_window(LIST_CONTROL_CLASS, LIST_CONTROL_TITLE, Some(host), SHELL_PID);
            state.list_control = Some(list);
        }
        shell.set_items(items);
        shell
    }

    /// Shell manager only; no icon view anywhere.
    pub fn without_list_control() -> Self {
        let shell = Self::blank();
        {
            let mut state = shell.state.lock();
            state.add_window(SHELL_MANAGER_CLASS, "Program Manager", None, SHELL_PID);
            state.add_window(WORKER_HOST_CLASS, "", None, SHELL_PID);
        }
        shell
    }

    pub fn shell_pid(&self) -> u32 {
        SHELL_PID
    }

    pub fn failures(&self) -> MutexGuard<'_, Failures> {
        self.failures.lock()
    }

    pub fn list_control(&self) -> Option<WindowId> {
        self.state.lock().list_control
    }

    pub fn set_items(&self, items: &[(&str, ItemRect)]) {
        self.state.lock().items = items
            .iter()
            .map(|(label, rect)| FakeItem {
                label: label.to_string(),
                rect: *rect,
            })
            .collect();
    }

    /// Move one item (simulates the user rearranging icons).
    pub fn set_item_rect(&self, index: usize, rect: ItemRect) {
        if let Some(item) = self.state.lock().items.get_mut(index) {
            item.rect = rect;
        }
    }

    /// Screen position of the list control's client origin.
    pub fn set_client_origin(&self, x: i32, y: i32) {
        self.state.lock().client_origin = (x, y);
    }

    /// Destroy the list control window (shell restart).
    pub fn destroy_list_control(&self) {
        let mut state = self.state.lock();
        if let Some(list) = state.list_control {
            for window in state.windows.iter_mut().filter(|w| w.id == list) {
                window.alive = false;
            }
        }
    }

    /// Top-level window owned by another application.
    pub fn add_foreign_window(&self) -> WindowId {
        self.state.lock().add_window("Notepad", "Untitled", None, OTHER_PID)
    }

    pub fn add_child(&self, parent: WindowId, class: &str) -> WindowId {
        self.state.lock().add_window(class, "", Some(parent), SHELL_PID)
    }

    /// Override what `window_from_point` returns. By default it is the list control.
    pub fn set_window_under_pointer(&self, window: Option<WindowId>) {
        self.state.lock().under_pointer = Some(window);
    }

    pub fn outstanding_allocations(&self) -> usize {
        self.state.lock().allocations.len()
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().open.len()
    }

    pub fn free_calls(&self) -> usize {
        self.state.lock().free_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Number of messages of the given id sent so far.
    pub fn sent_count(&self, message: u32) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(m, _)| *m == message)
            .count()
    }
}

impl ShellWindows for FakeShell {
    fn find_top_level(&self, class: &str, after: Option<WindowId>) -> Option<WindowId> {
        let state = self.state.lock();
        let mut candidates = state.windows.iter().filter(|w| w.parent.is_none() && w.alive);

        if let Some(after) = after {
            candidates.by_ref().find(|w| w.id == after)?;
        }
        candidates.find(|w| w.class == class).map(|w| w.id)
    }

    fn find_child(&self, parent: WindowId, class: &str, title: Option<&str>) -> Option<WindowId> {
        let state = self.state.lock();
        state
            .windows
            .iter()
            .filter(|w| w.alive && w.parent == Some(parent) && w.class == class)
            .find(|w| title.map(|t| w.title == t).unwrap_or(true))
            .map(|w| w.id)
    }

    fn is_window(&self, window: WindowId) -> bool {
        self.state.lock().window(window).is_some()
    }

    fn window_process_id(&self, window: WindowId) -> Option<u32> {
        self.state.lock().window(window).map(|w| w.pid)
    }

    fn send_message(
        &self,
        window: WindowId,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> Option<isize> {
        let failures = self.failures.lock();
        let mut state = self.state.lock();
        state.sent.push((message, wparam));

        if failures.hung || state.window(window).is_none() || state.list_control != Some(window) {
            return None;
        }
        if failures.fail_query == Some((message, wparam as i32)) {
            return Some(0);
        }

        let answer = match message {
            LVM_GETITEMCOUNT => failures.reported_count.unwrap_or(state.items.len() as isize),
            LVM_GETITEMRECT => state.answer_rect(wparam, lparam),
            LVM_GETITEMTEXTW => state.answer_text(wparam, lparam),
            _ => 0,
        };
        Some(answer)
    }

    fn client_to_screen(&self, window: WindowId, x: i32, y: i32) -> Option<(i32, i32)> {
        let state = self.state.lock();
        state.window(window)?;
        let (ox, oy) = state.client_origin;
        Some((x + ox, y + oy))
    }

    fn window_from_point(&self, _x: i32, _y: i32) -> Option<WindowId> {
        let state = self.state.lock();
        match state.under_pointer {
            Some(window) => window,
            None => state.list_control.filter(|&id| state.window(id).is_some()),
        }
    }

    fn parent_of(&self, window: WindowId) -> Option<WindowId> {
        self.state.lock().window(window).and_then(|w| w.parent)
    }
}

impl ProcessMemory for FakeShell {
    fn open_process(&self, pid: u32) -> Option<RawProcess> {
        if self.failures.lock().deny_open || pid != SHELL_PID {
            return None;
        }
        let mut state = self.state.lock();
        state.next_handle += 4;
        let handle = state.next_handle;
        state.open.insert(handle);
        Some(RawProcess(handle))
    }

    fn close_process(&self, process: RawProcess) {
        let mut state = self.state.lock();
        state.close_calls += 1;
        state.open.remove(&process.0);
    }

    fn allocate(&self, process: RawProcess, size: usize) -> Option<RemoteAddr> {
        let fail_at = self.failures.lock().fail_alloc_at;
        let mut state = self.state.lock();
        state.alloc_calls += 1;
        if fail_at == Some(state.alloc_calls) || !state.open.contains(&process.0) {
            return None;
        }

        let base = state.next_addr;
        state.next_addr += ((size as u64 / 0x1000) + 2) * 0x1000;
        state.allocations.insert(base, vec![0; size]);
        Some(RemoteAddr(base))
    }

    fn free(&self, _process: RawProcess, addr: RemoteAddr) -> FreeOutcome {
        let exited = self.failures.lock().process_exited;
        let mut state = self.state.lock();
        state.free_calls += 1;
        let removed = state.allocations.remove(&addr.0).is_some();

        match (exited, removed) {
            (true, _) => FreeOutcome::ProcessGone,
            (false, true) => FreeOutcome::Released,
            (false, false) => FreeOutcome::Failed,
        }
    }

    fn write(&self, _process: RawProcess, addr: RemoteAddr, data: &[u8]) -> bool {
        if self.failures.lock().fail_writes {
            return false;
        }
        self.state.lock().write_remote(addr.0, data)
    }

    fn read(&self, _process: RawProcess, addr: RemoteAddr, buf: &mut [u8]) -> bool {
        if self.failures.lock().fail_reads {
            return false;
        }
        match self.state.lock().read_remote(addr.0, buf.len()) {
            Some(bytes) => {
                buf.copy_from_slice(&bytes);
                true
            }
            None => false,
        }
    }
}

/// Pointer whose position the test moves by hand.
#[derive(Default)]
pub struct FakePointer {
    position: Mutex<Option<ScreenPoint>>,
}

impl FakePointer {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            position: Mutex::new(Some(ScreenPoint::new(x, y))),
        }
    }

    pub fn move_to(&self, x: i32, y: i32) {
        *self.position.lock() = Some(ScreenPoint::new(x, y));
    }

    pub fn lose(&self) {
        *self.position.lock() = None;
    }
}

impl PointerSource for FakePointer {
    fn position(&self) -> Option<ScreenPoint> {
        *self.position.lock()
    }
}
