//! Scoped ownership of cross-process resources.
//!
//! `ProcessHandle` owns an opened foreign process; `RemoteAllocation` owns a
//! block of memory inside it. Both release their resource exactly once, when
//! dropped or on an explicit `release()`, on every exit path. A remote
//! allocation borrows its process handle, so memory can never outlive the
//! handle needed to free it.
//!
//! Neither guard is `Send`: each is acquired, used and released inside the
//! single call that needed it.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::{DeskPeekError, DeskPeekResult};
use crate::platform::{FreeOutcome, ProcessMemory, RawProcess, RemoteAddr};

/// Owned handle to a foreign process opened for VM operation/read/write.
pub struct ProcessHandle<'a, M: ProcessMemory + ?Sized> {
    memory: &'a M,
    raw: Option<RawProcess>,
    pid: u32,
    failed_releases: Cell<u32>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, M: ProcessMemory + ?Sized> ProcessHandle<'a, M> {
    /// Open `pid`. Fails with `ProcessAccessDenied` if the OS refuses.
    pub fn open(memory: &'a M, pid: u32) -> DeskPeekResult<Self> {
        let raw = memory
            .open_process(pid)
            .ok_or(DeskPeekError::ProcessAccessDenied { pid })?;

        log::trace!("[REMOTE] Opened process {} ({:?})", pid, raw);
        Ok(Self {
            memory,
            raw: Some(raw),
            pid,
            failed_releases: Cell::new(0),
            _not_send: PhantomData,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.raw.is_some()
    }

    /// Underlying handle value, `None` once released.
    pub fn raw(&self) -> Option<RawProcess> {
        self.raw
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Number of remote frees that degraded to a no-op (process exited or
    /// the OS refused). Diagnostics only.
    pub fn failed_releases(&self) -> u32 {
        self.failed_releases.get()
    }

    /// Reserve and commit `size` bytes of read/write memory in the process.
    pub fn allocate(&self, size: usize) -> DeskPeekResult<RemoteAllocation<'_, 'a, M>> {
        let raw = self
            .raw
            .ok_or(DeskPeekError::RemoteAllocFailed { size })?;
        let addr = self
            .memory
            .allocate(raw, size)
            .ok_or(DeskPeekError::RemoteAllocFailed { size })?;

        Ok(RemoteAllocation {
            process: self,
            addr: Some(addr),
            size,
        })
    }

    /// Close the handle now. Calling this again (or dropping afterwards) is inert.
    pub fn release(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.memory.close_process(raw);
            log::trace!("[REMOTE] Closed process {}", self.pid);
        }
    }

    fn free_remote(&self, addr: RemoteAddr) {
        let Some(raw) = self.raw else {
            return;
        };

        match self.memory.free(raw, addr) {
            FreeOutcome::Released => {}
            outcome => {
                self.failed_releases.set(self.failed_releases.get() + 1);
                log::debug!(
                    "[REMOTE] Free of {:#x} in process {} degraded: {:?}",
                    addr.0,
                    self.pid,
                    outcome
                );
            }
        }
    }
}

impl<M: ProcessMemory + ?Sized> Drop for ProcessHandle<'_, M> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A block of memory inside a foreign process.
pub struct RemoteAllocation<'p, 'a, M: ProcessMemory + ?Sized> {
    process: &'p ProcessHandle<'a, M>,
    addr: Option<RemoteAddr>,
    size: usize,
}

impl<M: ProcessMemory + ?Sized> RemoteAllocation<'_, '_, M> {
    pub fn is_valid(&self) -> bool {
        self.addr.is_some()
    }

    /// Base address inside the foreign process, `None` once released.
    pub fn raw(&self) -> Option<RemoteAddr> {
        self.addr
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy `data` into the allocation at `offset`.
    pub fn write(&self, offset: usize, data: &[u8]) -> DeskPeekResult<()> {
        let (raw, addr) = self.target("write", offset, data.len())?;
        if self.process.memory.write(raw, addr, data) {
            Ok(())
        } else {
            Err(DeskPeekError::RemoteIo {
                op: "write",
                offset,
                len: data.len(),
            })
        }
    }

    /// Fill `buf` from the allocation at `offset`.
    pub fn read_into(&self, offset: usize, buf: &mut [u8]) -> DeskPeekResult<()> {
        let (raw, addr) = self.target("read", offset, buf.len())?;
        if self.process.memory.read(raw, addr, buf) {
            Ok(())
        } else {
            Err(DeskPeekError::RemoteIo {
                op: "read",
                offset,
                len: buf.len(),
            })
        }
    }

    /// Free the memory now. Calling this again (or dropping afterwards) is inert.
    pub fn release(&mut self) {
        if let Some(addr) = self.addr.take() {
            self.process.free_remote(addr);
        }
    }

    fn target(
        &self,
        op: &'static str,
        offset: usize,
        len: usize,
    ) -> DeskPeekResult<(RawProcess, RemoteAddr)> {
        let in_bounds = offset
            .checked_add(len)
            .map(|end| end <= self.size)
            .unwrap_or(false);

        match (self.process.raw, self.addr) {
            (Some(raw), Some(addr)) if in_bounds => Ok((raw, addr.offset(offset))),
            _ => Err(DeskPeekError::RemoteIo { op, offset, len }),
        }
    }
}

impl<M: ProcessMemory + ?Sized> Drop for RemoteAllocation<'_, '_, M> {
    fn drop(&mut self) {
        self.release();
    }
}
