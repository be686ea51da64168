//! Per-item reads from the foreign list control.
//!
//! Each query stages its request in a buffer allocated inside the shell
//! process, sends the message, and reads the answer back. Buffers are scoped
//! to the call that allocated them.

use std::mem::size_of;

use crate::error::{DeskPeekError, DeskPeekResult, OptionExt};
use crate::geometry::ScreenRect;
use crate::platform::protocol::{
    decode_label, ItemRect, ListItemW, LABEL_BYTES, LVM_GETITEMCOUNT, LVM_GETITEMRECT,
    LVM_GETITEMTEXTW,
};
use crate::platform::{DesktopPlatform, ShellWindows, WindowId};
use crate::remote::ProcessHandle;

use super::names::NameIndex;
use super::table::IconRecord;

/// Number of items the control reports. Zero and timeouts are errors.
pub fn item_count<S: ShellWindows + ?Sized>(shell: &S, list: WindowId) -> DeskPeekResult<usize> {
    match shell.send_message(list, LVM_GETITEMCOUNT, 0, 0) {
        // Item indices are i32 on the wire.
        Some(n) if n > 0 && n <= i32::MAX as isize => Ok(n as usize),
        Some(n) if n > 0 => Err(DeskPeekError::QueryFailed {
            message: LVM_GETITEMCOUNT,
            index: -1,
        }),
        Some(_) => Err(DeskPeekError::EmptyListControl),
        None => Err(DeskPeekError::QueryFailed {
            message: LVM_GETITEMCOUNT,
            index: -1,
        }),
    }
}

/// Reads items out of one opened shell process.
pub struct ItemReader<'p, 'a, P: DesktopPlatform + ?Sized> {
    platform: &'a P,
    process: &'p ProcessHandle<'a, P>,
    list: WindowId,
    staging: Vec<u8>,
}

impl<'p, 'a, P: DesktopPlatform + ?Sized> ItemReader<'p, 'a, P> {
    pub fn new(platform: &'a P, process: &'p ProcessHandle<'a, P>, list: WindowId) -> Self {
        Self {
            platform,
            process,
            list,
            staging: vec![0; LABEL_BYTES],
        }
    }

    /// Screen-space bounds (icon plus label) of item `index`.
    pub fn read_bounds(&self, index: i32) -> DeskPeekResult<ScreenRect> {
        let buffer = self.process.allocate(size_of::<ItemRect>())?;
        let addr = buffer.raw().context("rect buffer released early")?;

        buffer.write(0, bytemuck::bytes_of(&ItemRect::bounds_request()))?;
        self.query(LVM_GETITEMRECT, index, addr.0 as isize)?;

        let mut raw = [0u8; size_of::<ItemRect>()];
        buffer.read_into(0, &mut raw)?;
        let client: ItemRect = bytemuck::pod_read_unaligned(&raw);

        let (left, top) = self
            .platform
            .client_to_screen(self.list, client.left, client.top)
            .context("client_to_screen failed")?;
        let (right, bottom) = self
            .platform
            .client_to_screen(self.list, client.right, client.bottom)
            .context("client_to_screen failed")?;

        Ok(ScreenRect::new(left, top, right, bottom))
    }

    /// Label of item `index`, truncated to the protocol capacity.
    pub fn read_label(&mut self, index: i32) -> DeskPeekResult<String> {
        let header = size_of::<ListItemW>();
        let buffer = self.process.allocate(header + LABEL_BYTES)?;
        let addr = buffer.raw().context("label buffer released early")?;

        let request = ListItemW::text_request(index, addr.offset(header).0);
        buffer.write(0, bytemuck::bytes_of(&request))?;
        self.query(LVM_GETITEMTEXTW, index, addr.0 as isize)?;

        // A short answer must not pick up the previous item's tail.
        self.staging.fill(0);
        buffer.read_into(header, &mut self.staging)?;

        let units: Vec<u16> = self
            .staging
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(decode_label(&units))
    }

    /// Bounds, label and path for item `index`. `Ok(None)` when the label
    /// does not match any desktop entry.
    pub fn read_record(&mut self, index: i32, names: &NameIndex) -> DeskPeekResult<Option<IconRecord>> {
        let bounds = self.read_bounds(index)?;
        let label = self.read_label(index)?;

        let Some(path) = names.resolve(&label) else {
            log::trace!("[INTROSPECT] Item {} '{}' has no filesystem match", index, label);
            return Ok(None);
        };

        Ok(Some(IconRecord {
            index,
            file_path: path.to_path_buf(),
            bounds,
            is_folder: path.is_dir(),
        }))
    }

    fn query(&self, message: u32, index: i32, lparam: isize) -> DeskPeekResult<isize> {
        match self.platform.send_message(self.list, message, index as usize, lparam) {
            Some(answer) if answer > 0 => Ok(answer),
            _ => Err(DeskPeekError::QueryFailed { message, index }),
        }
    }
}
