//! Shell window classes and the list-view message protocol.
//!
//! The structures here are staged locally, copied byte-for-byte into the
//! shell process and read back, so their layout is fixed (x64 shell).

use bytemuck::{Pod, Zeroable};

/// Primary shell-manager top-level window.
pub const SHELL_MANAGER_CLASS: &str = "Progman";

/// Auxiliary desktop host windows (wallpaper utilities reparent the icon view here).
pub const WORKER_HOST_CLASS: &str = "WorkerW";

/// Default icon view hosting the list control.
pub const ICON_HOST_CLASS: &str = "SHELLDLL_DefView";

pub const LIST_CONTROL_CLASS: &str = "SysListView32";
pub const LIST_CONTROL_TITLE: &str = "FolderView";

pub const LVM_FIRST: u32 = 0x1000;
pub const LVM_GETITEMCOUNT: u32 = LVM_FIRST + 4;
pub const LVM_GETITEMRECT: u32 = LVM_FIRST + 14;
pub const LVM_GETITEMTEXTW: u32 = LVM_FIRST + 115;

pub const LVIF_TEXT: u32 = 0x0001;

/// `RECT.left` request tag for the full bounding box (icon + label).
pub const LVIR_BOUNDS: i32 = 0;

/// Label capacity in UTF-16 code units (legacy MAX_PATH).
pub const LABEL_CAPACITY: usize = 260;

/// Size of the label payload following the item structure.
pub const LABEL_BYTES: usize = LABEL_CAPACITY * std::mem::size_of::<u16>();

/// `RECT` as exchanged with `LVM_GETITEMRECT`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ItemRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ItemRect {
    pub fn bounds_request() -> Self {
        Self {
            left: LVIR_BOUNDS,
            ..Self::default()
        }
    }
}

/// `LVITEMW` with its x64 layout spelled out, padding included.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ListItemW {
    pub mask: u32,
    pub item: i32,
    pub sub_item: i32,
    pub state: u32,
    pub state_mask: u32,
    pub _pad0: u32,
    /// Remote address of the text buffer.
    pub text: u64,
    pub text_max: i32,
    pub image: i32,
    pub param: i64,
    pub indent: i32,
    pub group_id: i32,
    pub columns: u32,
    pub _pad1: u32,
    pub column_list: u64,
    pub column_formats: u64,
    pub group: i32,
    pub _pad2: u32,
}

const _: () = assert!(std::mem::size_of::<ListItemW>() == 88);
const _: () = assert!(std::mem::size_of::<ItemRect>() == 16);

impl ListItemW {
    /// Text request for `index` whose payload lives at `text` in the target process.
    pub fn text_request(index: i32, text: u64) -> Self {
        Self {
            mask: LVIF_TEXT,
            item: index,
            sub_item: 0,
            text,
            text_max: LABEL_CAPACITY as i32,
            ..Self::default()
        }
    }
}

/// Decode a NUL-terminated UTF-16 label.
pub fn decode_label(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids() {
        assert_eq!(LVM_GETITEMCOUNT, 0x1004);
        assert_eq!(LVM_GETITEMRECT, 0x100E);
        assert_eq!(LVM_GETITEMTEXTW, 0x1073);
    }

    #[test]
    fn test_text_request_layout() {
        let req = ListItemW::text_request(7, 0x1234_0000);
        let bytes = bytemuck::bytes_of(&req);
        assert_eq!(bytes.len(), 88);
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), LVIF_TEXT);
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 7);
        assert_eq!(
            u64::from_le_bytes(bytes[24..32].try_into().unwrap()),
            0x1234_0000
        );
        assert_eq!(i32::from_le_bytes(bytes[32..36].try_into().unwrap()), 260);
    }

    #[test]
    fn test_decode_label_stops_at_nul() {
        let mut units: Vec<u16> = "Projects".encode_utf16().collect();
        units.push(0);
        units.extend("stale".encode_utf16());
        assert_eq!(decode_label(&units), "Projects");
    }

    #[test]
    fn test_decode_label_without_terminator() {
        let units: Vec<u16> = "abc".encode_utf16().collect();
        assert_eq!(decode_label(&units), "abc");
    }
}
