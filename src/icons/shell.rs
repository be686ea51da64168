//! Icon extraction through the Windows shell.

use std::iter::once;
use std::mem;
use std::os::windows::ffi::OsStrExt;

use image::RgbaImage;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, GetObjectA, ReleaseDC,
    SelectObject, BITMAP, BITMAPINFO, BITMAPINFOHEADER, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
};
use windows::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_NORMAL};
use windows::Win32::UI::Shell::{
    SHGetFileInfoW, SHFILEINFOW, SHGFI_FLAGS, SHGFI_ICON, SHGFI_LARGEICON, SHGFI_SMALLICON,
    SHGFI_USEFILEATTRIBUTES,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyIcon, DrawIconEx, GetIconInfo, DI_NORMAL, HICON, ICONINFO,
};

use super::{IconRequest, IconSource};
use crate::error::{DeskPeekError, DeskPeekResult};

/// Extracts icons with `SHGetFileInfoW`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellIconSource;

impl ShellIconSource {
    pub fn new() -> Self {
        Self
    }
}

impl IconSource for ShellIconSource {
    fn extract(&self, request: &IconRequest<'_>) -> DeskPeekResult<RgbaImage> {
        let wide: Vec<u16> = request
            .path
            .as_os_str()
            .encode_wide()
            .chain(once(0))
            .collect();

        let mut flags: SHGFI_FLAGS = SHGFI_ICON;
        flags |= if request.large {
            SHGFI_LARGEICON
        } else {
            SHGFI_SMALLICON
        };
        if !request.read_file {
            flags |= SHGFI_USEFILEATTRIBUTES;
        }
        let attributes = if request.is_directory {
            FILE_ATTRIBUTE_DIRECTORY
        } else {
            FILE_ATTRIBUTE_NORMAL
        };

        let mut info = SHFILEINFOW::default();
        let found = unsafe {
            SHGetFileInfoW(
                PCWSTR(wide.as_ptr()),
                attributes,
                Some(&mut info as *mut SHFILEINFOW),
                mem::size_of::<SHFILEINFOW>() as u32,
                flags,
            )
        };
        if found == 0 || info.hIcon.is_invalid() {
            return Err(DeskPeekError::Image(format!(
                "shell has no icon for {}",
                request.path.display()
            )));
        }

        let result = hicon_to_rgba(info.hIcon);
        unsafe {
            let _ = DestroyIcon(info.hIcon);
        }
        result
    }
}

/// GDI objects released when the conversion returns, on any path.
struct GdiScope {
    screen_dc: HDC,
    mem_dc: HDC,
    dib: Option<HBITMAP>,
    previous: Option<HGDIOBJ>,
    color: HBITMAP,
    mask: HBITMAP,
}

impl Drop for GdiScope {
    fn drop(&mut self) {
        unsafe {
            if let Some(previous) = self.previous.take() {
                SelectObject(self.mem_dc, previous);
            }
            if let Some(dib) = self.dib.take() {
                let _ = DeleteObject(dib);
            }
            if !self.mem_dc.is_invalid() {
                let _ = DeleteDC(self.mem_dc);
            }
            ReleaseDC(None, self.screen_dc);
            if !self.color.is_invalid() {
                let _ = DeleteObject(self.color);
            }
            if !self.mask.is_invalid() {
                let _ = DeleteObject(self.mask);
            }
        }
    }
}

/// Render an icon into a 32-bit top-down DIB and return it as RGBA.
fn hicon_to_rgba(hicon: HICON) -> DeskPeekResult<RgbaImage> {
    unsafe {
        let mut icon_info: ICONINFO = mem::zeroed();
        GetIconInfo(hicon, &mut icon_info)
            .map_err(|e| DeskPeekError::Image(format!("GetIconInfo: {}", e)))?;

        let screen_dc = GetDC(None);
        let mut scope = GdiScope {
            screen_dc,
            mem_dc: CreateCompatibleDC(screen_dc),
            dib: None,
            previous: None,
            color: icon_info.hbmColor,
            mask: icon_info.hbmMask,
        };

        let bitmap_handle = if !icon_info.hbmColor.is_invalid() {
            icon_info.hbmColor
        } else {
            icon_info.hbmMask
        };
        let mut bitmap: BITMAP = mem::zeroed();
        if GetObjectA(
            bitmap_handle,
            mem::size_of::<BITMAP>() as i32,
            Some(&mut bitmap as *mut _ as *mut _),
        ) == 0
        {
            return Err(DeskPeekError::Image("GetObject failed".into()));
        }

        let width = bitmap.bmWidth;
        // Monochrome icons stack the AND and XOR masks vertically.
        let height = if icon_info.hbmColor.is_invalid() {
            bitmap.bmHeight / 2
        } else {
            bitmap.bmHeight
        };
        if width <= 0 || height <= 0 {
            return Err(DeskPeekError::Image("empty icon bitmap".into()));
        }

        let bitmap_info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: 0,
                ..Default::default()
            },
            bmiColors: [Default::default()],
        };

        let mut bits: *mut std::ffi::c_void = std::ptr::null_mut();
        let dib = CreateDIBSection(scope.mem_dc, &bitmap_info, DIB_RGB_COLORS, &mut bits, None, 0)
            .map_err(|e| DeskPeekError::Image(format!("CreateDIBSection: {}", e)))?;
        scope.dib = Some(dib);
        if bits.is_null() {
            return Err(DeskPeekError::Image("DIB has no pixel buffer".into()));
        }
        scope.previous = Some(SelectObject(scope.mem_dc, dib));

        DrawIconEx(scope.mem_dc, 0, 0, hicon, 0, 0, 0, None, DI_NORMAL)
            .map_err(|e| DeskPeekError::Image(format!("DrawIconEx: {}", e)))?;

        let size = (width * height * 4) as usize;
        let mut pixels = vec![0u8; size];
        std::ptr::copy_nonoverlapping(bits as *const u8, pixels.as_mut_ptr(), size);
        drop(scope);

        // BGRA -> RGBA
        for px in pixels.chunks_exact_mut(4) {
            px.swap(0, 2);
        }

        RgbaImage::from_raw(width as u32, height as u32, pixels)
            .ok_or_else(|| DeskPeekError::Image("pixel buffer size mismatch".into()))
    }
}
