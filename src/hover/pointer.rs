//! System pointer position via `device_query`.

use device_query::{DeviceQuery, DeviceState};

use crate::geometry::ScreenPoint;
use crate::platform::PointerSource;

/// Reads the physical cursor position.
///
/// `DeviceState` is created per query; it is a thin wrapper and not `Sync`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPointer;

impl SystemPointer {
    pub fn new() -> Self {
        Self
    }
}

impl PointerSource for SystemPointer {
    fn position(&self) -> Option<ScreenPoint> {
        let (x, y) = DeviceState::new().get_mouse().coords;
        Some(ScreenPoint::new(x, y))
    }
}
