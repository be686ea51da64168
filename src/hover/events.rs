//! Hover events delivered to the preview consumer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::desktop::IconRecord;
use crate::geometry::ScreenPoint;

/// Enter/leave notification for one hover session.
///
/// For any icon, an `Enter` is always followed by exactly one `Leave` before
/// the next `Enter` of that icon, unless the detector is stopped in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HoverEvent {
    /// The pointer dwelled on a folder icon long enough.
    Enter {
        icon: IconRecord,
        pointer: ScreenPoint,
        #[serde(rename = "dwellMs", with = "duration_ms")]
        dwell: Duration,
    },
    /// The popup for `icon` should close.
    Leave {
        icon: IconRecord,
        /// Pointer position when it left the icon and hot region.
        pointer: ScreenPoint,
        /// Time from first contact to this event.
        #[serde(rename = "sessionMs", with = "duration_ms")]
        session: Duration,
    },
}

impl HoverEvent {
    pub fn icon(&self) -> &IconRecord {
        match self {
            HoverEvent::Enter { icon, .. } | HoverEvent::Leave { icon, .. } => icon,
        }
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, HoverEvent::Enter { .. })
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
