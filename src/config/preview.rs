//! Preview popup layout configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    /// Folder entries listed in the popup (1-500).
    pub max_items: usize,

    pub popup_width: u32,
    pub popup_height: u32,

    /// Distance between the icon and the popup.
    pub popup_gap: i32,

    /// Margin added around icon + popup to form the hot region.
    pub region_margin: i32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_items: 20,
            popup_width: 320,
            popup_height: 280,
            popup_gap: 8,
            region_margin: 20,
        }
    }
}

impl PreviewConfig {
    pub fn validate(&mut self) {
        self.max_items = self.max_items.clamp(1, 500);
        self.popup_width = self.popup_width.clamp(80, 4096);
        self.popup_height = self.popup_height.clamp(60, 4096);
        self.popup_gap = self.popup_gap.clamp(0, 200);
        self.region_margin = self.region_margin.clamp(0, 200);
    }
}
