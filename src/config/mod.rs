//! DeskPeek configuration.
//!
//! Plain serde structs with defaults, passed explicitly to the components
//! that use them:
//!
//! - `HoverConfig`: dwell, hide and switch delays plus poll intervals
//! - `IconCacheConfig`: icon cache capacity and default size
//! - `PreviewConfig`: popup size, placement and folder listing limits
//!
//! `validate()` clamps out-of-range values instead of rejecting them.
//! Configuration is loaded, never written back.

pub mod hover;
pub mod icons;
pub mod preview;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DeskPeekResult;

pub use hover::HoverConfig;
pub use icons::IconCacheConfig;
pub use preview::PreviewConfig;

/// Complete configuration. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeskPeekConfig {
    pub hover: HoverConfig,
    pub icons: IconCacheConfig,
    pub preview: PreviewConfig,
}

impl DeskPeekConfig {
    pub fn validate(&mut self) {
        self.hover.validate();
        self.icons.validate();
        self.preview.validate();
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> DeskPeekResult<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        log::debug!(
            "[CONFIG] Loaded: dwell={}ms hide={}ms switch={}ms cache={}",
            config.hover.dwell_ms,
            config.hover.hide_delay_ms,
            config.hover.switch_delay_ms,
            config.icons.capacity
        );
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn load(path: &Path) -> DeskPeekResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
