//! Icon cache configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IconCacheConfig {
    /// Maximum number of cached icons (at least 1).
    pub capacity: usize,

    /// Default icon size for `IconCache::icon_for`.
    pub large_icons: bool,
}

impl Default for IconCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            large_icons: true,
        }
    }
}

impl IconCacheConfig {
    pub fn validate(&mut self) {
        self.capacity = self.capacity.max(1);
    }
}
