//! Hover timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIN_DWELL_MS: u64 = 100;
pub const MAX_DWELL_MS: u64 = 2000;

/// Debounce and polling timings for the hover detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoverConfig {
    /// Continuous time on one icon before it counts as a hover (100-2000 ms).
    pub dwell_ms: u64,

    /// Time outside icon and hot region before the popup is dismissed (50-5000 ms).
    pub hide_delay_ms: u64,

    /// Hide delay used when the pointer moves straight to another icon.
    /// Always shorter than `hide_delay_ms`.
    pub switch_delay_ms: u64,

    /// Poll interval while on an icon or inside the hot region (5-1000 ms).
    pub active_poll_ms: u64,

    /// Poll interval otherwise (5-1000 ms, at least `active_poll_ms`).
    pub idle_poll_ms: u64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 300,
            hide_delay_ms: 500,
            switch_delay_ms: 300,
            active_poll_ms: 16,
            idle_poll_ms: 100,
        }
    }
}

impl HoverConfig {
    /// Clamp every field into its supported range.
    pub fn validate(&mut self) {
        self.dwell_ms = clamp_dwell_ms(self.dwell_ms);
        self.hide_delay_ms = self.hide_delay_ms.clamp(50, 5000);
        self.switch_delay_ms = self.switch_delay_ms.min(self.hide_delay_ms - 1);
        self.active_poll_ms = self.active_poll_ms.clamp(5, 1000);
        self.idle_poll_ms = self.idle_poll_ms.clamp(self.active_poll_ms, 1000);
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn switch_delay(&self) -> Duration {
        Duration::from_millis(self.switch_delay_ms)
    }

    pub fn active_poll(&self) -> Duration {
        Duration::from_millis(self.active_poll_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Dwell threshold clamped to the supported range.
pub fn clamp_dwell_ms(ms: u64) -> u64 {
    ms.clamp(MIN_DWELL_MS, MAX_DWELL_MS)
}
