//! Hover event consumer.
//!
//! Turns `Enter` into a preview (folder listing, popup placement, hot
//! region, icon prefetch) and logs `Leave`. The detector drops a popup
//! region together with the leave of the icon that registered it, so the
//! consumer never has to clear it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PreviewConfig;
use crate::desktop::IconRecord;
use crate::geometry::ScreenRect;
use crate::hover::{HoverDetector, HoverEvent};
use crate::icons::{IconCache, IconSource};
use crate::platform::DesktopPlatform;
use crate::preview::{hot_region, list_folder, place_popup, FolderEntry};

/// What the consumer prepared for one enter event.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub folder: PathBuf,
    pub popup: ScreenRect,
    pub region: ScreenRect,
    pub entries: Vec<FolderEntry>,
    /// Entries whose icon is now in the cache.
    pub icons_loaded: usize,
    /// False if the session ended while the preview was being prepared.
    pub region_applied: bool,
}

pub struct PreviewFeed<P: DesktopPlatform + 'static, S: IconSource + 'static> {
    detector: Arc<HoverDetector<P>>,
    icons: Arc<IconCache<S>>,
    config: PreviewConfig,
    large_icons: bool,
}

impl<P: DesktopPlatform + 'static, S: IconSource + 'static> PreviewFeed<P, S> {
    pub fn new(
        detector: Arc<HoverDetector<P>>,
        icons: Arc<IconCache<S>>,
        config: &PreviewConfig,
        large_icons: bool,
    ) -> Self {
        let mut config = config.clone();
        config.validate();
        Self {
            detector,
            icons,
            config,
            large_icons,
        }
    }

    /// Consume `events` until every sender is gone. `work_area` maps an icon
    /// to the work area of its monitor.
    pub async fn run<F>(&self, events: flume::Receiver<HoverEvent>, work_area: F)
    where
        F: Fn(&ScreenRect) -> ScreenRect,
    {
        while let Ok(event) = events.recv_async().await {
            let area = work_area(&event.icon().bounds);
            self.handle(&event, area).await;
        }
        log::debug!("[APP] Event stream closed");
    }

    pub async fn handle(&self, event: &HoverEvent, work_area: ScreenRect) -> Option<PreviewFrame> {
        match event {
            HoverEvent::Enter { icon, .. } => Some(self.show(icon, work_area).await),
            HoverEvent::Leave { icon, session, .. } => {
                log::info!(
                    "[APP] Hide preview of '{}' ({}ms)",
                    icon.name(),
                    session.as_millis()
                );
                None
            }
        }
    }

    async fn show(&self, icon: &IconRecord, work_area: ScreenRect) -> PreviewFrame {
        let folder = icon.file_path.clone();
        let max_items = self.config.max_items;
        let listing = folder.clone();
        let entries = tokio::task::spawn_blocking(move || list_folder(&listing, max_items))
            .await
            .unwrap_or_else(|e| {
                log::warn!("[APP] Folder listing task failed: {}", e);
                Vec::new()
            });

        let popup = place_popup(
            &icon.bounds,
            &work_area,
            self.config.popup_width,
            self.config.popup_height,
            self.config.popup_gap,
        );
        let region = hot_region(&icon.bounds, &popup, self.config.region_margin);
        let region_applied = self.detector.set_popup_region_for(icon, region);

        let mut icons_loaded = 0;
        for entry in &entries {
            if self
                .icons
                .get_icon_async(entry.path.clone(), entry.is_dir, self.large_icons)
                .await
                .is_some()
            {
                icons_loaded += 1;
            }
        }

        log::info!(
            "[APP] Preview '{}': {} entries, {} icons, popup at ({}, {})",
            icon.name(),
            entries.len(),
            icons_loaded,
            popup.left,
            popup.top
        );

        PreviewFrame {
            folder,
            popup,
            region,
            entries,
            icons_loaded,
            region_applied,
        }
    }
}
