//! Application wiring for the `deskpeek` binary.
//!
//! - `events`: hover event consumer that prepares folder previews

pub mod events;

use crate::config::DeskPeekConfig;
use crate::error::DeskPeekResult;

pub use events::{PreviewFeed, PreviewFrame};

/// Run the hover service until ctrl-c.
#[cfg(windows)]
pub async fn run(config: DeskPeekConfig) -> DeskPeekResult<()> {
    use std::sync::Arc;

    use crate::desktop::DesktopIntrospector;
    use crate::error::DeskPeekError;
    use crate::geometry::ScreenRect;
    use crate::hover::{HoverDetector, SystemPointer};
    use crate::icons::{IconCache, ShellIconSource};
    use crate::platform::win32::Win32Platform;
    use crate::preview::work_area_at;

    let introspector = Arc::new(DesktopIntrospector::new(Win32Platform::new()));
    let scan = Arc::clone(&introspector);
    let scanned = tokio::task::spawn_blocking(move || scan.refresh())
        .await
        .unwrap_or(false);
    if !scanned {
        return Err(DeskPeekError::Other(
            "cannot read desktop icons, check that Explorer is running".into(),
        ));
    }
    log::info!("[APP] Monitoring {} desktop icons", introspector.icon_count());

    let detector = Arc::new(HoverDetector::new(
        introspector,
        Arc::new(SystemPointer::new()),
        &config.hover,
    ));
    let icons = Arc::new(IconCache::new(ShellIconSource::new(), &config.icons));
    let feed = PreviewFeed::new(
        Arc::clone(&detector),
        icons,
        &config.preview,
        config.icons.large_icons,
    );

    let events = detector.subscribe();
    detector.start()?;

    let fallback = ScreenRect::new(0, 0, 1920, 1080);
    tokio::select! {
        _ = feed.run(events, |icon| work_area_at(icon.left, icon.top).unwrap_or(fallback)) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::warn!("[APP] Cannot listen for ctrl-c: {}", e);
            }
        }
    }

    detector.stop();
    log::info!("[APP] Shut down");
    Ok(())
}

/// Desktop icon introspection needs the Windows shell.
#[cfg(not(windows))]
pub async fn run(config: DeskPeekConfig) -> DeskPeekResult<()> {
    log::debug!("[APP] Config: {:?}", config);
    Err(crate::error::DeskPeekError::Other(
        "deskpeek only runs on Windows".into(),
    ))
}
