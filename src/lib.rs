//! DeskPeek: hover-intent detection for desktop folder icons.
//!
//! The pipeline, bottom-up:
//!
//! - `platform` / `remote`: OS seam and scoped guards for memory in the
//!   shell process
//! - `desktop`: reads icon geometry out of the shell's list control and maps
//!   it to filesystem paths
//! - `hover`: debounced enter/leave detection driven by pointer polling
//! - `icons`: bounded cache of shell icons
//! - `preview`: folder listing and popup placement for consumers
//! - `app`: the demo service used by the `deskpeek` binary

pub mod app;
pub mod config;
pub mod desktop;
pub mod error;
pub mod geometry;
pub mod hover;
pub mod icons;
pub mod logging;
pub mod platform;
pub mod preview;
pub mod remote;

pub use config::DeskPeekConfig;
pub use desktop::{DesktopIntrospector, IconRecord, IndexTable};
pub use error::{DeskPeekError, DeskPeekResult};
pub use geometry::{ScreenPoint, ScreenRect};
pub use hover::{HoverDetector, HoverEvent};
pub use icons::IconCache;
