//! Hover-intent detection.
//!
//! - `machine`: pure dwell/hide/switch debounce state machine
//! - `detector`: polling service wiring pointer, introspector and machine
//! - `events`: enter/leave events handed to the preview consumer
//! - `pointer`: system pointer source (Windows)

pub mod detector;
pub mod events;
pub mod machine;

#[cfg(windows)]
pub mod pointer;


pub use detector::HoverDetector;
pub use events::HoverEvent;
pub use machine::{Contact, Focus, HoverMachine, HoverSnapshot, PendingHide, PollRate, TickOutcome};

#[cfg(windows)]
pub use pointer::SystemPointer;
