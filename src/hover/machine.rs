//! Hover-intent state machine.
//!
//! Pure and time-injected: every input carries `now`, nothing reads a clock
//! or touches the OS. One `tick` per poll.
//!
//! Transitions:
//!
//! ```text
//! Idle --contact X--> Dwelling(X) --dwell reached--> Triggered(X)   [enter X]
//! Dwelling(X) --leaves X--> Idle                                    (no event)
//! Triggered(X) --outside X and region--> pending hide(X, hide delay), Idle
//! Triggered(X) --contact Y--> pending hide(X, switch delay), Dwelling(Y)
//! pending hide(X) --contact X--> Triggered(X)                       (no event)
//! pending hide(X) --delay elapsed--> removed                        [leave X]
//! any --stale contact--> Idle, hides flushed                        [leave ...]
//! ```
//!
//! Pending hides live beside the focus, so "Triggered(Y) while X is still
//! waiting to hide" is representable and each side proceeds on its own.

use std::time::{Duration, Instant};

use crate::config::hover::clamp_dwell_ms;
use crate::config::HoverConfig;
use crate::desktop::IconRecord;
use crate::geometry::{ScreenPoint, ScreenRect};

use super::events::HoverEvent;

/// What the pointer is touching this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    /// No folder icon under the pointer.
    Empty,
    /// A folder icon whose cached geometry was confirmed.
    Icon(IconRecord),
    /// A folder icon whose cached geometry no longer matches the control.
    Stale(IconRecord),
}

/// Poll cadence requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollRate {
    /// On an icon, inside the hot region, or a hide is pending.
    Active,
    Idle,
}

/// The icon the machine is attending to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    Idle,
    Dwelling {
        icon: IconRecord,
        since: Instant,
    },
    Triggered {
        icon: IconRecord,
        /// First contact of the session (start of the dwell).
        session_start: Instant,
    },
}

impl Focus {
    pub fn icon(&self) -> Option<&IconRecord> {
        match self {
            Focus::Idle => None,
            Focus::Dwelling { icon, .. } | Focus::Triggered { icon, .. } => Some(icon),
        }
    }
}

/// A triggered icon waiting out its hide delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHide {
    pub icon: IconRecord,
    pub left_at: Instant,
    pub pointer: ScreenPoint,
    pub session_start: Instant,
    pub delay: Duration,
}

impl PendingHide {
    pub fn due_at(&self) -> Instant {
        self.left_at + self.delay
    }
}

#[derive(Debug, Clone)]
struct HotRegion {
    rect: ScreenRect,
    /// Icon whose popup registered the region.
    owner: Option<IconRecord>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub events: Vec<HoverEvent>,
    pub poll_rate: PollRate,
    /// Cached geometry was found stale; the index table should be rebuilt.
    pub refresh_requested: bool,
}

/// Snapshot for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverSnapshot {
    pub focus: Focus,
    pub pending: Vec<PendingHide>,
    pub region: Option<ScreenRect>,
}

pub struct HoverMachine {
    config: HoverConfig,
    focus: Focus,
    pending: Vec<PendingHide>,
    region: Option<HotRegion>,
    /// Bumped by every `stop`; observations taken before a stop are void.
    epoch: u64,
}

impl HoverMachine {
    pub fn new(config: &HoverConfig) -> Self {
        let mut config = config.clone();
        config.validate();
        Self {
            config,
            focus: Focus::Idle,
            pending: Vec::new(),
            region: None,
            epoch: 0,
        }
    }

    pub fn config(&self) -> &HoverConfig {
        &self.config
    }

    /// Set the dwell threshold, clamped to the supported range. Returns the
    /// value applied.
    pub fn set_dwell_threshold(&mut self, ms: u64) -> u64 {
        self.config.dwell_ms = clamp_dwell_ms(ms);
        self.config.dwell_ms
    }

    /// Register (or clear, with `None`) the popup's hot region. The region
    /// belongs to the currently triggered icon, if any.
    pub fn set_region(&mut self, rect: Option<ScreenRect>) {
        self.region = rect.map(|rect| HotRegion {
            rect,
            owner: match &self.focus {
                Focus::Triggered { icon, .. } => Some(icon.clone()),
                _ => None,
            },
        });
    }

    /// Register `rect` only if `icon` is still the triggered one. Returns
    /// whether the region was applied.
    pub fn set_region_for(&mut self, icon: &IconRecord, rect: ScreenRect) -> bool {
        match &self.focus {
            Focus::Triggered { icon: current, .. } if current.same_item(icon) => {
                self.set_region(Some(rect));
                true
            }
            _ => false,
        }
    }

    /// Discard everything without emitting events.
    pub fn stop(&mut self) {
        self.focus = Focus::Idle;
        self.pending.clear();
        self.region = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Number of stops so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> HoverSnapshot {
        HoverSnapshot {
            focus: self.focus.clone(),
            pending: self.pending.clone(),
            region: self.region.as_ref().map(|r| r.rect),
        }
    }

    /// Feed one observation.
    pub fn tick(&mut self, now: Instant, pointer: ScreenPoint, contact: Contact) -> TickOutcome {
        let mut events = Vec::new();
        // Hides whose delay ran out fire before the contact is considered,
        // so a late re-entry starts a new session instead of reviving one.
        self.fire_due_hides(now, &mut events);

        let mut refresh_requested = false;
        let on_icon = !matches!(contact, Contact::Empty);
        match contact {
            Contact::Icon(icon) => self.on_icon(now, pointer, icon, &mut events),
            Contact::Stale(icon) => {
                log::debug!(
                    "[HOVER] Geometry of '{}' is stale, tearing down session",
                    icon.name()
                );
                self.on_stale(now, pointer, &mut events);
                refresh_requested = true;
            }
            Contact::Empty => self.on_empty(now, pointer),
        }

        let poll_rate = if on_icon || self.in_region(pointer) || !self.pending.is_empty() {
            PollRate::Active
        } else {
            PollRate::Idle
        };

        TickOutcome {
            events,
            poll_rate,
            refresh_requested,
        }
    }

    /// Advance time without a pointer observation.
    pub fn advance(&mut self, now: Instant) -> TickOutcome {
        let mut events = Vec::new();
        self.fire_due_hides(now, &mut events);
        TickOutcome {
            events,
            poll_rate: if self.pending.is_empty() {
                PollRate::Idle
            } else {
                PollRate::Active
            },
            refresh_requested: false,
        }
    }

    fn in_region(&self, pointer: ScreenPoint) -> bool {
        self.region
            .as_ref()
            .map(|r| r.rect.contains_inclusive(pointer.x, pointer.y))
            .unwrap_or(false)
    }

    fn on_icon(&mut self, now: Instant, pointer: ScreenPoint, icon: IconRecord, events: &mut Vec<HoverEvent>) {
        match &self.focus {
            Focus::Triggered { icon: current, .. } if current.same_item(&icon) => return,
            Focus::Dwelling { icon: current, since } if current.same_item(&icon) => {
                let since = *since;
                let dwell = now.saturating_duration_since(since);
                if dwell >= self.config.dwell() {
                    log::debug!("[HOVER] Enter '{}' after {:?}", icon.name(), dwell);
                    events.push(HoverEvent::Enter {
                        icon: icon.clone(),
                        pointer,
                        dwell,
                    });
                    self.focus = Focus::Triggered {
                        icon,
                        session_start: since,
                    };
                }
                return;
            }
            _ => {}
        }

        if let Focus::Triggered {
            icon: previous,
            session_start,
        } = std::mem::replace(&mut self.focus, Focus::Idle)
        {
            let delay = self.config.switch_delay();
            self.schedule_hide(previous, now, pointer, session_start, delay);
        }

        if let Some(hide) = self.take_pending(&icon) {
            log::trace!("[HOVER] Re-entered '{}', hide cancelled", icon.name());
            self.focus = Focus::Triggered {
                icon,
                session_start: hide.session_start,
            };
            return;
        }

        log::trace!("[HOVER] Dwelling on '{}'", icon.name());
        self.focus = Focus::Dwelling { icon, since: now };
    }

    fn on_empty(&mut self, now: Instant, pointer: ScreenPoint) {
        if self.in_region(pointer) {
            if matches!(self.focus, Focus::Dwelling { .. }) {
                self.focus = Focus::Idle;
            }
            // Back inside the popup: its icon is still the one being shown.
            if matches!(self.focus, Focus::Idle) {
                let owner = self.region.as_ref().and_then(|r| r.owner.clone());
                if let Some(owner) = owner {
                    if let Some(hide) = self.take_pending(&owner) {
                        self.focus = Focus::Triggered {
                            icon: owner,
                            session_start: hide.session_start,
                        };
                    }
                }
            }
            return;
        }

        match std::mem::replace(&mut self.focus, Focus::Idle) {
            Focus::Triggered {
                icon,
                session_start,
            } => {
                let delay = self.config.hide_delay();
                self.schedule_hide(icon, now, pointer, session_start, delay);
            }
            Focus::Dwelling { .. } | Focus::Idle => {}
        }
    }

    fn on_stale(&mut self, now: Instant, pointer: ScreenPoint, events: &mut Vec<HoverEvent>) {
        if let Focus::Triggered {
            icon,
            session_start,
        } = std::mem::replace(&mut self.focus, Focus::Idle)
        {
            events.push(HoverEvent::Leave {
                icon,
                pointer,
                session: now.saturating_duration_since(session_start),
            });
        }

        self.pending.sort_by_key(PendingHide::due_at);
        for hide in self.pending.drain(..) {
            events.push(HoverEvent::Leave {
                icon: hide.icon,
                pointer: hide.pointer,
                session: now.saturating_duration_since(hide.session_start),
            });
        }
        self.region = None;
    }

    fn schedule_hide(
        &mut self,
        icon: IconRecord,
        now: Instant,
        pointer: ScreenPoint,
        session_start: Instant,
        delay: Duration,
    ) {
        log::trace!("[HOVER] '{}' hides in {:?}", icon.name(), delay);
        self.pending.push(PendingHide {
            icon,
            left_at: now,
            pointer,
            session_start,
            delay,
        });
    }

    fn take_pending(&mut self, icon: &IconRecord) -> Option<PendingHide> {
        let pos = self.pending.iter().position(|p| p.icon.same_item(icon))?;
        Some(self.pending.remove(pos))
    }

    fn fire_due_hides(&mut self, now: Instant, events: &mut Vec<HoverEvent>) {
        if self.pending.iter().all(|p| p.due_at() > now) {
            return;
        }

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_at() <= now);
        self.pending = waiting;
        due.sort_by_key(PendingHide::due_at);

        for hide in due {
            log::debug!("[HOVER] Leave '{}'", hide.icon.name());
            let owned_region = self
                .region
                .as_ref()
                .and_then(|r| r.owner.as_ref())
                .map(|owner| owner.same_item(&hide.icon))
                .unwrap_or(false);
            if owned_region {
                self.region = None;
            }

            events.push(HoverEvent::Leave {
                session: now.saturating_duration_since(hide.session_start),
                icon: hide.icon,
                pointer: hide.pointer,
            });
        }

        // A region nobody owns goes with the last visible popup.
        let unowned = self.region.as_ref().map(|r| r.owner.is_none()).unwrap_or(false);
        if unowned && self.pending.is_empty() && !matches!(self.focus, Focus::Triggered { .. }) {
            self.region = None;
        }
    }
}
