//! Polling service that turns pointer movement into hover events.
//!
//! One tokio task sleeps for the interval the machine asks for, then runs
//! `poll_once`: read the pointer, look up the icon under it, re-validate its
//! geometry and feed the state machine. Events go out to every subscriber.
//! Index refreshes run on the blocking pool, at most one at a time.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::Either;
use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::events::HoverEvent;
use super::machine::{Contact, HoverMachine, HoverSnapshot, PollRate, TickOutcome};
use crate::config::HoverConfig;
use crate::desktop::{DesktopIntrospector, IconRecord};
use crate::error::{DeskPeekError, DeskPeekResult};
use crate::geometry::ScreenRect;
use crate::platform::{DesktopPlatform, PointerSource};

/// Owned hover service. Dropping it cancels the polling loop.
pub struct HoverDetector<P: DesktopPlatform + 'static> {
    introspector: Arc<DesktopIntrospector<P>>,
    pointer: Arc<dyn PointerSource>,
    machine: Mutex<HoverMachine>,
    subscribers: Mutex<Vec<flume::Sender<HoverEvent>>>,
    refreshing: Arc<AtomicBool>,
    stop: Mutex<Option<DropGuard>>,
}

impl<P: DesktopPlatform + 'static> HoverDetector<P> {
    pub fn new(
        introspector: Arc<DesktopIntrospector<P>>,
        pointer: Arc<dyn PointerSource>,
        config: &HoverConfig,
    ) -> Self {
        Self {
            introspector,
            pointer,
            machine: Mutex::new(HoverMachine::new(config)),
            subscribers: Mutex::new(Vec::new()),
            refreshing: Arc::new(AtomicBool::new(false)),
            stop: Mutex::new(None),
        }
    }

    pub fn introspector(&self) -> &Arc<DesktopIntrospector<P>> {
        &self.introspector
    }

    /// New receiver for every event emitted from now on.
    pub fn subscribe(&self) -> flume::Receiver<HoverEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn is_running(&self) -> bool {
        self.stop.lock().is_some()
    }

    /// Spawn the polling loop on the current tokio runtime. Returns false if
    /// it is already running.
    pub fn start(self: &Arc<Self>) -> DeskPeekResult<bool> {
        let mut stop = self.stop.lock();
        if stop.is_some() {
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DeskPeekError::Other(format!("no tokio runtime: {}", e)))?;

        let token = CancellationToken::new();
        let child = token.child_token();
        let detector: Weak<Self> = Arc::downgrade(self);
        let mut delay = self.machine.lock().config().idle_poll();

        runtime.spawn(async move {
            log::debug!("[DETECTOR] Polling loop started");
            loop {
                let sleep = tokio::time::sleep(delay);
                let Either::Right(_) =
                    futures::future::select(pin!(child.cancelled()), pin!(sleep)).await
                else {
                    break;
                };

                let Some(detector) = detector.upgrade() else {
                    break;
                };
                let outcome = detector.poll_once(Instant::now());
                delay = detector.interval_for(outcome.poll_rate);
            }
            log::debug!("[DETECTOR] Polling loop stopped");
        });

        *stop = Some(token.drop_guard());
        log::info!("[DETECTOR] Started");
        Ok(true)
    }

    /// Cancel the polling loop and discard any session without a leave event.
    pub fn stop(&self) {
        let guard = self.stop.lock().take();
        let was_running = guard.is_some();
        drop(guard);

        self.machine.lock().stop();
        if was_running {
            log::info!("[DETECTOR] Stopped");
        }
    }

    /// One evaluation: pointer, icon lookup, validation, state update.
    pub fn poll_once(&self, now: Instant) -> TickOutcome {
        let epoch = self.machine.lock().epoch();
        let observed = self.pointer.position().map(|pointer| {
            let contact = match self.introspector.icon_at(pointer.x, pointer.y) {
                Some(icon) if self.introspector.validate(&icon) => Contact::Icon(icon),
                Some(icon) => Contact::Stale(icon),
                None => Contact::Empty,
            };
            (pointer, contact)
        });

        let outcome = {
            let mut machine = self.machine.lock();
            if machine.epoch() != epoch {
                // Stopped while the pointer was being read.
                log::trace!("[DETECTOR] Observation predates stop, dropped");
                return TickOutcome {
                    events: Vec::new(),
                    poll_rate: PollRate::Idle,
                    refresh_requested: false,
                };
            }
            match observed {
                Some((pointer, contact)) => machine.tick(now, pointer, contact),
                None => {
                    log::trace!("[DETECTOR] Pointer position unavailable");
                    machine.advance(now)
                }
            }
        };

        for event in &outcome.events {
            self.publish(event);
        }
        if outcome.refresh_requested {
            self.refresh_in_background();
        }
        outcome
    }

    /// Register the popup's hot region, or clear it with `None`.
    pub fn set_popup_region(&self, region: Option<ScreenRect>) {
        log::debug!("[DETECTOR] Popup region: {:?}", region);
        self.machine.lock().set_region(region);
    }

    /// Register a popup region for `icon`, unless the pointer has already
    /// moved on to another session.
    pub fn set_popup_region_for(&self, icon: &IconRecord, region: ScreenRect) -> bool {
        let applied = self.machine.lock().set_region_for(icon, region);
        if !applied {
            log::debug!("[DETECTOR] '{}' no longer shown, region dropped", icon.name());
        }
        applied
    }

    /// Returns the threshold actually applied after clamping.
    pub fn set_dwell_threshold(&self, ms: u64) -> u64 {
        self.machine.lock().set_dwell_threshold(ms)
    }

    pub fn state(&self) -> HoverSnapshot {
        self.machine.lock().state()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Rebuild the index table off the polling task. Returns false when a
    /// refresh is already in flight.
    pub fn refresh_in_background(&self) -> bool {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            log::trace!("[DETECTOR] Refresh already running");
            return false;
        }

        let introspector = Arc::clone(&self.introspector);
        let refreshing = Arc::clone(&self.refreshing);
        let job = move || {
            let ok = introspector.refresh();
            refreshing.store(false, Ordering::Release);
            log::debug!("[DETECTOR] Background refresh finished (ok={})", ok);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(job);
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name("deskpeek-refresh".into())
                    .spawn(job);
                if let Err(e) = spawned {
                    log::warn!("[DETECTOR] Cannot spawn refresh thread: {}", e);
                    self.refreshing.store(false, Ordering::Release);
                    return false;
                }
            }
        }
        true
    }

    fn interval_for(&self, rate: PollRate) -> Duration {
        let machine = self.machine.lock();
        match rate {
            PollRate::Active => machine.config().active_poll(),
            PollRate::Idle => machine.config().idle_poll(),
        }
    }

    fn publish(&self, event: &HoverEvent) {
        match event {
            HoverEvent::Enter { icon, dwell, .. } => {
                log::info!("[HOVER] Enter {} after {}ms", icon.name(), dwell.as_millis())
            }
            HoverEvent::Leave { icon, session, .. } => {
                log::info!("[HOVER] Leave {} after {}ms", icon.name(), session.as_millis())
            }
        }

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            log::trace!("[DETECTOR] {}", DeskPeekError::ChannelClosed);
        }
    }
}
