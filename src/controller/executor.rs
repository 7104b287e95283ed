//! Serialized executor
//!
//! All tracker state, the bounds cache and every listener dispatch live on one
//! dedicated thread. Other threads reach it only through [`Command`]s posted on the
//! channel, so listeners never run concurrently or re-entrantly.
//!
//! ```text
//! platform callbacks ─┐
//! notify_*() ─────────┼──Commands──> run()
//! hot-plug ───────────┘                │
//!                                      ├─ Info::capture() via BoundsCache
//!                                      ├─ ChangeFlags::between(old, new)
//!                                      ├─ publish Arc<Info> to shared map
//!                                      └─ priority listener, then display listeners
//! ```

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::events::{Command, EventSink};
use super::listeners::{invoke, ListenerRegistry};
use super::tracker::PerDisplayTracker;
use crate::bounds::BoundsCache;
use crate::config::ControllerConfig;
use crate::display::{ChangeFlags, DisplayId, Info};
use crate::platform::{CallbackRegistration, DisplayPlatform};

/// State readable from any thread
#[derive(Default)]
pub(crate) struct Shared {
    /// Latest published snapshot per tracked display
    pub(crate) infos: RwLock<HashMap<DisplayId, Arc<Info>>>,
    /// Listener lists and the priority slot
    pub(crate) listeners: Mutex<ListenerRegistry>,
    /// Set by `close()`; events queued behind it are dropped
    pub(crate) closed: AtomicBool,
}

impl Shared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct Executor {
    platform: Arc<dyn DisplayPlatform>,
    config: ControllerConfig,
    shared: Arc<Shared>,
    sink: EventSink,
    trackers: BTreeMap<DisplayId, PerDisplayTracker>,
    cache: BoundsCache,
    sequence: u64,
    system_registration: Option<CallbackRegistration>,
}

impl Executor {
    pub(crate) fn new(
        platform: Arc<dyn DisplayPlatform>,
        config: ControllerConfig,
        shared: Arc<Shared>,
        sink: EventSink,
    ) -> Self {
        Self {
            platform,
            config,
            shared,
            sink,
            trackers: BTreeMap::new(),
            cache: BoundsCache::new(),
            sequence: 0,
            system_registration: None,
        }
    }

    /// Thread body: start tracking, signal `ready`, then drain commands until shutdown
    pub(crate) fn run(mut self, commands: Receiver<Command>, ready: Sender<()>) {
        self.start();
        let _ = ready.send(());

        for command in commands.iter() {
            trace!("Executor command: {:?}", command);
            match command {
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Shutdown(ack) => {
                    self.shutdown();
                    let _ = ack.send(());
                    break;
                }
                event if self.shared.is_closed() => {
                    trace!("Closed, dropping {:?}", event);
                }
                Command::ConfigurationChanged(display_id) => self.refresh(display_id),
                Command::ThemeChanged => self.refresh_all(),
                Command::DisplayAdded(display_id) => self.display_added(display_id),
                Command::DisplayRemoved(display_id) => self.display_removed(display_id),
            }
        }

        info!("Display controller executor stopped");
    }

    fn start(&mut self) {
        match self
            .platform
            .register_system_callback(self.sink.clone())
        {
            Ok(registration) => self.system_registration = Some(registration),
            Err(e) => warn!("No system event callback, hot-plug and theme events disabled: {}", e),
        }

        let displays = if self.config.multi_display {
            self.platform.enumerate()
        } else {
            vec![DisplayId::DEFAULT]
        };

        for display_id in displays {
            self.track(display_id);
        }

        info!("Tracking {} display(s)", self.trackers.len());
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn track(&mut self, display_id: DisplayId) {
        if self.trackers.contains_key(&display_id) {
            return;
        }
        if self.trackers.len() >= self.config.max_displays {
            warn!(
                "Ignoring {}: already tracking the maximum of {} displays",
                display_id, self.config.max_displays
            );
            return;
        }

        let sequence = self.next_sequence();
        match PerDisplayTracker::start(
            self.platform.as_ref(),
            display_id,
            &self.sink,
            &mut self.cache,
            sequence,
        ) {
            Ok(tracker) => {
                let info = Arc::clone(tracker.info());
                info!(
                    "Tracking {}: {} at {}, {} dpi, {} navigation",
                    display_id,
                    info.current_bounds.size(),
                    info.rotation,
                    info.density_dpi,
                    info.navigation_mode
                );
                self.shared.infos.write().insert(display_id, info);
                self.trackers.insert(display_id, tracker);
            }
            Err(e) => warn!("Cannot track {}: {}", display_id, e),
        }
    }

    fn untrack(&mut self, display_id: DisplayId) {
        let Some(tracker) = self.trackers.remove(&display_id) else {
            trace!("{} is not tracked", display_id);
            return;
        };

        tracker.teardown(self.platform.as_ref());
        self.shared.infos.write().remove(&display_id);
        let dropped = self.shared.listeners.lock().clear(display_id);
        info!("Untracked {} ({} listeners dropped)", display_id, dropped);
    }

    fn refresh(&mut self, display_id: DisplayId) {
        let sequence = self.next_sequence();
        let Some(tracker) = self.trackers.get_mut(&display_id) else {
            trace!("Ignoring change for untracked {}", display_id);
            return;
        };

        match tracker.recompute(self.platform.as_ref(), &mut self.cache, sequence) {
            Ok(Some((info, flags))) => {
                self.shared.infos.write().insert(display_id, Arc::clone(&info));
                self.dispatch(display_id, &info, flags);
            }
            Ok(None) => trace!("No observable change on {}", display_id),
            Err(e) => warn!("Keeping previous configuration of {}: {}", display_id, e),
        }
    }

    fn refresh_all(&mut self) {
        let displays: Vec<DisplayId> = self.trackers.keys().copied().collect();
        debug!("Theme change, refreshing {} display(s)", displays.len());
        for display_id in displays {
            if self.shared.is_closed() {
                break;
            }
            self.refresh(display_id);
        }
    }

    fn display_added(&mut self, display_id: DisplayId) {
        if !self.config.multi_display && !display_id.is_default() {
            debug!("Multi-display disabled, ignoring {}", display_id);
            return;
        }
        if self.trackers.contains_key(&display_id) {
            self.refresh(display_id);
        } else {
            self.track(display_id);
        }
    }

    fn display_removed(&mut self, display_id: DisplayId) {
        self.untrack(display_id);
    }

    /// Priority listener first (default display only), then display listeners in
    /// registration order
    fn dispatch(&self, display_id: DisplayId, info: &Info, flags: ChangeFlags) {
        let (priority, listeners) = {
            let registry = self.shared.listeners.lock();
            let priority = if display_id.is_default() {
                registry.priority()
            } else {
                None
            };
            (priority, registry.snapshot(display_id))
        };

        debug!(
            "{} changed [{}], notifying {} listener(s){}",
            display_id,
            flags,
            listeners.len(),
            if priority.is_some() { " after priority" } else { "" }
        );

        for listener in priority.into_iter().chain(listeners) {
            // A listener may close the controller mid-dispatch
            if self.shared.is_closed() {
                debug!("Closed during dispatch for {}, skipping remaining listeners", display_id);
                break;
            }
            invoke(listener.as_ref(), display_id, info, flags);
        }
    }

    fn shutdown(&mut self) {
        let displays: Vec<DisplayId> = self.trackers.keys().copied().collect();
        for display_id in displays {
            self.untrack(display_id);
        }
        if let Some(registration) = self.system_registration.take() {
            self.platform.unregister(registration);
        }
        self.shared.listeners.lock().clear_all();

        let stats = self.cache.stats();
        debug!(
            "Bounds cache: {} entries, {} hits, {} misses, {} patches, {} invalidations",
            self.cache.len(),
            stats.hits,
            stats.misses,
            stats.patches,
            stats.invalidations
        );
        self.cache.clear();
    }
}
