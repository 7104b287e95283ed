//! Display Controller
//!
//! Root of the subsystem: tracks every display the platform reports, recomputes an
//! [`Info`] snapshot whenever something changes, and fans the change out to
//! listeners.
//!
//! # Threading
//!
//! Events may arrive on any thread (platform callbacks, broadcast receivers, explicit
//! [`DisplayController::notify_config_change`] calls). They are posted to a single
//! executor thread, which owns all trackers and the bounds cache and performs every
//! listener dispatch. Listeners therefore never run concurrently with each other.
//!
//! [`DisplayController::info`] does not go through the executor: each recompute
//! publishes an `Arc<Info>` that readers clone out of a shared map.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──track──> Tracked ──hot-unplug / close──> TornDown
//!                           │  ▲
//!                           └──┘ recompute, dispatch if flags non-empty
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use display_tracker::config::ControllerConfig;
//! use display_tracker::controller::DisplayController;
//! use display_tracker::display::{Change, DisplayId};
//! use display_tracker::platform::StaticPlatform;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Arc::new(StaticPlatform::new());
//! let controller = DisplayController::new(platform, ControllerConfig::default())?;
//!
//! controller.add_default_listener(|display, info, flags| {
//!     if flags.contains(Change::Rotation) {
//!         println!("{} rotated to {}", display, info.rotation);
//!     }
//! });
//!
//! controller.notify_config_change(DisplayId::DEFAULT);
//! controller.close()?;
//! # Ok(())
//! # }
//! ```

mod events;
mod executor;
mod listeners;
mod tracker;

pub use events::EventSink;
pub use listeners::{Listener, ListenerHandle};

pub(crate) use events::Command;

use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::config::ControllerConfig;
use crate::display::{ChangeFlags, DisplayId, Info};
use crate::platform::DisplayPlatform;
use executor::{Executor, Shared};

/// Controller result type
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Controller error types
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Executor thread could not be started
    #[error("Failed to spawn executor thread: {0}")]
    ExecutorSpawn(String),

    /// Executor thread died
    #[error("Executor thread panicked")]
    ExecutorPanicked,
}

/// Tracks display configuration and notifies listeners of changes
///
/// Construct once at startup and share it by reference or `Arc`. Call
/// [`close`](Self::close) at teardown; dropping the controller closes it too.
pub struct DisplayController {
    shared: Arc<Shared>,
    sink: EventSink,
    executor: Mutex<Option<JoinHandle<()>>>,
    executor_thread: ThreadId,
}

impl DisplayController {
    /// Start the executor and track the platform's displays
    ///
    /// Returns once every initial display has been captured, so [`info`](Self::info)
    /// is populated immediately.
    pub fn new(platform: Arc<dyn DisplayPlatform>, config: ControllerConfig) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::new(Shared::default());
        let sink = EventSink::new(tx);

        let thread_name = config.executor_thread_name.clone();
        let executor = Executor::new(platform, config, Arc::clone(&shared), sink.clone());

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || executor.run(rx, ready_tx))
            .map_err(|e| DisplayError::ExecutorSpawn(e.to_string()))?;
        let executor_thread = handle.thread().id();

        if ready_rx.recv().is_err() {
            let _ = handle.join();
            return Err(DisplayError::ExecutorPanicked);
        }

        info!("Display controller started on thread '{}'", thread_name);

        Ok(Self {
            shared,
            sink,
            executor: Mutex::new(Some(handle)),
            executor_thread,
        })
    }

    /// Subscribe to changes of `display`
    ///
    /// The display does not need to be tracked yet; the listener starts receiving
    /// notifications once it is.
    pub fn add_listener<F>(&self, display: DisplayId, listener: F) -> ListenerHandle
    where
        F: Fn(DisplayId, &Info, ChangeFlags) + Send + Sync + 'static,
    {
        let handle = self.shared.listeners.lock().add(display, Arc::new(listener));
        trace!("Added listener {:?}", handle);
        handle
    }

    /// Subscribe to changes of the default display
    pub fn add_default_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(DisplayId, &Info, ChangeFlags) + Send + Sync + 'static,
    {
        self.add_listener(DisplayId::DEFAULT, listener)
    }

    /// Unsubscribe; safe to call from inside the listener itself
    ///
    /// Returns false if the handle was already removed or its display torn down.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.shared.listeners.lock().remove(handle)
    }

    /// Install the listener that sees default-display changes before anyone else
    ///
    /// Replaces (and drops) any previous priority listener.
    pub fn set_priority_listener<F>(&self, listener: F)
    where
        F: Fn(DisplayId, &Info, ChangeFlags) + Send + Sync + 'static,
    {
        if self
            .shared
            .listeners
            .lock()
            .set_priority(Some(Arc::new(listener)))
        {
            debug!("Replaced priority listener");
        }
    }

    /// Remove the priority listener, if any
    pub fn clear_priority_listener(&self) {
        self.shared.listeners.lock().set_priority(None);
    }

    /// Current snapshot of `display`, or `None` if it is not tracked
    pub fn info(&self, display: DisplayId) -> Option<Arc<Info>> {
        self.shared.infos.read().get(&display).cloned()
    }

    /// Current snapshot of the default display
    pub fn default_info(&self) -> Option<Arc<Info>> {
        self.info(DisplayId::DEFAULT)
    }

    /// Ids of every tracked display, ascending
    pub fn tracked_displays(&self) -> Vec<DisplayId> {
        let mut displays: Vec<DisplayId> = self.shared.infos.read().keys().copied().collect();
        displays.sort_unstable();
        displays
    }

    /// Recompute `display` and notify listeners if anything changed
    pub fn notify_config_change(&self, display: DisplayId) {
        self.sink.configuration_changed(display);
    }

    /// Recompute every tracked display after a theme or overlay broadcast
    pub fn notify_theme_change(&self) {
        self.sink.theme_changed();
    }

    /// Handle for posting events from platform adapters
    pub fn event_sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Block until every event posted before this call has been processed
    ///
    /// Returns immediately when closed or when called from a listener.
    pub fn flush(&self) {
        if self.is_closed() || thread::current().id() == self.executor_thread {
            return;
        }
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.sink.post(Command::Flush(ack_tx)) {
            let _ = ack_rx.recv();
        }
    }

    /// Tear down every tracker, release all platform callbacks and stop the executor
    ///
    /// Idempotent. No listener is invoked once this returns. When called from inside
    /// a listener the teardown is queued behind the current dispatch instead of
    /// waited for, and events still pending are dropped.
    pub fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            trace!("Display controller already closed");
            return Ok(());
        }

        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let posted = self.sink.post(Command::Shutdown(ack_tx));

        if thread::current().id() == self.executor_thread {
            debug!("Close requested from a listener, shutdown queued");
            self.executor.lock().take();
            return Ok(());
        }

        if posted {
            let _ = ack_rx.recv();
        }

        let Some(handle) = self.executor.lock().take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(()) => {
                info!("Display controller closed");
                Ok(())
            }
            Err(_) => {
                warn!("Display controller executor panicked");
                Err(DisplayError::ExecutorPanicked)
            }
        }
    }

    /// True once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for DisplayController {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing display controller: {}", e);
        }
    }
}
