//! Listener registration and isolated invocation

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::display::{ChangeFlags, DisplayId, Info};

/// Change callback: display, new snapshot, what changed
pub type Listener = dyn Fn(DisplayId, &Info, ChangeFlags) + Send + Sync;

/// Returned by [`add_listener`](super::DisplayController::add_listener); pass it back
/// to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    display: DisplayId,
    id: u64,
}

impl ListenerHandle {
    /// Display the listener is registered for
    pub fn display(&self) -> DisplayId {
        self.display
    }
}

/// Per-display listener lists plus the priority slot
///
/// Dispatch takes a copy of the list, so listeners may add or remove listeners
/// (themselves included) while being called.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    by_display: HashMap<DisplayId, Vec<(u64, Arc<Listener>)>>,
    priority: Option<Arc<Listener>>,
    next_id: u64,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, display: DisplayId, listener: Arc<Listener>) -> ListenerHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.by_display
            .entry(display)
            .or_default()
            .push((id, listener));
        ListenerHandle { display, id }
    }

    pub(crate) fn remove(&mut self, handle: ListenerHandle) -> bool {
        let Some(list) = self.by_display.get_mut(&handle.display) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != handle.id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.by_display.remove(&handle.display);
        }
        removed
    }

    /// Returns true if a previous priority listener was replaced
    pub(crate) fn set_priority(&mut self, listener: Option<Arc<Listener>>) -> bool {
        std::mem::replace(&mut self.priority, listener).is_some()
    }

    pub(crate) fn priority(&self) -> Option<Arc<Listener>> {
        self.priority.clone()
    }

    /// Listeners for `display` in registration order
    pub(crate) fn snapshot(&self, display: DisplayId) -> Vec<Arc<Listener>> {
        self.by_display
            .get(&display)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn count(&self, display: DisplayId) -> usize {
        self.by_display.get(&display).map_or(0, Vec::len)
    }

    /// Drop every listener of `display`; returns how many were dropped
    pub(crate) fn clear(&mut self, display: DisplayId) -> usize {
        self.by_display.remove(&display).map_or(0, |list| list.len())
    }

    pub(crate) fn clear_all(&mut self) {
        self.by_display.clear();
        self.priority = None;
    }
}

/// Call `listener`, containing any panic
///
/// Returns false if the listener panicked. A panicking listener is logged and skipped;
/// it does not stop delivery to the listeners after it.
pub(crate) fn invoke(
    listener: &Listener,
    display_id: DisplayId,
    info: &Info,
    flags: ChangeFlags,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| listener(display_id, info, flags))) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                "Listener for {} panicked while handling [{}]: {}",
                display_id,
                flags,
                panic_message(&*payload)
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic>"
    }
}
