//! Executor commands and the thread-safe handle that posts them

use crossbeam_channel::Sender;
use tracing::trace;

use crate::display::DisplayId;

/// Commands processed by the executor thread, in FIFO order
#[derive(Debug)]
pub(crate) enum Command {
    /// Recompute one display
    ConfigurationChanged(DisplayId),
    /// Theme/overlay broadcast: recompute every tracked display
    ThemeChanged,
    /// Hot-plug add
    DisplayAdded(DisplayId),
    /// Hot-plug remove
    DisplayRemoved(DisplayId),
    /// Acknowledge once everything queued before it has run
    Flush(Sender<()>),
    /// Tear everything down, acknowledge, exit
    Shutdown(Sender<()>),
}

/// Cloneable handle for posting events to a controller from any thread
///
/// Platform callbacks hold one of these. Posting never blocks and never touches
/// controller state directly; once the controller is closed, posts are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<Command>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<Command>) -> Self {
        Self { tx }
    }

    /// Sink with no executor behind it; the receiver sees what gets posted
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, crossbeam_channel::Receiver<Command>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Configuration of `display` changed
    pub fn configuration_changed(&self, display: DisplayId) {
        self.post(Command::ConfigurationChanged(display));
    }

    /// System theme or overlay changed
    pub fn theme_changed(&self) {
        self.post(Command::ThemeChanged);
    }

    /// `display` was connected
    pub fn display_added(&self, display: DisplayId) {
        self.post(Command::DisplayAdded(display));
    }

    /// `display` was disconnected
    pub fn display_removed(&self, display: DisplayId) {
        self.post(Command::DisplayRemoved(display));
    }

    /// Returns false if the executor is gone
    pub(crate) fn post(&self, command: Command) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                trace!("Controller closed, dropping {:?}", e.into_inner());
                false
            }
        }
    }
}
