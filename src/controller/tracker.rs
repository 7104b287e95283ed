//! Per-display tracking state

use std::sync::Arc;
use tracing::{debug, warn};

use super::events::EventSink;
use crate::bounds::BoundsCache;
use crate::display::{ChangeFlags, DisplayId, Info};
use crate::platform::{self, CallbackRegistration, DisplayPlatform};

/// One tracked display: its current snapshot and its configuration callback
///
/// Lives on the executor thread only. Listeners are kept in the shared registry so
/// they can be added before the display is tracked.
pub(crate) struct PerDisplayTracker {
    display: DisplayId,
    info: Arc<Info>,
    registration: Option<CallbackRegistration>,
}

impl PerDisplayTracker {
    /// Capture the initial snapshot, then subscribe to configuration changes
    ///
    /// A display that cannot be observed is not tracked. A refused callback
    /// registration is logged; the display is still tracked and can be refreshed
    /// through explicit notifications.
    pub(crate) fn start(
        platform: &dyn DisplayPlatform,
        display_id: DisplayId,
        sink: &EventSink,
        cache: &mut BoundsCache,
        sequence: u64,
    ) -> platform::Result<Self> {
        let info = Info::capture(platform, display_id, cache, sequence)?;

        let registration = match platform.register_config_callback(display_id, sink.clone()) {
            Ok(registration) => Some(registration),
            Err(e) => {
                warn!("No configuration callback for {}: {}", display_id, e);
                None
            }
        };

        Ok(Self {
            display: display_id,
            info: Arc::new(info),
            registration,
        })
    }

    pub(crate) fn info(&self) -> &Arc<Info> {
        &self.info
    }

    /// Capture a new snapshot and diff it against the current one
    ///
    /// The new snapshot replaces the current one only when something observable
    /// changed; `None` means nothing did.
    pub(crate) fn recompute(
        &mut self,
        platform: &dyn DisplayPlatform,
        cache: &mut BoundsCache,
        sequence: u64,
    ) -> platform::Result<Option<(Arc<Info>, ChangeFlags)>> {
        let next = Info::capture(platform, self.display, cache, sequence)?;
        let flags = ChangeFlags::between(&self.info, &next);
        if flags.is_empty() {
            return Ok(None);
        }

        debug!(
            "{}: [{}] rotation {} -> {}, density {} -> {}",
            self.display,
            flags,
            self.info.rotation,
            next.rotation,
            self.info.density_dpi,
            next.density_dpi
        );
        self.info = Arc::new(next);
        Ok(Some((Arc::clone(&self.info), flags)))
    }

    /// Release the configuration callback
    pub(crate) fn teardown(self, platform: &dyn DisplayPlatform) {
        if let Some(registration) = self.registration {
            platform.unregister(registration);
        }
        debug!("Stopped tracking {}", self.display);
    }
}
