//! In-memory platform
//!
//! Holds display observations in memory and fires registered callbacks when they are
//! changed through its mutators. Sinks are invoked after the state lock is released,
//! so a sink may call straight back into the platform.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use super::{
    CallbackRegistration, CallbackScope, DisplayGeometry, DisplayObservation, DisplayPlatform,
    PlatformError, Result,
};
use crate::config::{DisplayConfig, ScriptedEvent};
use crate::controller::EventSink;
use crate::display::DisplayId;

#[derive(Default)]
struct State {
    displays: BTreeMap<DisplayId, DisplayObservation>,
    internal: Vec<DisplayGeometry>,
    callbacks: HashMap<u64, (CallbackScope, EventSink)>,
    next_token: u64,
}

impl State {
    fn sinks_for(&self, scope: CallbackScope) -> Vec<EventSink> {
        let mut matching: Vec<(u64, EventSink)> = self
            .callbacks
            .iter()
            .filter(|(_, (s, _))| *s == scope)
            .map(|(token, (_, sink))| (*token, sink.clone()))
            .collect();
        matching.sort_by_key(|(token, _)| *token);
        matching.into_iter().map(|(_, sink)| sink).collect()
    }
}

/// Thread-safe in-memory [`DisplayPlatform`]
#[derive(Default)]
pub struct StaticPlatform {
    state: Mutex<State>,
}

impl StaticPlatform {
    /// Platform with no displays
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a display without firing any callback (initial setup)
    pub fn with_display(self, display: DisplayId, observation: DisplayObservation) -> Self {
        self.state.lock().displays.insert(display, observation);
        self
    }

    /// Declare the device's built-in panels
    pub fn with_internal_displays(self, internal: Vec<DisplayGeometry>) -> Self {
        self.state.lock().internal = internal;
        self
    }

    /// Platform described by configuration; panels marked `internal` are reported
    /// as built-in
    pub fn from_config(displays: &[DisplayConfig]) -> Self {
        let internal = displays
            .iter()
            .filter(|d| d.internal)
            .map(DisplayConfig::geometry)
            .collect();
        displays
            .iter()
            .fold(Self::new(), |platform, d| {
                platform.with_display(d.display_id(), d.observation())
            })
            .with_internal_displays(internal)
    }

    /// Apply a scripted change, firing the callbacks it implies
    ///
    /// Returns false if the targeted display does not exist.
    pub fn apply(&self, event: &ScriptedEvent) -> bool {
        match event {
            ScriptedEvent::Rotate { display, rotation } => {
                self.update_display(DisplayId(*display), |o| o.geometry.rotate_to(*rotation))
            }
            ScriptedEvent::Density { display, dpi } => {
                self.update_display(DisplayId(*display), |o| o.density_dpi = *dpi)
            }
            ScriptedEvent::FontScale { display, scale } => {
                self.update_display(DisplayId(*display), |o| o.font_scale = *scale)
            }
            ScriptedEvent::Navigation { display, mode } => {
                self.update_display(DisplayId(*display), |o| o.navigation_mode = *mode)
            }
            ScriptedEvent::NightMode { display, enabled } => {
                self.update_display(DisplayId(*display), |o| o.night_mode = *enabled)
            }
            ScriptedEvent::Taskbar {
                display,
                pinned,
                desktop,
                locked_on_home,
            } => self.update_display(DisplayId(*display), |o| {
                if let Some(pinned) = pinned {
                    o.taskbar_pinned = *pinned;
                }
                if let Some(desktop) = desktop {
                    o.desktop_taskbar = *desktop;
                }
                if let Some(locked) = locked_on_home {
                    o.locked_taskbar_on_home = *locked;
                }
            }),
            ScriptedEvent::HomeVisible { display, visible } => {
                self.update_display(DisplayId(*display), |o| o.home_visible = *visible)
            }
            ScriptedEvent::Theme { night_mode } => {
                self.broadcast_theme_change(|o| {
                    if let Some(night_mode) = night_mode {
                        o.night_mode = *night_mode;
                    }
                });
                true
            }
            ScriptedEvent::Connect(config) => {
                self.connect_display(config.display_id(), config.observation());
                true
            }
            ScriptedEvent::Disconnect { display } => self.disconnect_display(DisplayId(*display)),
        }
    }

    /// Current observation for `display`
    pub fn observation(&self, display: DisplayId) -> Option<DisplayObservation> {
        self.state.lock().displays.get(&display).cloned()
    }

    /// Mutate a display and fire its configuration callbacks
    ///
    /// Returns false if the display does not exist.
    pub fn update_display<F>(&self, display_id: DisplayId, update: F) -> bool
    where
        F: FnOnce(&mut DisplayObservation),
    {
        let sinks = {
            let mut state = self.state.lock();
            let Some(observation) = state.displays.get_mut(&display_id) else {
                return false;
            };
            update(observation);
            state.sinks_for(CallbackScope::Display(display_id))
        };

        trace!("{} updated, notifying {} callbacks", display_id, sinks.len());
        for sink in sinks {
            sink.configuration_changed(display_id);
        }
        true
    }

    /// Hot-plug a display and fire system callbacks
    pub fn connect_display(&self, display_id: DisplayId, observation: DisplayObservation) {
        let sinks = {
            let mut state = self.state.lock();
            state.displays.insert(display_id, observation);
            state.sinks_for(CallbackScope::System)
        };

        debug!("{} connected", display_id);
        for sink in sinks {
            sink.display_added(display_id);
        }
    }

    /// Unplug a display and fire system callbacks
    ///
    /// Returns false if the display did not exist.
    pub fn disconnect_display(&self, display_id: DisplayId) -> bool {
        let sinks = {
            let mut state = self.state.lock();
            if state.displays.remove(&display_id).is_none() {
                return false;
            }
            state.sinks_for(CallbackScope::System)
        };

        debug!("{} disconnected", display_id);
        for sink in sinks {
            sink.display_removed(display_id);
        }
        true
    }

    /// Fire a theme/overlay broadcast
    ///
    /// `update` runs against every display first, so a theme switch can flip night
    /// mode everywhere before the broadcast goes out.
    pub fn broadcast_theme_change<F>(&self, mut update: F)
    where
        F: FnMut(&mut DisplayObservation),
    {
        let sinks = {
            let mut state = self.state.lock();
            state.displays.values_mut().for_each(&mut update);
            state.sinks_for(CallbackScope::System)
        };

        for sink in sinks {
            sink.theme_changed();
        }
    }

    /// Live registrations for `scope`
    pub fn registration_count(&self, scope: CallbackScope) -> usize {
        self.state
            .lock()
            .callbacks
            .values()
            .filter(|(s, _)| *s == scope)
            .count()
    }

    fn register(&self, scope: CallbackScope, sink: EventSink) -> CallbackRegistration {
        let mut state = self.state.lock();
        state.next_token += 1;
        let token = state.next_token;
        state.callbacks.insert(token, (scope, sink));
        CallbackRegistration::new(scope, token)
    }
}

impl DisplayPlatform for StaticPlatform {
    fn enumerate(&self) -> Vec<DisplayId> {
        self.state.lock().displays.keys().copied().collect()
    }

    fn observe(&self, display: DisplayId) -> Result<DisplayObservation> {
        self.observation(display)
            .ok_or(PlatformError::DisplayNotFound(display))
    }

    fn internal_displays(&self) -> Vec<DisplayGeometry> {
        self.state.lock().internal.clone()
    }

    fn register_config_callback(
        &self,
        display: DisplayId,
        sink: EventSink,
    ) -> Result<CallbackRegistration> {
        if !self.state.lock().displays.contains_key(&display) {
            return Err(PlatformError::DisplayNotFound(display));
        }
        Ok(self.register(CallbackScope::Display(display), sink))
    }

    fn register_system_callback(&self, sink: EventSink) -> Result<CallbackRegistration> {
        Ok(self.register(CallbackScope::System, sink))
    }

    fn unregister(&self, registration: CallbackRegistration) {
        if self
            .state
            .lock()
            .callbacks
            .remove(&registration.token())
            .is_some()
        {
            trace!("Released callback {:?}", registration.scope());
        }
    }
}
