//! Controller integration tests
//!
//! Drives a `DisplayController` through the in-memory platform: rotation, density,
//! hot-plug, listener ordering and teardown.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use display_tracker::bounds::{BoundsCache, Insets, Rotation, Size};
use display_tracker::config::ControllerConfig;
use display_tracker::controller::{DisplayController, ListenerHandle};
use display_tracker::display::{Change, ChangeFlags, DisplayId, Info, NavigationMode};
use display_tracker::platform::{CallbackScope, DisplayObservation, StaticPlatform};

fn phone() -> DisplayObservation {
    let mut observation = DisplayObservation::default();
    observation.geometry.unique_id = "local:4619827259835644672".to_string();
    observation.geometry.size = Size::new(1080, 2400);
    observation.geometry.rotation = Rotation::R0;
    observation.geometry.insets = Insets::new(0, 118, 0, 63);
    observation.geometry.cutout = Insets::new(0, 96, 0, 0);
    observation.density_dpi = 440;
    observation
}

fn monitor() -> DisplayObservation {
    let mut observation = DisplayObservation::default();
    observation.geometry.unique_id = "hdmi:1".to_string();
    observation.geometry.size = Size::new(1920, 1080);
    observation.density_dpi = 160;
    observation.desktop_first_mode = true;
    observation
}

fn setup() -> (Arc<StaticPlatform>, DisplayController) {
    let platform = Arc::new(
        StaticPlatform::new()
            .with_display(DisplayId::DEFAULT, phone())
            .with_internal_displays(vec![phone().geometry]),
    );
    let config = ControllerConfig {
        executor_thread_name: "display-controller-it".to_string(),
        ..ControllerConfig::default()
    };
    let controller = DisplayController::new(platform.clone(), config).unwrap();
    (platform, controller)
}

type Calls = Arc<Mutex<Vec<(&'static str, DisplayId, ChangeFlags)>>>;

fn recorder(
    calls: &Calls,
    label: &'static str,
) -> impl Fn(DisplayId, &Info, ChangeFlags) + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |display: DisplayId, _info: &Info, flags: ChangeFlags| {
        calls.lock().push((label, display, flags))
    }
}

#[test]
fn test_initial_snapshot() {
    let (_platform, controller) = setup();

    let info = controller.default_info().unwrap();
    assert_eq!(info.rotation, Rotation::R0);
    assert_eq!(info.density_dpi, 440);
    assert_eq!(info.current_bounds.size(), Size::new(1080, 2400));
    assert_eq!(info.supported_bounds.len(), 4);
    assert!(info.supported_bounds.contains(&info.current_bounds));
    assert!(controller.info(DisplayId(7)).is_none());
}

#[test]
fn test_notify_without_change_is_silent() {
    let (_platform, controller) = setup();
    let calls = Calls::default();
    controller.set_priority_listener(recorder(&calls, "priority"));
    controller.add_default_listener(recorder(&calls, "listener"));

    let before = controller.default_info().unwrap();
    for _ in 0..3 {
        controller.notify_config_change(DisplayId::DEFAULT);
    }
    controller.notify_theme_change();
    controller.flush();

    assert!(calls.lock().is_empty());
    assert!(Arc::ptr_eq(&before, &controller.default_info().unwrap()));
}

#[test]
fn test_rotation_to_landscape() {
    let (platform, controller) = setup();
    let calls = Calls::default();
    controller.add_default_listener(recorder(&calls, "listener"));

    platform.update_display(DisplayId::DEFAULT, |o| o.geometry.rotate_to(Rotation::R90));
    controller.flush();

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    let flags = calls[0].2;
    assert!(flags.contains(Change::Rotation));
    assert!(flags.contains(Change::ActiveScreen));
    assert!(!flags.contains(Change::Density));
    assert_eq!(flags, ChangeFlags::from(Change::Rotation) | Change::ActiveScreen);

    let info = controller.default_info().unwrap();
    assert_eq!(info.rotation, Rotation::R90);
    assert_eq!(info.current_bounds.size(), Size::new(2400, 1080));
    assert!(info.supported_bounds.contains(&info.current_bounds));
}

#[test]
fn test_estimated_landscape_entry_matches_live_bounds() {
    let mut portrait = phone();
    let mut cache = BoundsCache::new();
    let inputs = portrait.estimator_inputs();
    let identity = portrait.geometry.identity();
    cache.get_or_estimate(&identity, &portrait.geometry.bounds_observation(), inputs);

    portrait.geometry.rotate_to(Rotation::R90);
    let landscape = portrait.geometry.bounds_observation().window_bounds();
    let table = cache.get(&identity).unwrap();
    assert_eq!(table[Rotation::R90], landscape);
    assert_eq!(portrait.geometry.identity(), identity);
}

#[test]
fn test_density_change_priority_first() {
    let (platform, controller) = setup();
    let calls = Calls::default();
    controller.add_default_listener(recorder(&calls, "first"));
    controller.add_default_listener(recorder(&calls, "second"));
    controller.set_priority_listener(recorder(&calls, "priority"));

    platform.update_display(DisplayId::DEFAULT, |o| o.density_dpi = 480);
    controller.flush();

    let calls = calls.lock();
    let labels: Vec<&str> = calls.iter().map(|(label, _, _)| *label).collect();
    assert_eq!(labels, vec!["priority", "first", "second"]);
    for (_, display, flags) in calls.iter() {
        assert_eq!(*display, DisplayId::DEFAULT);
        assert!(flags.contains(Change::Density));
    }
    assert_eq!(controller.default_info().unwrap().density_dpi, 480);
}

#[test]
fn test_replaced_priority_listener_is_dropped() {
    let (platform, controller) = setup();
    let calls = Calls::default();
    controller.set_priority_listener(recorder(&calls, "old"));
    controller.set_priority_listener(recorder(&calls, "new"));

    platform.update_display(DisplayId::DEFAULT, |o| o.night_mode = true);
    controller.flush();
    controller.clear_priority_listener();
    platform.update_display(DisplayId::DEFAULT, |o| o.night_mode = false);
    controller.flush();

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "new");
    assert_eq!(calls[0].2, ChangeFlags::from(Change::NightMode));
}

#[test]
fn test_panicking_listener_does_not_stop_delivery() {
    let (platform, controller) = setup();
    let delivered = Arc::new(AtomicUsize::new(0));

    controller.add_default_listener(|_, _, _| panic!("listener failure"));
    let counter = Arc::clone(&delivered);
    controller.add_default_listener(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    platform.update_display(DisplayId::DEFAULT, |o| o.font_scale = 1.3);
    controller.flush();
    platform.update_display(DisplayId::DEFAULT, |o| o.font_scale = 1.0);
    controller.flush();

    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(controller.default_info().unwrap().font_scale, 1.0);
}

#[test]
fn test_listener_removes_itself() {
    let (platform, controller) = setup();
    let controller = Arc::new(controller);
    let calls = Calls::default();
    let slot: Arc<Mutex<Option<ListenerHandle>>> = Arc::default();

    let weak = Arc::downgrade(&controller);
    let own = Arc::clone(&slot);
    let record = recorder(&calls, "once");
    let handle = controller.add_default_listener(move |display, info, flags| {
        record(display, info, flags);
        if let (Some(controller), Some(handle)) = (weak.upgrade(), own.lock().take()) {
            assert!(controller.remove_listener(handle));
        }
    });
    *slot.lock() = Some(handle);
    controller.add_default_listener(recorder(&calls, "always"));

    platform.update_display(DisplayId::DEFAULT, |o| {
        o.navigation_mode = NavigationMode::ThreeButton
    });
    controller.flush();
    platform.update_display(DisplayId::DEFAULT, |o| o.density_dpi = 400);
    controller.flush();

    let labels: Vec<&str> = calls.lock().iter().map(|(label, _, _)| *label).collect();
    assert_eq!(labels, vec!["once", "always", "always"]);
    controller.close().unwrap();
}

#[test]
fn test_no_delivery_after_close() {
    let (platform, controller) = setup();
    let calls = Calls::default();
    controller.set_priority_listener(recorder(&calls, "priority"));
    controller.add_default_listener(recorder(&calls, "listener"));

    controller.close().unwrap();
    assert_eq!(platform.registration_count(CallbackScope::System), 0);
    assert_eq!(
        platform.registration_count(CallbackScope::Display(DisplayId::DEFAULT)),
        0
    );
    assert!(controller.default_info().is_none());
    assert!(controller.tracked_displays().is_empty());

    assert!(platform.update_display(DisplayId::DEFAULT, |o| o.density_dpi = 320));
    controller.notify_config_change(DisplayId::DEFAULT);
    controller.notify_theme_change();
    controller.flush();

    assert!(calls.lock().is_empty());
    controller.close().unwrap();
}

#[test]
fn test_close_from_listener_stops_delivery() {
    let (platform, controller) = setup();
    let controller = Arc::new(controller);
    let calls = Calls::default();
    let densities: Arc<Mutex<Vec<u32>>> = Arc::default();

    let weak = Arc::downgrade(&controller);
    let seen = Arc::clone(&densities);
    let queue = Arc::clone(&platform);
    controller.add_default_listener(move |_, info, _| {
        seen.lock().push(info.density_dpi);
        // Queued ahead of the shutdown
        queue.update_display(DisplayId::DEFAULT, |o| o.density_dpi = 300);
        if let Some(controller) = weak.upgrade() {
            controller.close().unwrap();
            assert!(controller.is_closed());
        }
    });
    controller.add_default_listener(recorder(&calls, "after"));

    platform.update_display(DisplayId::DEFAULT, |o| o.density_dpi = 400);

    let deadline = Instant::now() + Duration::from_secs(5);
    while platform.registration_count(CallbackScope::System) > 0 {
        assert!(Instant::now() < deadline, "executor did not shut down");
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(*densities.lock(), vec![400]);
    assert!(calls.lock().is_empty());
    assert!(controller.is_closed());
    assert!(controller.default_info().is_none());
    assert_eq!(
        platform.registration_count(CallbackScope::Display(DisplayId::DEFAULT)),
        0
    );
    controller.close().unwrap();
}

#[test]
fn test_other_display_refresh_keeps_patched_bounds() {
    let (platform, controller) = setup();
    let external = DisplayId(1);
    platform.connect_display(external, monitor());
    controller.flush();
    assert_eq!(controller.tracked_displays(), vec![DisplayId::DEFAULT, external]);

    let calls = Calls::default();
    controller.add_default_listener(recorder(&calls, "phone"));
    controller.add_listener(external, recorder(&calls, "monitor"));

    // Landscape with a taller bottom inset than the estimate, so the entry is patched
    platform.update_display(DisplayId::DEFAULT, |o| {
        o.geometry.rotate_to(Rotation::R90);
        o.geometry.insets.bottom += 24;
    });
    controller.flush();
    assert_eq!(calls.lock().len(), 1);
    calls.lock().clear();
    let before = controller.default_info().unwrap();

    controller.notify_config_change(external);
    controller.notify_config_change(DisplayId::DEFAULT);
    controller.notify_theme_change();
    controller.flush();

    assert!(calls.lock().is_empty());
    assert!(Arc::ptr_eq(&before, &controller.default_info().unwrap()));
}

#[test]
fn test_hotplug_lifecycle() {
    let (platform, controller) = setup();
    let calls = Calls::default();
    let external = DisplayId(2);

    // Registered before the display exists
    controller.add_listener(external, recorder(&calls, "external"));
    controller.set_priority_listener(recorder(&calls, "priority"));

    platform.connect_display(external, monitor());
    controller.flush();
    assert_eq!(controller.tracked_displays(), vec![DisplayId::DEFAULT, external]);
    assert!(controller.info(external).unwrap().desktop_first_mode);
    assert!(calls.lock().is_empty());

    platform.update_display(external, |o| o.taskbar_pinned = true);
    controller.flush();
    {
        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "external");
        assert_eq!(calls[0].2, ChangeFlags::from(Change::TaskbarPinning));
    }

    assert!(platform.disconnect_display(external));
    controller.flush();
    assert!(controller.info(external).is_none());
    assert_eq!(
        platform.registration_count(CallbackScope::Display(external)),
        0
    );

    controller.notify_config_change(external);
    platform.connect_display(external, monitor());
    platform.update_display(external, |o| o.density_dpi = 240);
    controller.flush();

    // Teardown dropped the old listener list
    assert_eq!(calls.lock().len(), 1);
    assert!(controller.info(external).is_some());
}

#[test]
fn test_single_display_mode_ignores_hotplug() {
    let platform = Arc::new(StaticPlatform::new().with_display(DisplayId::DEFAULT, phone()));
    let config = ControllerConfig {
        multi_display: false,
        ..ControllerConfig::default()
    };
    let controller = DisplayController::new(platform.clone(), config).unwrap();

    platform.connect_display(DisplayId(4), monitor());
    controller.flush();
    assert_eq!(controller.tracked_displays(), vec![DisplayId::DEFAULT]);
}

#[test]
fn test_events_from_many_threads_are_serialized() {
    let (platform, controller) = setup();
    let densities: Arc<Mutex<Vec<u32>>> = Arc::default();
    let active = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&densities);
    let running = Arc::clone(&active);
    let overlapped = Arc::clone(&overlaps);
    controller.add_default_listener(move |_, info, _| {
        if running.fetch_add(1, Ordering::SeqCst) != 0 {
            overlapped.fetch_add(1, Ordering::SeqCst);
        }
        seen.lock().push(info.density_dpi);
        running.fetch_sub(1, Ordering::SeqCst);
    });

    let controller = Arc::new(controller);
    let writer = {
        let platform = Arc::clone(&platform);
        thread::spawn(move || {
            for dpi in 200..240 {
                platform.update_display(DisplayId::DEFAULT, |o| o.density_dpi = dpi);
            }
        })
    };
    let noise: Vec<_> = (0..3)
        .map(|_| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                for _ in 0..50 {
                    controller.notify_config_change(DisplayId::DEFAULT);
                    controller.notify_theme_change();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for handle in noise {
        handle.join().unwrap();
    }
    controller.flush();

    let densities = densities.lock();
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert!(!densities.is_empty());
    assert!(densities.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(densities.last(), Some(&239));
    assert_eq!(controller.default_info().unwrap().density_dpi, 239);
}
