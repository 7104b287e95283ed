//! Bounds cache
//!
//! Maps a [`DisplayIdentity`] to its four-rotation [`BoundsTable`]. Owned by the
//! controller's executor, so it carries no locking of its own.

use std::collections::HashMap;
use tracing::{debug, trace, warn};

use super::estimator::{BoundsEstimator, BoundsObservation, BoundsTable};
use super::geometry::{Rotation, WindowBounds};
use crate::display::{DisplayIdentity, NavigationMode};

/// Configuration values the estimator depends on
///
/// An entry built under different inputs never answers a lookup, in any rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorInputs {
    /// Density in dots per inch
    pub density_dpi: u32,
    /// User font scale
    pub font_scale: f32,
    /// System navigation mode
    pub navigation_mode: NavigationMode,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedBounds {
    /// All four rotations are known
    Complete(BoundsTable),
    /// Estimation failed; only the observed rotation is known
    Partial(WindowBounds),
}

impl CachedBounds {
    /// Bounds at `rotation`, if known
    pub fn get(&self, rotation: Rotation) -> Option<&WindowBounds> {
        match self {
            CachedBounds::Complete(table) => Some(table.get(rotation)),
            CachedBounds::Partial(bounds) if bounds.rotation == rotation => Some(bounds),
            CachedBounds::Partial(_) => None,
        }
    }

    /// True when all four rotations are known
    pub fn is_complete(&self) -> bool {
        matches!(self, CachedBounds::Complete(_))
    }

    /// Every known bounds value
    pub fn iter(&self) -> impl Iterator<Item = &WindowBounds> {
        let slice: &[WindowBounds] = match self {
            CachedBounds::Complete(table) => table.as_array(),
            CachedBounds::Partial(bounds) => std::slice::from_ref(bounds),
        };
        slice.iter()
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a complete entry
    pub hits: u64,
    /// Lookups that had to estimate
    pub misses: u64,
    /// Active-rotation entries corrected from live bounds
    pub patches: u64,
    /// Entries dropped by invalidation or input-set eviction
    pub invalidations: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bounds: CachedBounds,
    inputs: EstimatorInputs,
}

/// Input sets kept per identity before the least recently used one is dropped
const MAX_INPUT_SETS: usize = 4;

/// Per-identity bounds tables
///
/// Each identity keeps one entry per [`EstimatorInputs`] it was resolved under, so
/// displays with different densities can share an internal panel without evicting
/// each other's entries. Entries never answer a lookup made under other inputs.
#[derive(Debug, Default)]
pub struct BoundsCache {
    /// Entries per identity, least recently used first
    entries: HashMap<DisplayIdentity, Vec<CacheEntry>>,
    stats: CacheStats,
}

impl BoundsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete table most recently resolved for `identity`
    ///
    /// Partial entries are not returned; callers go through
    /// [`get_or_estimate`](Self::get_or_estimate) to retry them.
    pub fn get(&self, identity: &DisplayIdentity) -> Option<&BoundsTable> {
        match self.entries.get(identity)?.last().map(|e| &e.bounds) {
            Some(CachedBounds::Complete(table)) => Some(table),
            _ => None,
        }
    }

    /// Look up `identity` under `inputs`, estimating on a miss and verifying on a hit
    ///
    /// - Miss, including an identity known only under other inputs: estimate and
    ///   store.
    /// - Hit: compare the entry for the live rotation with `live` and patch just that
    ///   rotation if they differ.
    /// - Partial entry: estimation is attempted again.
    ///
    /// Degenerate geometry stores a partial entry holding only the live bounds.
    pub fn get_or_estimate(
        &mut self,
        identity: &DisplayIdentity,
        live: &BoundsObservation,
        inputs: EstimatorInputs,
    ) -> CachedBounds {
        let live_bounds = live.window_bounds();
        let entries = self.entries.entry(identity.clone()).or_default();

        let previous = match entries.iter().position(|e| e.inputs == inputs) {
            Some(index) => Some(entries.remove(index)),
            None => {
                if !entries.is_empty() {
                    debug!(
                        "No bounds for {} under {:?}, estimating alongside {} other input set(s)",
                        identity,
                        inputs,
                        entries.len()
                    );
                }
                None
            }
        };

        let retrying = match previous {
            Some(mut entry) => {
                if let CachedBounds::Complete(table) = &mut entry.bounds {
                    self.stats.hits += 1;
                    if *table.get(live.rotation) != live_bounds {
                        debug!(
                            "Cached bounds for {} at {} disagree with live bounds, patching: {} -> {}",
                            identity,
                            live.rotation,
                            table.get(live.rotation),
                            live_bounds
                        );
                        table.patch(live_bounds);
                        self.stats.patches += 1;
                    } else {
                        trace!("Bounds cache hit for {} at {}", identity, live.rotation);
                    }
                    let bounds = entry.bounds.clone();
                    entries.push(entry);
                    return bounds;
                }
                true
            }
            None => false,
        };

        self.stats.misses += 1;
        let bounds = match BoundsEstimator::estimate(identity, live) {
            Ok(table) => {
                debug!("Estimated bounds for {}", identity);
                let mut table = table;
                // Live bounds win if the observation disagrees with the identity
                table.patch(live_bounds);
                CachedBounds::Complete(table)
            }
            Err(e) if retrying => {
                debug!("Bounds for {} still cannot be estimated: {}", identity, e);
                CachedBounds::Partial(live_bounds)
            }
            Err(e) => {
                warn!(
                    "Cannot estimate bounds for {}: {}, keeping live bounds for {} only",
                    identity, e, live.rotation
                );
                CachedBounds::Partial(live_bounds)
            }
        };

        entries.push(CacheEntry {
            bounds: bounds.clone(),
            inputs,
        });
        if entries.len() > MAX_INPUT_SETS {
            let evicted = entries.remove(0);
            debug!("Dropped bounds for {} under {:?}", identity, evicted.inputs);
            self.stats.invalidations += 1;
        }
        bounds
    }

    /// Drop every rotation cached for `identity`, under any inputs
    ///
    /// Returns true if anything was removed.
    pub fn invalidate_all(&mut self, identity: &DisplayIdentity) -> bool {
        match self.entries.remove(identity) {
            Some(entries) => {
                self.stats.invalidations += entries.len() as u64;
                !entries.is_empty()
            }
            None => false,
        }
    }

    /// Drop every entry built from inputs other than `inputs`
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_stale(&mut self, inputs: EstimatorInputs) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.inputs == inputs);
            removed += before - entries.len();
            !entries.is_empty()
        });
        if removed > 0 {
            debug!("Invalidated {} stale bounds entries", removed);
            self.stats.invalidations += removed as u64;
        }
        removed
    }

    /// Number of cached identities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Counters since creation
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Insets, Size};

    fn inputs() -> EstimatorInputs {
        EstimatorInputs {
            density_dpi: 440,
            font_scale: 1.0,
            navigation_mode: NavigationMode::Gesture,
        }
    }

    fn identity() -> DisplayIdentity {
        DisplayIdentity::from_geometry("local:0", Size::new(1080, 2400), Rotation::R0, Insets::NONE)
    }

    fn observation(rotation: Rotation) -> BoundsObservation {
        BoundsObservation {
            rotation,
            size: Size::new(1080, 2400).rotated(rotation),
            insets: Insets::new(0, 118, 0, 63).rotated(rotation),
        }
    }

    #[test]
    fn test_miss_then_round_trip() {
        let mut cache = BoundsCache::new();
        assert!(cache.get(&identity()).is_none());

        let bounds = cache.get_or_estimate(&identity(), &observation(Rotation::R0), inputs());
        let CachedBounds::Complete(table) = bounds else {
            panic!("expected complete table");
        };
        assert_eq!(cache.get(&identity()), Some(&table));
        assert_eq!(cache.stats().misses, 1);

        let again = cache.get_or_estimate(&identity(), &observation(Rotation::R0), inputs());
        assert_eq!(again, CachedBounds::Complete(table));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().patches, 0);
    }

    #[test]
    fn test_mismatch_patches_only_active_rotation() {
        let mut cache = BoundsCache::new();
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), inputs());
        let before = *cache.get(&identity()).unwrap();

        // Keyboard-sized inset change while landscape
        let mut live = observation(Rotation::R90);
        live.insets.bottom = 40;
        let after = cache.get_or_estimate(&identity(), &live, inputs());

        assert_eq!(after.get(Rotation::R90), Some(&live.window_bounds()));
        for rotation in [Rotation::R0, Rotation::R180, Rotation::R270] {
            assert_eq!(after.get(rotation), Some(before.get(rotation)));
        }
        assert_eq!(cache.stats().patches, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_input_change_rebuilds_entry() {
        let mut cache = BoundsCache::new();
        let mut live = observation(Rotation::R0);
        live.insets.bottom = 40;
        let original = cache.get_or_estimate(&identity(), &live, inputs());

        let changed = EstimatorInputs {
            navigation_mode: NavigationMode::ThreeButton,
            ..inputs()
        };
        let rebuilt = cache.get_or_estimate(&identity(), &observation(Rotation::R0), changed);

        let expected = BoundsEstimator::estimate(&identity(), &observation(Rotation::R0)).unwrap();
        assert_eq!(rebuilt, CachedBounds::Complete(expected));
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.stats().hits, 0);

        // The entry built under the original inputs is untouched
        assert_eq!(cache.get_or_estimate(&identity(), &live, inputs()), original);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_other_inputs_keep_patched_entry() {
        let mut cache = BoundsCache::new();
        let monitor_inputs = EstimatorInputs {
            density_dpi: 160,
            ..inputs()
        };

        cache.get_or_estimate(&identity(), &observation(Rotation::R0), inputs());
        let mut landscape = observation(Rotation::R90);
        landscape.insets.bottom = 40;
        let patched = cache.get_or_estimate(&identity(), &landscape, inputs());
        assert_eq!(cache.stats().patches, 1);

        // Another display resolving the same panel under its own inputs
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), monitor_inputs);
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), monitor_inputs);

        assert_eq!(cache.get_or_estimate(&identity(), &landscape, inputs()), patched);
        assert_eq!(cache.stats().patches, 1);
        assert_eq!(cache.stats().invalidations, 0);
    }

    #[test]
    fn test_least_recent_input_set_evicted() {
        let mut cache = BoundsCache::new();
        let at = |density_dpi| EstimatorInputs {
            density_dpi,
            ..inputs()
        };

        for dpi in 0..MAX_INPUT_SETS as u32 {
            cache.get_or_estimate(&identity(), &observation(Rotation::R0), at(320 + dpi));
        }
        // Touch the oldest so the second one becomes least recently used
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), at(320));
        assert_eq!(cache.stats().hits, 1);

        cache.get_or_estimate(&identity(), &observation(Rotation::R0), at(480));
        assert_eq!(cache.stats().invalidations, 1);

        cache.get_or_estimate(&identity(), &observation(Rotation::R0), at(320));
        assert_eq!(cache.stats().hits, 2);
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), at(321));
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_degenerate_stores_partial_and_retries() {
        let mut cache = BoundsCache::new();
        let degenerate =
            DisplayIdentity::from_geometry("virtual:7", Size::new(1920, 0), Rotation::R0, Insets::NONE);
        let live = BoundsObservation {
            rotation: Rotation::R0,
            size: Size::new(1920, 0),
            insets: Insets::NONE,
        };

        let bounds = cache.get_or_estimate(&degenerate, &live, inputs());
        assert!(!bounds.is_complete());
        assert_eq!(bounds.get(Rotation::R0), Some(&live.window_bounds()));
        assert_eq!(bounds.get(Rotation::R90), None);
        assert!(cache.get(&degenerate).is_none());

        // Partial entries go back through the estimator on every lookup
        for _ in 0..3 {
            let retried = cache.get_or_estimate(&degenerate, &live, inputs());
            assert_eq!(retried, bounds);
        }
        assert_eq!(cache.stats().misses, 4);
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_stale(inputs()), 0);
        assert_eq!(cache.stats().invalidations, 0);
    }

    #[test]
    fn test_invalidate_stale() {
        let mut cache = BoundsCache::new();
        cache.get_or_estimate(&identity(), &observation(Rotation::R0), inputs());
        assert_eq!(cache.invalidate_stale(inputs()), 0);

        let denser = EstimatorInputs {
            density_dpi: 480,
            ..inputs()
        };
        assert_eq!(cache.invalidate_stale(denser), 1);
        assert!(cache.is_empty());
        assert!(!cache.invalidate_all(&identity()));
    }
}
