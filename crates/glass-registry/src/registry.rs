// ABOUTME: Authoritative set of glass regions, keyed by id and ordered by registration.
// ABOUTME: Mutations take a write lock; snapshots copy the enabled set under a read lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use glass_core::{GlassRegion, IntensityTier, Rect, RectUpdate, RegionId, MAX_REGIONS};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy)]
struct Entry {
    seq: u64,
    region: GlassRegion,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<RegionId, Entry>,
    /// Registration order: sequence -> id
    order: BTreeMap<u64, RegionId>,
    next_seq: u64,
    revision: u64,
}

impl Inner {
    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Frozen copy of the drawable regions at one revision
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSnapshot {
    /// Enabled regions in registration order, at most `MAX_REGIONS`
    pub regions: Vec<GlassRegion>,
    /// Enabled regions left out because of the cap
    pub dropped: usize,
    pub revision: u64,
}

/// Thread-safe region map shared between the layout owner and the frame loop
#[derive(Debug)]
pub struct RegionRegistry {
    inner: RwLock<Inner>,
    id_counter: AtomicU64,
    overflow_logged_at: AtomicU64,
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            id_counter: AtomicU64::new(1),
            overflow_logged_at: AtomicU64::new(u64::MAX),
        }
    }

    /// Hand out an id no other caller of this registry has received
    pub fn next_id(&self) -> RegionId {
        RegionId(self.id_counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert or replace the region for `id`. A replaced region keeps its
    /// place in the registration order. Returns true if the id was new.
    pub fn register(&self, id: RegionId, rect: Rect, roundness: f32, tier: IntensityTier) -> bool {
        let region = GlassRegion::new(id, rect, roundness, tier);
        let mut inner = self.inner.write();

        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.region = region;
            inner.bump();
            tracing::trace!(?id, "Region re-registered in place");
            return false;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(id, Entry { seq, region });
        inner.order.insert(seq, id);
        inner.bump();
        tracing::debug!(?id, ?rect, ?tier, "Region registered");
        true
    }

    /// Merge new geometry into an existing region; unknown ids are ignored
    pub fn update(&self, id: RegionId, update: RectUpdate) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entries.get_mut(&id) else {
            tracing::trace!(?id, "Update for unknown region ignored");
            return false;
        };
        update.apply(&mut entry.region.rect);
        inner.bump();
        true
    }

    /// Keep a region registered but skip (or resume) drawing it
    pub fn set_enabled(&self, id: RegionId, enabled: bool) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entries.get_mut(&id) else {
            return false;
        };
        if entry.region.enabled != enabled {
            entry.region.enabled = enabled;
            inner.bump();
        }
        true
    }

    /// Remove a region; unknown ids are ignored
    pub fn unregister(&self, id: RegionId) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entries.remove(&id) else {
            tracing::trace!(?id, "Unregister for unknown region ignored");
            return false;
        };
        inner.order.remove(&entry.seq);
        inner.bump();
        tracing::debug!(?id, "Region unregistered");
        true
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.inner.read().entries.contains_key(&id)
    }

    pub fn get(&self, id: RegionId) -> Option<GlassRegion> {
        self.inner.read().entries.get(&id).map(|e| e.region)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// All registered ids, enabled or not, in registration order
    pub fn ids(&self) -> Vec<RegionId> {
        self.inner.read().order.values().copied().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        if inner.entries.is_empty() {
            return;
        }
        inner.entries.clear();
        inner.order.clear();
        inner.bump();
    }

    /// Changes every time the region set or any region changes
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Copy the drawable regions. Later mutations never affect the copy.
    pub fn snapshot(&self) -> RegionSnapshot {
        let inner = self.inner.read();
        let mut regions = Vec::with_capacity(inner.entries.len().min(MAX_REGIONS));
        let mut dropped = 0;

        for id in inner.order.values() {
            let Some(entry) = inner.entries.get(id) else {
                continue;
            };
            if !entry.region.enabled {
                continue;
            }
            if regions.len() < MAX_REGIONS {
                regions.push(entry.region);
            } else {
                dropped += 1;
            }
        }
        let revision = inner.revision;
        drop(inner);

        if dropped > 0 && self.overflow_logged_at.swap(revision, Ordering::Relaxed) != revision {
            tracing::debug!(dropped, max = MAX_REGIONS, "Too many enabled regions, drawing the oldest");
        }

        RegionSnapshot {
            regions,
            dropped,
            revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(i: u32) -> Rect {
        Rect::new(i as f32 * 10.0, 0.0, 50.0, 40.0)
    }

    #[test]
    fn register_twice_keeps_one_entry() {
        let registry = RegionRegistry::new();
        let id = RegionId(7);
        assert!(registry.register(id, rect(1), 0.5, IntensityTier::Normal));
        assert!(!registry.register(id, rect(1), 0.5, IntensityTier::Normal));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).map(|r| r.rect), Some(rect(1)));
    }

    #[test]
    fn re_register_keeps_registration_order() {
        let registry = RegionRegistry::new();
        let (a, b) = (RegionId(1), RegionId(2));
        registry.register(a, rect(0), 0.5, IntensityTier::Normal);
        registry.register(b, rect(1), 0.5, IntensityTier::Normal);
        registry.register(a, rect(5), 0.9, IntensityTier::Heavy);

        let ids: Vec<RegionId> = registry.snapshot().regions.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(registry.get(a).map(|r| r.tier), Some(IntensityTier::Heavy));
    }

    #[test]
    fn update_merges_partial_geometry() {
        let registry = RegionRegistry::new();
        let id = registry.next_id();
        registry.register(id, Rect::new(10.0, 20.0, 100.0, 50.0), 0.5, IntensityTier::Light);

        assert!(registry.update(id, RectUpdate::position(30.0, 40.0)));
        assert_eq!(registry.get(id).map(|r| r.rect), Some(Rect::new(30.0, 40.0, 100.0, 50.0)));
    }

    #[test]
    fn update_after_unregister_is_a_no_op() {
        let registry = RegionRegistry::new();
        let id = RegionId(3);
        registry.register(id, rect(0), 0.5, IntensityTier::Normal);
        assert!(registry.unregister(id));

        let revision = registry.revision();
        assert!(!registry.update(id, RectUpdate::size(1.0, 1.0)));
        assert!(!registry.unregister(id));
        assert!(!registry.set_enabled(id, false));
        assert!(!registry.contains(id));
        assert_eq!(registry.revision(), revision);
    }

    #[test]
    fn disabled_regions_stay_registered_but_are_not_drawn() {
        let registry = RegionRegistry::new();
        let (a, b) = (RegionId(1), RegionId(2));
        registry.register(a, rect(0), 0.5, IntensityTier::Normal);
        registry.register(b, rect(1), 0.5, IntensityTier::Normal);
        registry.set_enabled(a, false);

        let snap = registry.snapshot();
        assert_eq!(registry.len(), 2);
        assert_eq!(snap.regions.len(), 1);
        assert_eq!(snap.regions[0].id, b);
        assert_eq!(snap.dropped, 0);
    }

    #[test]
    fn snapshot_caps_to_the_oldest_regions() {
        let registry = RegionRegistry::new();
        let ids: Vec<RegionId> = (0..40)
            .map(|i| {
                let id = registry.next_id();
                registry.register(id, rect(i), 0.5, IntensityTier::Normal);
                id
            })
            .collect();

        let snap = registry.snapshot();
        assert_eq!(snap.regions.len(), MAX_REGIONS);
        assert_eq!(snap.dropped, 40 - MAX_REGIONS);
        let drawn: Vec<RegionId> = snap.regions.iter().map(|r| r.id).collect();
        assert_eq!(drawn, ids[..MAX_REGIONS].to_vec());
    }

    #[test]
    fn revision_tracks_changes() {
        let registry = RegionRegistry::new();
        let start = registry.revision();
        let id = registry.next_id();
        registry.register(id, rect(0), 0.5, IntensityTier::Normal);
        let after_register = registry.revision();
        assert_ne!(start, after_register);

        registry.set_enabled(id, true);
        assert_eq!(registry.revision(), after_register);

        registry.clear();
        assert!(registry.is_empty());
        assert_ne!(registry.revision(), after_register);
    }

    #[test]
    fn allocated_ids_are_unique() {
        let registry = RegionRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert_ne!(a, b);
    }
}
