//! Concurrent feature vector cache
//!
//! Maps a descriptor content fingerprint to its computed `FeatureVector`.
//!
//! # Concurrency
//! - Readers take a shared lock and clone the cached vector.
//! - The first caller for a fingerprint inserts an empty `OnceCell` slot under
//!   the write lock; the computation itself runs outside the map lock inside
//!   `OnceCell::get_or_try_init`, so each fingerprint is computed at most once
//!   while other fingerprints proceed in parallel.
//! - A failed computation leaves the slot empty; it is retried on next use.
//! - When `capacity` is reached, new fingerprints are computed but not stored.

use super::FeatureVector;
use crate::error::FeatureError;
use once_cell::sync::OnceCell;
use segue_common::TrackDescriptor;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Content fingerprint of a descriptor's normalized fields
///
/// The track id is not part of the fingerprint: two descriptors with the same
/// audio properties share one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(descriptor: &TrackDescriptor) -> Self {
        let mut hasher = Sha256::new();

        hash_number(&mut hasher, b"tempo", descriptor.usable_tempo());
        match descriptor.musical_key() {
            Some(key) => {
                hasher.update(b"key:");
                hasher.update(key.camelot_code().as_bytes());
            }
            None => hasher.update(b"key:-"),
        }
        hash_number(&mut hasher, b"energy", descriptor.finite_energy());
        match descriptor.genre_label() {
            Some(genre) => {
                hasher.update(b"genre:");
                hasher.update(genre.to_lowercase().as_bytes());
            }
            None => hasher.update(b"genre:-"),
        }
        hash_number(&mut hasher, b"loudness", descriptor.loudness_lufs.filter(|v| v.is_finite()));
        hash_number(
            &mut hasher,
            b"centroid",
            descriptor.spectral_centroid_hz.filter(|v| v.is_finite()),
        );

        Fingerprint(hasher.finalize().into())
    }
}

fn hash_number(hasher: &mut Sha256, label: &[u8], value: Option<f64>) {
    hasher.update(label);
    match value {
        Some(v) => {
            hasher.update(b":");
            hasher.update(v.to_bits().to_le_bytes());
        }
        None => hasher.update(b":-"),
    }
    hasher.update(b";");
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
}

type Slot = Arc<OnceCell<FeatureVector>>;

/// Fingerprint → FeatureVector cache with at-most-once computation
#[derive(Debug)]
pub struct VectorCache {
    slots: RwLock<HashMap<Fingerprint, Slot>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl VectorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Cached vector for `fingerprint`, if computed
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<FeatureVector> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(fingerprint).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached vector or compute it exactly once
    pub fn get_or_compute<F>(&self, fingerprint: Fingerprint, compute: F) -> Result<FeatureVector, FeatureError>
    where
        F: FnOnce() -> Result<FeatureVector, FeatureError>,
    {
        if let Some(vector) = self.get(&fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let slot = match self.slot_for(fingerprint) {
            Some(slot) => slot,
            None => {
                debug!(fingerprint = %fingerprint, capacity = self.capacity, "Vector cache full, computing uncached");
                self.computations.fetch_add(1, Ordering::Relaxed);
                return compute();
            }
        };

        let result = slot
            .get_or_try_init(|| {
                self.computations.fetch_add(1, Ordering::Relaxed);
                compute()
            })
            .cloned();
        if result.is_err() {
            self.discard_empty(&fingerprint, &slot);
        }
        result
    }

    /// Remove `slot` if it is still mapped and was never filled
    fn discard_empty(&self, fingerprint: &Fingerprint, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let unfilled = slots
            .get(fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if unfilled {
            slots.remove(fingerprint);
        }
    }

    /// Existing slot, or a freshly inserted one; `None` when full
    fn slot_for(&self, fingerprint: Fingerprint) -> Option<Slot> {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get(&fingerprint) {
            return Some(Arc::clone(slot));
        }
        if slots.len() >= self.capacity {
            return None;
        }
        let slot: Slot = Arc::new(OnceCell::new());
        slots.insert(fingerprint, Arc::clone(&slot));
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureVectorEngine, WeightTable, DIMENSIONS};
    use std::sync::atomic::AtomicUsize;

    fn descriptor(id: &str) -> TrackDescriptor {
        TrackDescriptor::new(id)
            .with_tempo(124.0)
            .with_key("8A")
            .with_energy(0.6)
            .with_genre("Deep House")
    }

    #[test]
    fn test_fingerprint_ignores_id_and_genre_case() {
        let a = Fingerprint::of(&descriptor("a"));
        let b = Fingerprint::of(&descriptor("b").with_genre("deep house"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_normalizes_key_spelling() {
        let a = Fingerprint::of(&descriptor("a").with_key("Am"));
        let b = Fingerprint::of(&descriptor("a").with_key("8A"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_tempo() {
        let a = Fingerprint::of(&descriptor("a"));
        let b = Fingerprint::of(&descriptor("a").with_tempo(125.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hit_after_first_computation() {
        let cache = Arc::new(VectorCache::new(16));
        let engine = FeatureVectorEngine::default().with_cache(Arc::clone(&cache));

        let first = engine.vector_for(&descriptor("a")).unwrap();
        let second = engine.vector_for(&descriptor("b")).unwrap();
        assert_eq!(first, second);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_failed_computation_is_not_cached() {
        let cache = VectorCache::new(4);
        let fp = Fingerprint::of(&descriptor("a"));

        let err = cache.get_or_compute(fp, || Err(FeatureError::invalid("boom")));
        assert!(err.is_err());
        assert!(cache.get(&fp).is_none());

        let ok = cache.get_or_compute(fp, || {
            FeatureVector::new(vec![0.5; DIMENSIONS], WeightTable::builtin(), 0.8)
        });
        assert!(ok.is_ok());
        assert!(cache.get(&fp).is_some());
    }

    #[test]
    fn test_failures_do_not_consume_capacity() {
        let cache = VectorCache::new(2);
        for tempo in [100.0, 101.0, 102.0, 103.0] {
            let fp = Fingerprint::of(&descriptor("bad").with_tempo(tempo));
            assert!(cache.get_or_compute(fp, || Err(FeatureError::invalid("boom"))).is_err());
        }
        assert!(cache.is_empty());

        let engine = FeatureVectorEngine::default();
        let good = descriptor("good");
        cache
            .get_or_compute(Fingerprint::of(&good), || engine.compute_vector(&good))
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&Fingerprint::of(&good)).is_some());
    }

    #[test]
    fn test_capacity_limit_computes_uncached() {
        let cache = VectorCache::new(1);
        let engine = FeatureVectorEngine::default();
        let a = descriptor("a");
        let b = descriptor("b").with_tempo(90.0);

        cache.get_or_compute(Fingerprint::of(&a), || engine.compute_vector(&a)).unwrap();
        cache.get_or_compute(Fingerprint::of(&b), || engine.compute_vector(&b)).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&Fingerprint::of(&b)).is_none());
    }

    #[test]
    fn test_concurrent_callers_compute_once() {
        let cache = Arc::new(VectorCache::new(16));
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = Fingerprint::of(&descriptor("shared"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_compute(fp, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            FeatureVector::new(vec![0.4; DIMENSIONS], WeightTable::builtin(), 0.8)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().values(), &[0.4; DIMENSIONS][..]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
