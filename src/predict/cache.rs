use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;

use crate::predict::{Observer, OrbitalElementSet, PassList, PredictError};

/// Identity of one pass computation. Floating point inputs are keyed by
/// their bit patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassKey {
    norad_id: u64,
    epoch: DateTime<Utc>,
    element_set_number: u64,
    observer: String,
    latitude_bits: u64,
    longitude_bits: u64,
    altitude_bits: u64,
    date: NaiveDate,
    threshold_bits: u64,
}

impl PassKey {
    pub fn new(
        elements: &OrbitalElementSet,
        observer: &Observer,
        date: NaiveDate,
        threshold_deg: f64,
    ) -> Self {
        Self {
            norad_id: elements.norad_id,
            epoch: elements.epoch,
            element_set_number: elements.element_set_number,
            observer: observer.name().to_string(),
            latitude_bits: observer.latitude_deg().to_bits(),
            longitude_bits: observer.longitude_deg().to_bits(),
            altitude_bits: observer.altitude_m().to_bits(),
            date,
            threshold_bits: threshold_deg.to_bits(),
        }
    }
}

/// Shared cache of computed pass lists.
///
/// Entries are immutable `Arc`s; a recomputation replaces the entry and
/// readers holding the previous value keep seeing it unchanged.
#[derive(Debug, Default)]
pub struct PassCache {
    entries: RwLock<HashMap<PassKey, Arc<PassList>>>,
}

impl PassCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PassKey) -> Option<Arc<PassList>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: PassKey, passes: PassList) -> Arc<PassList> {
        let passes = Arc::new(passes);
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, passes.clone());
        passes
    }

    /// Return the cached list or compute, store and return a new one.
    /// Errors are not cached.
    pub fn get_or_compute<F>(&self, key: PassKey, compute: F) -> Result<Arc<PassList>, PredictError>
    where
        F: FnOnce() -> Result<PassList, PredictError>,
    {
        if let Some(hit) = self.get(&key) {
            debug!("Pass cache hit for {} on {}", key.observer, key.date);
            return Ok(hit);
        }
        Ok(self.insert(key, compute()?))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
