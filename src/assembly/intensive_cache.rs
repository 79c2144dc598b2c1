//! Model-wide cache of intensive quantities, keyed by (global dof, level).
//!
//! Entries are shared with element contexts as `Arc`s so a cached bundle can
//! serve as a thermodynamic hint without being copied. Each entry carries an
//! up-to-date flag: [`invalidate_level`](IntensiveQuantityCache::invalidate_level)
//! only clears flags, so stale bundles remain available as hints.
//!
//! Lifetime policy: the owner invalidates a level whenever its solution
//! changes, shifts the history when a time step is accepted and clears the
//! cache when the discretisation changes.

use crate::config::CacheConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Entry<IQ> {
    quantities: Arc<IQ>,
    up_to_date: bool,
}

impl<IQ> Clone for Entry<IQ> {
    fn clone(&self) -> Self {
        Self {
            quantities: Arc::clone(&self.quantities),
            up_to_date: self.up_to_date,
        }
    }
}

type Level<IQ> = RwLock<Vec<Option<Entry<IQ>>>>;

/// Thread-safe intensive-quantity store for `num_levels` history levels.
#[derive(Debug)]
pub struct IntensiveQuantityCache<IQ> {
    levels: Vec<Level<IQ>>,
    config: CacheConfig,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<IQ: Clone> IntensiveQuantityCache<IQ> {
    pub fn new(num_levels: usize, num_dofs: usize, config: CacheConfig) -> Self {
        Self {
            levels: (0..num_levels)
                .map(|_| RwLock::new(vec![None; num_dofs]))
                .collect(),
            config,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable_intensive_quantity_cache
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Up-to-date bundle of `global_idx` at `time_idx`, if any.
    pub fn cached(&self, global_idx: usize, time_idx: usize) -> Option<Arc<IQ>> {
        if !self.is_enabled() {
            return None;
        }
        let found = self.levels[time_idx]
            .read()
            .get(global_idx)
            .and_then(Option::as_ref)
            .filter(|e| e.up_to_date)
            .map(|e| Arc::clone(&e.quantities));
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Any stored bundle of `global_idx` at `time_idx`, stale or not.
    pub fn hint(&self, global_idx: usize, time_idx: usize) -> Option<Arc<IQ>> {
        if !(self.is_enabled() && self.config.enable_thermodynamic_hints) {
            return None;
        }
        self.levels[time_idx]
            .read()
            .get(global_idx)
            .and_then(Option::as_ref)
            .map(|e| Arc::clone(&e.quantities))
    }

    /// Store an up-to-date copy of `quantities`. No-op when disabled.
    pub fn store(&self, quantities: &IQ, global_idx: usize, time_idx: usize) {
        if !self.is_enabled() {
            return;
        }
        let mut level = self.levels[time_idx].write();
        if global_idx >= level.len() {
            level.resize(global_idx + 1, None);
        }
        level[global_idx] = Some(Entry {
            quantities: Arc::new(quantities.clone()),
            up_to_date: true,
        });
    }

    /// Mark every entry of `time_idx` stale.
    pub fn invalidate_level(&self, time_idx: usize) {
        for entry in self.levels[time_idx].write().iter_mut().flatten() {
            entry.up_to_date = false;
        }
    }

    /// Level `k` takes over the entries of level `k - 1`; level 0 is kept.
    pub fn shift_history(&mut self) {
        for k in (1..self.levels.len()).rev() {
            let newer = self.levels[k - 1].get_mut().clone();
            *self.levels[k].get_mut() = newer;
        }
    }

    /// Drop every entry of every level.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.get_mut().fill(None);
        }
    }

    /// `(hits, misses)` of [`cached`](Self::cached) since construction.
    pub fn hit_statistics(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}
