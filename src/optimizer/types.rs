//! Statistics for the peephole optimizer
//!
//! Counters are atomic so callers may shard methods across worker
//! threads without extra bookkeeping; a `Clone` takes a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while the pass runs
#[derive(Debug)]
pub struct PeepholeStats {
    rule_names: Vec<&'static str>,
    fires: Vec<AtomicU64>,
    removed: AtomicU64,
    inserted: AtomicU64,
}

impl PeepholeStats {
    /// Create zeroed counters for the given rules, in matcher order
    pub fn new(rule_names: Vec<&'static str>) -> Self {
        let fires = rule_names.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            rule_names,
            fires,
            removed: AtomicU64::new(0),
            inserted: AtomicU64::new(0),
        }
    }

    /// Record one firing of the rule at `rule_index`
    pub(crate) fn record(&self, rule_index: usize, removed: u64, inserted: u64) {
        self.fires[rule_index].fetch_add(1, Ordering::Relaxed);
        self.removed.fetch_add(removed, Ordering::Relaxed);
        self.inserted.fetch_add(inserted, Ordering::Relaxed);
    }

    /// Total instructions deleted by firings
    pub fn instructions_removed(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    /// Total instructions inserted by firings
    pub fn instructions_inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    /// Net instruction change (inserted minus removed)
    pub fn net_change(&self) -> i64 {
        self.instructions_inserted() as i64 - self.instructions_removed() as i64
    }

    /// Total rule firings
    pub fn total_fires(&self) -> u64 {
        self.fires.iter().map(|f| f.load(Ordering::Relaxed)).sum()
    }

    /// Firings of one rule by name, 0 for unknown names
    pub fn fires_for(&self, name: &str) -> u64 {
        self.rule_names
            .iter()
            .position(|n| *n == name)
            .map_or(0, |i| self.fires[i].load(Ordering::Relaxed))
    }

    /// Per-rule firing counts in matcher order
    pub fn rule_fires(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.rule_names
            .iter()
            .zip(&self.fires)
            .map(|(name, fires)| (*name, fires.load(Ordering::Relaxed)))
    }
}

impl Clone for PeepholeStats {
    fn clone(&self) -> Self {
        Self {
            rule_names: self.rule_names.clone(),
            fires: self
                .fires
                .iter()
                .map(|f| AtomicU64::new(f.load(Ordering::Relaxed)))
                .collect(),
            removed: AtomicU64::new(self.instructions_removed()),
            inserted: AtomicU64::new(self.instructions_inserted()),
        }
    }
}
