//! # Failure-Surface Registry
//!
//! Keyed store of computed failure surfaces, one record per trial circle.
//! Recomputing a circle overwrites its record. Ranking is a value-producing
//! operation over a snapshot of the entries, so adding entries later never
//! invalidates a ranking already handed out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::stability::{CircleKey, FailureSurface, TrialCircle};

/// One row of a registry ranking, ascending by factor of safety.
///
/// Rank 0 is the critical (minimum-FoS) surface. Ties keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSurface {
    pub rank: usize,
    pub circle: TrialCircle,
    pub factor_of_safety: f64,
    pub converged: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    surface: FailureSurface,
}

/// Registry of trial circles and their computed surfaces.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    entries: HashMap<CircleKey, Entry>,
    next_seq: u64,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for the surface's trial circle.
    pub fn insert(&mut self, surface: FailureSurface) {
        let key = surface.circle.key();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(key, Entry { seq, surface });
    }

    /// Drop all records. There is no per-entry deletion.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, circle: &TrialCircle) -> Option<&FailureSurface> {
        self.entries.get(&circle.key()).map(|e| &e.surface)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &FailureSurface> {
        self.entries.values().map(|e| &e.surface)
    }

    /// Rank all entries ascending by factor of safety.
    ///
    /// Surfaces without a computed factor (never solved) sort last. The
    /// result is a detached value; later inserts do not affect it.
    pub fn ranking(&self) -> Vec<RankedSurface> {
        let mut snapshot: Vec<&Entry> = self.entries.values().collect();
        snapshot.sort_by(|a, b| {
            let fa = a.surface.factor_of_safety.unwrap_or(f64::INFINITY);
            let fb = b.surface.factor_of_safety.unwrap_or(f64::INFINITY);
            fa.total_cmp(&fb).then(a.seq.cmp(&b.seq))
        });
        snapshot
            .into_iter()
            .enumerate()
            .map(|(rank, entry)| RankedSurface {
                rank,
                circle: entry.surface.circle,
                factor_of_safety: entry.surface.factor_of_safety.unwrap_or(f64::INFINITY),
                converged: entry.surface.converged,
            })
            .collect()
    }

    /// The minimum-FoS surface, if any entry has a computed factor.
    pub fn critical(&self) -> Option<&FailureSurface> {
        self.entries
            .values()
            .filter(|e| e.surface.factor_of_safety.is_some())
            .min_by(|a, b| {
                let fa = a.surface.factor_of_safety.unwrap_or(f64::INFINITY);
                let fb = b.surface.factor_of_safety.unwrap_or(f64::INFINITY);
                fa.total_cmp(&fb).then(a.seq.cmp(&b.seq))
            })
            .map(|e| &e.surface)
    }
}
