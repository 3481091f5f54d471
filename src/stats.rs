//! Helpers for collecting statistics.

use std::collections::*;
use crate::branch::*;
use bitvec::prelude::*;
use itertools::*;

/// Container for recording simple statistics while evaluating some model.
#[derive(Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<usize, BranchData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of times any conditional branch was predicted
    pub global_brns: usize,

    /// Mispredictions counted in each window of 1000 branches
    pub mpkb: Vec<usize>,
}
impl BranchStats {
    pub fn new() -> Self { Self::default() }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        if self.global_brns == 0 { return 0.0; }
        self.global_hits as f64 / self.global_brns as f64
    }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize { self.global_brns - self.global_hits }

    /// Return the average number of misses per 1000 branches.
    pub fn avg_mpkb(&self) -> f64 {
        if self.global_brns == 0 { return 0.0; }
        self.global_miss() as f64 * 1000.0 / self.global_brns as f64
    }

    /// Return the best and worst windows of 1000 branches, in misses.
    pub fn mpkb_range(&self) -> Option<(usize, usize)> {
        self.mpkb.iter().copied().minmax().into_option()
    }

    /// Record a prediction for a conditional branch.
    pub fn update(&mut self, record: &BranchRecord, predicted: Outcome) {
        let hit = predicted == record.outcome;
        if self.global_brns % 1000 == 0 {
            self.mpkb.push(0);
        }
        self.global_brns += 1;
        if hit {
            self.global_hits += 1;
        } else if let Some(w) = self.mpkb.last_mut() {
            *w += 1;
        }

        let data = self.get_mut(record.pc);
        data.occ += 1;
        data.pat.push(record.outcome.into());
        if hit { data.hits += 1; }
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: usize) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of branches that are always taken
    pub fn num_always_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_always_taken()).count()
    }

    /// Returns the number of branches that are never taken
    pub fn num_never_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_never_taken()).count()
    }

    /// Return the 'n' most frequent branches with a hit rate of at most
    /// 'max_rate' (ignoring branches seen fewer than 'min_occ' times).
    pub fn get_low_rate_branches(&self, n: usize, min_occ: usize,
        max_rate: f64) -> Vec<(usize, &BranchData)>
    {
        self.data.iter()
            .filter(|(_, s)| s.occ >= min_occ && s.hit_rate() <= max_rate)
            .sorted_by_key(|(_, s)| s.occ)
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Default)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Record of all observed outcomes for this branch.
    pub pat: BitVec,
}
impl BranchData {
    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 { return 0.0; }
        self.hits as f64 / self.occ as f64
    }

    pub fn is_always_taken(&self) -> bool {
        self.pat.count_ones() == self.pat.len()
    }

    pub fn is_never_taken(&self) -> bool {
        self.pat.count_zeros() == self.pat.len()
    }
}
