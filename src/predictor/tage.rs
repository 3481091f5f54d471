//! Implementation of a "TAgged GEometric history length" (TAGE) predictor.

pub mod component;
pub mod config;
pub mod hash;
pub mod stat;

#[cfg(test)]
mod test;

pub use component::*;
pub use config::*;
pub use stat::*;

use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ProtocolError, UpdateRejected};
use crate::history::*;
use crate::Outcome;
use crate::predictor::*;

/// The target address reported with every prediction. Targets are not
/// predicted.
pub const PLACEHOLDER_TARGET: usize = 0;

/// The maximum number of entries allocated after a misprediction.
const MAX_ALLOCS: usize = 2;

/// Source of identifiers for [`TagePredictor`] instances.
static NEXT_PREDICTOR_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a particular component in a [`TagePredictor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TageProvider {
    /// The base component
    Base,

    /// A tagged component
    Tagged(usize),
}

/// The index and tag computed for a tagged component during a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TageLookup {
    pub idx: usize,
    pub tag: u16,
}

/// Container for output from [`TagePredictor::predict`], including the
/// predicted outcome and other metadata about how the prediction was made.
///
/// This must be handed back to [`TagePredictor::update`] once the outcome of
/// the branch is known. It cannot be copied, and only the most recent
/// prediction from a predictor is accepted.
#[derive(Debug, PartialEq, Eq)]
pub struct TagePrediction {
    /// Identifies the predictor that made this prediction
    origin: u64,

    /// Sequence number identifying this prediction
    seq: u64,

    /// Program counter value of the predicted branch
    pub pc: usize,

    /// Whether the branch was conditional. For other branches, none of the
    /// other metadata is meaningful.
    pub conditional: bool,

    /// The final predicted direction
    pub outcome: Outcome,

    /// The index of the entry in the base component
    pub base_idx: usize,

    /// Predicted direction from the base component
    pub base_outcome: Outcome,

    /// The index and tag computed for each tagged component
    pub lookups: Vec<TageLookup>,

    /// The component providing the prediction
    pub provider: TageProvider,

    /// Predicted direction from the provider
    pub provider_outcome: Outcome,

    /// The next component with a matching tag, or [`TageProvider::Base`]
    /// if only one tagged component matched
    pub alt_provider: TageProvider,

    /// Predicted direction from the alternate component
    pub alt_outcome: Outcome,

    /// Whether the alternate component overrode the provider
    pub used_alt: bool,
}
impl TagePrediction {
    fn unconditional(origin: u64, seq: u64, pc: usize) -> Self {
        Self {
            origin,
            seq,
            pc,
            conditional: false,
            outcome: Outcome::T,
            base_idx: 0,
            base_outcome: Outcome::T,
            lookups: Vec::new(),
            provider: TageProvider::Base,
            provider_outcome: Outcome::T,
            alt_provider: TageProvider::Base,
            alt_outcome: Outcome::T,
            used_alt: false,
        }
    }

    /// Sequence number of this prediction.
    pub fn seq(&self) -> u64 { self.seq }

    /// The predicted target address.
    pub fn target(&self) -> usize { PLACEHOLDER_TARGET }
}


/// The "TAgged GEometric history length" predictor.
///
/// See the following:
///  - "A case for (partially) TAgged GEometric history length branch prediction"
///  (Seznec, 2006).
pub struct TagePredictor {
    /// The configuration used to create this object
    pub cfg: TageConfig,

    pub stat: TageStats,

    /// Base component
    pub base: TageBaseComponent,

    /// Tagged components, by increasing history length
    pub comp: Vec<TageComponent>,

    /// Global history of conditional branch outcomes
    ghr: HistoryRegister,

    /// Counter used to periodically age all 'useful' counters
    tick: u64,

    /// Identifies this predictor
    id: u64,

    /// Sequence number for the next prediction
    seq: u64,

    /// Sequence number of the prediction awaiting an update
    inflight: Option<u64>,
}
impl TagePredictor {
    pub(crate) fn new(cfg: TageConfig, base: TageBaseComponent,
        comp: Vec<TageComponent>, ghr: HistoryRegister, stat: TageStats)
        -> Self
    {
        Self {
            cfg,
            stat,
            base,
            comp,
            ghr,
            tick: 0,
            id: NEXT_PREDICTOR_ID.fetch_add(1, Ordering::Relaxed),
            seq: 0,
            inflight: None,
        }
    }

    /// Probe the base component and all tagged components.
    fn lookup(&self, seq: u64, pc: usize) -> TagePrediction {
        let base_idx = self.base.get_index(pc);
        let base_outcome = self.base.get_entry(base_idx).predict();
        let lookups: Vec<TageLookup> = self.comp.iter()
            .map(|c| TageLookup { idx: c.get_index(pc), tag: c.get_tag(pc) })
            .collect();

        // The base component provides the default predicted outcome
        // for cases where we miss in all tagged components
        let mut result = TagePrediction {
            origin: self.id,
            seq,
            pc,
            conditional: true,
            outcome: base_outcome,
            base_idx,
            base_outcome,
            lookups,
            provider: TageProvider::Base,
            provider_outcome: base_outcome,
            alt_provider: TageProvider::Base,
            alt_outcome: base_outcome,
            used_alt: false,
        };

        // Scan from the longest history to the shortest. The first hit is
        // the provider, and the second is the alternate.
        let mut hits = self.comp.iter().zip(result.lookups.iter())
            .enumerate()
            .rev()
            .filter(|(_, (c, l))| c.get_entry(l.idx).tag_matches(l.tag))
            .map(|(id, _)| id);
        let provider = hits.next();
        let alt_provider = hits.next();

        let Some(p) = provider else {
            return result;
        };
        let entry = self.comp[p].get_entry(result.lookups[p].idx);
        result.provider = TageProvider::Tagged(p);
        result.provider_outcome = entry.predict();
        result.outcome = entry.predict();

        if let Some(a) = alt_provider {
            let alt_entry = self.comp[a].get_entry(result.lookups[a].idx);
            result.alt_provider = TageProvider::Tagged(a);
            result.alt_outcome = alt_entry.predict();

            // Don't trust a provider with low confidence
            if entry.ctr.is_weak() {
                result.outcome = result.alt_outcome;
                result.used_alt = result.alt_outcome != result.provider_outcome;
            }
        }
        result
    }

    /// Returns 'true' if the path that produced the prediction was wrong
    /// and a new entry should be allocated.
    fn should_allocate(&self, p: &TagePrediction, outcome: Outcome) -> bool {
        match p.provider {
            // Judged on the base prediction made at predict time, not on
            // the counter after it was trained.
            TageProvider::Base => p.base_outcome != outcome,
            TageProvider::Tagged(_) => {
                p.provider_outcome != outcome
                    && !(p.used_alt && p.alt_outcome == outcome)
            },
        }
    }

    /// Try to allocate new entries in components with a longer history
    /// length than the provider.
    fn allocate(&mut self, p: &TagePrediction, outcome: Outcome) {
        let start = match p.provider {
            TageProvider::Base => 0,
            TageProvider::Tagged(id) => id + 1,
        };

        // Early return: the provider is the component with the longest
        // associated history length.
        if start >= self.comp.len() {
            self.stat.failed_alcs += 1;
            return;
        }

        // An entry is only eligible when its 'useful' counter is zero, and
        // when it doesn't already belong to this branch.
        let mut allocs = 0;
        for id in start..self.comp.len() {
            if allocs == MAX_ALLOCS {
                break;
            }
            let TageLookup { idx, tag } = p.lookups[id];
            let entry = self.comp[id].get_entry_mut(idx);
            if !entry.tag_matches(tag) && entry.useful == 0 {
                entry.replace(tag, outcome);
                allocs += 1;
                trace!("alloc comp{}[{:#x}] tag={:#x} pc={:#x}",
                    id, idx, tag, p.pc);
            }
        }

        // Every candidate entry is still useful. Replace one anyway, so that
        // the shortest candidate history can keep learning new patterns.
        if allocs == 0 {
            let TageLookup { idx, tag } = p.lookups[start];
            self.comp[start].get_entry_mut(idx).replace(tag, outcome);
            self.stat.forced_alcs += 1;
            trace!("forced alloc comp{}[{:#x}] tag={:#x} pc={:#x}",
                start, idx, tag, p.pc);
        }
        self.stat.alcs += allocs;
    }

    /// Append an outcome to global history, and to the folded history in
    /// each tagged component.
    fn push_history(&mut self, outcome: Outcome) {
        for comp in self.comp.iter_mut() {
            comp.update_history(&self.ghr, outcome);
        }
        self.ghr.push(outcome);
    }

    /// Advance the aging clock, periodically aging all 'useful' counters
    /// across all tagged components.
    fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        let mask = (1u64 << self.cfg.aging_period_log2) - 1;
        if self.tick & mask == 0 {
            for comp in self.comp.iter_mut() {
                comp.age_useful_bits();
            }
            self.stat.agings += 1;
            debug!("aged 'useful' counters at tick {}", self.tick);
        }
    }

    /// Update the state of the predictor with the outcome of a conditional
    /// branch.
    fn train(&mut self, p: &TagePrediction, outcome: Outcome) {
        // The base component is always trained
        self.base.get_entry_mut(p.base_idx).update(outcome);

        match p.provider {
            TageProvider::Base => {
                if p.outcome == outcome {
                    self.stat.base_hits += 1;
                } else {
                    self.stat.base_miss += 1;
                }
            },
            TageProvider::Tagged(id) => {
                if p.provider_outcome == outcome {
                    self.stat.comp_hits[id] += 1;
                } else {
                    self.stat.comp_miss[id] += 1;
                }

                let entry = self.comp[id].get_entry_mut(p.lookups[id].idx);
                entry.ctr.update(outcome);

                // When the alternate overrode the provider, train it too,
                // and judge both of them on their own predictions.
                if let (true, TageProvider::Tagged(alt)) = (p.used_alt, p.alt_provider) {
                    entry.update_useful(p.provider_outcome, outcome);

                    let alt_entry = self.comp[alt]
                        .get_entry_mut(p.lookups[alt].idx);
                    alt_entry.ctr.update(outcome);
                    alt_entry.update_useful(p.alt_outcome, outcome);

                    self.stat.alt_used += 1;
                }
            },
        }

        if self.should_allocate(p, outcome) {
            self.allocate(p, outcome);
        }

        self.push_history(outcome);
        self.tick();
        self.stat.clk += 1;
    }
}

/// The public interface to a [`TagePredictor`].
impl TagePredictor {
    /// Return the number of tagged components.
    pub fn num_tagged_components(&self) -> usize {
        self.comp.len()
    }

    /// Global history of conditional branch outcomes.
    pub fn ghr(&self) -> &HistoryRegister { &self.ghr }

    /// Sequence number of the prediction awaiting an update, if any.
    pub fn outstanding(&self) -> Option<u64> { self.inflight }

    /// Make a prediction for the branch at 'pc'.
    ///
    /// Only conditional branches are predicted: all other branches are
    /// predicted 'taken' without consulting or changing any state.
    pub fn try_predict(&mut self, pc: usize, conditional: bool)
        -> Result<TagePrediction, ProtocolError>
    {
        if let Some(outstanding) = self.inflight {
            return Err(ProtocolError::Outstanding { outstanding });
        }
        let seq = self.seq;
        self.seq += 1;
        self.inflight = Some(seq);

        if conditional {
            Ok(self.lookup(seq, pc))
        } else {
            Ok(TagePrediction::unconditional(self.id, seq, pc))
        }
    }

    /// Check that 'prediction' is the one awaiting an update.
    fn check_inflight(&self, prediction: &TagePrediction)
        -> Result<(), ProtocolError>
    {
        if self.inflight.is_none() {
            return Err(ProtocolError::NotInFlight { got: prediction.seq });
        }
        if prediction.origin != self.id || self.inflight != Some(prediction.seq) {
            return Err(ProtocolError::Foreign { got: prediction.seq });
        }
        Ok(())
    }

    /// Given the most recent prediction and the resolved outcome, update the
    /// state of the predictor. The target address is ignored.
    ///
    /// A prediction that isn't awaiting an update here is handed back
    /// untouched, and the state of this predictor does not change.
    pub fn try_update(&mut self, prediction: TagePrediction, outcome: Outcome,
        _target: usize) -> Result<(), UpdateRejected>
    {
        if let Err(error) = self.check_inflight(&prediction) {
            return Err(UpdateRejected { error, prediction });
        }
        self.inflight = None;

        if prediction.conditional {
            self.train(&prediction, outcome);
        }
        Ok(())
    }

    /// Like [`TagePredictor::try_predict`].
    ///
    /// Panics if the previous prediction has not been handed back to
    /// [`TagePredictor::update`].
    pub fn predict(&mut self, pc: usize, conditional: bool) -> TagePrediction {
        match self.try_predict(pc, conditional) {
            Ok(p) => p,
            Err(e) => panic!("{}", e),
        }
    }

    /// Like [`TagePredictor::try_update`].
    ///
    /// Panics if 'prediction' is not the most recent prediction made by
    /// this predictor, or if it was already used for an update.
    pub fn update(&mut self, prediction: TagePrediction, outcome: Outcome,
        target: usize)
    {
        if let Err(e) = self.try_update(prediction, outcome, target) {
            panic!("{}", e.error);
        }
    }
}
