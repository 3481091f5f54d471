
use crate::Outcome;
use crate::history::*;
use crate::predictor::*;
use crate::predictor::tage::hash;

/// The base component in a [`TagePredictor`]: an untagged table of
/// saturating counters indexed by the program counter.
#[derive(Clone, Debug)]
pub struct TageBaseComponent {
    pub cfg: TageBaseConfig,

    /// A table of saturating counters
    pub data: Vec<SaturatingCounter>,
}
impl PredictorTable for TageBaseComponent {
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.cfg.size() }

    fn get_index(&self, pc: usize) -> usize {
        pc & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingCounter {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingCounter {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}


/// An entry in some [`TageComponent`].
///
/// There is no valid bit: a freshly-built entry has tag zero, and a lookup
/// whose computed tag is also zero will hit on it.
#[derive(Clone, Debug)]
pub struct TageEntry {
    /// State machine tracking a branch outcome
    pub ctr: SaturatingCounter,

    /// The number of bits in the 'useful' counter
    pub useful_bits: usize,

    /// The 'useful' counter, used to determine when the entry is
    /// eligible to be replaced
    pub useful: u8,

    /// Tag associated with this entry
    pub tag: u16,
}
impl TageEntry {
    pub fn new(ctr: SaturatingCounter, useful_bits: usize) -> Self {
        Self { ctr, useful_bits, useful: 0, tag: 0 }
    }

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    /// Returns true if the provided tag matches this entry.
    pub fn tag_matches(&self, tag: u16) -> bool {
        self.tag == tag
    }

    fn max_useful(&self) -> u8 {
        ((1u16 << self.useful_bits) - 1) as u8
    }

    /// Increment the 'useful' counter.
    pub fn increment_useful(&mut self) {
        if self.useful < self.max_useful() {
            self.useful += 1;
        }
    }

    /// Decrement the 'useful' counter.
    pub fn decrement_useful(&mut self) {
        self.useful = self.useful.saturating_sub(1);
    }

    /// Move the 'useful' counter toward whether 'outcome' was predicted.
    pub fn update_useful(&mut self, predicted: Outcome, outcome: Outcome) {
        if predicted == outcome {
            self.increment_useful();
        } else {
            self.decrement_useful();
        }
    }

    /// Give this entry to a new branch: take the new tag, predict 'outcome'
    /// with the weakest confidence, and start out as not useful.
    pub fn replace(&mut self, tag: u16, outcome: Outcome) {
        self.tag = tag;
        self.ctr.set_weak(outcome);
        self.useful = 0;
    }
}

/// A tagged component in a [`TagePredictor`].
#[derive(Clone, Debug)]
pub struct TageComponent {
    /// Position of this component (by increasing history length)
    pub id: usize,

    pub cfg: TageComponentConfig,

    /// Salt mixed into indexes and tags
    pub salt: u32,

    /// Table of entries
    pub data: Vec<TageEntry>,

    /// Folded global history used to form an index
    pub index_csr: FoldedHistoryRegister,

    /// Folded global history used to form a tag
    pub tag_csr: FoldedHistoryRegister,
}
impl TageComponent {
    pub fn num_useful_entries(&self) -> usize {
        self.data.iter().filter(|e| e.useful != 0).count()
    }

    /// Decrement the 'useful' counter for all entries in this component.
    pub fn age_useful_bits(&mut self) {
        for entry in self.data.iter_mut() {
            entry.decrement_useful();
        }
    }

    /// Update the folded history registers to account for 'outcome' being
    /// appended to 'ghr'. This must happen before 'ghr' is updated.
    pub fn update_history(&mut self, ghr: &HistoryRegister, outcome: Outcome) {
        self.index_csr.update(ghr, outcome);
        self.tag_csr.update(ghr, outcome);
    }
}

impl PredictorTable for TageComponent {
    type Entry = TageEntry;

    fn size(&self) -> usize { self.cfg.size() }

    fn get_index(&self, pc: usize) -> usize {
        hash::tage_index(self, pc) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &TageEntry {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut TageEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for TageComponent {
    fn get_tag(&self, pc: usize) -> u16 {
        hash::tage_tag(self, pc)
    }
}
