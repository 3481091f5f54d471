//! Implementation of a saturating counter.

use serde::{Deserialize, Serialize};

use crate::Outcome;
use crate::predictor::StatefulPredictor;

/// Configuration for building a [`SaturatingCounter`].
///
/// The counter predicts 'taken' when its value is at least 'threshold'.
/// Both signed (ie. `-4..=3` around zero) and unsigned (ie. `0..=7` around
/// four) encodings are expressed this way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Smallest value
    pub min: i8,

    /// Largest value
    pub max: i8,

    /// Smallest value predicting 'taken'
    pub threshold: i8,

    /// Value after reset
    pub init: i8,
}
impl CounterConfig {
    /// 2-bit unsigned counter, initially weakly not-taken.
    pub const UNSIGNED_2BIT: Self = Self { min: 0, max: 3, threshold: 2, init: 1 };

    /// 3-bit signed counter, initially weakly not-taken.
    pub const SIGNED_3BIT: Self = Self { min: -4, max: 3, threshold: 0, init: -1 };

    /// 3-bit unsigned counter, initially weakly not-taken.
    pub const UNSIGNED_3BIT: Self = Self { min: 0, max: 7, threshold: 4, init: 3 };

    /// Returns 'true' if both directions have at least one state and the
    /// initial value is in range.
    pub fn is_valid(&self) -> bool {
        self.min < self.threshold
            && self.threshold <= self.max
            && (self.min..=self.max).contains(&self.init)
    }

    /// Number of bits needed to store a counter.
    pub fn storage_bits(&self) -> usize {
        let states = (self.max as i16 - self.min as i16 + 1) as usize;
        states.next_power_of_two().ilog2() as usize
    }

    pub fn build(self) -> SaturatingCounter {
        SaturatingCounter {
            cfg: self,
            ctr: self.init,
        }
    }
}

/// An N-bit saturating counter used to follow the behavior of a branch.
#[derive(Clone, Copy, Debug)]
pub struct SaturatingCounter {
    cfg: CounterConfig,
    ctr: i8,
}
impl SaturatingCounter {
    pub fn value(&self) -> i8 { self.ctr }

    pub fn increment(&mut self) {
        if self.ctr < self.cfg.max {
            self.ctr += 1;
        }
    }

    pub fn decrement(&mut self) {
        if self.ctr > self.cfg.min {
            self.ctr -= 1;
        }
    }

    /// Returns 'true' when the counter sits on either side of the boundary
    /// between 'taken' and 'not-taken'.
    pub fn is_weak(&self) -> bool {
        self.ctr == self.cfg.threshold || self.ctr == self.cfg.threshold - 1
    }

    /// Set the counter to the weakest state in the given direction.
    pub fn set_weak(&mut self, outcome: Outcome) {
        self.ctr = match outcome {
            Outcome::T => self.cfg.threshold,
            Outcome::N => self.cfg.threshold - 1,
        };
    }

}

impl StatefulPredictor for SaturatingCounter {
    fn predict(&self) -> Outcome {
        Outcome::from(self.ctr >= self.cfg.threshold)
    }
    fn reset(&mut self) {
        self.ctr = self.cfg.init;
    }
    fn update(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::T => self.increment(),
            Outcome::N => self.decrement(),
        }
    }
}
