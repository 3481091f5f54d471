//! Generating synthetic traces from branches with known behavior.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::branch::*;
use crate::error::TraceError;

/// A pre-determined pattern of outcomes associated with a branch.
#[derive(Clone, Debug, PartialEq)]
pub enum BranchPattern {
    /// A branch whose outcome is always 'taken'.
    AlwaysTaken,

    /// A branch whose outcome is always 'not-taken'.
    NeverTaken,

    /// A branch whose outcome is only periodically "taken".
    /// Otherwise, the branch is "not-taken" by default.
    TakenPeriodic(usize),

    /// A branch whose outcome is only periodically "not-taken".
    /// Otherwise, the branch is "taken" by default.
    NotTakenPeriodic(usize),

    /// A branch with an arbitrary repeating pattern of outcomes.
    Pattern(Vec<Outcome>),

    /// A branch which is taken with some probability.
    Biased(f64),
}
impl BranchPattern {
    /// Returns an error if this pattern cannot produce an outcome.
    pub fn validate(&self) -> Result<(), TraceError> {
        match self {
            Self::TakenPeriodic(0) | Self::NotTakenPeriodic(0) => {
                Err(TraceError::InvalidPattern("period must be non-zero"))
            },
            Self::Pattern(p) if p.is_empty() => {
                Err(TraceError::InvalidPattern("pattern is empty"))
            },
            Self::Biased(p) if !(0.0..=1.0).contains(p) => {
                Err(TraceError::InvalidPattern("probability is outside 0..=1"))
            },
            _ => Ok(()),
        }
    }

    /// Given the number of times the branch was already executed, generate
    /// the next outcome. Panics if [`BranchPattern::validate`] fails.
    pub fn outcome(&self, ctr: usize, rng: &mut impl Rng) -> Outcome {
        match self {
            Self::AlwaysTaken => Outcome::T,
            Self::NeverTaken => Outcome::N,
            Self::TakenPeriodic(p) => {
                if ctr % p == (p - 1) { Outcome::T } else { Outcome::N }
            },
            Self::NotTakenPeriodic(p) => {
                if ctr % p == (p - 1) { Outcome::N } else { Outcome::T }
            },
            Self::Pattern(p) => p[ctr % p.len()],
            Self::Biased(p) => Outcome::from(rng.gen_bool(*p)),
        }
    }
}

/// A branch instruction in a synthetic program.
#[derive(Clone, Debug)]
pub struct BranchSite {
    pub pc: usize,
    pub tgt: usize,
    pub kind: BranchKind,
    pub pattern: BranchPattern,

    /// Number of times this branch was executed
    ctr: usize,
}

/// A loop over a list of branches, each with its own [`BranchPattern`].
///
/// Every iteration of the loop executes each branch once, in order.
pub struct SyntheticTrace {
    sites: Vec<BranchSite>,
    rng: StdRng,
    cursor: usize,
}
impl SyntheticTrace {
    pub fn new(seed: u64) -> Self {
        Self {
            sites: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            cursor: 0,
        }
    }

    /// Create a program with 'num_sites' randomly chosen branches.
    /// Most of them are conditional.
    pub fn random(seed: u64, num_sites: usize) -> Self {
        let mut res = Self::new(seed);
        let mut pc = 0x0040_0000;
        for _ in 0..num_sites {
            pc += res.rng.gen_range(1..64usize) * 4;
            let tgt = pc + res.rng.gen_range(1..1024usize) * 4;
            if res.rng.gen_bool(0.1) {
                let kind = *[
                    BranchKind::DirectJump,
                    BranchKind::DirectCall,
                    BranchKind::Return,
                ].choose(&mut res.rng).unwrap_or(&BranchKind::DirectJump);
                res.push_site(pc, tgt, kind, BranchPattern::AlwaysTaken);
                continue;
            }

            let pattern = match res.rng.gen_range(0..6) {
                0 => BranchPattern::AlwaysTaken,
                1 => BranchPattern::NeverTaken,
                2 => BranchPattern::TakenPeriodic(res.rng.gen_range(2..16)),
                3 => BranchPattern::NotTakenPeriodic(res.rng.gen_range(2..16)),
                4 => {
                    let len = res.rng.gen_range(2..12);
                    BranchPattern::Pattern((0..len)
                        .map(|_| Outcome::from(res.rng.gen::<bool>()))
                        .collect())
                },
                _ => BranchPattern::Biased(res.rng.gen_range(0.05..0.95)),
            };
            res.push_site(pc, tgt, BranchKind::DirectBranch, pattern);
        }
        res
    }

    /// Add a branch to the end of the loop.
    pub fn add_site(&mut self, pc: usize, tgt: usize, kind: BranchKind,
        pattern: BranchPattern) -> Result<(), TraceError>
    {
        pattern.validate()?;
        self.push_site(pc, tgt, kind, pattern);
        Ok(())
    }

    fn push_site(&mut self, pc: usize, tgt: usize, kind: BranchKind,
        pattern: BranchPattern)
    {
        self.sites.push(BranchSite { pc, tgt, kind, pattern, ctr: 0 });
    }

    pub fn sites(&self) -> &[BranchSite] { &self.sites }

    /// Generate the next 'n' records.
    pub fn generate(&mut self, n: usize) -> Vec<BranchRecord> {
        self.by_ref().take(n).collect()
    }
}
impl Iterator for SyntheticTrace {
    type Item = BranchRecord;
    fn next(&mut self) -> Option<BranchRecord> {
        if self.sites.is_empty() {
            return None;
        }
        let site = &mut self.sites[self.cursor];
        let outcome = site.pattern.outcome(site.ctr, &mut self.rng);
        site.ctr += 1;
        let record = BranchRecord::new(site.pc, site.tgt, site.kind, outcome);
        self.cursor = (self.cursor + 1) % self.sites.len();
        Some(record)
    }
}
