
use bitvec::prelude::*;
use std::ops::Range;

use crate::Outcome;

/// Initial value of every folded history.
pub const FOLD_SEED: u32 = 0xA5A5_A5A5;

/// A circular register holding the most recent outcomes of conditional
/// branches.
///
/// Bits are addressed by age: bit 0 is the most recent outcome, bit 1 the
/// one before it, and so on. Before warm-up, all bits are zero.
#[derive(Clone, Debug)]
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,

    /// Position of the next write
    pos: usize,
}

// NOTE: This presents the bits in a format where the rightmost bit is the
// most recent outcome.
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.read(0..self.len()).iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        assert!(len.is_power_of_two());
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            pos: 0,
        }
    }

    pub fn len(&self) -> usize { self.data.len() }

    fn mask(&self) -> usize { self.data.len() - 1 }

    /// Return the outcome recorded 'back' branches ago.
    /// Ages beyond the length of the register wrap around.
    pub fn bit(&self, back: usize) -> bool {
        let pos = (self.pos + self.len() - 1 - (back & self.mask()))
            & self.mask();
        self.data[pos]
    }

    /// Append an outcome, discarding the oldest one.
    pub fn push(&mut self, outcome: Outcome) {
        let pos = self.pos;
        self.data.set(pos, outcome.into());
        self.pos = (pos + 1) & self.mask();
    }

    /// Return some range of bits, ordered from most to least recent.
    pub fn read(&self, range: Range<usize>) -> BitVec {
        range.map(|back| self.bit(back)).collect()
    }

    /// Fold the most recent 'len' bits into 32 bits.
    ///
    /// Starting from [`FOLD_SEED`], the accumulator is rotated left by one
    /// and XOR'ed with each bit, from the most recent to the oldest.
    pub fn fold(&self, len: usize) -> u32 {
        (0..len).fold(FOLD_SEED, |res, back| {
            res.rotate_left(1) ^ self.bit(back) as u32
        })
    }
}


/// Tracks [`HistoryRegister::fold`] for a fixed history length without
/// reading the whole window on every lookup.
///
/// Each folded bit 'i' (counting from the most recent) sits rotated left by
/// 'len - 1 - i'. When a new outcome arrives, every bit ages by one: the
/// oldest bit is cancelled out, everything else rotates right by one, and
/// the new bit enters at rotation 'len - 1'.
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    /// Number of history bits being folded
    len: usize,

    /// Folded history bits, without the seed
    data: u32,
}
impl FoldedHistoryRegister {
    pub fn new(len: usize) -> Self {
        Self { len, data: 0 }
    }

    /// The number of history bits being folded.
    pub fn len(&self) -> usize { self.len }

    /// Return the folded history.
    pub fn output(&self) -> u32 {
        FOLD_SEED.rotate_left((self.len % 32) as u32) ^ self.data
    }

    /// Account for 'outcome' being appended to 'ghr'.
    ///
    /// This must be called *before* the outcome is pushed, while the oldest
    /// bit in the window is still readable.
    pub fn update(&mut self, ghr: &HistoryRegister, outcome: Outcome) {
        if self.len == 0 {
            return;
        }
        let oldest = ghr.bit(self.len - 1) as u32;
        let newest = bool::from(outcome) as u32;
        self.data = (self.data ^ oldest).rotate_right(1)
            ^ newest.rotate_left(((self.len - 1) % 32) as u32);
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    #[test]
    fn push_and_wrap() {
        let mut ghr = HistoryRegister::new(8);
        assert_eq!(ghr.to_string(), "00000000");
        ghr.push(Outcome::T);
        ghr.push(Outcome::N);
        ghr.push(Outcome::T);
        assert!(ghr.bit(0));
        assert!(!ghr.bit(1));
        assert!(ghr.bit(2));
        assert_eq!(ghr.to_string(), "00000101");

        // After 8 more pushes, the first three are gone
        for _ in 0..8 {
            ghr.push(Outcome::N);
        }
        assert_eq!(ghr.to_string(), "00000000");
        assert!(ghr.read(0..8).not_any());
    }

    #[test]
    fn fold_cold_register() {
        let ghr = HistoryRegister::new(64);
        assert_eq!(ghr.fold(0), FOLD_SEED);
        assert_eq!(ghr.fold(1), FOLD_SEED.rotate_left(1));
        assert_eq!(ghr.fold(40), FOLD_SEED.rotate_left(8));
    }

    #[test]
    fn folded_register_tracks_fold() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut ghr = HistoryRegister::new(64);
        let lengths = [0, 1, 5, 31, 32, 33, 58, 64];
        let mut csr: Vec<FoldedHistoryRegister> = lengths.iter()
            .map(|len| FoldedHistoryRegister::new(*len))
            .collect();

        for _ in 0..1000 {
            let outcome = Outcome::from(rng.gen::<bool>());
            for c in csr.iter_mut() {
                c.update(&ghr, outcome);
            }
            ghr.push(outcome);
            for c in csr.iter() {
                assert_eq!(c.output(), ghr.fold(c.len()), "len={}", c.len());
            }
        }
    }
}
