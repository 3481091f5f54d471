//! Hash functions used to index into and tag entries in a [`TageComponent`].
//!
//! Both functions mix (a) the program counter, (b) folded global history,
//! and (c) a per-component salt, so that two components rarely alias in
//! exactly the same way for the same branch.

use crate::predictor::tage::TageComponent;

/// Multiplier applied to the salt when forming a tag.
const TAG_SALT_MUL: u32 = 0x27D4_EB2D;

/// Fold a program counter value into 32 bits.
pub fn fold_pc(pc: usize) -> u32 {
    let pc = pc as u64;
    (pc ^ (pc >> 32)) as u32
}

/// Default salt for the tagged component with the given id.
pub fn default_salt(id: usize) -> u32 {
    let t = id as u32;
    0x9E37_79B9u32.wrapping_mul(t + 1) ^ 0x85EB_CA6Bu32.wrapping_add(t << 16)
}

/// History length folded into the tag of the component with the given id.
///
/// This differs from the index history length so that the index and tag
/// of an entry are not derived from exactly the same bits.
pub fn tag_history_len(id: usize, history_len: usize) -> usize {
    history_len ^ (id * 7)
}

/// Return a bitmask with the low 'bits' bits set.
pub fn mask(bits: usize) -> u32 {
    if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 }
}

/// Compute an index into some tagged component.
pub fn tage_index(comp: &TageComponent, pc: usize) -> usize {
    let pc = fold_pc(pc);
    let hist = comp.index_csr.output();
    let x = pc ^ pc.rotate_left((comp.id as u32 + 1) % 32) ^ hist ^ comp.salt;
    (x & mask(comp.cfg.index_bits)) as usize
}

/// Compute the tag for some tagged component.
pub fn tage_tag(comp: &TageComponent, pc: usize) -> u16 {
    let pc = fold_pc(pc);
    let hist = comp.tag_csr.output();
    let x = pc
        ^ (pc >> 7)
        ^ pc.rotate_left((13 + comp.id as u32) % 32)
        ^ hist
        ^ comp.salt.wrapping_mul(TAG_SALT_MUL);
    (x & mask(comp.cfg.tag_bits)) as u16
}
