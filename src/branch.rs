//! Types for representing branches and branch outcomes.

use crate::error::TraceError;

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N = 0,
    /// Taken
    T = 1
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        match x {
            true => Self::T,
            false => Self::N
        }
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> bool {
        match x {
            Outcome::T => true,
            Outcome::N => false,
        }
    }
}

/// Representing different kinds of branch/control-flow instructions.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BranchKind {
    /// A direct conditional branch instruction.
    DirectBranch = BranchFlags::BRN_FLAG,

    /// A direct unconditional jump instruction.
    DirectJump   = BranchFlags::JMP_FLAG,

    /// An indirect unconditional jump instruction.
    IndirectJump = BranchFlags::JMP_FLAG | BranchFlags::IND_FLAG,

    /// A direct procedure call instruction.
    DirectCall   = BranchFlags::CALL_FLAG,

    /// An indirect procedure call instruction.
    IndirectCall = BranchFlags::CALL_FLAG | BranchFlags::IND_FLAG,

    /// A return instruction.
    Return       = BranchFlags::RET_FLAG | BranchFlags::IND_FLAG,
}
impl BranchKind {
    const DIRECT_BRANCH: u32 = BranchFlags::BRN_FLAG;
    const DIRECT_JUMP: u32 = BranchFlags::JMP_FLAG;
    const DIRECT_CALL: u32 = BranchFlags::CALL_FLAG;
    const INDIRECT_CALL: u32 = BranchFlags::CALL_FLAG | BranchFlags::IND_FLAG;
    const INDIRECT_JUMP: u32 = BranchFlags::JMP_FLAG | BranchFlags::IND_FLAG;
    const RETURN: u32 = BranchFlags::RET_FLAG | BranchFlags::IND_FLAG;

    /// Returns 'true' if only the direction of this kind of branch is
    /// subject to prediction.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::DirectBranch)
    }
}
impl TryFrom<u32> for BranchKind {
    type Error = TraceError;
    fn try_from(x: u32) -> Result<Self, TraceError> {
        match x & 0b01_1111 {
            Self::DIRECT_BRANCH => Ok(Self::DirectBranch),
            Self::DIRECT_JUMP   => Ok(Self::DirectJump),
            Self::DIRECT_CALL   => Ok(Self::DirectCall),
            Self::INDIRECT_JUMP => Ok(Self::IndirectJump),
            Self::INDIRECT_CALL => Ok(Self::IndirectCall),
            Self::RETURN        => Ok(Self::Return),
            bits => Err(TraceError::InvalidFlags(bits)),
        }
    }
}

/// Packed flags describing a [`BranchRecord`].
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchFlags(pub u32);
impl BranchFlags {
    const BRN_FLAG: u32   = 1 << 0;
    const JMP_FLAG: u32   = 1 << 1;
    const CALL_FLAG: u32  = 1 << 2;
    const RET_FLAG: u32   = 1 << 3;
    const IND_FLAG: u32   = 1 << 4;
    const TAKEN_FLAG: u32 = 1 << 5;

    pub fn new(kind: BranchKind, outcome: Outcome) -> Self {
        let kbits = kind as u32;
        let tbits = match outcome {
            Outcome::T => Self::TAKEN_FLAG,
            Outcome::N => 0,
        };
        Self(kbits | tbits)
    }

    pub fn is_brn(&self) -> bool { self.0 & Self::BRN_FLAG != 0 }
    pub fn is_jmp(&self) -> bool { self.0 & Self::JMP_FLAG != 0 }
    pub fn is_call(&self) -> bool { self.0 & Self::CALL_FLAG != 0 }
    pub fn is_ret(&self) -> bool { self.0 & Self::RET_FLAG != 0 }
    pub fn is_indirect(&self) -> bool { self.0 & Self::IND_FLAG != 0 }
    pub fn is_taken(&self) -> bool { self.0 & Self::TAKEN_FLAG != 0 }

    pub fn kind(&self) -> Result<BranchKind, TraceError> {
        BranchKind::try_from(self.0)
    }
}


/// A record of branch execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    /// The program counter value for this branch
    pub pc: usize,

    /// The target address evaluated for this branch
    pub tgt: usize,

    /// The type/kind of branch
    pub kind: BranchKind,

    /// The outcome evaluated for this branch
    pub outcome: Outcome,
}
impl BranchRecord {
    pub fn new(pc: usize, tgt: usize, kind: BranchKind, outcome: Outcome)
        -> Self
    {
        Self { pc, tgt, kind, outcome }
    }

    /// Build a record from its packed flags.
    pub fn from_flags(pc: usize, tgt: usize, flags: BranchFlags)
        -> Result<Self, TraceError>
    {
        let kind = flags.kind()?;
        Ok(Self::new(pc, tgt, kind, Outcome::from(flags.is_taken())))
    }

    pub fn flags(&self) -> BranchFlags {
        BranchFlags::new(self.kind, self.outcome)
    }

    /// Returns 'true' if this is a conditional instruction.
    pub fn is_conditional(&self) -> bool {
        self.kind.is_conditional()
    }
}
