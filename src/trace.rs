//! Branch traces used to drive a predictor.

pub mod synthetic;

pub use synthetic::*;

use std::path::Path;

use crate::branch::*;
use crate::error::TraceError;

/// A trace of branch records read from a file.
///
/// Each record is 24 bytes, little-endian: the program counter (8 bytes),
/// the target address (8 bytes), [`BranchFlags`] (4 bytes), and 4 bytes of
/// padding.
pub struct BinaryTrace {
    pub records: Vec<BranchRecord>,
    pub name: String,
}
impl BinaryTrace {
    /// Size of a record in bytes.
    pub const RECORD_SIZE: usize = 24;

    pub fn new(records: Vec<BranchRecord>, name: impl ToString) -> Self {
        Self { records, name: name.to_string() }
    }

    /// Create a [`BinaryTrace`] from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path.file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_bytes(&data, name)
    }

    /// Parse records from a buffer.
    pub fn from_bytes(data: &[u8], name: impl ToString)
        -> Result<Self, TraceError>
    {
        if data.len() % Self::RECORD_SIZE != 0 {
            return Err(TraceError::Truncated {
                len: data.len(), size: Self::RECORD_SIZE,
            });
        }

        let mut records = Vec::with_capacity(data.len() / Self::RECORD_SIZE);
        for chunk in data.chunks_exact(Self::RECORD_SIZE) {
            let word = |off: usize| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&chunk[off..off + 8]);
                u64::from_le_bytes(buf)
            };
            let mut fbuf = [0u8; 4];
            fbuf.copy_from_slice(&chunk[16..20]);
            let flags = BranchFlags(u32::from_le_bytes(fbuf));
            records.push(BranchRecord::from_flags(
                word(0) as usize, word(8) as usize, flags
            )?);
        }
        Ok(Self::new(records, name))
    }

    /// Serialize all records.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.records.len() * Self::RECORD_SIZE);
        for r in self.records.iter() {
            data.extend_from_slice(&(r.pc as u64).to_le_bytes());
            data.extend_from_slice(&(r.tgt as u64).to_le_bytes());
            data.extend_from_slice(&r.flags().0.to_le_bytes());
            data.extend_from_slice(&[0u8; 4]);
        }
        data
    }

    /// Write all records to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.records.len() }

    pub fn name(&self) -> &str { &self.name }

    /// Return a truncated slice of records
    pub fn as_slice_trunc(&self, limit: usize) -> &[BranchRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] {
        &self.records
    }
}
