//! Guest memory access for client-side vertex and index arrays.
//!
//! When no buffer object is bound, guest array pointers are guest addresses. The emulator
//! supplies an implementation backed by its memory system; [`VecGuestMemory`] is enough for
//! tests and tools.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    #[error("guest memory read out of bounds (gpa=0x{gpa:x}, len={len})")]
    OutOfBounds { gpa: u64, len: usize },
    #[error("failed to allocate {len} bytes for a guest memory read")]
    AllocationFailed { len: usize },
}

pub trait GuestMemory {
    fn read(&self, gpa: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError>;

    /// Read `len` bytes starting at `gpa` into a fresh vector.
    ///
    /// `len` is guest controlled, so the buffer is allocated fallibly. Implementations that know
    /// their size should override this and reject out-of-range reads before allocating.
    fn read_vec(&self, gpa: u64, len: usize) -> Result<Vec<u8>, GuestMemoryError> {
        let mut out = Vec::new();
        out.try_reserve_exact(len)
            .map_err(|_| GuestMemoryError::AllocationFailed { len })?;
        out.resize(len, 0);
        self.read(gpa, &mut out)?;
        Ok(out)
    }
}

/// A simple in-memory guest memory implementation backed by a single `Vec<u8>`.
///
/// The address space starts at GPA 0.
#[derive(Debug, Clone)]
pub struct VecGuestMemory {
    data: Vec<u8>,
}

impl VecGuestMemory {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            data: vec![0u8; size_bytes],
        }
    }

    pub fn write(&mut self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        let range = checked_range(gpa, src.len(), self.data.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&self, gpa: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        let range = checked_range(gpa, dst.len(), self.data.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn read_vec(&self, gpa: u64, len: usize) -> Result<Vec<u8>, GuestMemoryError> {
        let range = checked_range(gpa, len, self.data.len())?;
        Ok(self.data[range].to_vec())
    }
}

fn checked_range(
    gpa: u64,
    len: usize,
    size: usize,
) -> Result<std::ops::Range<usize>, GuestMemoryError> {
    let oob = GuestMemoryError::OutOfBounds { gpa, len };
    let start: usize = gpa.try_into().map_err(|_| oob.clone())?;
    let end = start.checked_add(len).ok_or_else(|| oob.clone())?;
    if end > size {
        return Err(oob);
    }
    Ok(start..end)
}
