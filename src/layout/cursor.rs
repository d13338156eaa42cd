//! Bounds-checked cursor over segment bytes
//!
//! Every record read in the crate goes through [`ByteCursor::take`], so a
//! wrong stride or count surfaces as [`ShmError::Truncated`] instead of an
//! out-of-bounds access.

use crate::error::{Result, ShmError};

/// Read position over a byte slice with an upper bound
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    extent: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor over the whole slice
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            extent: bytes.len(),
        }
    }

    /// Cursor that refuses to read past `ceiling` even if the slice is longer
    pub fn with_ceiling(bytes: &'a [u8], ceiling: usize) -> Self {
        Self {
            bytes,
            offset: 0,
            extent: bytes.len().min(ceiling),
        }
    }

    /// Current offset from the start of the segment
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Readable bytes in total
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Bytes left before the extent
    pub fn remaining(&self) -> usize {
        self.extent - self.offset
    }

    /// Move to an absolute offset
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.extent {
            return Err(ShmError::truncated(offset, 0, self.extent));
        }
        self.offset = offset;
        Ok(())
    }

    /// Fail unless `len` bytes are readable at the current offset
    pub fn ensure(&self, len: usize) -> Result<()> {
        match self.offset.checked_add(len) {
            Some(end) if end <= self.extent => Ok(()),
            _ => Err(ShmError::truncated(self.offset, len, self.extent)),
        }
    }

    /// Read `len` bytes and advance past them
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.offset;
        self.offset += len;
        Ok(&self.bytes[start..self.offset])
    }

    /// Advance without reading
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Fail unless `count` elements of `stride` bytes are readable
    pub fn ensure_elements(&self, count: usize, stride: usize) -> Result<()> {
        match count.checked_mul(stride) {
            Some(len) => self.ensure(len),
            None => Err(ShmError::truncated(self.offset, usize::MAX, self.extent)),
        }
    }

    /// Advance past `count` elements of `stride` bytes each
    pub fn skip_elements(&mut self, count: usize, stride: usize) -> Result<()> {
        self.ensure_elements(count, stride)?;
        self.offset += count * stride;
        Ok(())
    }

    /// Copy a fixed-size array out of the segment
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }
}
