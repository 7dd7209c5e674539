//! Little-endian cursor over a tile payload.

use crate::DecodeError;

/// Sequential little-endian reader that reports truncation with context.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                field,
                offset: self.pos,
                expected: len,
                actual: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    pub(crate) fn f32(&mut self, field: &'static str) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.array(field)?))
    }

    pub(crate) fn f64(&mut self, field: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.array(field)?))
    }

    /// Read `count` little-endian `u16` values, checking the length up front.
    pub(crate) fn u16_array(
        &mut self,
        count: u32,
        field: &'static str,
    ) -> Result<Vec<u16>, DecodeError> {
        let bytes = self.take(byte_len(count, 2, field)?, field)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read `count` indices that are 4 bytes wide when `wide`, else 2.
    pub(crate) fn index_array(
        &mut self,
        count: u32,
        wide: bool,
        field: &'static str,
    ) -> Result<Vec<u32>, DecodeError> {
        if !wide {
            return Ok(self
                .u16_array(count, field)?
                .into_iter()
                .map(u32::from)
                .collect());
        }
        let bytes = self.take(byte_len(count, 4, field)?, field)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

fn byte_len(count: u32, width: usize, field: &'static str) -> Result<usize, DecodeError> {
    usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(width))
        .ok_or(DecodeError::CountOverflow { field, count })
}
