//! Bounds-checked cursors over byte buffers.
//!
//! Every frame and response payload in this crate is walked through these instead of
//! indexing, so an overrun is always a typed error and never a panic.

use crate::error::{Error, Result};

/// Forward-only reader over a borrowed byte slice.
///
/// Running past the end yields `Error::Protocol(truncated)`, where `truncated` is the
/// message supplied at construction.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    truncated: &'static str,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8], truncated: &'static str) -> Self {
        Self {
            bytes,
            pos: 0,
            truncated,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(Error::Protocol(self.truncated))?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u24_le(&mut self) -> Result<u32> {
        let [b0, b1, b2] = self.array()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    pub(crate) fn u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(Error::Protocol(self.truncated))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Read an optional fixed-size trailing field; absent (or partially present) yields `None`.
    pub(crate) fn optional_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.remaining() < N {
            return None;
        }
        self.array().ok()
    }
}

/// Forward-only writer into a caller-supplied buffer.
#[derive(Debug)]
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn put_u8(&mut self, b: u8) -> Result<()> {
        self.put_slice(&[b])
    }

    pub(crate) fn put_u32_le(&mut self, v: u32) -> Result<()> {
        self.put_slice(&v.to_le_bytes())
    }

    pub(crate) fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.buf.len();
        let end = self.pos + bytes.len();
        if end > available {
            return Err(Error::Capacity {
                required: end,
                available,
            });
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Bytes written so far, starting at `start`.
    pub(crate) fn written_since(&self, start: usize) -> &[u8] {
        &self.buf[start..self.pos]
    }
}
