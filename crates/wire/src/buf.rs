//! Bounds-checked cursor and write helpers shared by every codec.

use uuid::Uuid;

use crate::error::{DecodeError, DecodeResult};

/// Read cursor over untrusted bytes. Every read checks the remaining length
/// first, so malformed input surfaces as [`DecodeError::Truncated`].
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let available = self.remaining();
        if available < n {
            return Err(DecodeError::Truncated {
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16_le(&mut self) -> DecodeResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub(crate) fn u16_be(&mut self) -> DecodeResult<u16> {
        self.array().map(u16::from_be_bytes)
    }

    pub(crate) fn u32_le(&mut self) -> DecodeResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn u32_be(&mut self) -> DecodeResult<u32> {
        self.array().map(u32::from_be_bytes)
    }

    pub(crate) fn i64_le(&mut self) -> DecodeResult<i64> {
        self.array().map(i64::from_le_bytes)
    }

    pub(crate) fn uuid(&mut self) -> DecodeResult<Uuid> {
        self.array().map(Uuid::from_bytes)
    }

    /// Reads a `u8`-prefixed UTF-8 string no longer than `max` bytes.
    pub(crate) fn str8(&mut self, field: &'static str, max: usize) -> DecodeResult<String> {
        let len = self.u8()? as usize;
        check_len(field, len, max)?;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    /// Reads a `u16` LE-prefixed byte body no longer than `max` bytes.
    pub(crate) fn body16(&mut self, field: &'static str, max: usize) -> DecodeResult<Vec<u8>> {
        let len = self.u16_le()? as usize;
        check_len(field, len, max)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Fails if any bytes remain unread.
    pub(crate) fn finish(self) -> DecodeResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

pub(crate) fn check_len(field: &'static str, declared: usize, max: usize) -> DecodeResult<()> {
    if declared > max {
        return Err(DecodeError::UnknownFieldLength {
            field,
            declared,
            max,
        });
    }
    Ok(())
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Writes a `u8`-prefixed string, truncated to `max` (itself at most 255).
pub(crate) fn put_str8(buf: &mut Vec<u8>, s: &str, max: usize) {
    let s = truncate_utf8(s, max.min(u8::MAX as usize));
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

/// Writes a `u16` LE-prefixed body, capped at `max` bytes.
pub(crate) fn put_body16(buf: &mut Vec<u8>, body: &[u8], max: usize) {
    let body = &body[..body.len().min(max).min(u16::MAX as usize)];
    buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
    buf.extend_from_slice(body);
}
