use bytes::{Buf, Bytes};

use crate::error::{ProtocolError, Result};

/// A bounds checked cursor over the body of a single message.
///
/// Decoders only ever see a [`Payload`] scoped to their own envelope, so no
/// read can cross into the next message on the stream.
#[derive(Debug, Clone)]
pub struct Payload {
    body: Bytes,
    length: i32,
}

impl Payload {
    pub fn new(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let length = i32::try_from(body.len() + 4).unwrap_or(i32::MAX);
        Self { body, length }
    }

    /// Length declared by the enclosing envelope, including itself.
    pub fn declared_length(&self) -> i32 {
        self.length
    }

    /// Remaining unread bytes.
    pub fn remaining(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns the unread bytes without advancing.
    pub fn as_bytes(&self) -> &Bytes {
        &self.body
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.body.len() < n {
            return Err(ProtocolError::UnexpectedEnd);
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.body.get_u8())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.body.get_i16())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.body.get_i32())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.body.get_u32())
    }

    /// Read the next int32 without advancing.
    pub fn peek_i32(&self) -> Result<i32> {
        self.ensure(4)?;
        Ok((&self.body[..4]).get_i32())
    }

    /// Read one byte and fails if it is not `expected`.
    pub fn read_tag(&mut self, expected: u8) -> Result<()> {
        match self.read_u8()? {
            found if found == expected => Ok(()),
            found => Err(ProtocolError::unexpected(expected, found)),
        }
    }

    /// Read exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        Ok(self.body.split_to(n))
    }

    /// Read up to and including the next nul byte.
    ///
    /// The terminator is excluded from the returned bytes when `strip` is true.
    pub fn read_nul_bytes(&mut self, strip: bool) -> Result<Bytes> {
        let Some(end) = memchr::memchr(b'\0', &self.body) else {
            return Err(ProtocolError::UnexpectedEnd);
        };
        let mut me = self.body.split_to(end + 1);
        if strip {
            me.truncate(end);
        }
        Ok(me)
    }

    /// Read a nul terminated string, excluding the terminator.
    pub fn read_nul_string(&mut self) -> Result<Bytes> {
        self.read_nul_bytes(true)
    }

    /// Read an int16 element count, which can not be negative.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i16()?;
        usize::try_from(count).map_err(|_| ProtocolError::InvalidLength(count.into()))
    }

    /// Read an int32 length prefixed value, where `-1` denotes NULL.
    pub fn read_field(&mut self) -> Result<Option<Bytes>> {
        match self.read_i32()? {
            -1 => Ok(None),
            len => {
                let len = usize::try_from(len).map_err(|_| ProtocolError::InvalidLength(len))?;
                self.read_exact(len).map(Some)
            },
        }
    }

    /// Consume the rest of the payload.
    pub fn read_to_end(&mut self) -> Bytes {
        std::mem::take(&mut self.body)
    }

    /// Read a nested envelope length and its payload.
    ///
    /// Returns the scoped payload and the declared length.
    pub fn read_envelope(&mut self) -> Result<(Payload, i32)> {
        let len = self.read_i32()?;
        let body_len = body_len(len)?;
        Ok((Payload::new(self.read_exact(body_len)?), len))
    }

    /// Fails with [`ProtocolError::InvalidLength`] unless exactly `n` bytes remain.
    ///
    /// The reported length is the one the enclosing envelope declared.
    pub fn expect_remaining(&self, n: usize) -> Result<()> {
        if self.body.len() != n {
            return Err(ProtocolError::InvalidLength(self.length));
        }
        Ok(())
    }

    /// Fails with [`ProtocolError::InvalidLength`] if any byte is left unread.
    pub fn finish(&self) -> Result<()> {
        self.expect_remaining(0)
    }
}

/// Payload length of an envelope declaring `len`, which counts itself.
pub(crate) fn body_len(len: i32) -> Result<usize> {
    match len.checked_sub(4).map(usize::try_from) {
        Some(Ok(body)) => Ok(body),
        _ => Err(ProtocolError::InvalidLength(len)),
    }
}

impl From<Bytes> for Payload {
    fn from(body: Bytes) -> Self {
        Self::new(body)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounds_checked() {
        let mut p = Payload::new(&b"\x00\x01\x02"[..]);
        assert_eq!(p.read_i16().unwrap(), 1);
        assert!(matches!(p.read_i32(), Err(ProtocolError::UnexpectedEnd)));
        // failed read does not advance
        assert_eq!(p.read_u8().unwrap(), 2);
        assert!(matches!(p.read_u8(), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn nul_bytes() {
        let mut p = Payload::new(&b"user\0alice\0tail"[..]);
        assert_eq!(p.read_nul_bytes(true).unwrap(), "user");
        assert_eq!(p.read_nul_bytes(false).unwrap(), "alice\0");
        assert!(matches!(p.read_nul_bytes(true), Err(ProtocolError::UnexpectedEnd)));
        assert_eq!(p.read_to_end(), "tail");
        assert!(p.is_empty());
    }

    #[test]
    fn fields() {
        let mut p = Payload::new(&b"\xff\xff\xff\xff\x00\x00\x00\x00\x00\x00\x00\x02hi\xff\xff\xff\xfe"[..]);
        assert_eq!(p.read_field().unwrap(), None);
        assert_eq!(p.read_field().unwrap(), Some(Bytes::new()));
        assert_eq!(p.read_field().unwrap(), Some(Bytes::from_static(b"hi")));
        assert!(matches!(p.read_field(), Err(ProtocolError::InvalidLength(-2))));
    }

    #[test]
    fn negative_count() {
        let mut p = Payload::new(&b"\xff\xfe"[..]);
        assert!(matches!(p.read_count(), Err(ProtocolError::InvalidLength(-2))));
    }

    #[test]
    fn nested_envelope() {
        let mut p = Payload::new(&b"\x00\x00\x00\x06hi!"[..]);
        let (body, len) = p.read_envelope().unwrap();
        assert_eq!(len, 6);
        assert_eq!(body.as_bytes(), "hi");
        assert_eq!(p.remaining(), 1);

        let mut p = Payload::new(&b"\x00\x00\x00\x03"[..]);
        assert!(matches!(p.read_envelope(), Err(ProtocolError::InvalidLength(3))));

        let mut p = Payload::new(&b"\x00\x00\x00\x09abc"[..]);
        assert!(matches!(p.read_envelope(), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn leftover_reports_declared_length() {
        let mut p = Payload::new(&b"\x00\x00\x00\x01xy"[..]);
        assert_eq!(p.declared_length(), 10);
        assert_eq!(p.read_i32().unwrap(), 1);
        assert!(matches!(p.finish(), Err(ProtocolError::InvalidLength(10))));
        assert!(matches!(p.expect_remaining(1), Err(ProtocolError::InvalidLength(10))));
        p.read_to_end();
        assert!(p.finish().is_ok());
    }
}
