use bytes::{BufMut, Bytes, BytesMut};

use crate::{error::Result, ext::UsizeExt};

// msgtype + length
const PREFIX: usize = 1 + 4;

/// A byte accumulating message writer.
///
/// Space for the message type and length is reserved up front, and filled by
/// [`wrap`][WriteBuffer::wrap] or [`wrap_untagged`][WriteBuffer::wrap_untagged],
/// the only place message length is computed.
#[derive(Debug)]
pub struct WriteBuffer {
    buf: BytesMut,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create buffer with `capacity` bytes of payload preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(PREFIX + capacity);
        buf.put_bytes(0, PREFIX);
        Self { buf }
    }

    /// Length of the payload written so far.
    pub fn len(&self) -> usize {
        self.buf.len() - PREFIX
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn put_bytes(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    /// postgres String must be nul terminated
    pub fn put_nul_bytes(&mut self, value: &[u8], terminate: bool) {
        self.buf.put_slice(value);
        if terminate {
            self.buf.put_u8(b'\0');
        }
    }

    /// Write an int16 element count.
    pub fn put_count(&mut self, count: usize) -> Result<()> {
        self.buf.put_i16(count.to_i16()?);
        Ok(())
    }

    /// Write an int32 length prefixed value, `None` is written as `-1`.
    pub fn put_field(&mut self, value: Option<&[u8]>) -> Result<()> {
        match value {
            Some(value) => {
                self.buf.put_i32(value.len().to_i32()?);
                self.buf.put_slice(value);
            },
            None => self.buf.put_i32(-1),
        }
        Ok(())
    }

    fn put_length(&mut self) -> Result<()> {
        // the length count includes itself, but not the message-type byte
        let len = (self.len() + 4).to_i32()?;
        self.buf[1..PREFIX].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    /// Finish the message as `[tag][length][payload]`.
    pub fn wrap(mut self, tag: u8) -> Result<Bytes> {
        self.put_length()?;
        self.buf[0] = tag;
        Ok(self.buf.freeze())
    }

    /// Finish the message as `[length][payload]`.
    ///
    /// For historical reasons, the startup family of messages have no initial
    /// message-type byte.
    pub fn wrap_untagged(mut self) -> Result<Bytes> {
        self.put_length()?;
        Ok(self.buf.freeze().slice(1..))
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wrap() {
        let mut w = WriteBuffer::new();
        w.put_nul_bytes(b"SELECT 1", true);
        assert_eq!(w.len(), 9);
        assert_eq!(w.wrap(b'Q').unwrap(), &b"Q\x00\x00\x00\x0dSELECT 1\0"[..]);

        assert_eq!(WriteBuffer::new().wrap(b'S').unwrap(), &b"S\x00\x00\x00\x04"[..]);
    }

    #[test]
    fn wrap_untagged() {
        let mut w = WriteBuffer::new();
        w.put_i32(80877103);
        assert_eq!(w.wrap_untagged().unwrap(), &b"\x00\x00\x00\x08\x04\xd2\x16\x2f"[..]);
    }

    #[test]
    fn fields() {
        let mut w = WriteBuffer::new();
        w.put_count(2).unwrap();
        w.put_field(None).unwrap();
        w.put_field(Some(b"")).unwrap();
        w.put_nul_bytes(b"raw", false);
        assert_eq!(
            w.wrap(b'D').unwrap(),
            &b"D\x00\x00\x00\x11\x00\x02\xff\xff\xff\xff\x00\x00\x00\x00raw"[..]
        );
    }

    #[test]
    fn count_too_large() {
        let mut w = WriteBuffer::new();
        assert!(matches!(
            w.put_count(40_000),
            Err(crate::ProtocolError::FieldTooLarge(40_000))
        ));
    }
}
