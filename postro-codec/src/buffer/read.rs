use std::io::{self, Read};

use bytes::{Buf, Bytes};

use super::{Payload, payload::body_len};
use crate::{
    common::trace,
    error::{ProtocolError, Result},
};

/// A cursor over an abstract byte source.
///
/// Holds at most one byte of lookahead, used to tell a tag-less startup
/// message apart from a tagged one. The reader is stateful for a single
/// stream and must not be shared between concurrent readers.
#[derive(Debug)]
pub struct ReadBuffer<R> {
    reader: R,
    peeked: Option<u8>,
}

impl<R: Read> ReadBuffer<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, peeked: None }
    }

    /// Returns the underlying reader.
    ///
    /// A byte taken by [`peek_u8`][ReadBuffer::peek_u8] and not yet read is lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let buf = match (self.peeked.take(), buf.split_first_mut()) {
            (Some(byte), Some((first, rest))) => {
                *first = byte;
                rest
            },
            (peeked, _) => {
                self.peeked = peeked;
                buf
            },
        };
        self.reader.read_exact(buf)?;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&mut self) -> Result<u8> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.read_u8()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok((&buf[..]).get_i32())
    }

    /// Read one byte and fails if it is not `expected`.
    pub fn read_tag(&mut self, expected: u8) -> Result<()> {
        match self.read_u8()? {
            found if found == expected => Ok(()),
            found => Err(ProtocolError::unexpected(expected, found)),
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Bytes are pulled incrementally, a large `n` does not allocate up front.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = Vec::new();
        if n > 0 {
            if let Some(byte) = self.peeked.take() {
                buf.push(byte);
            }
        }
        let rest = (n - buf.len()) as u64;
        (&mut self.reader).take(rest).read_to_end(&mut buf)?;
        if buf.len() != n {
            return Err(ProtocolError::UnexpectedEnd);
        }
        Ok(Bytes::from(buf))
    }

    /// Read up to and including the next nul byte.
    ///
    /// The terminator is excluded from the returned bytes when `strip` is true.
    pub fn read_nul_bytes(&mut self, strip: bool) -> Result<Bytes> {
        let mut buf = Vec::new();
        loop {
            match self.read_u8()? {
                b'\0' => break,
                byte => buf.push(byte),
            }
        }
        if !strip {
            buf.push(b'\0');
        }
        Ok(Bytes::from(buf))
    }

    /// Read an envelope length and exactly the payload it declares.
    ///
    /// The tag, if any, must already be consumed. Returns the payload and the
    /// declared length, which counts itself.
    pub fn read_envelope(&mut self) -> Result<(Payload, i32)> {
        let len = self.read_i32()?;
        let body_len = body_len(len)?;
        trace!("envelope length {len}");
        let body = self.read_exact(body_len)?;
        Ok((Payload::new(body), len))
    }
}

impl<R: Read> Read for ReadBuffer<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match (self.peeked.take(), buf.first_mut()) {
            (Some(byte), Some(first)) => {
                *first = byte;
                Ok(1)
            },
            (peeked, _) => {
                self.peeked = peeked;
                self.reader.read(buf)
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn peek_then_read() {
        let mut r = ReadBuffer::new(&b"\x00\x00\x00\x08abcdZ"[..]);
        assert_eq!(r.peek_u8().unwrap(), 0);
        assert_eq!(r.peek_u8().unwrap(), 0);
        let (body, len) = r.read_envelope().unwrap();
        assert_eq!(len, 8);
        assert_eq!(body.as_bytes(), "abcd");
        assert_eq!(r.read_u8().unwrap(), b'Z');
        assert!(matches!(r.read_u8(), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn envelope_length() {
        let mut r = ReadBuffer::new(&b"\x00\x00\x00\x00"[..]);
        assert!(matches!(r.read_envelope(), Err(ProtocolError::InvalidLength(0))));

        let mut r = ReadBuffer::new(&b"\xff\xff\xff\xff"[..]);
        assert!(matches!(r.read_envelope(), Err(ProtocolError::InvalidLength(-1))));

        let mut r = ReadBuffer::new(&b"\x00\x00\x00\x04"[..]);
        let (body, _) = r.read_envelope().unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn truncated_payload() {
        // declares 0x7fffffff, must not allocate it, nor return short
        let mut r = ReadBuffer::new(&b"\x7f\xff\xff\xffabc"[..]);
        assert!(matches!(r.read_envelope(), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn nul_bytes_and_tag() {
        let mut r = ReadBuffer::new(&b"Qselect\0"[..]);
        assert!(matches!(
            r.read_tag(b'P'),
            Err(ProtocolError::InvalidTag { expected: b'P', found: b'Q' })
        ));
        assert_eq!(r.read_nul_bytes(false).unwrap(), "select\0");
        assert!(matches!(r.read_nul_bytes(true), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn integers() {
        let mut r = ReadBuffer::new(&b"\xff\xfe\x00\x00\x04\xd2\x01"[..]);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert_eq!(r.read_i32().unwrap(), 1234);
        assert_eq!(r.read_exact(1).unwrap(), "\x01");
        assert_eq!(r.read_exact(0).unwrap(), "");
    }
}
