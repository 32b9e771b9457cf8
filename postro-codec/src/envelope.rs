//! Message framing shared by every postgres message.
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┓
//! ┃ Ty ┃       Length      ┃ Body ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ u8 ┃        i32        ┃ [u8] ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┛
//! ```
//!
//! The startup family (startup, SSL request, cancel request) omits the
//! message-type byte. A message-type is never zero, so a leading zero byte is
//! the high byte of a tag-less length.
use std::io::Read;

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    buffer::{Payload, ReadBuffer, WriteBuffer, body_len},
    common::trace,
    error::Result,
    ext::UsizeExt,
};

/// Upper bound of a single reservation made by [`Envelope::decode`].
const RESERVE_LIMIT: usize = 8 * 1024;

/// A complete, undecoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message type, `None` for the startup family.
    pub tag: Option<u8>,
    /// Declared length, including itself but not the tag.
    pub length: i32,
    /// Message body, exactly `length - 4` bytes.
    pub payload: Bytes,
}

impl Envelope {
    /// Create a tagged envelope around `payload`.
    pub fn new(tag: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let length = (payload.len() + 4).to_i32()?;
        Ok(Self { tag: Some(tag), length, payload })
    }

    /// Create a tag-less envelope around `payload`.
    pub fn untagged(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let length = (payload.len() + 4).to_i32()?;
        Ok(Self { tag: None, length, payload })
    }

    /// Read one complete envelope from `reader`.
    ///
    /// The header is read first, then exactly the declared amount of payload.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Self::read_from(&mut ReadBuffer::new(reader))
    }

    pub(crate) fn read_from<R: Read>(reader: &mut ReadBuffer<R>) -> Result<Self> {
        let tag = match reader.peek_u8()? {
            0 => None,
            _ => Some(reader.read_u8()?),
        };
        let (payload, length) = reader.read_envelope()?;
        Ok(Self { tag, length, payload: payload.as_bytes().clone() })
    }

    /// Split one complete envelope off the front of `buf`.
    ///
    /// Returns `Ok(None)` and reserves part of the missing capacity when
    /// `buf` does not hold a complete message yet.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        let (tag, header) = match first {
            0 => (None, 4),
            tag => (Some(tag), 5),
        };

        let Some(mut len) = buf.get(header - 4..header) else {
            return Ok(None);
        };

        let length = len.get_i32();
        let total = header + body_len(length)?;

        if buf.len() < total {
            // the declared length is untrusted until the bytes arrive
            buf.reserve((total - buf.len()).min(RESERVE_LIMIT));
            return Ok(None);
        }

        let mut frame = buf.split_to(total).freeze();
        frame.advance(header);
        trace!("envelope {:?} length {length}", tag.map(char::from));

        Ok(Some(Self { tag, length, payload: frame }))
    }

    /// Read one complete envelope from an async `reader`.
    #[cfg(feature = "tokio")]
    pub async fn read_async<R>(reader: &mut R) -> Result<Self>
    where
        R: tokio::io::AsyncRead + Unpin + ?Sized,
    {
        use tokio::io::AsyncReadExt;

        let first = reader.read_u8().await?;
        let (tag, length) = match first {
            0 => {
                let mut rest = [0u8; 3];
                reader.read_exact(&mut rest).await?;
                (None, i32::from_be_bytes([first, rest[0], rest[1], rest[2]]))
            },
            tag => (Some(tag), reader.read_i32().await?),
        };

        let body_len = body_len(length)?;
        let mut payload = Vec::new();
        reader.take(body_len as u64).read_to_end(&mut payload).await?;
        if payload.len() != body_len {
            return Err(crate::ProtocolError::UnexpectedEnd);
        }

        Ok(Self { tag, length, payload: payload.into() })
    }

    /// Returns a cursor over the payload.
    pub fn payload(&self) -> Payload {
        Payload::new(self.payload.clone())
    }

    /// Consume the envelope into a cursor over the payload.
    pub fn into_payload(self) -> Payload {
        Payload::new(self.payload)
    }

    /// Write the envelope back into its wire representation.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = WriteBuffer::with_capacity(self.payload.len());
        buf.put_bytes(&self.payload);
        match self.tag {
            Some(tag) => buf.wrap(tag),
            None => buf.wrap_untagged(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ProtocolError;

    #[test]
    fn read_tagged() {
        let raw = b"Z\x00\x00\x00\x05I";
        let env = Envelope::read(&raw[..]).unwrap();
        assert_eq!(env.tag, Some(b'Z'));
        assert_eq!(env.length, 4 + env.payload.len() as i32);
        assert_eq!(env.payload, "I");
        assert_eq!(env.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn read_untagged() {
        let raw = b"\x00\x00\x00\x08\x04\xd2\x16\x2f";
        let env = Envelope::read(&raw[..]).unwrap();
        assert_eq!(env.tag, None);
        assert_eq!(env.length, 8);
        assert_eq!(env.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn read_empty() {
        assert!(matches!(Envelope::read(&b""[..]), Err(ProtocolError::UnexpectedEnd)));
        assert!(matches!(Envelope::read(&b"Z\x00\x00"[..]), Err(ProtocolError::UnexpectedEnd)));
        assert!(matches!(
            Envelope::read(&b"Z\x00\x00\x00\x01"[..]),
            Err(ProtocolError::InvalidLength(1))
        ));
    }

    #[test]
    fn decode_incremental() {
        let raw = b"1\x00\x00\x00\x04Z\x00\x00\x00\x05I";
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&raw[..3]);
        assert_eq!(Envelope::decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&raw[3..8]);
        let env = Envelope::decode(&mut buf).unwrap().unwrap();
        assert_eq!(env, Envelope::new(b'1', Bytes::new()).unwrap());
        assert_eq!(Envelope::decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&raw[8..]);
        let env = Envelope::decode(&mut buf).unwrap().unwrap();
        assert_eq!(env.tag, Some(b'Z'));
        assert_eq!(env.payload, "I");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_reserve_bounded() {
        let mut buf = BytesMut::from(&b"D\x7f\xff\xff\xff"[..]);
        assert_eq!(Envelope::decode(&mut buf).unwrap(), None);
        assert!(buf.capacity() <= 2 * RESERVE_LIMIT);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn decode_invalid_length() {
        let mut buf = BytesMut::from(&b"D\xff\xff\xff\xff"[..]);
        assert!(matches!(Envelope::decode(&mut buf), Err(ProtocolError::InvalidLength(-1))));
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn read_async() {
        let mut raw = &b"K\x00\x00\x00\x0c\x00\x00\x04\xd2\x00\x00\x04\xd2"[..];
        let env = Envelope::read_async(&mut raw).await.unwrap();
        assert_eq!(env.tag, Some(b'K'));
        assert_eq!(env.payload.len(), 8);

        let mut raw = &b"K\x00\x00\x00\x0c\x00\x00"[..];
        assert!(matches!(Envelope::read_async(&mut raw).await, Err(ProtocolError::UnexpectedEnd)));
    }
}
