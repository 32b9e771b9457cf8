//! Postgres Frontend and Backend Protocol
//!
//! Docs here mostly quoted from the official postgres documentation.
//!
//! ## Messaging Overview
//!
//! All communication is through a stream of messages. The first byte of a message identifies the message type,
//! and the next four bytes specify the length of the rest of the message (this length count includes itself,
//! but not the message-type byte). The remaining contents of the message are determined by the message type.
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┓
//! ┃ Ty ┃       Length      ┃ Body ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ u8 ┃        i32        ┃ [u8] ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ 43 ┃ 00 | 00 | 00 | 32 ┃  ..  ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┛
//! ```
//!
//! For historical reasons, the very first message sent by the client (the startup message)
//! has no initial message-type byte, see [`startup`].
//!
//! Several message types share the same byte, e.g. `D` is [`Describe`] when sent by the frontend
//! and [`DataRow`] when sent by the backend. Which one applies depends on the direction, which is
//! captured by the [`Frontend`] and [`Backend`] marker traits.
//!
//! ## [`Format`][PgFormat] and Format Codes
//!
//! Data of a particular data type might be transmitted in any of several different formats.
//! As of PostgreSQL 7.4 the only supported formats are “text” and “binary”. Text has format
//! code zero, and Binary has format code one.
//!
//! <https://www.postgresql.org/docs/17/protocol-overview.html>
use std::{fmt, io};

use bytes::Bytes;

use crate::{
    buffer::{Payload, ReadBuffer, WriteBuffer},
    envelope::Envelope,
    error::{ProtocolError, Result},
};

/// A type that can be decoded from and encoded into a tagged postgres message.
pub trait Message: Sized + fmt::Debug {
    /// Message type.
    const MSGTYPE: u8;

    /// Decode the message body.
    ///
    /// `body` is scoped to exactly the message payload.
    fn decode(body: &mut Payload) -> Result<Self>;

    /// Write the message body, without message type and length.
    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()>;

    /// Decode the message body, bytes left unread are an [`InvalidLength`][ProtocolError::InvalidLength].
    fn decode_exact(body: &mut Payload) -> Result<Self> {
        let message = Self::decode(body)?;
        body.finish()?;
        Ok(message)
    }

    /// Encode the complete message, including message type and length.
    fn encode(&self) -> Result<Bytes> {
        let mut buf = WriteBuffer::new();
        self.encode_body(&mut buf)?;
        buf.wrap(Self::MSGTYPE)
    }

    /// Write the complete message to `writer`, returns the amount of bytes written.
    fn write_to<W: io::Write>(&self, mut writer: W) -> Result<usize> {
        let bytes = self.encode()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Read exactly one message of this type from `reader`.
    fn parse<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = ReadBuffer::new(reader);
        reader.read_tag(Self::MSGTYPE)?;
        let (mut body, _) = reader.read_envelope()?;
        Self::decode_exact(&mut body)
    }

    /// Decode the message from an already framed [`Envelope`].
    fn from_envelope(envelope: Envelope) -> Result<Self> {
        match envelope.tag {
            Some(tag) if tag == Self::MSGTYPE => Self::decode_exact(&mut envelope.into_payload()),
            found => Err(ProtocolError::unexpected(Self::MSGTYPE, found.unwrap_or(0))),
        }
    }
}

/// Marker for messages sent by the frontend (client).
pub trait Frontend: Message { }

/// Marker for messages sent by the backend (server).
pub trait Backend: Message { }

/// Postgres object identifier.
pub type Oid = u32;

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal, $($dir:ident),*;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl $crate::postgres::Message for $name {
            const MSGTYPE: u8 = $ty;

            fn decode(body: &mut $crate::buffer::Payload) -> $crate::Result<Self> {
                body.expect_remaining(0)?;
                Ok(Self)
            }

            fn encode_body(&self, _: &mut $crate::buffer::WriteBuffer) -> $crate::Result<()> {
                Ok(())
            }
        }

        $(impl $crate::postgres::$dir for $name { })*
    )*};
}

mod pg_format;

pub mod authentication;
pub mod startup;
pub mod frontend;
pub mod backend;
pub mod password;
pub mod row;
pub mod notice;
pub mod copy;

pub use pg_format::PgFormat;

pub use authentication::{Authentication, AuthenticationMethod, SaslMechanism, SaslMechanisms};
pub use startup::{CancelRequest, PROTOCOL_VERSION, SslRequest, StartupMessage};
pub use frontend::{Bind, Close, Describe, Execute, Flush, Parse, Query, Sync, Target, Terminate};
pub use backend::{
    BackendKeyData, BindComplete, CloseComplete, CommandComplete, EmptyQueryResponse,
    NegotiateProtocolVersion, NoData, NotificationResponse, ParameterDescription, ParameterStatus,
    ParseComplete, PortalSuspended, ReadyForQuery, TransactionStatus,
};
pub use password::{PasswordKind, PasswordMessage};
pub use row::{BinaryParameters, DataRow, RowDescription, RowField};
pub use notice::{ErrorFields, ErrorResponse, NoticeResponse};
pub use copy::{CopyBothResponse, CopyData, CopyDone, CopyFail, CopyInResponse, CopyOutResponse};
