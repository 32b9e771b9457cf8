//! Startup negotiation messages.
//!
//! For historical reasons, the very first message sent by the client has no
//! initial message-type byte, thus none of the messages here implement
//! [`Message`][super::Message]. Each one is identified by the first int32 of
//! its payload instead.
use std::{collections::BTreeMap, io};

use bytes::Bytes;

use crate::{
    buffer::{Payload, ReadBuffer, WriteBuffer},
    error::{ProtocolError, Result},
};

/// The protocol version number.
///
/// The most significant 16 bits are the major version number (3 for the protocol described here).
/// The least significant 16 bits are the minor version number (0 for the protocol described here).
pub const PROTOCOL_VERSION: i32 = 196_608;

/// The SSL request code.
///
/// The value is chosen to contain 1234 in the most significant 16 bits,
/// and 5679 in the least significant 16 bits.
pub const SSL_REQUEST_CODE: i32 = 80_877_103;

/// The cancel request code.
///
/// The value is chosen to contain 1234 in the most significant 16 bits,
/// and 5678 in the least significant 16 bits.
pub const CANCEL_REQUEST_CODE: i32 = 80_877_102;

fn read_untagged<R: io::Read>(reader: R) -> Result<Payload> {
    let (body, _) = ReadBuffer::new(reader).read_envelope()?;
    Ok(body)
}

/// Postgres Startup frontend message.
///
/// Parameter names are case insensitive and kept lowercased. Parameters are
/// written in ascending name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupMessage {
    pub protocol_version: i32,
    options: BTreeMap<Bytes, Bytes>,
}

impl StartupMessage {
    pub fn new() -> Self {
        Self { protocol_version: PROTOCOL_VERSION, options: BTreeMap::new() }
    }

    /// Insert a parameter, the name is lowercased.
    pub fn insert(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Option<Bytes> {
        self.options.insert(lowercase(name.into()), value.into())
    }

    /// Returns a parameter value, `name` is case insensitive.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&Bytes> {
        self.options.get(&name.as_ref().to_ascii_lowercase()[..])
    }

    /// Parameter name and value pairs, in ascending name order.
    ///
    /// `user` is required, `database` defaults to the user name. Names beginning with `_pq_.`
    /// are reserved for protocol extensions, others are run-time parameters.
    pub fn options(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.options.iter()
    }

    /// Remove a parameter, `name` is case insensitive.
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Bytes> {
        self.options.remove(&name.as_ref().to_ascii_lowercase()[..])
    }

    /// The database user name to connect as.
    pub fn user(&self) -> Option<&Bytes> {
        self.options.get(&b"user"[..])
    }

    /// The database to connect to, defaults to the user name.
    pub fn database(&self) -> Option<&Bytes> {
        self.options.get(&b"database"[..]).or_else(|| self.user())
    }

    /// Decode the payload of a startup message, without its length.
    pub fn decode(body: &mut Payload) -> Result<Self> {
        let protocol_version = body.read_i32()?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedProtocolVersion(protocol_version));
        }

        let mut me = Self { protocol_version, options: BTreeMap::new() };
        loop {
            // A zero byte is required as a terminator after the last name/value pair.
            let name = body.read_nul_string()?;
            if name.is_empty() {
                break;
            }
            let value = body.read_nul_string()?;
            me.options.insert(lowercase(name), value);
        }
        body.finish()?;
        Ok(me)
    }

    /// Read exactly one startup message from `reader`.
    pub fn parse<R: io::Read>(reader: R) -> Result<Self> {
        Self::decode(&mut read_untagged(reader)?)
    }

    /// Encode the complete message, starting with its length.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = WriteBuffer::new();
        buf.put_i32(self.protocol_version);
        for (name, value) in &self.options {
            buf.put_nul_bytes(name, true);
            buf.put_nul_bytes(value, true);
        }
        buf.put_u8(b'\0');
        buf.wrap_untagged()
    }
}

impl Default for StartupMessage {
    fn default() -> Self {
        Self::new()
    }
}

fn lowercase(name: Bytes) -> Bytes {
    if name.iter().any(u8::is_ascii_uppercase) {
        Bytes::from(name.to_ascii_lowercase())
    } else {
        name
    }
}

/// Request the backend to negotiate an SSL encrypted connection.
///
/// The backend answers with a single byte, `S` or `N`, which is not a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SslRequest;

impl SslRequest {
    /// The complete message.
    pub const BYTES: [u8; 8] = [0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x2f];

    pub fn decode(body: &mut Payload) -> Result<Self> {
        body.expect_remaining(4)?;
        match body.read_i32()? {
            SSL_REQUEST_CODE => Ok(Self),
            code => Err(ProtocolError::UnsupportedProtocolVersion(code)),
        }
    }

    pub fn parse<R: io::Read>(reader: R) -> Result<Self> {
        Self::decode(&mut read_untagged(reader)?)
    }

    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from_static(&Self::BYTES))
    }
}

/// Request the backend to abort processing of the query in progress.
///
/// Sent over a new connection, instead of a [`StartupMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRequest {
    /// The process ID of the target backend.
    pub process_id: i32,
    /// The secret key for the target backend.
    pub secret_key: i32,
}

impl CancelRequest {
    pub fn decode(body: &mut Payload) -> Result<Self> {
        body.expect_remaining(12)?;
        let code = body.read_i32()?;
        if code != CANCEL_REQUEST_CODE {
            return Err(ProtocolError::UnsupportedProtocolVersion(code));
        }
        Ok(Self { process_id: body.read_i32()?, secret_key: body.read_i32()? })
    }

    pub fn parse<R: io::Read>(reader: R) -> Result<Self> {
        Self::decode(&mut read_untagged(reader)?)
    }

    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = WriteBuffer::with_capacity(12);
        buf.put_i32(CANCEL_REQUEST_CODE);
        buf.put_i32(self.process_id);
        buf.put_i32(self.secret_key);
        buf.wrap_untagged()
    }
}
