//! Postgres Backend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::Bytes;

use super::{Backend, Message, Oid};
use crate::{
    buffer::{Payload, WriteBuffer},
    error::{ProtocolError, Result},
    ext::UsizeExt,
};

/// Identifies the message as cancellation key data.
///
/// The frontend must save these values if it wishes to be able to issue CancelRequest messages later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: i32,
    /// The secret key of this backend.
    pub secret_key: i32,
}

impl Message for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            process_id: body.read_i32()?,
            secret_key: body.read_i32()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_i32(self.process_id);
        buf.put_i32(self.secret_key);
        Ok(())
    }
}

impl Backend for BackendKeyData { }

/// Identifies the message as a run-time parameter status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported
    pub name: Bytes,
    /// The current value of the parameter
    pub value: Bytes,
}

impl Message for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            name: body.read_nul_string()?,
            value: body.read_nul_string()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.name, true);
        buf.put_nul_bytes(&self.value, true);
        Ok(())
    }
}

impl Backend for ParameterStatus { }

/// Identifies the message as a command-completed response
///
/// For an INSERT command, the tag is INSERT oid rows, where rows is the number of rows inserted.
/// oid used to be the object ID of the inserted row if rows was 1 and the target table had OIDs,
/// but OIDs system columns are not supported anymore; therefore oid is always 0.
///
/// For a DELETE command, the tag is DELETE rows where rows is the number of rows deleted.
///
/// For an UPDATE command, the tag is UPDATE rows where rows is the number of rows updated.
///
/// For a SELECT or CREATE TABLE AS command, the tag is SELECT rows where rows is the number of rows retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// The command tag. This is usually a single word that identifies which SQL command was completed.
    pub tag: Bytes,
}

impl Message for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { tag: body.read_nul_string()? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.tag, true);
        Ok(())
    }
}

impl Backend for CommandComplete { }

/// Current backend transaction status indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionStatus {
    /// `I` if idle (not in a transaction block)
    #[default]
    Idle,
    /// `T` if in a transaction block
    InTransaction,
    /// `E` if in a failed transaction block (queries will be rejected until block is ended)
    Failed,
}

impl TransactionStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Idle => b'I',
            Self::InTransaction => b'T',
            Self::Failed => b'E',
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            b'I' => Ok(Self::Idle),
            b'T' => Ok(Self::InTransaction),
            b'E' => Ok(Self::Failed),
            code => Err(ProtocolError::unknown_code("transaction status", code)),
        }
    }
}

/// Identifies the message type. ReadyForQuery is sent whenever the backend is ready for a new query cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyForQuery {
    pub status: TransactionStatus,
}

impl Message for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(body: &mut Payload) -> Result<Self> {
        body.expect_remaining(1)?;
        Ok(Self { status: TransactionStatus::from_code(body.read_u8()?)? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_u8(self.status.code());
        Ok(())
    }
}

impl Backend for ReadyForQuery { }

/// Identifies the message as a notification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    /// The process ID of the notifying backend process.
    pub process_id: i32,
    /// The name of the channel that the notify has been raised on.
    pub channel: Bytes,
    /// The “payload” string passed from the notifying process.
    pub payload: Bytes,
}

impl Message for NotificationResponse {
    const MSGTYPE: u8 = b'A';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            process_id: body.read_i32()?,
            channel: body.read_nul_string()?,
            payload: body.read_nul_string()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_i32(self.process_id);
        buf.put_nul_bytes(&self.channel, true);
        buf.put_nul_bytes(&self.payload, true);
        Ok(())
    }
}

impl Backend for NotificationResponse { }

/// Identifies the message as a parameter description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDescription {
    /// Specifies the object ID of each parameter data type.
    pub types: Vec<Oid>,
}

impl Message for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(body: &mut Payload) -> Result<Self> {
        let len = body.read_count()?;
        let mut types = Vec::with_capacity(len.min(body.remaining() / 4));
        for _ in 0..len {
            types.push(body.read_u32()?);
        }
        Ok(Self { types })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_count(self.types.len())?;
        for oid in &self.types {
            buf.put_u32(*oid);
        }
        Ok(())
    }
}

impl Backend for ParameterDescription { }

/// Identifies the message as a protocol version negotiation message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiateProtocolVersion {
    /// Newest minor protocol version supported by the server for the major protocol version requested by the client.
    pub minor_version: i32,
    /// The option names not recognized by the server.
    pub options: Vec<Bytes>,
}

impl Message for NegotiateProtocolVersion {
    const MSGTYPE: u8 = b'v';

    fn decode(body: &mut Payload) -> Result<Self> {
        let minor_version = body.read_i32()?;
        let len = body.read_i32()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::InvalidLength(len))?;
        let mut options = Vec::with_capacity(len.min(body.remaining()));
        for _ in 0..len {
            options.push(body.read_nul_string()?);
        }
        Ok(Self { minor_version, options })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_i32(self.minor_version);
        buf.put_i32(self.options.len().to_i32()?);
        for option in &self.options {
            buf.put_nul_bytes(option, true);
        }
        Ok(())
    }
}

impl Backend for NegotiateProtocolVersion { }

unit_msg! {
    /// Identifies the message as a Parse-complete indicator.
    struct ParseComplete, b'1', Backend;

    /// Identifies the message as a Bind-complete indicator.
    struct BindComplete, b'2', Backend;

    /// Identifies the message as a Close-complete indicator.
    struct CloseComplete, b'3', Backend;

    /// Identifies the message as a no-data indicator.
    struct NoData, b'n', Backend;

    /// Identifies the message as a response to an empty query string.
    ///
    /// This substitutes for CommandComplete.
    struct EmptyQueryResponse, b'I', Backend;

    /// Identifies the message as a portal-suspended indicator.
    ///
    /// Note this only appears if an Execute message's row-count limit was reached.
    struct PortalSuspended, b's', Backend;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ready_for_query() {
        let raw = b"Z\x00\x00\x00\x05I";
        let ready = ReadyForQuery::parse(&raw[..]).unwrap();
        assert_eq!(ready.status, TransactionStatus::Idle);
        assert_eq!(ready.encode().unwrap(), &raw[..]);

        let failed = ReadyForQuery { status: TransactionStatus::Failed };
        assert_eq!(failed.encode().unwrap(), &b"Z\x00\x00\x00\x05E"[..]);
    }

    #[test]
    fn ready_for_query_invalid() {
        let raw = b"Z\x00\x00\x00\x05Q";
        assert!(matches!(
            ReadyForQuery::parse(&raw[..]),
            Err(ProtocolError::UnknownCode { kind: "transaction status", code: 81 })
        ));

        let raw = b"Z\x00\x00\x00\x06II";
        assert!(matches!(ReadyForQuery::parse(&raw[..]), Err(ProtocolError::InvalidLength(6))));
    }

    #[test]
    fn backend_key_data() {
        let raw = b"K\x00\x00\x00\x0c\x00\x00\x30\x39\xde\xad\xbe\xef";
        let key = BackendKeyData::parse(&raw[..]).unwrap();
        assert_eq!(key.process_id, 12345);
        assert_eq!(key.secret_key, 0xdeadbeef_u32 as i32);
        assert_eq!(key.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn parameter_status() {
        let raw = b"S\x00\x00\x00\x19client_encoding\0UTF8\0";
        let status = ParameterStatus::parse(&raw[..]).unwrap();
        assert_eq!(status.name, "client_encoding");
        assert_eq!(status.value, "UTF8");
        assert_eq!(status.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn command_complete() {
        let raw = b"C\x00\x00\x00\x0dSELECT 1\0";
        let complete = CommandComplete::parse(&raw[..]).unwrap();
        assert_eq!(complete.tag, "SELECT 1");
        assert_eq!(complete.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn notification() {
        let raw = b"A\x00\x00\x00\x11\x00\x00\x00\x07jobs\0run\0";
        let notify = NotificationResponse::parse(&raw[..]).unwrap();
        assert_eq!(notify.process_id, 7);
        assert_eq!(notify.channel, "jobs");
        assert_eq!(notify.payload, "run");
        assert_eq!(notify.encode().unwrap(), &raw[..]);
    }

    #[test]
    fn parameter_description() {
        let raw = b"t\x00\x00\x00\x0e\x00\x02\x00\x00\x00\x17\x00\x00\x00\x19";
        let desc = ParameterDescription::parse(&raw[..]).unwrap();
        assert_eq!(desc.types, [23, 25]);
        assert_eq!(desc.encode().unwrap(), &raw[..]);

        // declares 2 types, carries 1
        let raw = b"t\x00\x00\x00\x0a\x00\x02\x00\x00\x00\x17";
        assert!(matches!(ParameterDescription::parse(&raw[..]), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn negotiate_protocol_version() {
        let raw = b"v\x00\x00\x00\x15\x00\x00\x00\x00\x00\x00\x00\x01_pq_.opt\0";
        let negotiate = NegotiateProtocolVersion::parse(&raw[..]).unwrap();
        assert_eq!(negotiate.minor_version, 0);
        assert_eq!(negotiate.options, [Bytes::from_static(b"_pq_.opt")]);
        assert_eq!(negotiate.encode().unwrap(), &raw[..]);

        let raw = b"v\x00\x00\x00\x0c\x00\x00\x00\x00\xff\xff\xff\xff";
        assert!(matches!(
            NegotiateProtocolVersion::parse(&raw[..]),
            Err(ProtocolError::InvalidLength(-1))
        ));
    }
}
