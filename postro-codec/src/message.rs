//! Tag dispatch for both directions of traffic.
//!
//! Several message types share a tag, which one applies depends on who sent
//! it, so each direction has its own closed set of messages:
//! [`FrontendMessage`] for client traffic and [`BackendMessage`] for server traffic.
use std::io::{self, Read};

use bytes::Bytes;

use crate::{
    buffer::Payload,
    common::trace,
    envelope::Envelope,
    error::{ProtocolError, Result},
    postgres::{
        startup::{CANCEL_REQUEST_CODE, PROTOCOL_VERSION, SSL_REQUEST_CODE},
        *,
    },
};

macro_rules! registry {
    (
        $(#[$doc:meta])*
        enum $me:ident, $dir:literal {
            untagged [$($un:ident($unty:ident),)*],
            $($name:ident,)*
        }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $me {
            $($un($unty),)*
            $($name($name),)*
        }

        impl $me {
            /// Returns the message type, `None` for the startup family.
            pub fn msgtype(&self) -> Option<u8> {
                match self {
                    $(Self::$un(_) => None,)*
                    $(Self::$name(_) => Some($name::MSGTYPE),)*
                }
            }

            /// Get message name from message type.
            ///
            /// Returns `"Unknown"` for unknown message type.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }

            /// Decode the message body of a tagged message.
            pub fn decode(msgtype: u8, body: &mut Payload) -> Result<Self> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name($name::decode_exact(body)?),)*
                    _ => {
                        trace!("({}) unknown message type {:?}", $dir, char::from(msgtype));
                        return Err(ProtocolError::UnknownMessageTag(msgtype));
                    },
                };
                trace!("({}) {}", $dir, Self::message_name(msgtype));
                Ok(message)
            }

            /// Decode the message from an already framed [`Envelope`].
            pub fn from_envelope(envelope: Envelope) -> Result<Self> {
                let tag = envelope.tag;
                let mut body = envelope.into_payload();
                match tag {
                    Some(msgtype) => Self::decode(msgtype, &mut body),
                    None => Self::decode_untagged(&mut body),
                }
            }

            /// Encode the complete message, including message type and length.
            pub fn encode(&self) -> Result<Bytes> {
                match self {
                    $(Self::$un(msg) => msg.encode(),)*
                    $(Self::$name(msg) => Message::encode(msg),)*
                }
            }

            /// Write the complete message to `writer`, returns the amount of bytes written.
            pub fn write_to<W: io::Write>(&self, mut writer: W) -> Result<usize> {
                let bytes = self.encode()?;
                writer.write_all(&bytes)?;
                Ok(bytes.len())
            }
        }

        $(
            impl From<$unty> for $me {
                fn from(value: $unty) -> Self {
                    Self::$un(value)
                }
            }
        )*

        $(
            impl From<$name> for $me {
                fn from(value: $name) -> Self {
                    Self::$name(value)
                }
            }
        )*
    };
}

registry! {
    /// Postgres frontend messages.
    enum FrontendMessage, "F" {
        untagged [
            Startup(StartupMessage),
            SslRequest(SslRequest),
            CancelRequest(CancelRequest),
        ],
        Bind,
        Close,
        CopyData,
        CopyDone,
        CopyFail,
        Describe,
        Execute,
        Flush,
        Parse,
        PasswordMessage,
        Query,
        Sync,
        Terminate,
    }
}

registry! {
    /// Postgres backend messages.
    enum BackendMessage, "B" {
        untagged [],
        Authentication,
        BackendKeyData,
        BindComplete,
        CloseComplete,
        CommandComplete,
        CopyBothResponse,
        CopyData,
        CopyDone,
        CopyInResponse,
        CopyOutResponse,
        DataRow,
        EmptyQueryResponse,
        ErrorResponse,
        NegotiateProtocolVersion,
        NoData,
        NoticeResponse,
        NotificationResponse,
        ParameterDescription,
        ParameterStatus,
        ParseComplete,
        PortalSuspended,
        ReadyForQuery,
        RowDescription,
    }
}

impl FrontendMessage {
    /// Decode the startup family, selected by the first int32 of the body.
    fn decode_untagged(body: &mut Payload) -> Result<Self> {
        match body.peek_i32()? {
            PROTOCOL_VERSION => StartupMessage::decode(body).map(Self::Startup),
            SSL_REQUEST_CODE => SslRequest::decode(body).map(Self::SslRequest),
            CANCEL_REQUEST_CODE => CancelRequest::decode(body).map(Self::CancelRequest),
            version => Err(ProtocolError::UnsupportedProtocolVersion(version)),
        }
    }
}

impl BackendMessage {
    /// The backend never sends a message without message type.
    fn decode_untagged(_: &mut Payload) -> Result<Self> {
        Err(ProtocolError::UnknownMessageTag(0))
    }

    /// Returns `true` if the message is [`ReadyForQuery`].
    pub fn is_ready_for_query(&self) -> bool {
        matches!(self, Self::ReadyForQuery(_))
    }
}

/// Read exactly one client message from `reader`.
///
/// A leading zero byte can not be a message type, so it starts a startup
/// family message.
pub fn parse_client_message<R: Read>(reader: R) -> Result<FrontendMessage> {
    FrontendMessage::from_envelope(Envelope::read(reader)?)
}

/// Read exactly one server message from `reader`.
pub fn parse_server_message<R: Read>(reader: R) -> Result<BackendMessage> {
    BackendMessage::from_envelope(Envelope::read(reader)?)
}

/// Read exactly one client message from an async `reader`.
#[cfg(feature = "tokio")]
pub async fn parse_client_message_async<R>(reader: &mut R) -> Result<FrontendMessage>
where
    R: tokio::io::AsyncRead + Unpin + ?Sized,
{
    FrontendMessage::from_envelope(Envelope::read_async(reader).await?)
}

/// Read exactly one server message from an async `reader`.
#[cfg(feature = "tokio")]
pub async fn parse_server_message_async<R>(reader: &mut R) -> Result<BackendMessage>
where
    R: tokio::io::AsyncRead + Unpin + ?Sized,
{
    BackendMessage::from_envelope(Envelope::read_async(reader).await?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn client_stream() -> Vec<u8> {
        let mut startup = StartupMessage::new();
        startup.insert("user", "alice");

        let mut raw = startup.encode().unwrap().to_vec();
        raw.extend_from_slice(b"Q\x00\x00\x00\x0dSELECT 1\0");
        raw.extend_from_slice(b"D\x00\x00\x00\x06S\0");
        raw.extend_from_slice(b"X\x00\x00\x00\x04");
        raw
    }

    #[test]
    fn client_dispatch() {
        let raw = client_stream();
        let mut reader = &raw[..];

        let FrontendMessage::Startup(startup) = parse_client_message(&mut reader).unwrap() else {
            panic!("expected startup message");
        };
        assert_eq!(startup.user().unwrap(), "alice");

        let query = parse_client_message(&mut reader).unwrap();
        assert_eq!(query, FrontendMessage::Query(Query { query: Bytes::from_static(b"SELECT 1") }));
        assert_eq!(query.msgtype(), Some(b'Q'));

        // `D` from the client is Describe
        let describe = parse_client_message(&mut reader).unwrap();
        assert_eq!(describe, FrontendMessage::from(Describe::default()));

        assert_eq!(parse_client_message(&mut reader).unwrap(), FrontendMessage::from(Terminate));
        assert!(matches!(parse_client_message(&mut reader), Err(ProtocolError::UnexpectedEnd)));
    }

    #[test]
    fn server_dispatch() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"R\x00\x00\x00\x08\x00\x00\x00\x00");
        raw.extend_from_slice(b"S\x00\x00\x00\x17DateStyle\0ISO, MDY\0");
        raw.extend_from_slice(b"D\x00\x00\x00\x0b\x00\x01\x00\x00\x00\x01x");
        raw.extend_from_slice(b"Z\x00\x00\x00\x05I");
        let mut reader = &raw[..];

        assert_eq!(parse_server_message(&mut reader).unwrap(), BackendMessage::from(Authentication::Ok));

        let BackendMessage::ParameterStatus(status) = parse_server_message(&mut reader).unwrap() else {
            panic!("expected parameter status");
        };
        assert_eq!(status.value, "ISO, MDY");

        // `D` from the server is DataRow
        let BackendMessage::DataRow(row) = parse_server_message(&mut reader).unwrap() else {
            panic!("expected data row");
        };
        assert_eq!(row.get(0).unwrap(), "x");

        let ready = parse_server_message(&mut reader).unwrap();
        assert!(ready.is_ready_for_query());
        assert_eq!(ready.encode().unwrap(), &b"Z\x00\x00\x00\x05I"[..]);
    }

    #[test]
    fn unknown_tag_keeps_framing() {
        let raw = b"Z\x00\x00\x00\x05IS\x00\x00\x00\x04";
        let mut reader = &raw[..];
        assert!(matches!(
            parse_client_message(&mut reader),
            Err(ProtocolError::UnknownMessageTag(b'Z'))
        ));
        assert_eq!(parse_client_message(&mut reader).unwrap(), FrontendMessage::from(Sync));
    }

    #[test]
    fn leftover_bytes() {
        let raw = b"K\x00\x00\x00\x0d\x00\x00\x00\x01\x00\x00\x00\x02\xffZ\x00\x00\x00\x05I";
        let mut reader = &raw[..];
        assert!(matches!(parse_server_message(&mut reader), Err(ProtocolError::InvalidLength(13))));
        assert!(parse_server_message(&mut reader).unwrap().is_ready_for_query());

        let raw = b"Q\x00\x00\x00\x0fSELECT 1\0xy";
        assert!(matches!(parse_client_message(&raw[..]), Err(ProtocolError::InvalidLength(15))));

        let mut startup = StartupMessage::new();
        startup.insert("user", "bob");
        let mut raw = startup.encode().unwrap().to_vec();
        raw.extend_from_slice(b"zz");
        raw[3] += 2;
        assert!(matches!(
            parse_client_message(&raw[..]),
            Err(ProtocolError::InvalidLength(len)) if len == raw.len() as i32
        ));
    }

    #[test]
    fn untagged() {
        let raw = SslRequest.encode().unwrap();
        let msg = parse_client_message(&raw[..]).unwrap();
        assert_eq!(msg, FrontendMessage::SslRequest(SslRequest));
        assert_eq!(msg.msgtype(), None);
        assert_eq!(msg.encode().unwrap(), raw);

        let cancel = CancelRequest { process_id: 1, secret_key: 2 };
        let raw = cancel.encode().unwrap();
        assert_eq!(parse_client_message(&raw[..]).unwrap(), FrontendMessage::from(cancel));

        let raw = b"\x00\x00\x00\x08\x00\x02\x00\x00";
        assert!(matches!(
            parse_client_message(&raw[..]),
            Err(ProtocolError::UnsupportedProtocolVersion(131072))
        ));

        assert!(matches!(
            parse_server_message(&SslRequest::BYTES[..]),
            Err(ProtocolError::UnknownMessageTag(0))
        ));
    }

    #[test]
    fn message_names() {
        assert_eq!(FrontendMessage::message_name(b'D'), "Describe");
        assert_eq!(BackendMessage::message_name(b'D'), "DataRow");
        assert_eq!(FrontendMessage::message_name(b'p'), "PasswordMessage");
        assert_eq!(BackendMessage::message_name(b'p'), "Unknown");
    }

    #[test]
    fn write_to() {
        let mut out = Vec::new();
        let msg = FrontendMessage::from(Flush);
        assert_eq!(msg.write_to(&mut out).unwrap(), 5);
        assert_eq!(out, b"H\x00\x00\x00\x04");
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn parse_async() {
        let raw = client_stream();
        let mut reader = &raw[..];
        assert!(matches!(
            parse_client_message_async(&mut reader).await.unwrap(),
            FrontendMessage::Startup(_)
        ));
        assert!(matches!(
            parse_client_message_async(&mut reader).await.unwrap(),
            FrontendMessage::Query(_)
        ));

        let mut reader = &b"n\x00\x00\x00\x04"[..];
        assert_eq!(parse_server_message_async(&mut reader).await.unwrap(), BackendMessage::from(NoData));
    }
}
