//! `postro-codec` error types.
use std::io;

use bytes::Bytes;

use crate::message::{BackendMessage, FrontendMessage};

/// A specialized [`Result`] type for `postro-codec` operation.
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// An error when translating buffer from or into postgres message.
///
/// Any decode error is terminal for the message being read. Framing cannot be
/// recovered after a corrupt length, so the underlying stream should be closed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The byte source ended before the required amount of bytes.
    #[error("unexpected end of message")]
    UnexpectedEnd,
    /// The leading byte is not the expected message type.
    #[error("expected message `{}` found `{}`", message_name(*.expected), message_name(*.found))]
    InvalidTag {
        expected: u8,
        found: u8,
    },
    /// Declared length is invalid for the message.
    #[error("invalid message length ({0})")]
    InvalidLength(i32),
    /// No message type registered for the tag.
    #[error("unknown message type `{}`", char::from(*.0))]
    UnknownMessageTag(u8),
    #[error("unsupported protocol version ({0})")]
    UnsupportedProtocolVersion(i32),
    #[error("unknown SASL mechanism ({0:?})")]
    UnknownSaslMechanism(Bytes),
    #[error("unknown authentication methods ({0})")]
    UnknownAuthenticationMethod(i32),
    /// An enumerated value inside a message body is not recognized.
    #[error("unknown {kind} ({code})")]
    UnknownCode {
        kind: &'static str,
        code: i32,
    },
    /// A length or count does not fit in its wire representation.
    #[error("message size too large for protocol ({0})")]
    FieldTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::UnexpectedEnd,
            _ => Self::Io(err),
        }
    }
}

impl ProtocolError {
    pub(crate) fn unexpected(expected: u8, found: u8) -> ProtocolError {
        Self::InvalidTag { expected, found }
    }

    pub(crate) fn unknown_code(kind: &'static str, code: impl Into<i32>) -> ProtocolError {
        Self::UnknownCode { kind, code: code.into() }
    }
}

fn message_name(msgtype: u8) -> String {
    match (FrontendMessage::message_name(msgtype), BackendMessage::message_name(msgtype)) {
        ("Unknown", "Unknown") => format!("{:?}", char::from(msgtype)),
        ("Unknown", name) | (name, "Unknown") => name.to_owned(),
        (front, back) => format!("{front}/{back}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eof_is_unexpected_end() {
        let err = ProtocolError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, ProtocolError::UnexpectedEnd));

        let err = ProtocolError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn display_names_overloaded_tag() {
        let err = ProtocolError::unexpected(b'K', b'D');
        assert_eq!(err.to_string(), "expected message `BackendKeyData` found `Describe/DataRow`");

        let err = ProtocolError::UnknownMessageTag(b'~');
        assert_eq!(err.to_string(), "unknown message type `~`");
    }
}
