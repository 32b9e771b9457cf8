//! Error and notice responses.
//!
//! The message body consists of one or more identified fields, followed by a zero byte as a terminator.
//! Fields can appear in any order.
//!
//! For each field there is the following:
//!
//! `Byte1` A code identifying the field type; if zero, this is the message terminator and no string follows.
//! Since more field types might be added in future, frontends should silently ignore fields of unrecognized type.
//!
//! `String` The field value.
//!
//! <https://www.postgresql.org/docs/current/protocol-error-fields.html>
use std::fmt;

use bytes::Bytes;

use super::{Backend, Message};
use crate::{
    buffer::{Payload, WriteBuffer},
    error::Result,
};

/// Identified fields of an [`ErrorResponse`] or [`NoticeResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFields {
    /// `S`, the severity, possibly localized.
    pub severity: Bytes,
    /// `V`, the severity, never localized.
    pub text: Bytes,
    /// `C`, the SQLSTATE code for the error.
    pub code: Bytes,
    /// `M`, the primary human-readable error message.
    pub message: Bytes,
    /// `P`, error cursor position as an index into the original query string.
    pub position: Bytes,
    /// `F`, the file name of the source-code location where the error was reported.
    ///
    /// Decoded but never written.
    pub file: Bytes,
    /// `L`, the line number of the source-code location where the error was reported.
    pub line: Bytes,
    /// `R`, the name of the source-code routine reporting the error.
    pub routine: Bytes,
}

impl ErrorFields {
    fn decode(body: &mut Payload) -> Result<Self> {
        let mut me = Self::default();
        loop {
            let code = body.read_u8()?;
            if code == b'\0' {
                break;
            }
            let value = body.read_nul_string()?;
            match code {
                b'S' => me.severity = value,
                b'V' => me.text = value,
                b'C' => me.code = value,
                b'M' => me.message = value,
                b'P' => me.position = value,
                b'F' => me.file = value,
                b'L' => me.line = value,
                b'R' => me.routine = value,
                _ => { },
            }
        }
        Ok(me)
    }

    fn encode(&self, buf: &mut WriteBuffer) {
        for (code, value) in [
            (b'S', &self.severity),
            (b'V', &self.text),
            (b'C', &self.code),
            (b'M', &self.message),
            (b'P', &self.position),
            (b'L', &self.line),
            (b'R', &self.routine),
        ] {
            buf.put_u8(code);
            buf.put_nul_bytes(value, true);
        }
        buf.put_u8(b'\0');
    }
}

impl fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            String::from_utf8_lossy(&self.severity),
            String::from_utf8_lossy(&self.message),
            String::from_utf8_lossy(&self.code),
        )
    }
}

/// Identifies the message as an error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorResponse {
    pub fields: ErrorFields,
}

impl Message for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { fields: ErrorFields::decode(body)? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        self.fields.encode(buf);
        Ok(())
    }
}

impl Backend for ErrorResponse { }

/// A warning message. The frontend should display the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeResponse {
    pub fields: ErrorFields,
}

impl Message for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { fields: ErrorFields::decode(body)? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        self.fields.encode(buf);
        Ok(())
    }
}

impl Backend for NoticeResponse { }

#[cfg(test)]
mod test {
    use super::*;
    use crate::ProtocolError;

    const RAW: &[u8] = b"E\x00\x00\x00\x4dSERROR\0VERROR\0C42P01\0Mrelation \"foo\" does not exist\0P15\0Lparse.c\0Rparse\0\0";

    #[test]
    fn error_response() {
        let err = ErrorResponse::parse(RAW).unwrap();
        assert_eq!(err.fields.severity, "ERROR");
        assert_eq!(err.fields.code, "42P01");
        assert_eq!(err.fields.message, "relation \"foo\" does not exist");
        assert_eq!(err.fields.position, "15");
        assert_eq!(err.encode().unwrap(), RAW);
        assert_eq!(err.fields.to_string(), "ERROR: relation \"foo\" does not exist (42P01)");
    }

    #[test]
    fn file_and_unknown_fields() {
        // F is kept, unknown `n` is dropped, encode omits F
        let raw = b"N\x00\x00\x00\x21SNOTICE\0Fscan.l\0nconstraint\0\0";
        let notice = NoticeResponse::parse(&raw[..]).unwrap();
        assert_eq!(notice.fields.severity, "NOTICE");
        assert_eq!(notice.fields.file, "scan.l");
        assert_eq!(
            notice.encode().unwrap(),
            &b"N\x00\x00\x00\x19SNOTICE\0V\0C\0M\0P\0L\0R\0\0"[..]
        );
    }

    #[test]
    fn unterminated() {
        let raw = b"E\x00\x00\x00\x0bSERROR\0";
        assert!(matches!(ErrorResponse::parse(&raw[..]), Err(ProtocolError::UnexpectedEnd)));
    }
}
