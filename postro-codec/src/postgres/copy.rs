//! COPY sub-protocol messages.
//!
//! `CopyData` and `CopyDone` flow in either direction, so they are both
//! [`Frontend`] and [`Backend`].
use bytes::Bytes;

use super::{
    Backend, Frontend, Message, PgFormat,
    frontend::{put_formats, read_formats},
};
use crate::{
    buffer::{Payload, WriteBuffer},
    error::Result,
};

/// Identifies the message as COPY data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyData {
    /// Data that forms part of a COPY data stream.
    ///
    /// Messages sent from the backend will always correspond to single data rows,
    /// but messages sent by frontends might divide the data stream arbitrarily.
    pub data: Bytes,
}

impl Message for CopyData {
    const MSGTYPE: u8 = b'd';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { data: body.read_to_end() })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_bytes(&self.data);
        Ok(())
    }
}

impl Frontend for CopyData { }
impl Backend for CopyData { }

unit_msg! {
    /// Identifies the message as a COPY-complete indicator.
    struct CopyDone, b'c', Frontend, Backend;
}

/// Identifies the message as a COPY-failure indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyFail {
    /// An error message to report as the cause of failure.
    pub message: Bytes,
}

impl Message for CopyFail {
    const MSGTYPE: u8 = b'f';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { message: body.read_nul_string()? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.message, true);
        Ok(())
    }
}

impl Frontend for CopyFail { }

macro_rules! copy_response {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            /// Overall COPY format, [`Text`][PgFormat::Text] or [`Binary`][PgFormat::Binary].
            pub format: PgFormat,
            /// The format codes to be used for each column.
            ///
            /// Each must presently be zero (text) or one (binary).
            /// All must be zero if the overall copy format is textual.
            pub column_formats: Vec<PgFormat>,
        }

        impl Message for $name {
            const MSGTYPE: u8 = $ty;

            fn decode(body: &mut Payload) -> Result<Self> {
                // overall format is an int8
                let format = PgFormat::from_code(body.read_u8()?.into())?;
                let column_formats = read_formats(body)?;
                Ok(Self { format, column_formats })
            }

            fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
                // format code is 0 or 1
                buf.put_u8(self.format.format_code() as u8);
                put_formats(buf, &self.column_formats)
            }
        }

        impl Backend for $name { }
    )*};
}

copy_response! {
    /// Identifies the message as a Start Copy In response.
    ///
    /// The frontend must now send copy-in data (if not prepared to do so, send a CopyFail message).
    struct CopyInResponse, b'G';

    /// Identifies the message as a Start Copy Out response.
    ///
    /// This message will be followed by copy-out data.
    struct CopyOutResponse, b'H';

    /// Identifies the message as a Start Copy Both response.
    ///
    /// This message is used only for Streaming Replication.
    struct CopyBothResponse, b'W';
}
