//! Postgres Frontend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::Bytes;

use super::{Frontend, Message, Oid, PgFormat};
use crate::{
    buffer::{Payload, WriteBuffer},
    error::{ProtocolError, Result},
};

/// Identifies the message as a simple query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// the query string itself
    pub query: Bytes,
}

impl Message for Query {
    const MSGTYPE: u8 = b'Q';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self { query: body.read_nul_string()? })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.query, true);
        Ok(())
    }
}

impl Frontend for Query { }

/// Identifies the message as a Parse command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    /// prepared statement name (an empty string selects the unnamed prepared statement).
    pub name: Bytes,
    /// The query string to be parsed.
    pub query: Bytes,
    /// Specifies the object ID of the parameter data type.
    ///
    /// Note that this is not an indication of the number of parameters that might appear in the
    /// query string, only the number that the frontend wants to prespecify types for.
    /// Placing a zero here is equivalent to leaving the type unspecified.
    pub param_types: Vec<Oid>,
}

impl Message for Parse {
    const MSGTYPE: u8 = b'P';

    fn decode(body: &mut Payload) -> Result<Self> {
        let name = body.read_nul_string()?;
        let query = body.read_nul_string()?;
        let len = body.read_count()?;
        let mut param_types = Vec::with_capacity(len.min(body.remaining() / 4));
        for _ in 0..len {
            param_types.push(body.read_u32()?);
        }
        Ok(Self { name, query, param_types })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.name, true);
        buf.put_nul_bytes(&self.query, true);
        buf.put_count(self.param_types.len())?;
        for oid in &self.param_types {
            buf.put_u32(*oid);
        }
        Ok(())
    }
}

impl Frontend for Parse { }

/// Identifies the message as a Bind command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bind {
    /// The name of the destination portal (an empty string selects the unnamed portal).
    pub portal: Bytes,
    /// The name of the source prepared statement (an empty string selects the unnamed prepared statement).
    pub statement: Bytes,
    /// The parameter [`PgFormat`].
    ///
    /// This can be empty to indicate that there are no parameters or that the parameters
    /// all use the default format (text); or one, in which case the specified format code
    /// is applied to all parameters; or it can equal the actual number of parameters.
    pub param_formats: Vec<PgFormat>,
    /// The value of the parameters, in the format indicated by the associated format code.
    ///
    /// `None` is a NULL parameter value.
    pub params: Vec<Option<Bytes>>,
    /// The result-columns [`PgFormat`].
    ///
    /// This can be empty to indicate that there are no result columns or that the result
    /// columns should all use the default format (text); or one, in which case the
    /// specified format code is applied to all result columns (if any); or it can equal
    /// the actual number of result columns of the query.
    pub result_formats: Vec<PgFormat>,
}

impl Message for Bind {
    const MSGTYPE: u8 = b'B';

    fn decode(body: &mut Payload) -> Result<Self> {
        let portal = body.read_nul_string()?;
        let statement = body.read_nul_string()?;
        let param_formats = read_formats(body)?;

        let len = body.read_count()?;
        let mut params = Vec::with_capacity(len.min(body.remaining() / 4));
        for _ in 0..len {
            params.push(body.read_field()?);
        }

        let result_formats = read_formats(body)?;
        Ok(Self { portal, statement, param_formats, params, result_formats })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.portal, true);
        buf.put_nul_bytes(&self.statement, true);
        put_formats(buf, &self.param_formats)?;

        buf.put_count(self.params.len())?;
        for param in &self.params {
            // NULL is written as -1
            buf.put_field(param.as_deref())?;
        }

        put_formats(buf, &self.result_formats)
    }
}

impl Frontend for Bind { }

/// int16 count followed by int16 format codes.
pub(crate) fn read_formats(body: &mut Payload) -> Result<Vec<PgFormat>> {
    let len = body.read_count()?;
    let mut formats = Vec::with_capacity(len.min(body.remaining() / 2));
    for _ in 0..len {
        formats.push(PgFormat::from_code(body.read_i16()?)?);
    }
    Ok(formats)
}

pub(crate) fn put_formats(buf: &mut WriteBuffer, formats: &[PgFormat]) -> Result<()> {
    buf.put_count(formats.len())?;
    for format in formats {
        buf.put_i16(format.format_code());
    }
    Ok(())
}

/// Object kind a [`Describe`] or [`Close`] refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// `S`, a prepared statement.
    #[default]
    Statement,
    /// `P`, a portal.
    Portal,
}

impl Target {
    pub fn code(&self) -> u8 {
        match self {
            Self::Statement => b'S',
            Self::Portal => b'P',
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            b'S' => Ok(Self::Statement),
            b'P' => Ok(Self::Portal),
            code => Err(ProtocolError::unknown_code("describe target", code)),
        }
    }
}

/// Identifies the message as a Describe command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Describe {
    pub target: Target,
    /// The name of the prepared statement or portal to describe
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: Bytes,
}

impl Message for Describe {
    const MSGTYPE: u8 = b'D';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            target: Target::from_code(body.read_u8()?)?,
            name: body.read_nul_string()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_u8(self.target.code());
        buf.put_nul_bytes(&self.name, true);
        Ok(())
    }
}

impl Frontend for Describe { }

/// Identifies the message as a Close command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Close {
    pub target: Target,
    /// The name of the prepared statement or portal to close
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: Bytes,
}

impl Message for Close {
    const MSGTYPE: u8 = b'C';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            target: Target::from_code(body.read_u8()?)?,
            name: body.read_nul_string()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_u8(self.target.code());
        buf.put_nul_bytes(&self.name, true);
        Ok(())
    }
}

impl Frontend for Close { }

/// Identifies the message as a Execute command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execute {
    /// The name of the portal to execute (an empty string selects the unnamed portal).
    pub portal: Bytes,
    /// Maximum number of rows to return, if portal contains a query that returns rows
    /// (ignored otherwise). Zero denotes “no limit”.
    pub max_rows: i32,
}

impl Message for Execute {
    const MSGTYPE: u8 = b'E';

    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            portal: body.read_nul_string()?,
            max_rows: body.read_i32()?,
        })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_nul_bytes(&self.portal, true);
        buf.put_i32(self.max_rows);
        Ok(())
    }
}

impl Frontend for Execute { }

unit_msg! {
    /// Identifies the message as a Sync command
    struct Sync, b'S', Frontend;
    /// Identifies the message as a Flush command
    struct Flush, b'H', Frontend;
    /// Identifies the message as a termination
    struct Terminate, b'X', Frontend;
}
