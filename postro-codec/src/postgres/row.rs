//! Row description and row data.
use bytes::Bytes;

use super::{Backend, Frontend, Message, Oid, PgFormat};
use crate::{
    buffer::{Payload, WriteBuffer},
    common::trace,
    error::Result,
};

/// Identifies the message as a row description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDescription {
    pub fields: Vec<RowField>,
}

/// Column schema of a [`RowDescription`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowField {
    /// The field name.
    pub column_name: Bytes,
    /// If the field can be identified as a column of a specific table, the object ID of the table; otherwise zero.
    pub table_oid: Oid,
    /// If the field can be identified as a column of a specific table, the attribute number of the column; otherwise zero.
    pub column_attribute_number: i16,
    /// The object ID of the field's data type.
    pub type_oid: Oid,
    /// The data type size (see pg_type.typlen). Note that negative values denote variable-width types.
    pub type_size: i16,
    /// The type modifier (see pg_attribute.atttypmod). The meaning of the modifier is type-specific.
    pub type_modifier: i32,
    /// The format code being used for the field.
    ///
    /// In a RowDescription returned from the statement variant of Describe,
    /// the format code is not yet known and will always be zero.
    pub format: PgFormat,
}

impl RowField {
    fn decode(body: &mut Payload) -> Result<Self> {
        Ok(Self {
            column_name: body.read_nul_string()?,
            table_oid: body.read_u32()?,
            column_attribute_number: body.read_i16()?,
            type_oid: body.read_u32()?,
            type_size: body.read_i16()?,
            type_modifier: body.read_i32()?,
            format: PgFormat::from_code(body.read_i16()?)?,
        })
    }

    fn encode(&self, buf: &mut WriteBuffer) {
        buf.put_nul_bytes(&self.column_name, true);
        buf.put_u32(self.table_oid);
        buf.put_i16(self.column_attribute_number);
        buf.put_u32(self.type_oid);
        buf.put_i16(self.type_size);
        buf.put_i32(self.type_modifier);
        buf.put_i16(self.format.format_code());
    }
}

impl Message for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(body: &mut Payload) -> Result<Self> {
        let len = body.read_count()?;
        // a field is at least 19 bytes
        let mut fields = Vec::with_capacity(len.min(body.remaining() / 19));
        for _ in 0..len {
            fields.push(RowField::decode(body)?);
        }
        Ok(Self { fields })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_count(self.fields.len())?;
        for field in &self.fields {
            field.encode(buf);
        }
        Ok(())
    }
}

impl Backend for RowDescription { }

/// Identifies the message as a data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
    /// The column values, in the format indicated by the associated format code.
    ///
    /// `None` is a NULL column value.
    pub fields: Vec<Option<Bytes>>,
}

impl DataRow {
    /// Returns the column value, `None` for NULL or out of range column.
    pub fn get(&self, idx: usize) -> Option<&Bytes> {
        self.fields.get(idx)?.as_ref()
    }
}

impl Message for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(body: &mut Payload) -> Result<Self> {
        let len = body.read_count()?;
        let mut fields = Vec::with_capacity(len.min(body.remaining() / 4));
        for _ in 0..len {
            fields.push(body.read_field()?);
        }
        Ok(Self { fields })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        put_fields(buf, &self.fields)
    }
}

impl Backend for DataRow { }

fn put_fields(buf: &mut WriteBuffer, fields: &[Option<Bytes>]) -> Result<()> {
    buf.put_count(fields.len())?;
    for field in fields {
        buf.put_field(field.as_deref())?;
    }
    Ok(())
}

/// Binary parameter values, sent by the frontend with the `D` message type.
///
/// Shares its layout with [`DataRow`], but is lenient on a truncated body:
/// when the body ends exactly where the next length prefix would start, the
/// values read so far are returned. It is not part of the frontend message
/// dispatch, since `D` is [`Describe`][super::Describe] there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryParameters {
    /// `None` is a NULL parameter value.
    pub fields: Vec<Option<Bytes>>,
}

impl Message for BinaryParameters {
    const MSGTYPE: u8 = b'D';

    fn decode(body: &mut Payload) -> Result<Self> {
        let len = body.read_count()?;
        let mut fields = Vec::with_capacity(len.min(body.remaining() / 4));
        for _ in 0..len {
            if body.is_empty() {
                trace!("binary parameters truncated at {} of {len}", fields.len());
                break;
            }
            fields.push(body.read_field()?);
        }
        Ok(Self { fields })
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        put_fields(buf, &self.fields)
    }
}

impl Frontend for BinaryParameters { }

impl From<DataRow> for BinaryParameters {
    fn from(row: DataRow) -> Self {
        Self { fields: row.fields }
    }
}

impl From<BinaryParameters> for DataRow {
    fn from(params: BinaryParameters) -> Self {
        Self { fields: params.fields }
    }
}
