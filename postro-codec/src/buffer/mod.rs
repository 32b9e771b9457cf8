//! Binary cursor primitives.
//!
//! [`ReadBuffer`] reads from an abstract byte source, [`Payload`] reads the
//! body of one message, and [`WriteBuffer`] accumulates a message body and
//! finalizes it with its tag and length.
mod read;
mod payload;
mod write;

pub use read::ReadBuffer;
pub use payload::Payload;
pub use write::WriteBuffer;

pub(crate) use payload::body_len;
