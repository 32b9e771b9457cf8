//! Postgres Frontend and Backend Protocol Codec
//!
//! Parse raw bytes of a postgres connection into typed messages, and encode
//! them back into the exact wire representation. The codec performs no I/O of
//! its own beyond reading one message from a caller provided byte source.
//!
//! ```
//! use postro_codec::{BackendMessage, parse_server_message};
//!
//! let raw = b"Z\x00\x00\x00\x05I";
//! let msg = parse_server_message(&raw[..]).unwrap();
//! assert!(matches!(msg, BackendMessage::ReadyForQuery(_)));
//! assert_eq!(msg.encode().unwrap(), &raw[..]);
//! ```
//!
//! # Features
//!
//! - `tokio`, async entry points over `tokio::io::AsyncRead`
//! - `log`, `log-verbose`, trace every decoded message
mod common;
mod ext;

pub mod buffer;
pub mod envelope;
pub mod postgres;
pub mod message;
pub mod auth;

mod error;

pub use self::error::{ProtocolError, Result};
pub use self::envelope::Envelope;
pub use self::postgres::{Backend, Frontend, Message};
pub use self::message::{BackendMessage, FrontendMessage, parse_client_message, parse_server_message};
#[cfg(feature = "tokio")]
pub use self::message::{parse_client_message_async, parse_server_message_async};
pub use self::auth::{hash_password, password_matches};
