//! Password and SASL response messages.
//!
//! Three different messages share the `p` message type, the layout depends on
//! the [`Authentication`][super::Authentication] request being answered. The
//! message itself does not say which, see [`PasswordMessage::decode`].
use bytes::Bytes;

use super::{AuthenticationMethod, Frontend, Message, SaslMechanism};
use crate::{
    auth::hash_password,
    buffer::{Payload, WriteBuffer},
    error::Result,
};

/// The layout of a [`PasswordMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordKind {
    Password,
    SaslInitialResponse,
    SaslResponse,
}

/// Identifies the message as a password or SASL response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordMessage {
    /// The password (encrypted, if requested).
    Password {
        password: Bytes,
    },
    /// Identifies the message as an initial SASL response.
    SaslInitialResponse {
        /// Name of the SASL authentication mechanism that the client selected.
        mechanism: Bytes,
        /// SASL mechanism specific "Initial Response", `None` if there is no initial response.
        data: Option<Bytes>,
    },
    /// Identifies the message as a SASL response.
    SaslResponse {
        /// SASL mechanism specific message data.
        data: Bytes,
    },
}

impl PasswordMessage {
    /// Password response to an `AuthenticationCleartextPassword` request.
    pub fn cleartext(password: impl Into<Bytes>) -> Self {
        Self::Password { password: password.into() }
    }

    /// Password response to an `AuthenticationMD5Password` request.
    pub fn md5(user: &[u8], password: &[u8], salt: [u8; 4]) -> Self {
        let hashed = hash_password(user, password, salt);
        Self::Password { password: Bytes::copy_from_slice(&hashed) }
    }

    /// Initial response of the selected SASL mechanism.
    pub fn sasl_initial(mechanism: SaslMechanism, data: Option<Bytes>) -> Self {
        Self::SaslInitialResponse { mechanism: Bytes::from_static(mechanism.name().as_bytes()), data }
    }

    pub fn kind(&self) -> PasswordKind {
        match self {
            Self::Password { .. } => PasswordKind::Password,
            Self::SaslInitialResponse { .. } => PasswordKind::SaslInitialResponse,
            Self::SaslResponse { .. } => PasswordKind::SaslResponse,
        }
    }

    /// The nul terminated part of the message, the password or the mechanism name.
    pub fn header(&self) -> Option<&Bytes> {
        match self {
            Self::Password { password } => Some(password),
            Self::SaslInitialResponse { mechanism, .. } => Some(mechanism),
            Self::SaslResponse { .. } => None,
        }
    }

    /// The SASL data of the message.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Password { .. } => None,
            Self::SaslInitialResponse { data, .. } => data.as_ref(),
            Self::SaslResponse { data } => Some(data),
        }
    }

    /// Decode the message body with a known layout.
    pub fn decode_as(body: &mut Payload, kind: PasswordKind) -> Result<Self> {
        match kind {
            PasswordKind::Password => {
                let password = body.read_nul_string()?;
                body.expect_remaining(0)?;
                Ok(Self::Password { password })
            },
            PasswordKind::SaslInitialResponse => {
                let mechanism = body.read_nul_string()?;
                let data = body.read_field()?;
                body.expect_remaining(0)?;
                Ok(Self::SaslInitialResponse { mechanism, data })
            },
            PasswordKind::SaslResponse => Ok(Self::SaslResponse { data: body.read_to_end() }),
        }
    }

    /// Decode the message body as the answer to an authentication request of `method`.
    ///
    /// Falls back to [`infer_kind`][PasswordMessage::infer_kind] when `method`
    /// expects no answer.
    pub fn decode_for(body: &mut Payload, method: AuthenticationMethod) -> Result<Self> {
        let kind = method
            .response_kind()
            .unwrap_or_else(|| Self::infer_kind(body.as_bytes()));
        Self::decode_as(body, kind)
    }

    /// Guess the layout of a message body from its structure.
    ///
    /// - a name, a nul, then an int32 length exactly covering the rest, or `-1`
    ///   with nothing after, is a SASL initial response
    /// - a single nul at the very end is a password
    /// - anything else is a SASL response
    pub fn infer_kind(body: &[u8]) -> PasswordKind {
        let Some(nul) = memchr::memchr(b'\0', body) else {
            return PasswordKind::SaslResponse;
        };

        let rest = &body[nul + 1..];
        if rest.is_empty() {
            return PasswordKind::Password;
        }

        if let Some((len, data)) = rest.split_first_chunk::<4>() {
            let len = i32::from_be_bytes(*len);
            let covered = match len {
                -1 => data.is_empty(),
                len => usize::try_from(len).is_ok_and(|len| len == data.len()),
            };
            if covered {
                return PasswordKind::SaslInitialResponse;
            }
        }

        PasswordKind::SaslResponse
    }
}

impl Message for PasswordMessage {
    const MSGTYPE: u8 = b'p';

    /// Decode the message body, inferring its layout with [`infer_kind`][PasswordMessage::infer_kind].
    ///
    /// Use [`decode_for`][PasswordMessage::decode_for] when the pending
    /// authentication request is known.
    fn decode(body: &mut Payload) -> Result<Self> {
        let kind = Self::infer_kind(body.as_bytes());
        Self::decode_as(body, kind)
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        match self {
            Self::Password { password } => buf.put_nul_bytes(password, true),
            Self::SaslInitialResponse { mechanism, data } => {
                buf.put_nul_bytes(mechanism, true);
                buf.put_field(data.as_deref())?;
            },
            Self::SaslResponse { data } => buf.put_bytes(data),
        }
        Ok(())
    }
}

impl Frontend for PasswordMessage { }
