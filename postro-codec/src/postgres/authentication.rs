//! Authentication request and SASL mechanism negotiation.
//!
//! Authentication flows as the following, the sequencing itself is left to the caller:
//!
//! ```text
//! Start -> Authentication(method)
//!   CleartextPassword -> PasswordMessage::Password
//!   Md5Password       -> PasswordMessage::Password
//!   SASL              -> PasswordMessage::SaslInitialResponse
//!                        -> SaslContinue <-> PasswordMessage::SaslResponse
//!                        -> SaslFinal
//!   -> Ok
//! ```
use std::fmt;

use bytes::Bytes;

use super::{Backend, Message, PasswordKind};
use crate::{
    buffer::{Payload, WriteBuffer},
    error::{ProtocolError, Result},
};

/// Identifies the message as an authentication request.
///
/// format: `b'R'`
///
/// <https://www.postgresql.org/docs/current/protocol-message-formats.html#PROTOCOL-MESSAGE-FORMATS>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Int32(8) Length of message contents in bytes, including self.
    /// Int32(0) Specifies that the authentication was successful.
    Ok,
    /// Int32(8) Length of message contents in bytes, including self.
    /// Int32(3) Specifies that a clear-text password is required.
    CleartextPassword,
    /// Int32(12) Length of message contents in bytes, including self.
    /// Int32(5) Specifies that an MD5-encrypted password is required.
    Md5Password {
        /// The salt to use when encrypting the password.
        salt: [u8; 4],
    },
    /// Specifies that SASL authentication is required.
    Sasl {
        /// The message body is a list of SASL authentication mechanisms, in the server's order of preference.
        ///
        /// A zero byte is required as terminator after the last authentication mechanism name.
        mechanisms: SaslMechanisms,
    },
    /// Specifies that this message contains a SASL challenge.
    SaslContinue {
        /// SASL data, specific to the SASL mechanism being used.
        data: Bytes,
    },
    /// Specifies that SASL authentication has completed.
    SaslFinal {
        /// SASL outcome "additional data", specific to the SASL mechanism being used.
        data: Bytes,
    },
}

impl Authentication {
    pub fn method(&self) -> AuthenticationMethod {
        match self {
            Self::Ok => AuthenticationMethod::Ok,
            Self::CleartextPassword => AuthenticationMethod::CleartextPassword,
            Self::Md5Password { .. } => AuthenticationMethod::Md5Password,
            Self::Sasl { .. } => AuthenticationMethod::Sasl,
            Self::SaslContinue { .. } => AuthenticationMethod::SaslContinue,
            Self::SaslFinal { .. } => AuthenticationMethod::SaslFinal,
        }
    }
}

impl Message for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode(body: &mut Payload) -> Result<Self> {
        let auth = match AuthenticationMethod::from_code(body.read_i32()?)? {
            AuthenticationMethod::Ok => Self::Ok,
            AuthenticationMethod::CleartextPassword => Self::CleartextPassword,
            AuthenticationMethod::Md5Password => {
                body.expect_remaining(4)?;
                let mut salt = [0u8; 4];
                salt.copy_from_slice(&body.read_exact(4)?);
                Self::Md5Password { salt }
            },
            AuthenticationMethod::Sasl => {
                let mut mechanisms = SaslMechanisms::default();
                loop {
                    let name = body.read_nul_bytes(true)?;
                    if name.is_empty() {
                        break;
                    }
                    match SaslMechanism::from_name(&name) {
                        Some(mechanism) => mechanisms.insert(mechanism),
                        None => return Err(ProtocolError::UnknownSaslMechanism(name)),
                    }
                }
                Self::Sasl { mechanisms }
            },
            AuthenticationMethod::SaslContinue => Self::SaslContinue { data: body.read_to_end() },
            AuthenticationMethod::SaslFinal => Self::SaslFinal { data: body.read_to_end() },
        };
        Ok(auth)
    }

    fn encode_body(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.put_i32(self.method().code());
        match self {
            Self::Ok | Self::CleartextPassword => { },
            Self::Md5Password { salt } => buf.put_bytes(salt),
            Self::Sasl { mechanisms } => {
                for mechanism in mechanisms.iter() {
                    buf.put_nul_bytes(mechanism.name().as_bytes(), true);
                }
                buf.put_u8(b'\0');
            },
            Self::SaslContinue { data } | Self::SaslFinal { data } => buf.put_bytes(data),
        }
        Ok(())
    }
}

impl Backend for Authentication { }

/// Authentication method code of an [`Authentication`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    Ok,
    CleartextPassword,
    Md5Password,
    Sasl,
    SaslContinue,
    SaslFinal,
}

impl AuthenticationMethod {
    /// Returns the wire code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::CleartextPassword => 3,
            Self::Md5Password => 5,
            Self::Sasl => 10,
            Self::SaslContinue => 11,
            Self::SaslFinal => 12,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Ok),
            3 => Ok(Self::CleartextPassword),
            5 => Ok(Self::Md5Password),
            10 => Ok(Self::Sasl),
            11 => Ok(Self::SaslContinue),
            12 => Ok(Self::SaslFinal),
            code => Err(ProtocolError::UnknownAuthenticationMethod(code)),
        }
    }

    /// The shape of the [`PasswordMessage`][super::PasswordMessage] a frontend answers this request with.
    ///
    /// Returns `None` when the request expects no answer.
    pub fn response_kind(&self) -> Option<PasswordKind> {
        match self {
            Self::CleartextPassword | Self::Md5Password => Some(PasswordKind::Password),
            Self::Sasl => Some(PasswordKind::SaslInitialResponse),
            Self::SaslContinue => Some(PasswordKind::SaslResponse),
            Self::Ok | Self::SaslFinal => None,
        }
    }
}

impl fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::CleartextPassword => "Plaintext",
            Self::Md5Password => "MD5",
            Self::Sasl => "SASL",
            Self::SaslContinue => "SaslContinue",
            Self::SaslFinal => "SaslFinal",
        })
    }
}

/// Supported SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaslMechanism {
    /// `SCRAM-SHA-256`
    ScramSha256,
    /// `SCRAM-SHA-256-PLUS`, SCRAM with channel binding.
    ScramSha256Plus,
}

impl SaslMechanism {
    pub const SCRAM_SHA_256: &str = "SCRAM-SHA-256";
    pub const SCRAM_SHA_256_PLUS: &str = "SCRAM-SHA-256-PLUS";

    pub fn name(&self) -> &'static str {
        match self {
            Self::ScramSha256 => Self::SCRAM_SHA_256,
            Self::ScramSha256Plus => Self::SCRAM_SHA_256_PLUS,
        }
    }

    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"SCRAM-SHA-256" => Some(Self::ScramSha256),
            b"SCRAM-SHA-256-PLUS" => Some(Self::ScramSha256Plus),
            _ => None,
        }
    }
}

impl fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of SASL mechanisms offered by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaslMechanisms {
    pub scram_sha_256: bool,
    pub scram_sha_256_plus: bool,
}

impl SaslMechanisms {
    pub fn insert(&mut self, mechanism: SaslMechanism) {
        match mechanism {
            SaslMechanism::ScramSha256 => self.scram_sha_256 = true,
            SaslMechanism::ScramSha256Plus => self.scram_sha_256_plus = true,
        }
    }

    pub fn contains(&self, mechanism: SaslMechanism) -> bool {
        match mechanism {
            SaslMechanism::ScramSha256 => self.scram_sha_256,
            SaslMechanism::ScramSha256Plus => self.scram_sha_256_plus,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.scram_sha_256 && !self.scram_sha_256_plus
    }

    /// Offered mechanisms, in wire order.
    pub fn iter(&self) -> impl Iterator<Item = SaslMechanism> + '_ {
        [SaslMechanism::ScramSha256, SaslMechanism::ScramSha256Plus]
            .into_iter()
            .filter(|mechanism| self.contains(*mechanism))
    }

    /// Pick the mechanism a frontend should use.
    ///
    /// `SCRAM-SHA-256-PLUS` is only selected when the frontend can provide
    /// channel binding data.
    pub fn select(&self, channel_binding: bool) -> Option<SaslMechanism> {
        if channel_binding && self.scram_sha_256_plus {
            return Some(SaslMechanism::ScramSha256Plus);
        }
        self.scram_sha_256.then_some(SaslMechanism::ScramSha256)
    }
}

impl FromIterator<SaslMechanism> for SaslMechanisms {
    fn from_iter<T: IntoIterator<Item = SaslMechanism>>(iter: T) -> Self {
        let mut me = Self::default();
        for mechanism in iter {
            me.insert(mechanism);
        }
        me
    }
}
