//! Credential hashing.
//!
//! Only the MD5 scheme is computed here, SASL mechanisms are negotiated in
//! [`authentication`][crate::postgres::authentication] but their exchange is
//! left to the caller.
use md5::{Digest, Md5};

use crate::ext::hex_into;

/// Length of an MD5 password response, `md5` followed by 32 hex digits.
pub const MD5_PASSWORD_LEN: usize = 3 + 32;

/// Compute the password response to an `AuthenticationMD5Password` request.
///
/// `"md5" || hex(md5(hex(md5(password || user)) || salt))`
pub fn hash_password(user: &[u8], password: &[u8], salt: [u8; 4]) -> [u8; MD5_PASSWORD_LEN] {
    let mut inner = [0u8; 32];
    let mut hasher = Md5::new();
    hasher.update(password);
    hasher.update(user);
    hex_into(&hasher.finalize(), &mut inner);

    let mut hasher = Md5::new();
    hasher.update(inner);
    hasher.update(salt);

    let mut out = [0u8; MD5_PASSWORD_LEN];
    out[..3].copy_from_slice(b"md5");
    hex_into(&hasher.finalize(), &mut out[3..]);
    out
}

/// Check a password response received from a frontend against the known credential.
pub fn password_matches(candidate: &[u8], user: &[u8], password: &[u8], salt: [u8; 4]) -> bool {
    candidate == hash_password(user, password, salt)
}
