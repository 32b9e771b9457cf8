use crate::error::{ProtocolError, Result};

/// Integer signess in postgres docs is awful.
pub trait UsizeExt {
    /// length is usize in rust, while postgres want i32,
    /// this will error when overflow instead of wrapping
    fn to_i32(self) -> Result<i32>;
    /// length is usize in rust, while sometime postgres want i16,
    /// this will error when overflow instead of wrapping
    fn to_i16(self) -> Result<i16>;
}

impl UsizeExt for usize {
    fn to_i32(self) -> Result<i32> {
        i32::try_from(self).map_err(|_| ProtocolError::FieldTooLarge(self))
    }

    fn to_i16(self) -> Result<i16> {
        i16::try_from(self).map_err(|_| ProtocolError::FieldTooLarge(self))
    }
}

/// Lowercase hex digits of `bytes` into `out`, which must be twice as long.
pub fn hex_into(bytes: &[u8], out: &mut [u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for (byte, pair) in bytes.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = HEX[usize::from(byte >> 4)];
        pair[1] = HEX[usize::from(byte & 0x0f)];
    }
}
