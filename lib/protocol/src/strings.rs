//! Fixed-width, NUL-padded string fields (`username[32]`, `name[32]`, ...).
//!
//! The wire format has no length prefix for these — the field is always
//! exactly `N` bytes, truncated or zero-padded, mirroring the original's
//! `char[N]` layout.

use rtype_common::{ErrorType, NetworkError, NetworkResult};

/// Writes `s` into exactly `width` bytes, truncating at `width` UTF-8 bytes
/// and zero-padding the rest. A string that exactly fills `width` carries no
/// trailing NUL, matching the original's `strncpy`-style `char[N]` layout.
pub fn write_fixed(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(width);
    out.extend_from_slice(&bytes[..copy_len]);
    out.resize(out.len() + (width - copy_len), 0);
}

/// Reads a fixed-width field back out, stopping at the first NUL byte (or
/// the field width if there isn't one) and lossily decoding the rest.
pub fn read_fixed(data: &[u8]) -> String {
    let nul_pos = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..nul_pos]).into_owned()
}

pub fn expect_len(data: &[u8], expected: usize) -> NetworkResult<()> {
    if data.len() < expected {
        Err(NetworkError::Fatal(ErrorType::Decoding))
    } else {
        Ok(())
    }
}
