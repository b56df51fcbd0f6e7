use libsodium_sys;
use std::ffi::CString;
use std::sync::Once;

static SODIUM_INIT: Once = Once::new();

/// Initializes libsodium. Safe to call repeatedly; the actual initialization
/// only happens once. Every public function in this module calls this first,
/// matching the teacher's `#[ctor]`-based eager init but without requiring a
/// binary constructor (harder to reason about across platforms).
#[inline]
fn ensure_init() {
    SODIUM_INIT.call_once(|| unsafe {
        if libsodium_sys::sodium_init() < 0 {
            panic!("libsodium initialization failed");
        }
    });
}

/// Hashes a plaintext password into a self-describing Argon2id string
/// (algorithm, cost parameters and salt are all embedded), suitable for
/// storage in the `users` table and later verification with [`verify_password`].
pub fn hash_password(password: &str) -> Result<String, ()> {
    ensure_init();

    let passwd = CString::new(password).map_err(|_| ())?;
    let mut out = vec![0u8; libsodium_sys::crypto_pwhash_STRBYTES as usize];

    let result = unsafe {
        libsodium_sys::crypto_pwhash_str(
            out.as_mut_ptr() as *mut i8,
            passwd.as_ptr(),
            password.len() as u64,
            libsodium_sys::crypto_pwhash_OPSLIMIT_INTERACTIVE as u64,
            libsodium_sys::crypto_pwhash_MEMLIMIT_INTERACTIVE as usize,
        )
    };

    if result != 0 {
        return Err(());
    }

    // out is a NUL-terminated C string; trim at the first NUL before lossy-decoding.
    let nul_pos = out.iter().position(|&b| b == 0).unwrap_or(out.len());
    Ok(String::from_utf8_lossy(&out[..nul_pos]).into_owned())
}

/// Verifies a plaintext password against a hash produced by [`hash_password`].
/// Returns `false` (never panics/errors) on any malformed hash — a corrupt
/// stored hash must behave like a wrong password, not crash the caller.
pub fn verify_password(hash: &str, password: &str) -> bool {
    ensure_init();

    let hash_c = match CString::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let passwd = match CString::new(password) {
        Ok(p) => p,
        Err(_) => return false,
    };

    let result = unsafe {
        libsodium_sys::crypto_pwhash_str_verify(hash_c.as_ptr(), passwd.as_ptr(), password.len() as u64)
    };

    result == 0
}

/// Fills the provided buffer with cryptographically secure random bytes.
#[inline]
pub fn random_bytes(out: &mut [u8]) {
    ensure_init();
    unsafe {
        libsodium_sys::randombytes_buf(out.as_mut_ptr() as *mut ::std::ffi::c_void, out.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password(&hash, "correct horse battery staple"));
        assert!(!verify_password(&hash, "wrong password"));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("not a real hash", "anything"));
    }

    #[test]
    fn random_bytes_are_not_all_zero() {
        let mut buf = [0u8; 32];
        random_bytes(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
