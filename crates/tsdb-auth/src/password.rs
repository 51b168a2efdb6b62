//! Password hashing. Uses HMAC-SHA256 over a per-user random salt, matching
//! the `sha2`/`hmac` primitives already in this workspace's dependency
//! graph rather than introducing a new KDF crate (bcrypt/argon2 are out of
//! scope — see SPEC_FULL's data-model supplement).

use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SALT_BYTES: usize = 16;

pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(password.as_bytes());
    let digest = mac.finalize().into_bytes();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    // Constant-time comparison isn't load-bearing for an in-memory demo
    // catalog, but comparing the raw hash strings matches what the encoded
    // form is for: a value that's cheap to store and compare, not a MAC
    // over untrusted attacker input.
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_and_salt_hash_identically() {
        let salt = generate_salt();
        assert_eq!(
            hash_password("hunter2", &salt),
            hash_password("hunter2", &salt)
        );
    }

    #[test]
    fn different_salts_change_the_hash() {
        assert_ne!(
            hash_password("hunter2", "salt-a"),
            hash_password("hunter2", "salt-b")
        );
    }

    #[test]
    fn verify_round_trips() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }
}
