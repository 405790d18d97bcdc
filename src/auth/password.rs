/// Password Hashing and Verification
///
/// Credentials are stored as a lowercase hex SHA3-512 digest of
/// `password || SALT`. The salt is one application-wide constant, so stored
/// digests stay stable across restarts and hosts.

use sha3::{Digest, Sha3_512};

/// Application-wide salt appended to every password before hashing
pub const SALT: &str = "crm-system";

/// Hash a password for storage
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha3_512::new();
    hasher.update(password.as_bytes());
    hasher.update(SALT.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a candidate password against a stored digest
pub fn verify_password(candidate: &str, stored_hash: &str) -> bool {
    hash_password(candidate) == stored_hash
}
