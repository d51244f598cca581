use bcrypt::{hash, verify, BcryptResult, DEFAULT_COST};

/// Hashes a password for a passwd file line.
pub fn hash_password(password: &str) -> BcryptResult<String> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    verify(password, hashed_password).unwrap_or(false)
}
