//! Password hashing via bcrypt.

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 12;

/// Hash of a throwaway password at `BCRYPT_COST`, verified against when no user matches.
pub const DUMMY_HASH: &str = "$2b$12$eqJ8i/3.ohhpiAkAambQt.uXR/O2eJgalWsiJhWEeARFBf2URfE82";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("password verification task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Hash a password with bcrypt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// Verify a password against a bcrypt hash on the blocking pool.
/// A mismatch is `Ok(false)`; only an unreadable hash is an error.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(verified)
}
