use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    // Verified against when the email is unknown so both branches pay for one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash("recipe-api-dummy-password").ok();
}

pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!("password hashing failed: {e}")
        })?
        .to_string();
    Ok(hash)
}

/// False for a wrong password and for a stored value that is not a PHC string.
pub fn verify(plain: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "stored password hash is unusable");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Runs one verification against a throwaway hash and discards the result.
pub fn verify_dummy(plain: &str) {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        let _ = verify(plain, dummy);
    }
}
