use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

/// bcrypt hash at the configured work factor.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, config::config().security.password_hash_cost)?)
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_differ_per_salt() {
        let a = hash_password("secreto123").unwrap();
        let b = hash_password("secreto123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2"));
        assert!(verify_password("secreto123", &a));
        assert!(verify_password("secreto123", &b));
        assert!(!verify_password("otro", &a));
        assert!(!verify_password("secreto123", "malformed"));
    }
}
