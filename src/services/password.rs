use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Hashing failed: {0}")]
    Hash(String),

    #[error("Stored hash is malformed: {0}")]
    Malformed(String),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password with Argon2id and a fresh random salt, returning the PHC string
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(stored).map_err(|e| PasswordHashError::Malformed(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordHashError::Hash(e.to_string())),
    }
}

/// [`hash_password`] on the blocking pool, keeping Argon2 off the async workers
pub async fn hash_password_async(password: String) -> Result<String, PasswordHashError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_async(password: String, stored: String) -> Result<bool, PasswordHashError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter22"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(PasswordHashError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_async_hash_and_verify() {
        let hash = hash_password_async("s3cret!".to_string()).await.unwrap();

        assert!(verify_password_async("s3cret!".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password_async("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_async_verify_reports_malformed_hash() {
        let result = verify_password_async("x".to_string(), "plain".to_string()).await;
        assert!(matches!(result, Err(PasswordHashError::Malformed(_))));
    }
}
