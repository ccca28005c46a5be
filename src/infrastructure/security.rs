// Password hashing and credential generation

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use base64::Engine;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::{AppError, AppResult};

const TOKEN_BYTES: usize = 30;
pub const SHORT_CODE_LEN: usize = 6;

/// Argon2 hasher peppered with the server's `SECRET_KEY`.
#[derive(Clone)]
pub struct PasswordService {
    secret: String,
}

impl PasswordService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn argon2(&self) -> AppResult<Argon2<'_>> {
        Argon2::new_with_secret(
            self.secret.as_bytes(),
            Algorithm::default(),
            Version::default(),
            Params::default(),
        )
        .map_err(|e| AppError::Internal(format!("Failed to configure argon2: {}", e)))
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Stored password hash is malformed: {}", e)))?;
        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Opaque API token key, URL-safe.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Random alphanumeric code used in recipe short links.
pub fn generate_short_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_CODE_LEN)
        .map(char::from)
        .collect()
}
