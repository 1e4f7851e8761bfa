use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::Key;
use sha2::{Digest, Sha512};

use crate::error::{AppError, Result};

/// Everything `serve` needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// sqlx connection string, e.g. `sqlite://shift_scheduler.db`
    pub database_url: String,
    /// Signs session cookies. Without it a random key is used and sessions
    /// do not survive a restart.
    pub session_secret: Option<String>,
    /// Mark the session cookie `Secure` (HTTPS only)
    pub secure_cookies: bool,
    pub password_hash_cost: u32,
    /// Fixed seed for option generation; entropy when unset
    pub seed: Option<u64>,
    pub static_dir: PathBuf,
    /// How long a login stays valid, checked server-side on every request
    pub session_ttl: Duration,
    /// Google sign-in; disabled when unset
    pub google: Option<GoogleConfig>,
}

/// OAuth client registered with Google.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered for the client
    pub redirect_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5003,
            database_url: "sqlite://shift_scheduler.db".to_string(),
            session_secret: None,
            secure_cookies: false,
            password_hash_cost: bcrypt::DEFAULT_COST,
            seed: None,
            static_dir: PathBuf::from("static"),
            session_ttl: Duration::from_secs(3600),
            google: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.password_hash_cost) {
            return Err(AppError::Validation(format!(
                "bcrypt cost must be between 4 and 31, got {}",
                self.password_hash_cost
            )));
        }
        if self.session_secret.as_deref().is_some_and(|s| s.len() < 32) {
            return Err(AppError::Validation(
                "session secret must be at least 32 characters".to_string(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(AppError::Validation("session TTL must be positive".to_string()));
        }
        if let Some(google) = &self.google {
            if google.client_id.trim().is_empty() || google.client_secret.trim().is_empty() {
                return Err(AppError::Validation(
                    "Google client id and secret must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Cookie signing key: a SHA-512 of the configured secret, or a random key.
    pub fn session_key(&self) -> Key {
        match &self.session_secret {
            Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
            None => {
                tracing::warn!("No session secret configured, sessions will not survive a restart");
                Key::generate()
            }
        }
    }
}
