//! Registered users for the search shell
//!
//! Provides:
//! - Registration with argon2 hashing and a fresh random salt per user
//! - Password verification for login
//! - JSON file persistence (`username -> PHC hash string`)

use crate::errors::{AppError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 64;

/// File-backed user store
pub struct UserStore {
    path: PathBuf,
    users: BTreeMap<String, String>,
}

/// Hash a password with a newly generated salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC hash string
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

impl UserStore {
    /// Open the store; a missing or unreadable file yields an empty store
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let users = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "User store is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "User store unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self { path, users }
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check that a new username is well formed and free; returns it trimmed
    pub fn check_new_username<'a>(&self, username: &'a str) -> Result<&'a str> {
        let username = username.trim();

        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(AppError::Validation {
                message: format!("username must be 1-{} characters", MAX_USERNAME_LEN),
                field: Some("username".to_string()),
            });
        }
        if username.contains('|') || username.chars().any(char::is_whitespace) {
            return Err(AppError::Validation {
                message: "username may not contain whitespace or '|'".to_string(),
                field: Some("username".to_string()),
            });
        }
        if self.users.contains_key(username) {
            return Err(AppError::DuplicateUser {
                username: username.to_string(),
            });
        }
        Ok(username)
    }

    /// Register a new user and persist the store
    pub fn register(&mut self, username: &str, password: &str) -> Result<()> {
        let username = self.check_new_username(username)?;

        if password.is_empty() {
            return Err(AppError::Validation {
                message: "password must not be empty".to_string(),
                field: Some("password".to_string()),
            });
        }
        let hash = hash_password(password)?;
        self.users.insert(username.to_string(), hash);
        self.save()?;

        info!(username, "User registered");
        Ok(())
    }

    /// Verify credentials; returns the normalized username on success
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let username = username.trim();
        let stored = self.users.get(username).ok_or_else(|| AppError::UserNotFound {
            username: username.to_string(),
        })?;

        if verify_password(password, stored) {
            info!(username, "User logged in");
            Ok(username.to_string())
        } else {
            Err(AppError::Unauthorized {
                message: "wrong password".to_string(),
            })
        }
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.users)?;
        std::fs::write(&self.path, json).map_err(|e| AppError::Storage {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}
