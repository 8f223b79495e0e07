//! # Bearer Token Store
//!
//! Holds the operator's JWT and persists it to a file in the platform config
//! directory, so a restarted register stays logged in.
//!
//! ## Request Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  before send                                                            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  token? ──no──► send without Authorization (server decides)             │
//! │     │ yes                                                               │
//! │     ▼                                                                   │
//! │  decode `exp` locally (no signature check)                              │
//! │     │                                                                   │
//! │     ├── exp <= now ──► clear token, fail with TokenExpired (not sent)   │
//! │     └── otherwise ───► send with `Authorization: Bearer <jwt>`          │
//! │                                                                         │
//! │  after send                                                             │
//! │     └── 401 ─────────► clear token, fail with Unauthorized              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The signature is never checked here; only the server can do that. The
//! local check just avoids sending requests that are bound to fail.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT without verifying its signature.
///
/// Returns `None` for tokens that are not JWTs or carry no `exp`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    data.claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

/// Whether the token is known to be expired at `now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token).map_or(false, |exp| exp <= now)
}

/// Shared bearer-token holder.
///
/// Cloning is cheap; clones share the same token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: Option<PathBuf>,
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// A store that lives only in memory.
    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            path: None,
            token: Arc::new(RwLock::new(token.filter(|t| !t.trim().is_empty()))),
        }
    }

    /// Loads the token persisted at `path`. A missing file means logged out.
    pub fn load(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref().to_path_buf();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                (!token.is_empty()).then_some(token)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), has_token = token.is_some(), "Token store loaded");

        Ok(Self {
            path: Some(path),
            token: Arc::new(RwLock::new(token)),
        })
    }

    /// Stores a new token (after login) and persists it.
    pub async fn set(&self, token: impl Into<String>) -> ApiResult<()> {
        let token = token.into();
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &token)?;
        }
        *self.token.write().await = Some(token);
        info!("Session token stored");
        Ok(())
    }

    /// Forgets the token and deletes the persisted copy.
    pub async fn clear(&self) {
        *self.token.write().await = None;
        if let Some(path) = &self.path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to delete token file");
                }
            }
        }
    }

    /// Current token, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Value for the `Authorization` header, checking expiry at `now`.
    ///
    /// An expired token is cleared and the call fails with
    /// [`ApiError::TokenExpired`].
    pub async fn authorization_at(&self, now: DateTime<Utc>) -> ApiResult<Option<String>> {
        let token = match self.token().await {
            Some(token) => token,
            None => return Ok(None),
        };

        if is_expired_at(&token, now) {
            warn!("Session token expired, clearing it before sending");
            self.clear().await;
            return Err(ApiError::TokenExpired);
        }

        Ok(Some(format!("Bearer {}", token)))
    }

    /// [`TokenStore::authorization_at`] against the wall clock.
    pub async fn authorization(&self) -> ApiResult<Option<String>> {
        self.authorization_at(Utc::now()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
