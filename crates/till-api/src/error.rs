//! # API Error Types
//!
//! Everything that can go wrong between the register and the backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       API Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │  Auth           │  │   Transport     │  │     Response            │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  TokenExpired   │  │  Http           │  │  Server{status,message} │  │
//! │  │  Unauthorized   │  │  InvalidUrl     │  │  InvalidResponse        │  │
//! │  │  TokenStorage   │  │                 │  │  Serialization          │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Generic message shown when the server gave none.
pub const GENERIC_ERROR_MESSAGE: &str = "Đã có lỗi xảy ra, vui lòng thử lại";

/// Message shown when the session is over and the operator must log in again.
pub const SESSION_EXPIRED_MESSAGE: &str = "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại";

#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Auth Errors
    // =========================================================================
    /// The stored token expired; the request was never sent.
    #[error("Session token expired")]
    TokenExpired,

    /// The server answered 401. The stored token has been cleared.
    #[error("Unauthorized")]
    Unauthorized,

    /// Reading or writing the token file failed.
    #[error("Token storage error: {0}")]
    TokenStorage(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Connection, timeout or TLS failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A base URL or path could not be joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// Non-success status. `message` is the server's own text when it sent one.
    #[error("Server returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    /// Body did not match any known envelope shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request body could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::TokenStorage(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ApiError {
    /// Returns true if the same request could succeed on a later attempt.
    ///
    /// ## Retryable Errors
    /// - Transport failures
    /// - 5xx responses, 408 and 429
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http(_) => true,
            ApiError::Server { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Returns true if the operator has to log in again.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::TokenExpired | ApiError::Unauthorized)
    }

    /// The server's own message, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text for the operator: the server's message when present, otherwise a
    /// generic localized string.
    pub fn user_message(&self) -> String {
        if self.is_auth_error() {
            return SESSION_EXPIRED_MESSAGE.to_string();
        }
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
