//! # till-api: REST Client for Till POS
//!
//! Owns every HTTP exchange with the POS backend: bearer authentication with
//! a local expiry check, a single response-envelope normalizer, and the
//! [`PosApi`] trait that orchestration code depends on.
//!
//! ## Modules
//!
//! - [`client`] - `PosApi` trait and its `reqwest` implementation
//! - [`auth`] - Persisted bearer token with JWT expiry check
//! - [`envelope`] - Bare / `{data}` / `{content}` unwrapping
//! - [`dto`] - Validation and payment wire types
//! - [`error`] - `ApiError`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use till_api::{ClientOptions, HttpPosApi, PosApi, TokenStore};
//!
//! # async fn run() -> till_api::ApiResult<()> {
//! let tokens = TokenStore::load("/tmp/till/token")?;
//! let api = HttpPosApi::new(
//!     ClientOptions { base_url: "http://localhost:8080/api/v1".into(), timeout: None },
//!     tokens,
//! )?;
//! let promotions = api.active_promotions(1).await?;
//! println!("{} active promotions", promotions.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod dto;
pub mod envelope;
pub mod error;

pub use auth::TokenStore;
pub use client::{ClientOptions, HttpPosApi, PosApi};
pub use dto::{PaymentRequest, PaymentResponse, PaymentVerification, ValidationResponse};
pub use error::{ApiError, ApiResult};
