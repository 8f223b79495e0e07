//! # POS Backend Client
//!
//! [`PosApi`] is the seam between orchestration and the network. The real
//! implementation, [`HttpPosApi`], talks JSON over HTTPS with `reqwest`;
//! orchestration tests substitute an in-memory fake.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  endpoint method                                                        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  TokenStore::authorization()  ── expired ──► Err(TokenExpired)          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  reqwest send                 ── io/tls  ──► Err(Http)                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  status 401                   ───────────► clear token, Err(Unauthorized)│
//! │  status !2xx                  ───────────► Err(Server{status, message}) │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  envelope::unwrap_payload / unwrap_list ──► canonical type              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use till_core::{CheckoutRequest, EntityId, HoldBillRequest, HoldPaymentMethod, Invoice, Promotion};
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenStore;
use crate::dto::{PaymentRequest, PaymentResponse, PaymentVerification, ValidationResponse};
use crate::envelope;
use crate::error::{ApiError, ApiResult};

/// Query parameter carrying the payment method when completing a held bill.
pub const HOLD_PAYMENT_PARAM: &str = "phuongThucThanhToan";

// =============================================================================
// API Trait
// =============================================================================

/// Every backend call the checkout core makes.
#[async_trait]
pub trait PosApi: Send + Sync {
    /// `POST /pos/checkout/validate`
    async fn validate_checkout(&self, request: &CheckoutRequest) -> ApiResult<ValidationResponse>;

    /// `POST /pos/checkout`
    async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Invoice>;

    /// `POST /pos/checkout/hold`
    async fn hold(&self, request: &HoldBillRequest) -> ApiResult<Invoice>;

    /// `PUT /pos/invoices/{id}/update-pending`
    async fn update_pending(&self, invoice_id: EntityId, request: &HoldBillRequest)
        -> ApiResult<Invoice>;

    /// `GET /pos/invoices/{id}/resume`
    async fn resume(&self, invoice_id: EntityId) -> ApiResult<Invoice>;

    /// `POST /pos/invoices/{id}/complete?phuongThucThanhToan=...`
    async fn complete_pending(
        &self,
        invoice_id: EntityId,
        method: HoldPaymentMethod,
    ) -> ApiResult<Invoice>;

    /// `POST /pos/invoices/{id}/cancel-pending`
    async fn cancel_pending(&self, invoice_id: EntityId) -> ApiResult<()>;

    /// `POST /pos/payments/process`
    async fn process_payment(&self, request: &PaymentRequest) -> ApiResult<PaymentResponse>;

    /// `GET /pos/payments/verify/{transactionId}`
    async fn verify_payment(&self, transaction_id: &str) -> ApiResult<PaymentVerification>;

    /// `GET /pos/promotions/branch/{branchId}/active`
    async fn active_promotions(&self, branch_id: EntityId) -> ApiResult<Vec<Promotion>>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Connection settings for [`HttpPosApi`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Versioned API root, e.g. `http://localhost:8080/api/v1`.
    pub base_url: String,
    /// `None` leaves requests without a client-side timeout.
    pub timeout: Option<Duration>,
}

/// [`PosApi`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPosApi {
    client: Client,
    base_url: Url,
    tokens: TokenStore,
}

impl HttpPosApi {
    pub fn new(options: ClientOptions, tokens: TokenStore) -> ApiResult<Self> {
        let base_url = Url::parse(options.base_url.trim_end_matches('/'))?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Token store shared with the login flow.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
    }

    /// Attaches the bearer token, sends, and returns the raw JSON body.
    async fn send(&self, builder: RequestBuilder) -> ApiResult<Value> {
        let builder = match self.tokens.authorization().await? {
            Some(bearer) => builder.header(header::AUTHORIZATION, bearer),
            None => builder,
        };

        let response = builder.send().await?;
        self.read(response).await
    }

    async fn read(&self, response: Response) -> ApiResult<Value> {
        let status = response.status();
        let url = response.url().path().to_string();

        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %url, "Backend rejected the session token");
            self.tokens.clear().await;
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await?;

        if !status.is_success() {
            let message = envelope::error_message(&text);
            debug!(path = %url, status = status.as_u16(), ?message, "Request failed");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        debug!(path = %url, status = status.as_u16(), "Request succeeded");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path)?;
        let body = self.send(self.request(Method::GET, url)).await?;
        envelope::unwrap_payload(body)
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path)?;
        let body = self.send(self.request(Method::POST, url).json(body)).await?;
        envelope::unwrap_payload(body)
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path)?;
        let body = self.send(self.request(Method::PUT, url).json(body)).await?;
        envelope::unwrap_payload(body)
    }
}

/// Statuses the validate endpoint uses to say "no" with a reason list.
fn is_rejection(status: u16) -> bool {
    matches!(status, 400 | 409 | 422)
}

#[async_trait]
impl PosApi for HttpPosApi {
    async fn validate_checkout(&self, request: &CheckoutRequest) -> ApiResult<ValidationResponse> {
        let url = self.url("pos/checkout/validate")?;
        match self.send(self.request(Method::POST, url).json(request)).await {
            Ok(body) => envelope::unwrap_payload(body),
            Err(ApiError::Server { status, message }) if is_rejection(status) => {
                Ok(ValidationResponse::rejected(message.into_iter().collect()))
            }
            Err(e) => Err(e),
        }
    }

    async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Invoice> {
        self.post("pos/checkout", request).await
    }

    async fn hold(&self, request: &HoldBillRequest) -> ApiResult<Invoice> {
        self.post("pos/checkout/hold", request).await
    }

    async fn update_pending(
        &self,
        invoice_id: EntityId,
        request: &HoldBillRequest,
    ) -> ApiResult<Invoice> {
        self.put(&format!("pos/invoices/{}/update-pending", invoice_id), request)
            .await
    }

    async fn resume(&self, invoice_id: EntityId) -> ApiResult<Invoice> {
        self.get(&format!("pos/invoices/{}/resume", invoice_id)).await
    }

    async fn complete_pending(
        &self,
        invoice_id: EntityId,
        method: HoldPaymentMethod,
    ) -> ApiResult<Invoice> {
        let mut url = self.url(&format!("pos/invoices/{}/complete", invoice_id))?;
        url.query_pairs_mut()
            .append_pair(HOLD_PAYMENT_PARAM, method.as_code());
        let body = self.send(self.request(Method::POST, url)).await?;
        envelope::unwrap_payload(body)
    }

    async fn cancel_pending(&self, invoice_id: EntityId) -> ApiResult<()> {
        let url = self.url(&format!("pos/invoices/{}/cancel-pending", invoice_id))?;
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    async fn process_payment(&self, request: &PaymentRequest) -> ApiResult<PaymentResponse> {
        self.post("pos/payments/process", request).await
    }

    async fn verify_payment(&self, transaction_id: &str) -> ApiResult<PaymentVerification> {
        let mut url = self.url("pos/payments/verify")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .push(transaction_id);
        let body = self.send(self.request(Method::GET, url)).await?;
        envelope::unwrap_payload(body)
    }

    async fn active_promotions(&self, branch_id: EntityId) -> ApiResult<Vec<Promotion>> {
        let url = self.url(&format!("pos/promotions/branch/{}/active", branch_id))?;
        let body = self.send(self.request(Method::GET, url)).await?;
        envelope::unwrap_list(body)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpPosApi {
        HttpPosApi::new(
            ClientOptions {
                base_url: base.to_string(),
                timeout: None,
            },
            TokenStore::in_memory(None),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joining_keeps_version_prefix() {
        let api = api("http://localhost:8080/api/v1/");
        assert_eq!(
            api.url("pos/checkout/hold").unwrap().as_str(),
            "http://localhost:8080/api/v1/pos/checkout/hold"
        );
        assert_eq!(
            api.url("/pos/invoices/7/resume").unwrap().as_str(),
            "http://localhost:8080/api/v1/pos/invoices/7/resume"
        );
    }

    #[test]
    fn test_complete_url_carries_hold_method() {
        let api = api("http://localhost:8080/api/v1");
        let mut url = api.url("pos/invoices/7/complete").unwrap();
        url.query_pairs_mut()
            .append_pair(HOLD_PAYMENT_PARAM, HoldPaymentMethod::ChuyenKhoan.as_code());
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/pos/invoices/7/complete?phuongThucThanhToan=CHUYEN_KHOAN"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpPosApi::new(
            ClientOptions {
                base_url: "not a url".to_string(),
                timeout: None,
            },
            TokenStore::in_memory(None),
        );
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejection_statuses() {
        assert!(is_rejection(400));
        assert!(is_rejection(422));
        assert!(!is_rejection(500));
    }
}
