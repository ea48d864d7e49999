//! `reqwest` implementation of the backend contract.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{
    ApiEnvelope, AuthPayload, LoginRequest, MerchantPaymentRequest, ProfilePayload,
    RegistrationForm, SearchPayload, SendMoneyRequest, StkPushRequest, TransactionAck,
};
use super::{AuthApi, DirectoryApi, TransactionExecutor};
use crate::config::ApiConfig;
use crate::core_types::Recipient;
use crate::session::AuthToken;

/// HTTP client for the wallet backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/mpesa/transaction/:id/status`, with the id escaped as one segment.
    fn status_url(&self, transaction_id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url("/mpesa/transaction"))
            .map_err(|e| ApiError::Network(format!("Invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network("Invalid base url".to_string()))?
            .push(transaction_id)
            .push("status");
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            warn!(endpoint = endpoint, error = %e, "Backend request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint = endpoint, status = status.as_u16(), "Backend response");

        decode_envelope(status, &body)
    }
}

/// Map an HTTP status and body onto the envelope contract.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, ApiError> {
    let envelope: Option<ApiEnvelope<serde_json::Value>> = serde_json::from_str(body).ok();

    if status == StatusCode::UNAUTHORIZED {
        let message = envelope
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Session expired".to_string());
        return Err(ApiError::Unauthorized(message));
    }

    let Some(envelope) = envelope else {
        return Err(if status.is_success() {
            ApiError::Decode("response is not a JSON envelope".to_string())
        } else {
            ApiError::Rejected {
                status: status.as_u16(),
                code: None,
                message: format!("Request failed with status {}", status.as_u16()),
            }
        });
    };

    if !status.is_success() || !envelope.success {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            code: envelope.code,
            message: envelope
                .message
                .unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        let builder = self.client.post(self.url("/auth/login")).json(request);
        self.execute("auth/login", builder).await
    }

    async fn register(&self, form: &RegistrationForm) -> Result<AuthPayload, ApiError> {
        let builder = self.client.post(self.url("/auth/register")).json(form);
        self.execute("auth/register", builder).await
    }

    async fn profile(&self, token: &AuthToken) -> Result<ProfilePayload, ApiError> {
        let builder = self
            .client
            .get(self.url("/auth/profile"))
            .bearer_auth(token.expose());
        self.execute("auth/profile", builder).await
    }

    async fn revoke(&self, token: &AuthToken) -> Result<(), ApiError> {
        let builder = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token.expose());
        self.execute::<serde_json::Value>("auth/logout", builder)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl DirectoryApi for HttpBackend {
    async fn search_users(
        &self,
        token: &AuthToken,
        query: &str,
    ) -> Result<Vec<Recipient>, ApiError> {
        let builder = self
            .client
            .get(self.url("/users/search"))
            .query(&[("q", query)])
            .bearer_auth(token.expose());
        let payload: SearchPayload = self.execute("users/search", builder).await?;
        Ok(payload.users.into_iter().map(Recipient::from).collect())
    }
}

#[async_trait]
impl TransactionExecutor for HttpBackend {
    async fn send_money(
        &self,
        token: &AuthToken,
        request: &SendMoneyRequest,
    ) -> Result<TransactionAck, ApiError> {
        let builder = self
            .client
            .post(self.url("/mpesa/send-money"))
            .bearer_auth(token.expose())
            .json(request);
        self.execute("mpesa/send-money", builder).await
    }

    async fn pay_merchant(
        &self,
        token: &AuthToken,
        request: &MerchantPaymentRequest,
    ) -> Result<TransactionAck, ApiError> {
        let builder = self
            .client
            .post(self.url("/payments/merchant"))
            .bearer_auth(token.expose())
            .json(request);
        self.execute("payments/merchant", builder).await
    }

    async fn top_up(
        &self,
        token: &AuthToken,
        request: &StkPushRequest,
    ) -> Result<TransactionAck, ApiError> {
        let builder = self
            .client
            .post(self.url("/mpesa/stk-push"))
            .bearer_auth(token.expose())
            .json(request);
        self.execute("mpesa/stk-push", builder).await
    }

    async fn transaction_status(
        &self,
        token: &AuthToken,
        transaction_id: &str,
    ) -> Result<TransactionAck, ApiError> {
        let builder = self
            .client
            .get(self.status_url(transaction_id)?)
            .bearer_auth(token.expose());
        self.execute("mpesa/transaction/status", builder).await
    }
}
