//! reqwest-backed Odyssey client

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{AccountInfo, AuthToken, OdysseyApi};
use crate::config::ApiConfig;
use crate::{Error, Result};

/// Client for the Odyssey HTTP API
pub struct OdysseyClient {
    client: Client,
    base_url: String,
}

/// `{ "data": ..., "status": ..., "message": ... }` wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct EncodedTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct DailyState {
    total_transactions: u64,
}

/// Turn a status and body into the envelope's `data`, or an [`Error::ApiError`]
/// carrying the service message.
pub fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    trimmed.to_string()
                }
            });
        return Err(Error::ApiError { status: status.as_u16(), message });
    }

    let envelope: Envelope<T> = serde_json::from_str(body)?;
    envelope.data.ok_or_else(|| Error::ApiError {
        status: status.as_u16(),
        message: envelope.message.unwrap_or_else(|| "response carried no data".to_string()),
    })
}

/// Like [`decode_response`] for calls whose payload is not needed.
fn expect_success(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    decode_response::<serde_json::Value>(status, body).map(|_| ())
}

impl OdysseyClient {
    /// Create a new client with the browser-like headers the service expects
    pub fn new(config: &ApiConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)?;

        let origin = config.origin.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(ORIGIN, header_value(origin)?);
        headers.insert(REFERER, header_value(&format!("{}/", origin))?);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &AuthToken) -> RequestBuilder {
        request.header(AUTHORIZATION, token.as_str())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("odyssey response {} ({} bytes)", status, body.len());
        decode_response(status, &body)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("odyssey response {} ({} bytes)", status, body.len());
        expect_success(status, &body)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::ConfigError(format!("invalid header value '{}': {}", value, e)))
}

#[async_trait]
impl OdysseyApi for OdysseyClient {
    async fn challenge(&self, address: &str) -> Result<String> {
        let request = self
            .client
            .get(self.url("/auth/sonic/challenge"))
            .query(&[("wallet", address)]);
        self.fetch(request).await
    }

    async fn authorize(
        &self, address: &str, address_encoded: &str, signature: &str,
    ) -> Result<AuthToken> {
        let request = self.client.post(self.url("/auth/sonic/authorize")).json(&json!({
            "address": address,
            "address_encoded": address_encoded,
            "signature": signature,
        }));
        let data: TokenData = self.fetch(request).await?;
        Ok(AuthToken::new(data.token))
    }

    async fn account_info(&self, token: &AuthToken) -> Result<AccountInfo> {
        let request = self.authorized(self.client.get(self.url("/user/rewards/info")), token);
        self.fetch(request).await
    }

    async fn check_in_transaction(&self, token: &AuthToken) -> Result<String> {
        let request =
            self.authorized(self.client.get(self.url("/user/check-in/transaction")), token);
        let data: EncodedTransaction = self.fetch(request).await?;
        Ok(data.hash)
    }

    async fn submit_check_in(&self, token: &AuthToken, signature: &str) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.url("/user/check-in")), token)
            .json(&json!({ "hash": signature }));
        self.execute(request).await
    }

    async fn daily_transactions(&self, token: &AuthToken) -> Result<u64> {
        let request = self
            .authorized(self.client.get(self.url("/user/transactions/state/daily")), token);
        let data: DailyState = self.fetch(request).await?;
        Ok(data.total_transactions)
    }

    async fn claim_stage(&self, token: &AuthToken, stage: u8) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.url("/user/transactions/rewards/claim")), token)
            .json(&json!({ "stage": stage }));
        self.execute(request).await
    }

    async fn mystery_box_transaction(&self, token: &AuthToken) -> Result<String> {
        let request = self.authorized(
            self.client.get(self.url("/user/rewards/mystery-box/build-tx")),
            token,
        );
        let data: EncodedTransaction = self.fetch(request).await?;
        Ok(data.hash)
    }

    async fn open_mystery_box(&self, token: &AuthToken, signature: &str) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.url("/user/rewards/mystery-box/open")), token)
            .json(&json!({ "hash": signature }));
        self.execute(request).await
    }
}
