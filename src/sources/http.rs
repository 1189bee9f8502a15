//! JSON HTTP backend
//!
//! This module implements PoolSource, SettingsSource and TransferSender
//! against a small JSON API:
//! - `GET  {base}/pool`      -> PoolSnapshot
//! - `GET  {base}/settings`  -> map of recipient id to RecipientSettings
//! - `POST {base}/transfers` -> `{ "delivered": n }` or `{ "error_code": "..." }`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::{PoolSource, SettingsSource, SourceError, TransferOutcome, TransferSender};
use crate::domain::{PoolSnapshot, RecipientSettings};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the HTTP backend
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
}

impl HttpApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    recipient_id: &'a str,
    amount: u64,
}

/// Body of a transfer response; exactly one field is expected to be set
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TransferReply {
    delivered: Option<u64>,
    error_code: Option<String>,
}

impl TransferReply {
    fn into_outcome(self) -> Result<TransferOutcome, SourceError> {
        match (self.delivered, self.error_code) {
            (_, Some(code)) => Ok(TransferOutcome::Rejected { code }),
            (Some(amount), None) => Ok(TransferOutcome::Delivered { amount }),
            (None, None) => Err(SourceError::InvalidResponse(
                "transfer reply has neither delivered nor error_code".to_string(),
            )),
        }
    }
}

/// Pool, settings, and transfer client over HTTP
pub struct HttpTransferApi {
    client: Client,
    config: HttpApiConfig,
}

impl HttpTransferApi {
    pub fn new(config: HttpApiConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-success status into an API error carrying the body text
    async fn check_status(response: Response) -> Result<Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(SourceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PoolSource for HttpTransferApi {
    async fn fetch_pool_and_recipients(&self) -> Result<PoolSnapshot, SourceError> {
        let response = self.authorize(self.client.get(self.url("pool"))).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SettingsSource for HttpTransferApi {
    async fn fetch_recipient_settings(&self) -> Result<HashMap<String, RecipientSettings>, SourceError> {
        let response = self.authorize(self.client.get(self.url("settings"))).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TransferSender for HttpTransferApi {
    async fn send(&self, recipient_id: &str, amount: u64) -> Result<TransferOutcome, SourceError> {
        let request = TransferRequest { recipient_id, amount };
        let response = self
            .authorize(self.client.post(self.url("transfers")))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // 4xx bodies may still carry a structured refusal
        if status.is_client_error() {
            if let Ok(reply) = serde_json::from_str::<TransferReply>(&body) {
                if let Some(code) = reply.error_code {
                    return Ok(TransferOutcome::Rejected { code });
                }
            }
        }

        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str::<TransferReply>(&body)?.into_outcome()
    }
}

impl std::fmt::Debug for HttpTransferApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransferApi")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("authenticated", &self.config.token.is_some())
            .finish()
    }
}
