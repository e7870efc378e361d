//! Client for the Sonic Odyssey rewards REST API.

use crate::wallet::WalletIdentity;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use core_logic::ProxyConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Proxy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const ALREADY_CHECKED_IN: &str = "current account already checked in";
pub const STAGE_ALREADY_CLAIMED: [i64; 2] = [100015, 100016];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} rejected the request (status {status}, code {code}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        code: i64,
        message: String,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("not authenticated")]
    NotAuthenticated,
}

impl ApiError {
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct TxData {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct DailyState {
    #[serde(default)]
    total_transactions: u64,
}

#[derive(Debug, Deserialize)]
struct RewardsInfo {
    #[serde(default)]
    ring_monitor: u64,
}

#[derive(Debug, Deserialize)]
struct BoxOpened {
    #[serde(default)]
    amount: Value,
}

#[derive(Serialize)]
struct AuthorizeRequest {
    address: String,
    address_encoded: String,
    signature: String,
}

/// Turns a raw response into `data` or an [`ApiError`].
///
/// Some endpoints answer 200 with an error body, so a body with a non-zero
/// `code` and no `data` is treated as a rejection too.
pub fn decode_response<T: DeserializeOwned>(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<T, ApiError> {
    let rejected = |code: i64, message: String| ApiError::Rejected {
        endpoint: endpoint.to_string(),
        status,
        code,
        message,
    };
    let invalid = |reason: String| ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason,
    };

    if !(200..300).contains(&status) {
        let err = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
        let message = if err.message.is_empty() {
            body.chars().take(200).collect()
        } else {
            err.message
        };
        return Err(rejected(err.code, message));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    let code = value.get("code").and_then(Value::as_i64).unwrap_or(0);
    let has_data = value.get("data").is_some_and(|d| !d.is_null());
    if code != 0 && !has_data {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(rejected(code, message));
    }

    serde_json::from_value::<Envelope<T>>(value)
        .map(|envelope| envelope.data)
        .map_err(|e| invalid(e.to_string()))
}

pub struct SonicApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl SonicApiClient {
    pub fn new(base_url: &str, proxy: Option<&ProxyConfig>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_config) = proxy {
            let mut proxy = Proxy::all(&proxy_config.url).context("Failed to create proxy")?;
            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                proxy = proxy.basic_auth(username, password);
            }
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        authenticated: bool,
    ) -> Result<T, ApiError> {
        let endpoint = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &endpoint).query(query);

        if authenticated {
            let token = self.token.as_deref().ok_or(ApiError::NotAuthenticated)?;
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("{} {}", method, endpoint);
        let http_err = |source| ApiError::Http {
            endpoint: endpoint.clone(),
            source,
        };
        let response = request.send().await.map_err(http_err)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(http_err)?;

        decode_response(&endpoint, status, &text)
    }

    /// Challenge-response login; the token is kept for later calls.
    pub async fn authenticate(&mut self, wallet: &WalletIdentity) -> Result<(), ApiError> {
        let address = wallet.address();
        let challenge: String = self
            .request(
                Method::GET,
                "/auth/sonic/challenge",
                &[("wallet", address.to_string())],
                None,
                false,
            )
            .await?;

        let signature = wallet.sign_message(challenge.as_bytes());
        let payload = AuthorizeRequest {
            address: address.to_string(),
            address_encoded: STANDARD.encode(address.to_bytes()),
            signature: STANDARD.encode(signature.as_ref()),
        };
        let body = serde_json::to_value(&payload).map_err(|e| ApiError::InvalidResponse {
            endpoint: "/auth/sonic/authorize".to_string(),
            reason: e.to_string(),
        })?;

        let data: TokenData = self
            .request(Method::POST, "/auth/sonic/authorize", &[], Some(body), false)
            .await?;
        self.token = Some(data.token);
        Ok(())
    }

    /// Base64 check-in transaction to be signed by the wallet.
    pub async fn check_in_transaction(&self) -> Result<String, ApiError> {
        let data: TxData = self
            .request(Method::GET, "/user/check-in/transaction", &[], None, true)
            .await?;
        Ok(data.hash)
    }

    pub async fn confirm_check_in(&self, signature: &str) -> Result<Option<Value>, ApiError> {
        self.request(
            Method::POST,
            "/user/check-in",
            &[],
            Some(serde_json::json!({ "hash": signature })),
            true,
        )
        .await
    }

    pub async fn daily_transaction_count(&self) -> Result<u64, ApiError> {
        let data: DailyState = self
            .request(Method::GET, "/user/transactions/state/daily", &[], None, true)
            .await?;
        Ok(data.total_transactions)
    }

    pub async fn claim_stage(&self, stage: u8) -> Result<Option<Value>, ApiError> {
        self.request(
            Method::POST,
            "/user/transactions/rewards/claim",
            &[],
            Some(serde_json::json!({ "stage": stage })),
            true,
        )
        .await
    }

    pub async fn mystery_box_count(&self) -> Result<u64, ApiError> {
        let data: RewardsInfo = self
            .request(Method::GET, "/user/rewards/info", &[], None, true)
            .await?;
        Ok(data.ring_monitor)
    }

    pub async fn build_mystery_box_transaction(&self) -> Result<String, ApiError> {
        let data: TxData = self
            .request(Method::GET, "/user/rewards/mystery-box/build-tx", &[], None, true)
            .await?;
        Ok(data.hash)
    }

    /// Returns the reward amount as reported by the API.
    pub async fn open_mystery_box(&self, signature: &str) -> Result<String, ApiError> {
        let data: BoxOpened = self
            .request(
                Method::POST,
                "/user/rewards/mystery-box/open",
                &[],
                Some(serde_json::json!({ "hash": signature })),
                true,
            )
            .await?;
        Ok(match data.amount {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}
