// src/api.rs
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::ValidateKeyResponse;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Bodies come back either bare or wrapped as `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// REST client for the relay service (account creation, sponsorship, bundler).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn validate_key(&self) -> Result<bool, ApiError> {
        let path = format!("/v1/auth/validate-key/{}", self.api_key);
        let response: ValidateKeyResponse = self.get(&path).await?;
        Ok(response.is_valid)
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        serde_json::from_slice::<Envelope<R>>(&body)
            .map(Envelope::into_inner)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        _ if body.is_empty() => status.to_string(),
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_api_key_and_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/auth/validate-key/secret"))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"isValid": true}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri(), "secret");
        assert!(api.validate_key().await.unwrap());
    }

    #[tokio::test]
    async fn accepts_bare_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/auth/validate-key/nope"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"isValid": false})))
            .mount(&server)
            .await;

        let api = ApiClient::new(format!("{}/", server.uri()), "nope");
        assert!(!api.validate_key().await.unwrap());
    }

    #[tokio::test]
    async fn non_success_status_keeps_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transaction/send-transaction"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "AA21 didn't pay prefund"})),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri(), "key");
        let err = api
            .post::<_, serde_json::Value>("/v1/transaction/send-transaction", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("AA21"));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri(), "key");
        let err = api.validate_key().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
