use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("Unsupported method: {0}")]
    InvalidMethod(String),
}

/// Replays one queued action against the backend.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    async fn send(
        &self,
        method: &str,
        endpoint: &str,
        data: Option<&Value>,
    ) -> Result<(), TransportError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(Self::DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

/// Parse an HTTP verb, defaulting to `POST` when blank.
pub fn parse_method(method: &str) -> Result<Method, TransportError> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(Method::POST);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| TransportError::InvalidMethod(method.to_string()))
}

#[async_trait]
impl ActionTransport for HttpTransport {
    async fn send(
        &self,
        method: &str,
        endpoint: &str,
        data: Option<&Value>,
    ) -> Result<(), TransportError> {
        let method = parse_method(method)?;
        let unsafe_method = !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
        let mut request = self.client.request(method, self.url(endpoint));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        match data {
            Some(data) => request = request.json(data),
            // Body-less writes still need a JSON content type to pass CSRF checks.
            None if unsafe_method => {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            None => {}
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}
