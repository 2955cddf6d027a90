//! The primitive that performs one HTTP call and hands back the raw body.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::endpoints::Operation;
use super::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    }
  }
}

/// One request against the service, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub operation: Operation,
  pub method: Method,
  pub path: String,
  pub body: Option<Value>,
}

impl ApiRequest {
  /// Request line such as `GET /task/7`
  pub fn line(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for ApiRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method.as_str(), self.path)
  }
}

/// Undecoded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body: String,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
  client: Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
    // Url::join replaces the last segment unless the base ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url })
  }

  fn url_for(&self, path: &str) -> Result<Url, TransportError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| TransportError::InvalidUrl {
        path: path.to_string(),
        message: e.to_string(),
      })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
    let url = self.url_for(&request.path)?;
    let builder = match request.method {
      Method::Get => self.client.get(url.clone()),
      Method::Post => self.client.post(url.clone()),
      Method::Patch => self.client.patch(url.clone()),
      Method::Delete => self.client.delete(url.clone()),
    };
    let builder = match &request.body {
      Some(body) => builder.json(body),
      None => builder,
    };

    let response = builder.send().await.map_err(|e| map_send_error(&url, e))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| TransportError::Body {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    tracing::debug!(request = %request, status, "response received");
    Ok(RawResponse { status, body })
  }
}

fn map_send_error(url: &Url, error: reqwest::Error) -> TransportError {
  if error.is_timeout() {
    TransportError::Timeout {
      url: url.to_string(),
    }
  } else {
    TransportError::Unreachable {
      url: url.to_string(),
      message: error.to_string(),
    }
  }
}
