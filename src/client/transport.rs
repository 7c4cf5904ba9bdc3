//! Outbound HTTP seam
//!
//! Every call the gateway makes to the backend or the page renderer goes
//! through a [`Transport`]. The production implementation wraps one shared
//! `reqwest` client; tests substitute a scripted transport.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{redirect, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::error::ClientError;

/// Marker carried by a request re-issued after a token refresh
pub const RETRY_MARKER_HEADER: &str = "x-retry-after-refresh";

/// Shared HTTP client; redirects are relayed to the browser, not followed
static CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap_or_else(|err| {
            log::warn!("Falling back to default HTTP client: {err}");
            Client::new()
        })
});

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Set on the single re-issue that follows a refresh
    pub retried_after_refresh: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            retried_after_refresh: false,
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] if the name or value is not a valid header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serialize `body` as JSON
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if serialization fails
    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// URL-encoded form body
    #[must_use]
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(encoded.into_bytes());
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self
    }

    /// Whether this request is a post-refresh retry
    ///
    /// Either the explicit flag or a caller supplied marker whose value is
    /// exactly `1`.
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.retried_after_refresh
            || self
                .headers
                .get(RETRY_MARKER_HEADER)
                .is_some_and(|value| value.as_bytes() == b"1")
    }

    /// Flag the request as the post-refresh retry and stamp the marker header
    pub fn mark_retried(&mut self) {
        self.retried_after_refresh = true;
        self.headers
            .insert(RETRY_MARKER_HEADER, HeaderValue::from_static("1"));
    }
}

/// Buffered backend response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if the body is not the expected JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as JSON, falling back to a JSON string for non-JSON bodies
    #[must_use]
    pub fn json_value(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&self.body).trim().to_string();
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        })
    }

    /// Every `Set-Cookie` header, in order
    #[must_use]
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    /// Turn a non-2xx response into [`ClientError::Status`]
    ///
    /// # Errors
    ///
    /// Returns the status error when the response is not successful
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                status: self.status.as_u16(),
                body: self.json_value(),
            })
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and buffer its response
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when no response was received
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// Production transport backed by the shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            client: CLIENT.clone(),
        }
    }
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://backend/api/v1/runs").unwrap()
    }

    #[test]
    fn test_retry_marker_requires_exact_value() {
        let plain = ApiRequest::get(url());
        assert!(!plain.is_retry());

        let debug_marker = ApiRequest::get(url())
            .header("X-Retry-After-Refresh", "true")
            .unwrap();
        assert!(!debug_marker.is_retry());

        let caller_marker = ApiRequest::get(url())
            .header("X-Retry-After-Refresh", "1")
            .unwrap();
        assert!(caller_marker.is_retry());
    }

    #[test]
    fn test_mark_retried() {
        let mut request = ApiRequest::get(url());
        request.mark_retried();
        assert!(request.retried_after_refresh);
        assert_eq!(request.headers.get(RETRY_MARKER_HEADER).unwrap(), "1");
    }

    #[test]
    fn test_form_body_is_encoded() {
        let request = ApiRequest::post(url()).form(&[("username", "a+b@example.com"), ("password", "p w")]);
        assert_eq!(
            request.body.as_deref(),
            Some("username=a%2Bb%40example.com&password=p%20w".as_bytes())
        );
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("access_token=a; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("refresh_token=r; Path=/"));
        let response = ApiResponse {
            status: StatusCode::CONFLICT,
            headers,
            body: b"already exists".to_vec(),
        };

        assert_eq!(response.set_cookies().len(), 2);
        assert_eq!(response.json_value(), Value::String("already exists".to_string()));

        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.detail().as_deref(), Some("already exists"));
    }
}
