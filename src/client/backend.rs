//! Typed calls against the backend auth API

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use url::Url;

use super::error::ClientError;
use super::transport::{ApiRequest, ApiResponse};
use crate::models::{RefreshRequest, RegisterRequest, Token, User};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const CURRENT_USER_PATH: &str = "/api/v1/auth/me";
pub const REGISTER_PATH: &str = "/api/v1/auth/register";

/// Whether `url` targets the token refresh endpoint
#[must_use]
pub fn is_refresh_url(url: &Url) -> bool {
    url.path().contains(REFRESH_PATH)
}

/// A client bound to the backend base URL
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Absolute URL for a backend path
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined
    fn endpoint(&self, path: &str) -> Result<Url, ClientError>;

    /// Issue one logical call
    ///
    /// # Errors
    ///
    /// Returns an error when no response was received
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// Backend auth operations, available on every [`ApiClient`]
#[async_trait]
pub trait BackendClient: ApiClient {
    /// Password grant login
    ///
    /// The raw response is returned so the caller can relay its `Set-Cookie` headers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] for non-2xx responses
    async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, ClientError> {
        let request = ApiRequest::post(self.endpoint(LOGIN_PATH)?)
            .form(&[
                ("grant_type", "password"),
                ("username", email),
                ("password", password),
            ])
            .header("X-Client-Type", "web")?;
        self.send(request).await?.error_for_status()
    }

    /// Exchange a refresh token for a new credential pair
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-2xx responses and
    /// undecodable bodies
    async fn refresh(&self, refresh_token: &str) -> Result<Token, ClientError> {
        let mut request = ApiRequest::post(self.endpoint(REFRESH_PATH)?)
            .json(&RefreshRequest { refresh_token })?;
        request.headers.remove(AUTHORIZATION);
        self.send(request).await?.error_for_status()?.json()
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Status`] when the backend rejects the credential
    async fn current_user(&self) -> Result<User, ClientError> {
        let request = ApiRequest::get(self.endpoint(CURRENT_USER_PATH)?);
        self.send(request).await?.error_for_status()?.json()
    }

    /// Create an account; the new user is returned as sent by the backend
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] for duplicate emails and validation failures
    async fn register(&self, payload: &RegisterRequest) -> Result<Value, ClientError> {
        let request = ApiRequest::post(self.endpoint(REGISTER_PATH)?).json(payload)?;
        self.send(request).await?.error_for_status()?.json()
    }
}

impl<T: ApiClient + ?Sized> BackendClient for T {}
