//! Authenticated backend client
//!
//! Each logical call runs the same sequence:
//!
//! 1. inject `Authorization: Bearer <access_token>` from the cookie store,
//!    unless the caller set its own header or the call targets the refresh
//!    endpoint;
//! 2. issue the call;
//! 3. anything but a 401 is returned as-is, as is a 401 from a retry or from
//!    the refresh endpoint;
//! 4. otherwise exchange the refresh cookie for a new token pair, write the
//!    new cookies back (best effort), and re-issue the call exactly once.
//!
//! Every refresh failure degrades to returning the original 401.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use url::Url;

use super::backend::{is_refresh_url, ApiClient, BackendClient};
use super::error::ClientError;
use super::factory::UnauthenticatedClient;
use super::transport::{ApiRequest, ApiResponse};
use crate::models::Token;
use crate::session::{CookieFactory, CookieStore, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

pub struct AuthenticatedClient {
    inner: UnauthenticatedClient,
    cookies: Arc<dyn CookieStore>,
    cookie_factory: CookieFactory,
}

impl AuthenticatedClient {
    pub(crate) fn new(
        inner: UnauthenticatedClient,
        cookies: Arc<dyn CookieStore>,
        cookie_factory: CookieFactory,
    ) -> Self {
        Self {
            inner,
            cookies,
            cookie_factory,
        }
    }

    async fn try_refresh(&self) -> Option<Token> {
        let refresh_token = self.cookies.get(REFRESH_TOKEN_COOKIE)?;

        match self.inner.refresh(&refresh_token).await {
            Ok(token) if !token.access_token.is_empty() => Some(token),
            Ok(_) => {
                warn!("Token refresh returned an empty access token");
                None
            }
            Err(err) => {
                debug!("Token refresh failed: {err}");
                None
            }
        }
    }

    fn persist(&self, token: &Token) {
        for cookie in self.cookie_factory.token_cookies(token) {
            if let Err(err) = self.cookies.set(cookie) {
                debug!("Skipping refreshed cookie write: {err}");
            }
        }
    }
}

fn bearer(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {token}")).ok()
}

#[async_trait]
impl ApiClient for AuthenticatedClient {
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.inner.endpoint(path)
    }

    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let targets_refresh = is_refresh_url(&request.url);

        if !targets_refresh && !request.headers.contains_key(AUTHORIZATION) {
            if let Some(value) = self.cookies.get(ACCESS_TOKEN_COOKIE).as_deref().and_then(bearer) {
                request.headers.insert(AUTHORIZATION, value);
            }
        }

        let response = self.inner.send(request.clone()).await?;

        if response.status != reqwest::StatusCode::UNAUTHORIZED
            || request.is_retry()
            || targets_refresh
        {
            return Ok(response);
        }

        let Some(token) = self.try_refresh().await else {
            return Ok(response);
        };
        let Some(authorization) = bearer(&token.access_token) else {
            warn!("Refreshed access token is not a valid header value");
            return Ok(response);
        };

        self.persist(&token);

        debug!("Retrying {} {} after token refresh", request.method, request.url.path());
        request.headers.insert(AUTHORIZATION, authorization);
        request.mark_retried();
        self.inner.send(request).await
    }
}
