use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::authenticated::AuthenticatedClient;
use super::backend::ApiClient;
use super::error::ClientError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::session::{CookieFactory, CookieStore};

/// Builds backend clients for one configured base URL
///
/// The factory itself is shared across requests; the clients it returns are
/// built per request and never hold credentials beyond that request.
#[derive(Clone)]
pub struct ClientFactory {
    base_url: Url,
    transport: Arc<dyn Transport>,
    cookie_factory: CookieFactory,
}

impl ClientFactory {
    #[must_use]
    pub fn new(base_url: Url, transport: Arc<dyn Transport>, cookie_factory: CookieFactory) -> Self {
        Self {
            base_url,
            transport,
            cookie_factory,
        }
    }

    /// Client with no credential injection and no retry
    #[must_use]
    pub fn unauthenticated(&self) -> UnauthenticatedClient {
        UnauthenticatedClient {
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Client that injects the session credential and refreshes it once on 401
    #[must_use]
    pub fn authenticated(&self, cookies: Arc<dyn CookieStore>) -> AuthenticatedClient {
        AuthenticatedClient::new(self.unauthenticated(), cookies, self.cookie_factory)
    }

    /// Raw transport, for proxying requests that are not backend API calls
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }
}

pub struct UnauthenticatedClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl ApiClient for UnauthenticatedClient {
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        join_url(&self.base_url, path)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.transport.send(request).await
    }
}

/// Append `path` to `base`, keeping any path prefix the base URL carries
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] if the result is not a valid URL
pub fn join_url(base: &Url, path: &str) -> Result<Url, ClientError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_keeps_prefix() {
        let base = Url::parse("http://backend:8000/").unwrap();
        assert_eq!(
            join_url(&base, "/api/v1/auth/me").unwrap().as_str(),
            "http://backend:8000/api/v1/auth/me"
        );

        let prefixed = Url::parse("https://gateway.example.com/worker").unwrap();
        assert_eq!(
            join_url(&prefixed, "runs?limit=5").unwrap().as_str(),
            "https://gateway.example.com/worker/runs?limit=5"
        );
    }
}
