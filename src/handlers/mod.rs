//! HTTP request handlers
//!
//! - [`auth`] - Browser-facing login, logout, current user and registration
//! - [`worker_proxy`] - Generic pass-through to the worker API
//! - [`pages`] - Health check and the page proxy with its admin gate

pub mod auth;
pub mod pages;
pub mod worker_proxy;

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::warn;
use url::Url;

use crate::client::{ApiResponse, ClientFactory, Transport};
use crate::session::CookieFactory;
use crate::settings::{GatewaySettings, SettingsError};
use crate::utils::headers::ResponseHeaderProcessor;

pub use auth::{login, logout, me, register};
pub use pages::{health, proxy_page};
pub use worker_proxy::proxy_worker;

/// Shared, immutable handler state
#[derive(Clone)]
pub struct GatewayState {
    /// Clients for the backend auth API
    pub api: ClientFactory,
    /// Target of the generic worker proxy
    pub worker_base_url: Url,
    pub worker_api_token: Option<String>,
    /// Page renderer behind the catch-all route
    pub frontend_url: Url,
    pub cookie_factory: CookieFactory,
}

impl GatewayState {
    /// Build handler state from settings over the given transport
    ///
    /// # Errors
    ///
    /// Returns an error if any configured base URL is invalid
    pub fn from_settings(
        settings: &GatewaySettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SettingsError> {
        let cookie_factory = CookieFactory::new(settings.application.production);

        Ok(Self {
            api: ClientFactory::new(settings.api_base_url()?, transport, cookie_factory),
            worker_base_url: settings.worker_base_url()?,
            worker_api_token: settings.backend.worker_api_token.clone(),
            frontend_url: settings.frontend_url()?,
            cookie_factory,
        })
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.api.transport()
    }
}

/// Relay a buffered upstream response to the browser
pub(crate) fn relay_response(upstream: ApiResponse) -> HttpResponse {
    let status =
        StatusCode::from_u16(upstream.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = HttpResponse::build(status);
    ResponseHeaderProcessor::for_proxy().forward_response_headers(&upstream.headers, &mut builder);
    builder.body(upstream.body)
}

/// Attach cookies queued during the request
pub(crate) fn apply_cookies(response: &mut HttpResponse, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        if let Err(err) = response.add_cookie(cookie) {
            warn!("Failed to attach cookie '{}': {err}", cookie.name());
        }
    }
}
