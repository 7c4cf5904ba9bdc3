//! HTTP response handling
//!
//! Every error the gateway produces itself is a JSON body of the form
//! `{"detail": "..."}`. Redirects issued by the gateway are `307 Temporary Redirect`
//! so the browser repeats the original method.

use std::sync::LazyLock;

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use log::warn;
use url::Url;

use crate::client::join_url;
use crate::models::ErrorDetail;

// ===============================
// CACHED RESPONSES
// ===============================

static CACHED_RESPONSES: LazyLock<CachedResponses> = LazyLock::new(CachedResponses::new);

/// Pre-serialized bodies for the most frequent errors
struct CachedResponses {
    unauthorized: String,
    server_error: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            unauthorized: Self::create_json("Unauthorized"),
            server_error: Self::create_json("Internal server error"),
        }
    }

    fn create_json(detail: &str) -> String {
        serde_json::to_string(&ErrorDetail {
            detail: detail.to_string(),
        })
        .unwrap_or_default()
    }

    fn lookup(&self, status: StatusCode) -> Option<&str> {
        match status {
            StatusCode::UNAUTHORIZED => Some(&self.unauthorized),
            StatusCode::INTERNAL_SERVER_ERROR => Some(&self.server_error),
            _ => None,
        }
    }
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    // ===============================
    // ERROR RESPONSE METHODS
    // ===============================

    /// Error response with an arbitrary status; invalid codes fall back to 500
    #[must_use]
    pub fn error(status: u16) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
    }

    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::BAD_REQUEST)
    }

    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub fn bad_gateway() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::BAD_GATEWAY)
    }

    // ===============================
    // SUCCESS RESPONSE METHODS
    // ===============================

    /// Temporary (307) redirect
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::OK)
    }

    #[must_use]
    pub fn created() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::CREATED)
    }

    // ===============================
    // CONVENIENCE METHODS
    // ===============================

    #[must_use]
    pub fn missing_credentials() -> HttpResponse {
        Self::bad_request()
            .with_detail("Email and password are required")
            .build()
    }

    #[must_use]
    pub fn invalid_json() -> HttpResponse {
        Self::bad_request().with_detail("Invalid JSON body").build()
    }
}

// ===============================
// BUILDER TYPES
// ===============================

/// Builder for `{detail}` error responses
pub struct ErrorResponseBuilder {
    status: StatusCode,
    detail: Option<String>,
    headers: Vec<(String, String)>,
}

impl ErrorResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        builder.insert_header((header::CONTENT_TYPE, "application/json"));
        for (name, value) in self.headers {
            builder.insert_header((name, value));
        }

        match self.detail {
            Some(detail) => builder.json(ErrorDetail { detail }),
            None => match CACHED_RESPONSES.lookup(self.status) {
                Some(cached) => builder.body(cached.to_string()),
                None => builder.json(ErrorDetail {
                    detail: self
                        .status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string(),
                }),
            },
        }
    }
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
        }
    }

    /// Append the originally requested path as `redirect=<path>`
    #[must_use]
    pub fn with_return_to(mut self, path: &str) -> Self {
        let separator = if self.location.contains('?') { '&' } else { '?' };
        self.location = format!(
            "{}{separator}redirect={}",
            self.location,
            urlencoding::encode(path)
        );
        self
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        HttpResponse::TemporaryRedirect()
            .append_header((header::LOCATION, self.location))
            .finish()
    }
}

/// Builder for JSON responses
pub struct JsonResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl JsonResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        for (name, value) in self.headers {
            builder.insert_header((name, value));
        }
        builder.json(data)
    }
}

// ===============================
// UTILITY FUNCTIONS
// ===============================

/// Convert Actix HTTP method to reqwest method
///
/// # Errors
///
/// Returns an `HttpResponse` error if the HTTP method is not supported
pub fn convert_http_method(
    method: &actix_web::http::Method,
) -> Result<reqwest::Method, HttpResponse> {
    match method.as_str() {
        "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "DELETE" => Ok(reqwest::Method::DELETE),
        "PATCH" => Ok(reqwest::Method::PATCH),
        "HEAD" => Ok(reqwest::Method::HEAD),
        "OPTIONS" => Ok(reqwest::Method::OPTIONS),
        _ => Err(ResponseBuilder::error(405)
            .with_detail("HTTP method not supported")
            .build()),
    }
}

/// Build the upstream URL from a base URL, a path and the raw query string
///
/// # Errors
///
/// Returns a 500 `HttpResponse` if the URL cannot be constructed
pub fn build_upstream_url(base: &Url, path: &str, query: &str) -> Result<Url, HttpResponse> {
    let mut url = join_url(base, path).map_err(|e| {
        warn!("Failed to join URL '{base}' + '{path}': {e}");
        ResponseBuilder::internal_server_error()
            .with_detail("Failed to construct upstream URL")
            .build()
    })?;

    if !query.is_empty() {
        url.set_query(Some(query));
    }
    Ok(url)
}
