//! HTTP request builders for testing handlers

use actix_web::cookie::Cookie;
use actix_web::http::Method;
use actix_web::test;
use serde_json::Value;

use crate::session::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

/// Builder for browser requests against the gateway
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    #[must_use]
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies
            .push(Cookie::new(name.to_string(), value.to_string()));
        self
    }

    /// Access and refresh token cookies
    #[must_use]
    pub fn session(self, access_token: &str, refresh_token: &str) -> Self {
        self.cookie(ACCESS_TOKEN_COOKIE, access_token)
            .cookie(REFRESH_TOKEN_COOKIE, refresh_token)
    }

    /// Mark the request as arriving over HTTPS through a terminating proxy
    #[must_use]
    pub fn secure(self) -> Self {
        self.header("X-Forwarded-Proto", "https")
    }

    /// JSON body
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized
    #[must_use]
    pub fn json(self, body: &Value) -> Self {
        self.header("Content-Type", "application/json")
            .raw_body(serde_json::to_vec(body).unwrap())
    }

    #[must_use]
    pub fn raw_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Finish into an `actix_web::test::TestRequest`
    #[must_use]
    pub fn build(self) -> test::TestRequest {
        let mut req = test::TestRequest::default()
            .method(self.method)
            .uri(&self.uri);

        for (name, value) in self.headers {
            req = req.insert_header((name, value));
        }
        for cookie in self.cookies {
            req = req.cookie(cookie);
        }
        if let Some(body) = self.body {
            req = req.set_payload(body);
        }
        req
    }

    #[must_use]
    pub fn to_http_request(self) -> actix_web::HttpRequest {
        self.build().to_http_request()
    }
}
