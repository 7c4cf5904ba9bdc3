//! HTTP header forwarding between the browser-facing request and the upstreams
//!
//! actix-web and reqwest carry different `http` crate versions, so headers
//! cross the boundary as strings.

use actix_web::{HttpRequest, HttpResponseBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Whether the browser reached the gateway over HTTPS
///
/// Honours `Forwarded` / `X-Forwarded-Proto` from a terminating proxy.
#[must_use]
pub fn is_secure_request(req: &HttpRequest) -> bool {
    req.connection_info().scheme().eq_ignore_ascii_case("https")
}

// ===============================
// HOP-BY-HOP HEADER DETECTION
// ===============================

/// Check if a header is a hop-by-hop header that should not be forwarded
///
/// Based on RFC 2616 Section 13.5.1
#[must_use]
pub fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

// ===============================
// REQUEST HEADER FORWARDING
// ===============================

/// Header Processing Strategy for request forwarding
#[derive(Debug, Clone)]
pub struct RequestHeaderProcessor {
    /// Whether to filter hop-by-hop headers
    pub skip_hop_by_hop: bool,
}

impl Default for RequestHeaderProcessor {
    fn default() -> Self {
        Self {
            skip_hop_by_hop: true,
        }
    }
}

impl RequestHeaderProcessor {
    /// Processor for proxied requests: caller credentials are kept
    #[must_use]
    pub fn for_proxy() -> Self {
        Self::default()
    }

    /// Copy the browser's headers into an outbound header map
    ///
    /// `Host` and `Content-Length` are always dropped; the transport sets both.
    #[must_use]
    pub fn forward_request_headers(&self, req: &HttpRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in req.headers() {
            let name_str = name.as_str();
            if self.should_skip_header(name_str) {
                continue;
            }

            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name_str.as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }

        headers
    }

    fn should_skip_header(&self, name_str: &str) -> bool {
        if name_str == "host" || name_str == "content-length" {
            return true;
        }

        self.skip_hop_by_hop && is_hop_by_hop_header(name_str)
    }
}

// ===============================
// RESPONSE HEADER FORWARDING
// ===============================

/// Header Processing Strategy for response forwarding
#[derive(Debug, Clone)]
pub struct ResponseHeaderProcessor {
    /// Whether to filter hop-by-hop headers
    pub skip_hop_by_hop: bool,
}

impl Default for ResponseHeaderProcessor {
    fn default() -> Self {
        Self {
            skip_hop_by_hop: true,
        }
    }
}

impl ResponseHeaderProcessor {
    #[must_use]
    pub fn for_proxy() -> Self {
        Self::default()
    }

    /// Forward upstream response headers to an Actix `HttpResponseBuilder`
    ///
    /// Repeated headers such as `Set-Cookie` are appended, so every value
    /// survives. `Content-Length` is left to actix.
    pub fn forward_response_headers(
        &self,
        upstream_headers: &HeaderMap,
        response_builder: &mut HttpResponseBuilder,
    ) {
        for (name, value) in upstream_headers {
            let name_str = name.as_str();

            if name_str == "content-length" {
                continue;
            }
            if self.skip_hop_by_hop && is_hop_by_hop_header(name_str) {
                continue;
            }

            if let Ok(value_str) = value.to_str() {
                response_builder.append_header((name_str, value_str));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use actix_web::HttpResponse;
    use reqwest::header::SET_COOKIE;

    #[test]
    fn test_hop_by_hop_headers() {
        assert!(is_hop_by_hop_header("connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(!is_hop_by_hop_header("content-type"));
        assert!(!is_hop_by_hop_header("authorization"));
    }

    #[test]
    fn test_request_forwarding_drops_host_and_hop_by_hop() {
        let req = TestRequest::default()
            .insert_header(("Host", "gateway.local"))
            .insert_header(("Connection", "keep-alive"))
            .insert_header(("Authorization", "Bearer user-token"))
            .insert_header(("X-Request-Id", "abc"))
            .to_http_request();

        let headers = RequestHeaderProcessor::for_proxy().forward_request_headers(&req);

        assert!(headers.get("host").is_none());
        assert!(headers.get("connection").is_none());
        assert_eq!(headers.get("authorization").unwrap(), "Bearer user-token");
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn test_response_forwarding_keeps_every_set_cookie() {
        let mut upstream = HeaderMap::new();
        upstream.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        upstream.append(SET_COOKIE, HeaderValue::from_static("b=2; Path=/"));
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.insert("x-upstream", HeaderValue::from_static("worker"));

        let mut builder = HttpResponse::Ok();
        ResponseHeaderProcessor::for_proxy().forward_response_headers(&upstream, &mut builder);
        let response = builder.finish();

        assert_eq!(response.headers().get_all("set-cookie").count(), 2);
        assert!(response.headers().get("transfer-encoding").is_none());
        assert_eq!(response.headers().get("x-upstream").unwrap(), "worker");
    }

    #[test]
    fn test_secure_request_detection() {
        let forwarded = TestRequest::default()
            .insert_header(("X-Forwarded-Proto", "https"))
            .to_http_request();
        assert!(is_secure_request(&forwarded));

        let plain = TestRequest::default().to_http_request();
        assert!(!is_secure_request(&plain));
    }
}
