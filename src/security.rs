//! Security response headers and Content Security Policy

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use log::warn;

use crate::settings::GatewaySettings;

const STATIC_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
];

/// Inputs that shape the CSP
#[derive(Debug, Clone)]
pub struct CspConfig {
    pub production: bool,
    pub worker_origin: String,
    pub trusted_session_origin: Option<String>,
}

impl CspConfig {
    #[must_use]
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self {
            production: settings.application.production,
            worker_origin: settings.backend.worker_base_url.trim_end_matches('/').to_string(),
            trusted_session_origin: settings
                .security
                .trusted_session_origin
                .as_deref()
                .map(|origin| origin.trim_end_matches('/').to_string()),
        }
    }

    /// Render the policy as a single header value
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut script_src = vec!["'self'", "'unsafe-eval'"];
        if !self.production {
            script_src.push("'unsafe-inline'");
        }

        let mut directives: Vec<(&str, Vec<&str>)> = vec![
            ("default-src", vec!["'self'"]),
            ("script-src", script_src),
            ("style-src", vec!["'self'", "'unsafe-inline'"]),
            ("img-src", vec!["'self'", "data:", "https:"]),
            ("font-src", vec!["'self'", "data:"]),
            ("connect-src", vec!["'self'", self.worker_origin.as_str()]),
        ];
        if let Some(origin) = &self.trusted_session_origin {
            directives.push(("frame-src", vec!["'self'", origin.as_str()]));
        }
        directives.extend([
            ("frame-ancestors", vec!["'none'"]),
            ("form-action", vec!["'self'"]),
            ("base-uri", vec!["'self'"]),
            ("object-src", vec!["'none'"]),
            ("script-src-attr", vec!["'none'"]),
        ]);

        directives
            .into_iter()
            .map(|(name, sources)| format!("{name} {}", sources.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Pre-rendered security headers attached by the edge middleware
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    #[must_use]
    pub fn new(csp: Option<&CspConfig>) -> Self {
        let mut headers: Vec<(HeaderName, HeaderValue)> = STATIC_HEADERS
            .iter()
            .map(|(name, value)| {
                (
                    HeaderName::from_static(*name),
                    HeaderValue::from_static(*value),
                )
            })
            .collect();

        if let Some(csp) = csp {
            match HeaderValue::from_str(&csp.header_value()) {
                Ok(value) => headers.push((
                    HeaderName::from_static("content-security-policy"),
                    value,
                )),
                Err(err) => warn!("Content-Security-Policy disabled, invalid header value: {err}"),
            }
        }

        Self { headers }
    }

    #[must_use]
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let csp = settings
            .security
            .content_security_policy
            .then(|| CspConfig::from_settings(settings));
        Self::new(csp.as_ref())
    }

    /// Set every security header, replacing upstream values
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn has_csp(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.as_str() == "content-security-policy")
    }
}
