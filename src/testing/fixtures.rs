//! Pre-built settings, handler state and backend payloads

use std::sync::Arc;

use serde_json::{json, Value};

use super::constants::{
    API_BASE_URL, FRONTEND_URL, NEW_ACCESS_TOKEN, NEW_REFRESH_TOKEN, TEST_EMAIL, TEST_USER_NAME,
    WORKER_API_TOKEN, WORKER_BASE_URL,
};
use super::mock::MockTransport;
use crate::handlers::GatewayState;
use crate::security::SecurityHeaders;
use crate::settings::GatewaySettings;

/// Central fixture provider
pub struct TestFixtures;

impl TestFixtures {
    /// Development settings pointing at the `.test` upstreams
    #[must_use]
    pub fn settings() -> GatewaySettings {
        let mut settings = GatewaySettings::default();
        settings.backend.api_base_url = API_BASE_URL.to_string();
        settings.backend.worker_base_url = WORKER_BASE_URL.to_string();
        settings.backend.worker_api_token = Some(WORKER_API_TOKEN.to_string());
        settings.frontend.upstream_url = FRONTEND_URL.to_string();
        settings
    }

    #[must_use]
    pub fn production_settings() -> GatewaySettings {
        let mut settings = Self::settings();
        settings.application.production = true;
        settings
    }

    /// Handler state over a scripted transport
    ///
    /// # Panics
    ///
    /// Panics if the fixture URLs are invalid
    #[must_use]
    pub fn state(transport: MockTransport) -> GatewayState {
        Self::state_with(&Self::settings(), transport)
    }

    /// # Panics
    ///
    /// Panics if the settings carry invalid URLs
    #[must_use]
    pub fn state_with(settings: &GatewaySettings, transport: MockTransport) -> GatewayState {
        GatewayState::from_settings(settings, Arc::new(transport)).unwrap()
    }

    #[must_use]
    pub fn security_headers() -> SecurityHeaders {
        SecurityHeaders::from_settings(&Self::settings())
    }

    /// Backend token response after a refresh or login
    #[must_use]
    pub fn token_json() -> Value {
        json!({
            "access_token": NEW_ACCESS_TOKEN,
            "refresh_token": NEW_REFRESH_TOKEN,
            "token_type": "bearer",
            "expires_in": 900,
            "refresh_expires_in": 604_800
        })
    }

    /// Backend `auth/me` payload with the given role
    #[must_use]
    pub fn user_json(role: &str) -> Value {
        json!({
            "id": "6a1f9d2e-0c4b-4f55-9b1e-2f3c8a7d1e90",
            "email": TEST_EMAIL,
            "name": TEST_USER_NAME,
            "role": role,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }
}
