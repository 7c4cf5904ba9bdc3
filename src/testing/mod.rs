//! Testing utilities for the gateway
//!
//! Available to unit tests and, through the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Settings, handler state and backend payloads
//! - [`mock`] - Scripted transport that records every outbound call
//! - [`requests`] - Fluent builder for browser requests
//! - [`assertions`] - Assertion helpers for responses and cookies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use yeetflow_gateway::testing::{mock::{MockResponse, MockTransport}, TestFixtures};
//!
//! let transport = MockTransport::new()
//!     .respond("/api/v1/auth/me", MockResponse::json(200, TestFixtures::user_json("user")));
//! let state = TestFixtures::state(transport.clone());
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;
pub mod requests;

pub use assertions::*;
pub use fixtures::TestFixtures;
pub use mock::{MockResponse, MockTransport};
pub use requests::RequestBuilder;

/// Common test constants
pub mod constants {
    pub const TEST_EMAIL: &str = "test@example.com";
    pub const TEST_PASSWORD: &str = "correct-horse-battery";
    pub const TEST_USER_NAME: &str = "Test User";

    pub const API_BASE_URL: &str = "http://backend.test";
    pub const WORKER_BASE_URL: &str = "http://worker.test";
    pub const FRONTEND_URL: &str = "http://frontend.test";
    pub const WORKER_API_TOKEN: &str = "service-token";

    pub const EXPIRED_ACCESS_TOKEN: &str = "expired-access";
    pub const VALID_REFRESH_TOKEN: &str = "valid-refresh";
    pub const NEW_ACCESS_TOKEN: &str = "new-access";
    pub const NEW_REFRESH_TOKEN: &str = "new-refresh";
}
