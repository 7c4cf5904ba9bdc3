//! Backend API clients
//!
//! - [`transport`] - Outbound HTTP seam and the shared `reqwest` transport
//! - [`factory`] - Builds per-request clients for a base URL
//! - [`authenticated`] - Credential injection with one refresh-and-retry
//! - [`backend`] - Typed auth endpoints
//! - [`error`] - Outbound call failures

pub mod authenticated;
pub mod backend;
pub mod error;
pub mod factory;
pub mod transport;

pub use authenticated::AuthenticatedClient;
pub use backend::{is_refresh_url, ApiClient, BackendClient, REFRESH_PATH};
pub use error::ClientError;
pub use factory::{join_url, ClientFactory, UnauthenticatedClient};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, RETRY_MARKER_HEADER};
