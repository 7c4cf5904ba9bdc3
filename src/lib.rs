#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the gateway
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod server;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use client::{ClientFactory, ReqwestTransport, Transport};
pub use handlers::GatewayState;
pub use security::SecurityHeaders;
pub use settings::GatewaySettings;
