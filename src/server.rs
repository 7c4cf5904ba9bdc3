//! Route table and CORS policy shared by the binary and the integration tests

use actix_cors::Cors;
use actix_web::web;

use crate::handlers::{health, login, logout, me, proxy_page, proxy_worker, register};

/// Register every gateway route
///
/// Paths outside `/api` fall through to the page proxy; unknown `/api`
/// paths answer 404 there.
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Browser-facing auth endpoints
        .route("/api/auth/login", web::post().to(login))
        .route("/api/auth/logout", web::post().to(logout))
        .route("/api/auth/me", web::get().to(me))
        .route("/api/auth/register", web::post().to(register))
        // Worker pass-through
        .route("/api/worker/{path:.*}", web::get().to(proxy_worker))
        .route("/api/worker/{path:.*}", web::post().to(proxy_worker))
        .route("/api/worker/{path:.*}", web::put().to(proxy_worker))
        .route("/api/worker/{path:.*}", web::patch().to(proxy_worker))
        .route("/api/worker/{path:.*}", web::delete().to(proxy_worker))
        // Health endpoint
        .route("/api/health", web::get().to(health))
        // Catch-all page proxy
        .default_service(web::to(proxy_page));
}

/// CORS policy for the configured origins; credentials are allowed so the
/// session cookies travel with cross-origin calls
#[must_use]
pub fn build_cors(cors_origins: Vec<String>) -> Cors {
    Cors::default()
        .allowed_origin_fn(move |origin, _| {
            cors_origins
                .iter()
                .any(|allowed| allowed == origin.to_str().unwrap_or(""))
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
        .supports_credentials()
        .max_age(3600)
}
