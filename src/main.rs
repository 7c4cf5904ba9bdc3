#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use yeetflow_gateway::{
    middleware::edge_gate,
    server::{build_cors, configure_services},
    GatewaySettings, GatewayState, ReqwestTransport, SecurityHeaders,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = GatewaySettings::load().context("Failed to load settings")?;

    let state = GatewayState::from_settings(&settings, Arc::new(ReqwestTransport::default()))
        .context("Invalid upstream configuration")?;
    let security = SecurityHeaders::from_settings(&settings);

    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(security.clone()))
            .wrap(from_fn(edge_gate))
            .wrap(build_cors(cors_origins.clone()))
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server terminated with an error")
}

fn print_startup_info(bind_address: &str, settings: &GatewaySettings) {
    println!(
        "Starting YeetFlow gateway v{} on http://{bind_address}",
        yeetflow_gateway::VERSION
    );
    println!(
        "Mode: {}",
        if settings.application.production {
            "production"
        } else {
            "development"
        }
    );
    println!();
    println!("Auth endpoints:");
    println!("  POST /api/auth/login    - Password login, relays session cookies");
    println!("  POST /api/auth/logout   - Clear session cookies");
    println!("  GET  /api/auth/me       - Current user (refreshes expired tokens)");
    println!("  POST /api/auth/register - Create an account");
    println!();
    println!("Proxy endpoints:");
    println!(
        "  ALL  /api/worker/{{path}} - Worker API at {}",
        settings.backend.worker_base_url
    );
    println!(
        "  ALL  {{any page}}         - Frontend at {}",
        settings.frontend.upstream_url
    );
    println!();
    println!("System endpoints:");
    println!("  GET  /api/health        - Health check");
}
