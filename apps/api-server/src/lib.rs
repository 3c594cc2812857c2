//! # Folio API Server
//!
//! HTTP surface of the portfolio and blog backend. The binary in
//! `main.rs` wires these modules into an actix-web server; tests build the
//! same app around in-memory state.

pub mod background;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;

use actix_cors::Cors;
use actix_web::http::{Method, header};

use config::AppConfig;

/// CORS policy for the configured frontend origins. Credentials are
/// allowed so the session cookie travels with API calls.
pub fn cors(config: &AppConfig) -> Cors {
    let mut origins = config.cors_allowed_origins.clone();
    if origins.is_empty() {
        origins.push(config.oauth.frontend_url.clone());
    }

    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([
            header::HeaderName::from_static("x-request-id"),
            header::RETRY_AFTER,
        ])
        .supports_credentials()
        .max_age(3600)
}
