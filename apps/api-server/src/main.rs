//! # Folio API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use api_server::config::AppConfig;
use api_server::handlers;
use api_server::middleware::RateLimitMiddleware;
use api_server::observability::RequestIdMiddleware;
use api_server::state::AppState;
use api_server::telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;

    tracing::info!(
        environment = %config.environment,
        "Starting Folio API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(config.clone())
        .await
        .context("failed to build application state")?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = if config.scheduler_enabled {
        let scheduler = api_server::background::Scheduler::new()
            .await
            .context("failed to create scheduler")?;
        scheduler
            .add_session_cleanup(state.services.auth.clone())
            .await
            .context("failed to register session cleanup")?;
        scheduler.start().await.context("failed to start scheduler")?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    let server_config = config.clone();
    let limiter = state.rate_limiter.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(limiter.clone()))
            .wrap(api_server::cors(&server_config))
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not stop cleanly");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
