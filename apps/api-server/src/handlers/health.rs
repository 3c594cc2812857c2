//! Health check endpoints.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: BTreeMap<&'static str, String>,
}

/// Liveness - returns server status.
///
/// GET /health
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

/// Readiness - checks the dependencies requests need.
///
/// GET /ready
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let mut checks = BTreeMap::new();
    let mut ready = true;

    #[cfg(feature = "postgres")]
    match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => {
                checks.insert("database", "ok".to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, "Database ping failed");
                checks.insert("database", "unavailable".to_string());
                ready = false;
            }
        },
        None => {
            checks.insert("database", "in-memory".to_string());
        }
    }
    #[cfg(not(feature = "postgres"))]
    checks.insert("database", "in-memory".to_string());

    match tokio::fs::metadata(&state.config.media.upload_path).await {
        Ok(meta) if meta.is_dir() => {
            checks.insert("media_storage", "ok".to_string());
        }
        _ => {
            tracing::error!(path = %state.config.media.upload_path, "Upload directory missing");
            checks.insert("media_storage", "unavailable".to_string());
            ready = false;
        }
    }

    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" },
        checks,
    };
    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
