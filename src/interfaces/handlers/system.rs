use std::time::Duration;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use humantime::format_duration;
use serde::Serialize;

use crate::{constants::START_TIME, AppState};

#[derive(Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    uptime: String,
    timestamp: String,
    start_at: String,
    version: &'static str,
    backend: String,
    database: &'static str,
}

async fn build_health_response(state: &AppState) -> HealthCheckResponse {
    let now_utc = Utc::now();
    let uptime_secs = now_utc.signed_duration_since(*START_TIME).num_seconds().max(0) as u64;

    let database = match state.repositories.users.check_connection().await {
        Ok(()) => "OK",
        Err(e) => {
            tracing::warn!(error = %e, "health check: backend unreachable");
            "Unavailable"
        }
    };

    HealthCheckResponse {
        status: if database == "OK" { "healthy" } else { "degraded" },
        uptime: format_duration(Duration::from_secs(uptime_secs)).to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        backend: state.repositories.kind.to_string(),
        database,
    }
}

/// 200 while the backend answers, 503 otherwise.
#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let response = build_health_response(&state).await;
    if response.database == "OK" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
