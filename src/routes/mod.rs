// Route exports
pub mod connections;
pub mod partners;

use actix_web::{http::header, http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::config::MatchingSettings;
use crate::connection::{ConnectionError, TransactionManager};
use crate::core::Matcher;
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{AppwriteClient, ConnectionRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub appwrite: Arc<AppwriteClient>,
    pub repository: Arc<dyn ConnectionRepository>,
    pub manager: TransactionManager,
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(connections::configure)
            .configure(partners::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.repository.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// HTTP status for a connection error
pub fn status_for(err: &ConnectionError) -> StatusCode {
    match err {
        ConnectionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ConnectionError::InvalidOperation(_) => StatusCode::CONFLICT,
        ConnectionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ConnectionError::TransientNetwork { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ConnectionError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(err: &ConnectionError) -> &'static str {
    match err {
        ConnectionError::InvalidInput(_) => "invalid_input",
        ConnectionError::InvalidOperation(_) => "invalid_operation",
        ConnectionError::RateLimitExceeded { .. } => "rate_limited",
        ConnectionError::TransientNetwork { .. } => "transient_network",
        ConnectionError::Persistence(_) => "persistence",
    }
}

/// Render a connection error as an `ErrorResponse`
///
/// Rate-limit denials also carry a `Retry-After` header in whole seconds.
pub fn connection_error_response(err: &ConnectionError) -> HttpResponse {
    let status = status_for(err);
    let retry_after = err.retry_after_secs();

    if status.is_server_error() {
        tracing::error!(error = %err, "Connection operation failed");
    }

    let mut body = ErrorResponse::new(error_kind(err), err.user_message(), status.as_u16());
    body.retry_after_secs = retry_after;

    let mut response = HttpResponse::build(status);
    if let Some(secs) = retry_after {
        response.insert_header((header::RETRY_AFTER, secs.to_string()));
    }
    response.json(body)
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("Validation failed", errors.to_string(), 400))
}
