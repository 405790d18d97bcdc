use actix_web::HttpResponse;

use crate::error::AppError;

pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Fallback for unknown routes
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::RecordNotFound)
}
