use axum::{extract::State, Json};
use portal_core::error::AppError;

use crate::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "A dependency is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.identity.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Identity provider health check failed");
        AppError::ServiceUnavailable(format!("identity provider: {}", e))
    })?;

    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        AppError::ServiceUnavailable(format!("database: {}", e))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "identity_provider": "up",
            "postgres": "up"
        }
    })))
}
