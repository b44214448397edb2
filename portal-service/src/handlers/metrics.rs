use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Prometheus metrics", content_type = "text/plain")),
    tag = "Observability"
)]
pub async fn metrics() -> impl IntoResponse {
    portal_core::observability::render_metrics()
}
