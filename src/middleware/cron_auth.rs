use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;

/// Guards the cron trigger endpoints with a shared secret. With no secret
/// configured the endpoints stay open, which is only acceptable on a
/// network-isolated deployment, so it is logged loudly.
pub async fn require_cron_secret(req: Request, next: Next) -> Response {
    let Some(expected) = crate::config::get_config().cron_secret.as_deref() else {
        tracing::warn!("CRON_SECRET not set, cron endpoints are unauthenticated");
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));
    let Some(provided) = provided else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_cron_secret"})),
        )
            .into_response();
    };

    if ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_cron_secret"})),
        )
            .into_response()
    }
}
