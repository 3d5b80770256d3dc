use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use crate::AppState;

/// The batch jobs run on an in-process schedule and are also exposed here
/// so an external scheduler or an operator can trigger them on demand.
#[axum::debug_handler]
pub async fn run_check_ins(State(state): State<AppState>) -> crate::error::Result<Response> {
    let outcome = state.scheduler.run().await?;
    Ok(Json(outcome).into_response())
}

#[axum::debug_handler]
pub async fn run_expiry_alerts(State(state): State<AppState>) -> crate::error::Result<Response> {
    let outcome = state.monitor.run_expiry_alerts().await?;
    Ok(Json(outcome).into_response())
}

#[axum::debug_handler]
pub async fn run_guarantee_checks(
    State(state): State<AppState>,
) -> crate::error::Result<Response> {
    let outcome = state.monitor.run_guarantee_checks().await?;
    Ok(Json(outcome).into_response())
}
