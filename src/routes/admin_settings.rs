use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::settings_dto::UpdateSettingsRequest;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_settings(State(state): State<AppState>) -> crate::error::Result<Response> {
    let settings = state.stores.settings.current().await?;
    Ok(Json(settings).into_response())
}

#[axum::debug_handler]
pub async fn put_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let saved = state.stores.settings.put(req.into_settings()).await?;
    tracing::info!(version = saved.version, "platform settings updated");
    Ok(Json(saved).into_response())
}
