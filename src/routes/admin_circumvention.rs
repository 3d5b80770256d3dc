use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::circumvention_dto::{FlagListQuery, SendInvoiceRequest, UpdateFlagRequest};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_flags(
    State(state): State<AppState>,
    Query(query): Query<FlagListQuery>,
) -> crate::error::Result<Response> {
    let flags = state.flag_manager.list_flags(query.status).await?;
    Ok(Json(flags).into_response())
}

#[axum::debug_handler]
pub async fn get_flag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let flag = state.flag_manager.get_flag(id).await?;
    Ok(Json(flag).into_response())
}

#[axum::debug_handler]
pub async fn update_flag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFlagRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let flag = state.flag_manager.update_flag(id, req.into_update()).await?;
    Ok(Json(flag).into_response())
}

#[axum::debug_handler]
pub async fn delete_flag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.flag_manager.delete_flag(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn send_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendInvoiceRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let result = state
        .flag_manager
        .send_invoice(id, req.invoice_amount, req.due_date, req.custom_message)
        .await?;
    Ok(Json(result).into_response())
}
