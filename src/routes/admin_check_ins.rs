use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::check_in_dto::{CheckInListQuery, ParseReplyRequest};
use crate::error::Error;
use crate::store::CheckInListFilter;
use crate::AppState;

/// Operators paste a forwarded candidate email here for AI parsing.
#[axum::debug_handler]
pub async fn parse_reply(
    State(state): State<AppState>,
    Json(req): Json<ParseReplyRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let receipt = state
        .ingestor
        .parse_free_text(req.check_in_id, &req.email_content)
        .await?;
    Ok(Json(receipt).into_response())
}

#[axum::debug_handler]
pub async fn list_check_ins(
    State(state): State<AppState>,
    Query(query): Query<CheckInListQuery>,
) -> crate::error::Result<Response> {
    let filter = match query.status.as_deref() {
        None | Some("all") => CheckInListFilter::All,
        Some("pending") => CheckInListFilter::Pending,
        Some("flagged") => CheckInListFilter::Flagged,
        Some(other) => {
            return Err(Error::Validation(format!(
                "Unknown status filter: {}",
                other
            )))
        }
    };
    let check_ins = state.ingestor.list_for_admin(filter).await?;
    Ok(Json(check_ins).into_response())
}
