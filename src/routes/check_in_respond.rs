use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use validator::Validate;

use crate::dto::check_in_dto::{RespondContextResponse, StructuredReplyRequest};
use crate::services::response_ingestor::StructuredReply;
use crate::AppState;

/// Context for the one-click response page. Expired or already-answered
/// links still resolve so the page can say so instead of 404ing.
#[axum::debug_handler]
pub async fn get_respond_context(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let check_in = state.ingestor.check_in_by_token(&token).await?;
    let intro = state
        .stores
        .introductions
        .get(check_in.introduction_id)
        .await?
        .ok_or_else(|| crate::error::Error::NotFound("Introduction not found".to_string()))?;

    let response = RespondContextResponse {
        employer_name: intro.employer_name,
        candidate_name: intro.candidate_name,
        check_in_number: check_in.check_in_number,
        already_responded: check_in.responded_at.is_some(),
        expired: check_in.token_expired(Utc::now()),
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn submit_response(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<StructuredReplyRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let receipt = state
        .ingestor
        .submit_structured(
            &token,
            StructuredReply {
                status: req.status,
                message: req.message,
                start_date: req.start_date,
                role_title: req.role_title,
            },
        )
        .await?;
    Ok(Json(receipt).into_response())
}
