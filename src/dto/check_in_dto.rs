use crate::models::parsed_response::CandidateReportedStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// What the response page needs to render the one-click form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondContextResponse {
    pub employer_name: String,
    pub candidate_name: String,
    pub check_in_number: i32,
    pub already_responded: bool,
    pub expired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StructuredReplyRequest {
    pub status: CandidateReportedStatus,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    pub start_date: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub role_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ParseReplyRequest {
    pub check_in_id: Uuid,
    #[validate(length(min = 10, max = 50000))]
    pub email_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInListQuery {
    pub status: Option<String>,
}
