use crate::models::parsed_response::{ParsedResponse, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    ClickedButton,
    FreeText,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClickedButton => "clicked_button",
            Self::FreeText => "free_text",
        }
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clicked_button" => Ok(Self::ClickedButton),
            "free_text" => Ok(Self::FreeText),
            other => Err(format!("unknown response type: {}", other)),
        }
    }
}

/// One scheduled probe of a candidate during an introduction's protection
/// window. Numbered sequentially per introduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: Uuid,
    pub introduction_id: Uuid,
    pub check_in_number: i32,
    pub scheduled_for: DateTime<Utc>,
    /// Null until the check-in email is delivered; the scheduler retries
    /// sending on its next run while this stays null.
    pub sent_at: Option<DateTime<Utc>>,
    pub response_token: String,
    pub response_token_expiry: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub response_type: Option<ResponseType>,
    pub response_raw: Option<String>,
    pub response_parsed: Option<ParsedResponse>,
    pub risk_level: Option<RiskLevel>,
    pub risk_reason: Option<String>,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.response_token_expiry <= now
    }
}
