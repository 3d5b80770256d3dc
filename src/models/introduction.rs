use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntroductionStatus {
    ProfileViewed,
    IntroRequested,
    Introduced,
    Hired,
    CandidateDeclined,
    ClosedNoHire,
    Expired,
}

impl IntroductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileViewed => "PROFILE_VIEWED",
            Self::IntroRequested => "INTRO_REQUESTED",
            Self::Introduced => "INTRODUCED",
            Self::Hired => "HIRED",
            Self::CandidateDeclined => "CANDIDATE_DECLINED",
            Self::ClosedNoHire => "CLOSED_NO_HIRE",
            Self::Expired => "EXPIRED",
        }
    }

    /// Terminal states are never left, not even for each other.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Hired | Self::CandidateDeclined | Self::ClosedNoHire | Self::Expired
        )
    }
}

impl FromStr for IntroductionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROFILE_VIEWED" => Ok(Self::ProfileViewed),
            "INTRO_REQUESTED" => Ok(Self::IntroRequested),
            "INTRODUCED" => Ok(Self::Introduced),
            "HIRED" => Ok(Self::Hired),
            "CANDIDATE_DECLINED" => Ok(Self::CandidateDeclined),
            "CLOSED_NO_HIRE" => Ok(Self::ClosedNoHire),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown introduction status: {}", other)),
        }
    }
}

impl fmt::Display for IntroductionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateResponse {
    Accepted,
    Declined,
    Questions,
}

impl CandidateResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Questions => "QUESTIONS",
        }
    }
}

impl FromStr for CandidateResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            "QUESTIONS" => Ok(Self::Questions),
            other => Err(format!("unknown candidate response: {}", other)),
        }
    }
}

/// One employer's claim of priority on one candidate. Unique on
/// (employer_id, candidate_id). The protection window is fixed at creation
/// and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Introduction {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub candidate_id: Uuid,
    pub employer_name: String,
    pub employer_email: String,
    pub employer_contact_email: Option<String>,
    pub candidate_name: String,
    pub candidate_email: String,
    pub status: IntroductionStatus,
    pub profile_viewed_at: Option<DateTime<Utc>>,
    pub intro_requested_at: Option<DateTime<Utc>>,
    pub candidate_responded_at: Option<DateTime<Utc>>,
    pub candidate_response: Option<CandidateResponse>,
    pub introduced_at: Option<DateTime<Utc>>,
    pub protection_starts_at: DateTime<Utc>,
    pub protection_ends_at: DateTime<Utc>,
    pub profile_views: i32,
    pub resume_downloads: i32,
    pub response_token: Option<String>,
    pub response_token_expiry: Option<DateTime<Utc>>,
    pub last_email_sent_at: Option<DateTime<Utc>>,
    pub email_resend_count: i32,
    pub expiry_warning_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Introduction {
    /// Email address invoices and notices go to, preferring the dedicated
    /// billing contact over the account email.
    pub fn billing_email(&self) -> &str {
        self.employer_contact_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.employer_email)
    }
}
