use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of employment statuses a candidate can report about one
/// employer. Anything outside this set is rejected at the DTO boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReportedStatus {
    HiredThere,
    Offer,
    Interviewing,
    HiredElsewhere,
    Rejected,
    Withdrew,
    NoResponse,
    StillLooking,
}

impl CandidateReportedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiredThere => "hired_there",
            Self::Offer => "offer",
            Self::Interviewing => "interviewing",
            Self::HiredElsewhere => "hired_elsewhere",
            Self::Rejected => "rejected",
            Self::Withdrew => "withdrew",
            Self::NoResponse => "no_response",
            Self::StillLooking => "still_looking",
        }
    }
}

impl FromStr for CandidateReportedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hired_there" => Ok(Self::HiredThere),
            "offer" => Ok(Self::Offer),
            "interviewing" => Ok(Self::Interviewing),
            "hired_elsewhere" => Ok(Self::HiredElsewhere),
            "rejected" => Ok(Self::Rejected),
            "withdrew" => Ok(Self::Withdrew),
            "no_response" => Ok(Self::NoResponse),
            "still_looking" => Ok(Self::StillLooking),
            other => Err(format!("unknown candidate status: {}", other)),
        }
    }
}

impl fmt::Display for CandidateReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Clear,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    pub fn needs_review(&self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLEAR" => Ok(Self::Clear),
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Parser confidence, only present on AI-derived parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseConfidence {
    Low,
    Medium,
    High,
}

/// Normalized view of a candidate's reply, shared by the button-click and
/// free-text paths. Persisted as JSONB on the check-in and embedded in flag
/// evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub status: CandidateReportedStatus,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ParseConfidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date_mentioned: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_title_mentioned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_mentioned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_mentioned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_introduced_company: Option<bool>,
}

impl ParsedResponse {
    pub fn new(status: CandidateReportedStatus, risk_level: RiskLevel, risk_reason: impl Into<String>) -> Self {
        Self {
            status,
            risk_level,
            risk_reason: risk_reason.into(),
            confidence: None,
            summary: None,
            suggested_action: None,
            start_date_mentioned: None,
            role_title_mentioned: None,
            salary_mentioned: None,
            company_mentioned: None,
            is_introduced_company: None,
        }
    }
}
