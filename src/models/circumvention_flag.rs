use crate::models::parsed_response::ParsedResponse;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagStatus {
    Open,
    InvoiceSent,
    Paid,
    FalsePositive,
    WroteOff,
}

impl FlagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InvoiceSent => "INVOICE_SENT",
            Self::Paid => "PAID",
            Self::FalsePositive => "FALSE_POSITIVE",
            Self::WroteOff => "WROTE_OFF",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::FalsePositive | Self::WroteOff)
    }

    /// Allowed transitions: OPEN -> INVOICE_SENT or any terminal;
    /// INVOICE_SENT -> any terminal; terminals are final.
    pub fn can_transition_to(&self, next: FlagStatus) -> bool {
        match self {
            Self::Open => matches!(
                next,
                Self::InvoiceSent | Self::Paid | Self::FalsePositive | Self::WroteOff
            ),
            Self::InvoiceSent => next.is_terminal(),
            _ => false,
        }
    }
}

impl FromStr for FlagStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "INVOICE_SENT" => Ok(Self::InvoiceSent),
            "PAID" => Ok(Self::Paid),
            "FALSE_POSITIVE" => Ok(Self::FalsePositive),
            "WROTE_OFF" => Ok(Self::WroteOff),
            other => Err(format!("unknown flag status: {}", other)),
        }
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    CheckInResponse,
    EmailReplyParsing,
    Manual,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckInResponse => "check_in_response",
            Self::EmailReplyParsing => "email_reply_parsing",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in_response" => Ok(Self::CheckInResponse),
            "email_reply_parsing" => Ok(Self::EmailReplyParsing),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown detection method: {}", other)),
        }
    }
}

/// Evidence attached to a flag. Tagged so the structured-response and
/// AI-parsing paths stay type-safe through JSONB persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagEvidence {
    CheckInResponse {
        check_in_id: Uuid,
        parsed: ParsedResponse,
        detected_at: DateTime<Utc>,
    },
    EmailReplyParsing {
        check_in_id: Uuid,
        parsed: ParsedResponse,
        raw_excerpt: String,
        detected_at: DateTime<Utc>,
    },
    Manual {
        notes: String,
        detected_at: DateTime<Utc>,
    },
}

/// An accusation that an employer hired a protected candidate outside the
/// paid placement path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircumventionFlag {
    pub id: Uuid,
    pub introduction_id: Uuid,
    pub detection_method: DetectionMethod,
    pub evidence: FlagEvidence,
    pub status: FlagStatus,
    pub estimated_salary: Option<Decimal>,
    pub fee_percentage: Option<Decimal>,
    pub estimated_fee_owed: Option<Decimal>,
    pub detected_at: DateTime<Utc>,
    /// Set exactly once, on the first transition into a terminal status.
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub resolution_notes: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_sent_at: Option<DateTime<Utc>>,
    pub invoice_amount: Option<Decimal>,
    pub invoice_due_date: Option<NaiveDate>,
    pub invoice_paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CircumventionFlag {
    /// Deterministic invoice number so a retried send never double-issues.
    pub fn invoice_reference(&self) -> String {
        let short = self.id.simple().to_string();
        format!("CF-{}", short[..8].to_uppercase())
    }
}

pub fn compute_fee_owed(salary: Option<Decimal>, pct: Option<Decimal>) -> Option<Decimal> {
    match (salary, pct) {
        (Some(s), Some(p)) => Some(s * p / Decimal::from(100)),
        _ => None,
    }
}
