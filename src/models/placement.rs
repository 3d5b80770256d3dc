use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementStatus {
    Active,
    GuaranteeExpired,
    Refunded,
}

impl PlacementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::GuaranteeExpired => "GUARANTEE_EXPIRED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for PlacementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "GUARANTEE_EXPIRED" => Ok(Self::GuaranteeExpired),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(format!("unknown placement status: {}", other)),
        }
    }
}

/// A completed, fee-paid hire. Carries its own guarantee window, swept on a
/// separate cadence from introduction protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub introduction_id: Uuid,
    pub hired_at: DateTime<Utc>,
    pub guarantee_ends_at: DateTime<Utc>,
    pub guarantee_warning_sent_at: Option<DateTime<Utc>>,
    pub status: PlacementStatus,
    pub fee_invoiced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
