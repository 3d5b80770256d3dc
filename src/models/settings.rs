use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operational knobs for the protection subsystem. Persisted as a versioned
/// record rather than process memory so every instance reads the same
/// values; writes insert a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub version: i32,
    pub default_fee_percentage: Decimal,
    pub protection_months: u32,
    pub check_in_interval_days: i64,
    pub response_token_ttl_days: i64,
    pub invoice_due_days: i64,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            version: 1,
            default_fee_percentage: Decimal::from(20),
            protection_months: 12,
            check_in_interval_days: 30,
            response_token_ttl_days: 7,
            invoice_due_days: 30,
            batch_size: 10,
            batch_delay_ms: 250,
            updated_at: Utc::now(),
        }
    }
}
