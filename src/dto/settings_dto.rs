use crate::models::settings::PlatformSettings;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Full replacement of the tunable values; the store assigns the version.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    pub default_fee_percentage: Decimal,
    #[validate(range(min = 1, max = 36))]
    pub protection_months: u32,
    #[validate(range(min = 1, max = 365))]
    pub check_in_interval_days: i64,
    #[validate(range(min = 1, max = 90))]
    pub response_token_ttl_days: i64,
    #[validate(range(min = 1, max = 365))]
    pub invoice_due_days: i64,
    #[validate(range(min = 1, max = 1000))]
    pub batch_size: usize,
    #[validate(range(max = 60000))]
    pub batch_delay_ms: u64,
}

impl UpdateSettingsRequest {
    pub fn into_settings(self) -> PlatformSettings {
        PlatformSettings {
            version: 0, // assigned by the store
            default_fee_percentage: self.default_fee_percentage,
            protection_months: self.protection_months,
            check_in_interval_days: self.check_in_interval_days,
            response_token_ttl_days: self.response_token_ttl_days,
            invoice_due_days: self.invoice_due_days,
            batch_size: self.batch_size,
            batch_delay_ms: self.batch_delay_ms,
            updated_at: Utc::now(),
        }
    }
}
