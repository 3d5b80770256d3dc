use crate::models::circumvention_flag::FlagStatus;
use crate::services::flag_manager::FlagUpdate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateFlagRequest {
    pub status: Option<FlagStatus>,
    pub estimated_salary: Option<Decimal>,
    pub fee_percentage: Option<Decimal>,
    #[validate(length(max = 500))]
    pub resolution: Option<String>,
    #[validate(length(max = 5000))]
    pub resolution_notes: Option<String>,
}

impl UpdateFlagRequest {
    pub fn into_update(self) -> FlagUpdate {
        FlagUpdate {
            status: self.status,
            estimated_salary: self.estimated_salary,
            fee_percentage: self.fee_percentage,
            resolution: self.resolution,
            resolution_notes: self.resolution_notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendInvoiceRequest {
    pub invoice_amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub custom_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagListQuery {
    pub status: Option<FlagStatus>,
}
