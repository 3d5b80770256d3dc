use crate::error::{Error, Result};
use crate::models::circumvention_flag::{
    compute_fee_owed, CircumventionFlag, DetectionMethod, FlagEvidence, FlagStatus,
};
use crate::models::introduction::Introduction;
use crate::services::emails;
use crate::services::mailer::Mailer;
use crate::store::Stores;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Opens, reviews and settles circumvention flags, and drives the fee
/// invoice lifecycle.
#[derive(Clone)]
pub struct FlagManager {
    stores: Stores,
    mailer: Arc<dyn Mailer>,
    admin_email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagUpdate {
    pub status: Option<FlagStatus>,
    pub estimated_salary: Option<Decimal>,
    pub fee_percentage: Option<Decimal>,
    pub resolution: Option<String>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResult {
    pub flag_id: Uuid,
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub invoice_due_date: NaiveDate,
    pub emailed_to: String,
    pub admin_copy_sent: bool,
    pub status: FlagStatus,
}

impl FlagManager {
    pub fn new(stores: Stores, mailer: Arc<dyn Mailer>, admin_email: String) -> Self {
        Self {
            stores,
            mailer,
            admin_email,
        }
    }

    /// Opens a flag for an introduction and moves the introduction to HIRED
    /// so the scheduler and monitor stop touching it. Re-detection against
    /// an introduction that already has an active flag returns the existing
    /// flag instead of stacking a duplicate.
    pub async fn open_flag(
        &self,
        introduction_id: Uuid,
        detection_method: DetectionMethod,
        evidence: FlagEvidence,
        estimated_salary: Option<Decimal>,
    ) -> Result<CircumventionFlag> {
        let intro = self
            .stores
            .introductions
            .get(introduction_id)
            .await?
            .ok_or_else(|| Error::NotFound("Introduction not found".to_string()))?;

        let now = Utc::now();

        if let Some(existing) = self
            .stores
            .flags
            .active_for_introduction(introduction_id)
            .await?
        {
            self.stores.introductions.mark_hired(introduction_id, now).await?;
            tracing::info!(flag_id = %existing.id, %introduction_id, "active flag already open, skipping duplicate");
            return Ok(existing);
        }

        let settings = self.stores.settings.current().await?;
        let fee_percentage = Some(settings.default_fee_percentage);
        let flag = CircumventionFlag {
            id: Uuid::new_v4(),
            introduction_id,
            detection_method,
            evidence,
            status: FlagStatus::Open,
            estimated_salary,
            fee_percentage,
            estimated_fee_owed: compute_fee_owed(estimated_salary, fee_percentage),
            detected_at: now,
            resolved_at: None,
            resolution: None,
            resolution_notes: None,
            invoice_number: None,
            invoice_sent_at: None,
            invoice_amount: None,
            invoice_due_date: None,
            invoice_paid_at: None,
            created_at: now,
            updated_at: now,
        };
        let flag = self.stores.flags.create(flag).await?;
        self.stores.introductions.mark_hired(introduction_id, now).await?;

        tracing::warn!(
            flag_id = %flag.id,
            employer = %intro.employer_name,
            candidate = %intro.candidate_name,
            method = flag.detection_method.as_str(),
            "circumvention flag opened"
        );
        self.alert_admin(&intro, &flag).await;

        Ok(flag)
    }

    async fn alert_admin(&self, intro: &Introduction, flag: &CircumventionFlag) {
        let excerpt = match &flag.evidence {
            FlagEvidence::EmailReplyParsing { raw_excerpt, .. } => Some(raw_excerpt.as_str()),
            _ => None,
        };
        let message = emails::admin_flag_alert(&self.admin_email, intro, flag, excerpt);
        let outcome = self.mailer.send(&message).await;
        if !outcome.success {
            // Detection already persisted; the alert is best-effort.
            tracing::error!(flag_id = %flag.id, error = ?outcome.error, "admin alert email failed");
        }
    }

    pub async fn get_flag(&self, flag_id: Uuid) -> Result<CircumventionFlag> {
        self.stores
            .flags
            .get(flag_id)
            .await?
            .ok_or_else(|| Error::NotFound("Flag not found".to_string()))
    }

    pub async fn list_flags(&self, status: Option<FlagStatus>) -> Result<Vec<CircumventionFlag>> {
        self.stores.flags.list(status).await
    }

    /// Merge-then-recompute update. The fee owed is recomputed whenever
    /// salary or percentage change, using the merged values; resolved_at is
    /// stamped on the first transition into a terminal status and never
    /// afterwards.
    pub async fn update_flag(&self, flag_id: Uuid, update: FlagUpdate) -> Result<CircumventionFlag> {
        let mut flag = self.get_flag(flag_id).await?;
        let now = Utc::now();

        if let Some(next) = update.status {
            if next != flag.status {
                if !flag.status.can_transition_to(next) {
                    return Err(Error::Conflict(format!(
                        "Flag cannot move from {} to {}",
                        flag.status, next
                    )));
                }
                if next.is_terminal() {
                    if flag.resolved_at.is_none() {
                        flag.resolved_at = Some(now);
                    }
                    if next == FlagStatus::Paid && flag.invoice_paid_at.is_none() {
                        flag.invoice_paid_at = Some(now);
                    }
                }
                flag.status = next;
            }
        }

        let fee_inputs_changed =
            update.estimated_salary.is_some() || update.fee_percentage.is_some();
        if let Some(salary) = update.estimated_salary {
            flag.estimated_salary = Some(salary);
        }
        if let Some(pct) = update.fee_percentage {
            flag.fee_percentage = Some(pct);
        }
        if fee_inputs_changed {
            flag.estimated_fee_owed = compute_fee_owed(flag.estimated_salary, flag.fee_percentage);
        }

        if let Some(resolution) = update.resolution {
            flag.resolution = Some(resolution);
        }
        if let Some(notes) = update.resolution_notes {
            flag.resolution_notes = Some(notes);
        }

        flag.updated_at = now;
        self.stores.flags.update(flag).await
    }

    /// Emails the fee invoice and transitions the flag to INVOICE_SENT. The
    /// transition is applied only after the employer email is delivered, so
    /// a failed send leaves the flag retryable; the invoice number is
    /// derived from the flag id and identical across retries.
    pub async fn send_invoice(
        &self,
        flag_id: Uuid,
        invoice_amount: Option<Decimal>,
        due_date: Option<NaiveDate>,
        custom_message: Option<String>,
    ) -> Result<InvoiceResult> {
        let flag = self.get_flag(flag_id).await?;
        if flag.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "Flag is already resolved as {}",
                flag.status
            )));
        }

        let amount = invoice_amount
            .or(flag.estimated_fee_owed)
            .filter(|a| *a > Decimal::ZERO)
            .ok_or_else(|| {
                Error::Validation(
                    "No positive invoice amount: supply invoice_amount or set estimated salary and fee percentage".to_string(),
                )
            })?;

        let intro = self
            .stores
            .introductions
            .get(flag.introduction_id)
            .await?
            .ok_or_else(|| Error::NotFound("Introduction not found".to_string()))?;

        let settings = self.stores.settings.current().await?;
        let now = Utc::now();
        let due = due_date
            .unwrap_or_else(|| (now + Duration::days(settings.invoice_due_days)).date_naive());
        let invoice_number = flag.invoice_reference();
        let recipient = intro.billing_email().to_string();

        let message = emails::invoice_email(
            &recipient,
            &intro,
            &invoice_number,
            amount,
            due,
            custom_message.as_deref(),
        );
        let outcome = self.mailer.send(&message).await;
        if !outcome.success {
            return Err(Error::Mail(
                outcome.error.unwrap_or_else(|| "invoice email failed".to_string()),
            ));
        }

        let admin_copy = emails::invoice_email(
            &self.admin_email,
            &intro,
            &invoice_number,
            amount,
            due,
            custom_message.as_deref(),
        );
        let admin_copy_sent = self.mailer.send(&admin_copy).await.success;

        let mut updated = flag;
        if updated.status == FlagStatus::Open {
            updated.status = FlagStatus::InvoiceSent;
        }
        updated.invoice_number = Some(invoice_number.clone());
        updated.invoice_sent_at = Some(now);
        updated.invoice_amount = Some(amount);
        updated.invoice_due_date = Some(due);
        updated.updated_at = now;
        let updated = self.stores.flags.update(updated).await?;

        tracing::info!(flag_id = %updated.id, %invoice_number, %amount, "invoice sent");

        Ok(InvoiceResult {
            flag_id: updated.id,
            invoice_number,
            invoice_amount: amount,
            invoice_due_date: due,
            emailed_to: recipient,
            admin_copy_sent,
            status: updated.status,
        })
    }

    /// Flags carry financial history; only ones reviewed down to
    /// FALSE_POSITIVE may be removed.
    pub async fn delete_flag(&self, flag_id: Uuid) -> Result<()> {
        let flag = self.get_flag(flag_id).await?;
        if flag.status != FlagStatus::FalsePositive {
            return Err(Error::Conflict(
                "Only false-positive flags can be deleted".to_string(),
            ));
        }
        self.stores.flags.delete(flag_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parsed_response::{CandidateReportedStatus, ParsedResponse, RiskLevel};
    use crate::services::mailer::testing::RecordingMailer;
    use crate::testing::introduced_introduction;

    fn evidence() -> FlagEvidence {
        FlagEvidence::Manual {
            notes: "reported by account manager".to_string(),
            detected_at: Utc::now(),
        }
    }

    async fn manager_with_intro() -> (FlagManager, Uuid, Arc<RecordingMailer>) {
        let stores = Stores::memory();
        let intro = introduced_introduction(30);
        let intro_id = intro.id;
        stores.introductions.create(intro).await.unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let manager = FlagManager::new(stores, mailer.clone(), "ops@hirehub.test".to_string());
        (manager, intro_id, mailer)
    }

    #[tokio::test]
    async fn open_flag_marks_introduction_hired_and_alerts_admin() {
        let (manager, intro_id, mailer) = manager_with_intro().await;
        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();
        assert_eq!(flag.status, FlagStatus::Open);

        let intro = manager.stores.introductions.get(intro_id).await.unwrap().unwrap();
        assert_eq!(
            intro.status,
            crate::models::introduction::IntroductionStatus::Hired
        );
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn open_flag_twice_reuses_the_active_flag() {
        let (manager, intro_id, _mailer) = manager_with_intro().await;
        let first = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();
        let second = manager
            .open_flag(intro_id, DetectionMethod::CheckInResponse, evidence(), None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(manager.list_flags(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fee_owed_recomputed_on_either_input() {
        let (manager, intro_id, _mailer) = manager_with_intro().await;
        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();

        let updated = manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    estimated_salary: Some(Decimal::from(120_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Default fee percentage is 20.
        assert_eq!(updated.estimated_fee_owed, Some(Decimal::from(24_000)));

        let updated = manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    fee_percentage: Some(Decimal::from(25)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.estimated_fee_owed, Some(Decimal::from(30_000)));

        // Untouched inputs leave the fee alone.
        let updated = manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    resolution_notes: Some("reviewing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.estimated_fee_owed, Some(Decimal::from(30_000)));
    }

    #[tokio::test]
    async fn resolved_at_is_set_once_and_terminal_states_are_final() {
        let (manager, intro_id, _mailer) = manager_with_intro().await;
        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();

        let resolved = manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    status: Some(FlagStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let original_resolved_at = resolved.resolved_at.expect("resolved_at set");

        let err = manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    status: Some(FlagStatus::WroteOff),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let unchanged = manager.get_flag(flag.id).await.unwrap();
        assert_eq!(unchanged.resolved_at, Some(original_resolved_at));
        assert_eq!(unchanged.status, FlagStatus::Paid);
    }

    #[tokio::test]
    async fn delete_only_false_positive() {
        let (manager, intro_id, _mailer) = manager_with_intro().await;
        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();

        let err = manager.delete_flag(flag.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    status: Some(FlagStatus::FalsePositive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        manager.delete_flag(flag.id).await.unwrap();
        assert!(manager.get_flag(flag.id).await.is_err());
    }

    #[tokio::test]
    async fn invoice_defaults_to_estimated_fee_and_requires_a_positive_amount() {
        let (manager, intro_id, mailer) = manager_with_intro().await;
        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), None)
            .await
            .unwrap();

        // No salary, no explicit amount: nothing to invoice.
        let err = manager.send_invoice(flag.id, None, None, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        manager
            .update_flag(
                flag.id,
                FlagUpdate {
                    estimated_salary: Some(Decimal::from(100_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = manager.send_invoice(flag.id, None, None, None).await.unwrap();
        assert_eq!(result.invoice_amount, Decimal::from(20_000));
        assert_eq!(result.status, FlagStatus::InvoiceSent);
        assert!(result.invoice_number.starts_with("CF-"));
        // Admin alert + employer invoice + admin copy.
        assert_eq!(mailer.sent_count(), 3);
    }

    #[tokio::test]
    async fn failed_invoice_email_leaves_the_flag_open() {
        let stores = Stores::memory();
        let intro = introduced_introduction(30);
        let intro_id = intro.id;
        stores.introductions.create(intro).await.unwrap();
        // Fails the best-effort open alert and the first invoice email.
        let mailer = Arc::new(RecordingMailer::failing_first(2));
        let manager = FlagManager::new(stores, mailer, "ops@hirehub.test".to_string());

        let flag = manager
            .open_flag(intro_id, DetectionMethod::Manual, evidence(), Some(Decimal::from(90_000)))
            .await
            .unwrap();

        let err = manager.send_invoice(flag.id, None, None, None).await.unwrap_err();
        assert!(matches!(err, Error::Mail(_)));

        let unchanged = manager.get_flag(flag.id).await.unwrap();
        assert_eq!(unchanged.status, FlagStatus::Open);
        assert!(unchanged.invoice_sent_at.is_none());

        // Retry once the provider recovers: same invoice number every time.
        let result = manager.send_invoice(flag.id, None, None, None).await.unwrap();
        assert_eq!(result.invoice_number, unchanged.invoice_reference());
        assert_eq!(result.status, FlagStatus::InvoiceSent);
    }

    #[test]
    fn evidence_round_trips_through_json() {
        let parsed = ParsedResponse::new(
            CandidateReportedStatus::HiredThere,
            RiskLevel::High,
            "Candidate reports being hired by the introduced employer",
        );
        let evidence = FlagEvidence::CheckInResponse {
            check_in_id: Uuid::new_v4(),
            parsed,
            detected_at: Utc::now(),
        };
        let value = serde_json::to_value(&evidence).unwrap();
        assert_eq!(value["kind"], "check_in_response");
        let back: FlagEvidence = serde_json::from_value(value).unwrap();
        assert_eq!(back, evidence);
    }
}
