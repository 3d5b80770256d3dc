use crate::error::Result;
use crate::models::introduction::{Introduction, IntroductionStatus};
use crate::models::settings::PlatformSettings;
use crate::services::check_in_scheduler::CheckInScheduler;
use crate::services::emails;
use crate::services::mailer::Mailer;
use crate::services::sweep::{classify_window, BatchPolicy, WindowEvent};
use crate::store::Stores;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration as StdDuration;

const WARN_DAYS: i64 = 7;
const WARN_TOLERANCE_DAYS: i64 = 1;

/// Daily sweeps over the two time windows the platform guards: the
/// introduction protection period and the placement guarantee period.
#[derive(Clone)]
pub struct ExpiryMonitor {
    stores: Stores,
    mailer: Arc<dyn Mailer>,
    scheduler: CheckInScheduler,
}

#[derive(Debug, Default, Serialize)]
pub struct ExpirySweepOutcome {
    pub scanned: usize,
    pub expiring_in_7_days: usize,
    pub warnings_sent: usize,
    pub final_check_ins_sent: usize,
    pub expired_marked: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct GuaranteeSweepOutcome {
    pub scanned: usize,
    pub warnings_sent: usize,
    pub expired_marked: usize,
    pub errors: Vec<String>,
}

impl ExpiryMonitor {
    pub fn new(stores: Stores, mailer: Arc<dyn Mailer>, scheduler: CheckInScheduler) -> Self {
        Self {
            stores,
            mailer,
            scheduler,
        }
    }

    /// Warns employers whose protection window closes in about a week and
    /// marks overdue windows EXPIRED. The expiry write is a compare-and-swap
    /// on status, so overlapping runs count each expiry once.
    pub async fn run_expiry_alerts(&self) -> Result<ExpirySweepOutcome> {
        let now = Utc::now();
        let settings = self.stores.settings.current().await?;
        let policy = BatchPolicy {
            size: settings.batch_size,
            delay: StdDuration::from_millis(settings.batch_delay_ms),
        };

        let introductions = self
            .stores
            .introductions
            .list_by_status(IntroductionStatus::Introduced)
            .await?;

        let mut outcome = ExpirySweepOutcome::default();
        for (index, intro) in introductions.iter().enumerate() {
            policy.pause_before(index).await;
            outcome.scanned += 1;
            let event = classify_window(
                now,
                intro.protection_ends_at,
                WARN_DAYS,
                WARN_TOLERANCE_DAYS,
                intro.expiry_warning_sent_at.is_some(),
            );
            match event {
                WindowEvent::Nothing => {}
                WindowEvent::Warn { days_left } => {
                    outcome.expiring_in_7_days += 1;
                    match self.warn_expiring(intro, days_left, &settings, now).await {
                        Ok(final_sent) => {
                            outcome.warnings_sent += 1;
                            outcome.final_check_ins_sent += final_sent as usize;
                        }
                        Err(e) => {
                            tracing::error!(introduction_id = %intro.id, error = ?e, "expiry warning failed");
                            outcome.errors.push(intro.id.to_string());
                        }
                    }
                }
                WindowEvent::Expire => match self
                    .stores
                    .introductions
                    .mark_expired_if_introduced(intro.id, now)
                    .await
                {
                    Ok(true) => {
                        tracing::info!(introduction_id = %intro.id, "protection period expired");
                        outcome.expired_marked += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(introduction_id = %intro.id, error = ?e, "expiry marking failed");
                        outcome.errors.push(intro.id.to_string());
                    }
                },
            }
        }

        tracing::info!(
            scanned = outcome.scanned,
            expiring = outcome.expiring_in_7_days,
            warned = outcome.warnings_sent,
            expired = outcome.expired_marked,
            failed = outcome.errors.len(),
            "expiry sweep complete"
        );
        Ok(outcome)
    }

    /// The warning marker is set only after the employer email goes out, so
    /// a failed send is retried on the next run. The accompanying final
    /// check-in is best-effort here: a created-but-unsent record is picked
    /// up by the regular scheduler.
    async fn warn_expiring(
        &self,
        intro: &Introduction,
        days_left: i64,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let message = emails::expiry_warning_email(intro, days_left);
        let delivery = self.mailer.send(&message).await;
        if !delivery.success {
            return Err(crate::error::Error::Mail(
                delivery
                    .error
                    .unwrap_or_else(|| "expiry warning email failed".to_string()),
            ));
        }
        self.stores
            .introductions
            .set_expiry_warning_sent(intro.id, now)
            .await?;

        let final_sent = match self.send_final_check_in(intro, settings, now).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::warn!(introduction_id = %intro.id, error = ?e, "final check-in delivery failed");
                false
            }
        };
        Ok(final_sent)
    }

    /// One last status probe to the candidate before the window closes.
    /// Skipped when a check-in is still awaiting its answer.
    async fn send_final_check_in(
        &self,
        intro: &Introduction,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let existing = self.stores.check_ins.list_for_introduction(intro.id).await?;
        if existing
            .iter()
            .any(|c| c.responded_at.is_none() && !c.token_expired(now))
        {
            return Ok(false);
        }
        let next_number = existing.last().map(|c| c.check_in_number + 1).unwrap_or(1);
        let check_in = self
            .scheduler
            .create_check_in(intro.id, next_number, now, settings, now)
            .await?;
        self.scheduler.deliver(intro, &check_in, now).await
    }

    /// Placement guarantee windows follow the same warn-then-expire shape
    /// as protection windows, on their own table.
    pub async fn run_guarantee_checks(&self) -> Result<GuaranteeSweepOutcome> {
        let now = Utc::now();
        let settings = self.stores.settings.current().await?;
        let policy = BatchPolicy {
            size: settings.batch_size,
            delay: StdDuration::from_millis(settings.batch_delay_ms),
        };

        let placements = self.stores.placements.list_active().await?;
        let mut outcome = GuaranteeSweepOutcome::default();
        for (index, placement) in placements.iter().enumerate() {
            policy.pause_before(index).await;
            outcome.scanned += 1;
            let event = classify_window(
                now,
                placement.guarantee_ends_at,
                WARN_DAYS,
                WARN_TOLERANCE_DAYS,
                placement.guarantee_warning_sent_at.is_some(),
            );
            match event {
                WindowEvent::Nothing => {}
                WindowEvent::Warn { .. } => {
                    match self.warn_guarantee(placement.introduction_id, placement.id, placement.guarantee_ends_at, now).await {
                        Ok(()) => outcome.warnings_sent += 1,
                        Err(e) => {
                            tracing::error!(placement_id = %placement.id, error = ?e, "guarantee warning failed");
                            outcome.errors.push(placement.id.to_string());
                        }
                    }
                }
                WindowEvent::Expire => match self
                    .stores
                    .placements
                    .mark_guarantee_expired_if_active(placement.id, now)
                    .await
                {
                    Ok(true) => outcome.expired_marked += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(placement_id = %placement.id, error = ?e, "guarantee expiry marking failed");
                        outcome.errors.push(placement.id.to_string());
                    }
                },
            }
        }

        tracing::info!(
            scanned = outcome.scanned,
            warned = outcome.warnings_sent,
            expired = outcome.expired_marked,
            failed = outcome.errors.len(),
            "guarantee sweep complete"
        );
        Ok(outcome)
    }

    async fn warn_guarantee(
        &self,
        introduction_id: uuid::Uuid,
        placement_id: uuid::Uuid,
        guarantee_ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let intro = self
            .stores
            .introductions
            .get(introduction_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound("Introduction not found".to_string()))?;
        let message = emails::guarantee_warning_email(&intro, guarantee_ends_at.date_naive());
        let delivery = self.mailer.send(&message).await;
        if !delivery.success {
            return Err(crate::error::Error::Mail(
                delivery
                    .error
                    .unwrap_or_else(|| "guarantee warning email failed".to_string()),
            ));
        }
        self.stores
            .placements
            .set_guarantee_warning_sent(placement_id, now)
            .await?;
        Ok(())
    }
}
