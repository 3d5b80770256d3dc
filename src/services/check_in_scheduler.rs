use crate::error::Result;
use crate::models::check_in::CheckIn;
use crate::models::introduction::{Introduction, IntroductionStatus};
use crate::models::settings::PlatformSettings;
use crate::services::emails;
use crate::services::mailer::Mailer;
use crate::services::sweep::BatchPolicy;
use crate::store::Stores;
use crate::utils::token::generate_response_token;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

/// Periodically probes candidates under active introductions. Safe to run
/// on any cadence: cadence slots are keyed by check-in number, so a re-run
/// never creates a duplicate, and a created-but-unsent check-in is resent
/// instead of recreated.
#[derive(Clone)]
pub struct CheckInScheduler {
    stores: Stores,
    mailer: Arc<dyn Mailer>,
    webapp_url: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SchedulerOutcome {
    pub introductions_processed: usize,
    pub created: usize,
    pub sent: usize,
    pub errors: Vec<String>,
}

/// Per-introduction result. A send failure is data, not an error: the
/// check-in record is already durable by then and must still be counted.
#[derive(Debug, Default)]
struct IntroProcessed {
    created: bool,
    sent: bool,
    send_error: Option<crate::error::Error>,
}

impl CheckInScheduler {
    pub fn new(stores: Stores, mailer: Arc<dyn Mailer>, webapp_url: String) -> Self {
        Self {
            stores,
            mailer,
            webapp_url,
        }
    }

    pub async fn run(&self) -> Result<SchedulerOutcome> {
        let now = Utc::now();
        let settings = self.stores.settings.current().await?;
        let policy = BatchPolicy {
            size: settings.batch_size,
            delay: StdDuration::from_millis(settings.batch_delay_ms),
        };

        let candidates: Vec<Introduction> = self
            .stores
            .introductions
            .list_by_status(IntroductionStatus::Introduced)
            .await?
            .into_iter()
            .filter(|i| i.protection_ends_at > now)
            .collect();

        let mut outcome = SchedulerOutcome::default();
        for (index, intro) in candidates.iter().enumerate() {
            policy.pause_before(index).await;
            outcome.introductions_processed += 1;
            match self.process_introduction(intro, &settings, now).await {
                Ok(item) => {
                    outcome.created += item.created as usize;
                    outcome.sent += item.sent as usize;
                    if let Some(e) = item.send_error {
                        tracing::error!(introduction_id = %intro.id, error = ?e, "check-in email failed");
                        outcome.errors.push(intro.id.to_string());
                    }
                }
                Err(e) => {
                    tracing::error!(introduction_id = %intro.id, error = ?e, "check-in scheduling failed");
                    outcome.errors.push(intro.id.to_string());
                }
            }
        }

        tracing::info!(
            processed = outcome.introductions_processed,
            created = outcome.created,
            sent = outcome.sent,
            failed = outcome.errors.len(),
            "check-in scheduler run complete"
        );
        Ok(outcome)
    }

    async fn process_introduction(
        &self,
        intro: &Introduction,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<IntroProcessed> {
        let existing = self.stores.check_ins.list_for_introduction(intro.id).await?;

        // A check-in that never left the building takes priority over
        // opening the next slot.
        if let Some(pending) = existing.iter().find(|c| c.sent_at.is_none()) {
            return Ok(self.attempt_delivery(intro, pending, now, false).await);
        }

        let anchor = intro.introduced_at.unwrap_or(intro.protection_starts_at);
        let next_number = existing.last().map(|c| c.check_in_number + 1).unwrap_or(1);
        let slot = anchor + Duration::days(settings.check_in_interval_days * next_number as i64);
        if slot > now || slot >= intro.protection_ends_at {
            return Ok(IntroProcessed::default());
        }

        let check_in = self
            .create_check_in(intro.id, next_number, slot, settings, now)
            .await?;
        Ok(self.attempt_delivery(intro, &check_in, now, true).await)
    }

    async fn attempt_delivery(
        &self,
        intro: &Introduction,
        check_in: &CheckIn,
        now: DateTime<Utc>,
        created: bool,
    ) -> IntroProcessed {
        match self.deliver(intro, check_in, now).await {
            Ok(sent) => IntroProcessed {
                created,
                sent,
                send_error: None,
            },
            Err(e) => IntroProcessed {
                created,
                sent: false,
                send_error: Some(e),
            },
        }
    }

    pub(crate) async fn create_check_in(
        &self,
        introduction_id: Uuid,
        number: i32,
        scheduled_for: DateTime<Utc>,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<CheckIn> {
        let check_in = CheckIn {
            id: Uuid::new_v4(),
            introduction_id,
            check_in_number: number,
            scheduled_for,
            sent_at: None,
            response_token: generate_response_token(),
            response_token_expiry: now + Duration::days(settings.response_token_ttl_days),
            responded_at: None,
            response_type: None,
            response_raw: None,
            response_parsed: None,
            risk_level: None,
            risk_reason: None,
            flagged_for_review: false,
            created_at: now,
            updated_at: now,
        };
        self.stores.check_ins.create(check_in).await
    }

    /// Emails the response link. Failure is retryable: the record keeps
    /// sent_at = null and the next run picks it up again.
    pub(crate) async fn deliver(
        &self,
        intro: &Introduction,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let response_url = format!(
            "{}/check-ins/respond/{}",
            self.webapp_url.trim_end_matches('/'),
            check_in.response_token
        );
        let message = emails::check_in_email(intro, &response_url);
        let outcome = self.mailer.send(&message).await;
        if outcome.success {
            self.stores.check_ins.mark_sent(check_in.id, now).await?;
            Ok(true)
        } else {
            Err(crate::error::Error::Mail(
                outcome.error.unwrap_or_else(|| "check-in email failed".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::testing::RecordingMailer;
    use crate::testing::introduced_introduction;

    fn scheduler(stores: &Stores, mailer: Arc<RecordingMailer>) -> CheckInScheduler {
        CheckInScheduler::new(stores.clone(), mailer, "https://app.hirehub.test".to_string())
    }

    #[tokio::test]
    async fn first_check_in_created_when_slot_passes() {
        let stores = Stores::memory();
        let intro = introduced_introduction(31);
        let intro_id = intro.id;
        stores.introductions.create(intro).await.unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let svc = scheduler(&stores, mailer.clone());

        let outcome = svc.run().await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.sent, 1);
        assert!(outcome.errors.is_empty());

        let check_ins = stores.check_ins.list_for_introduction(intro_id).await.unwrap();
        assert_eq!(check_ins.len(), 1);
        assert_eq!(check_ins[0].check_in_number, 1);
        assert!(check_ins[0].sent_at.is_some());
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn running_twice_creates_no_duplicate_for_the_same_slot() {
        let stores = Stores::memory();
        stores.introductions.create(introduced_introduction(31)).await.unwrap();
        let svc = scheduler(&stores, Arc::new(RecordingMailer::new()));

        let first = svc.run().await.unwrap();
        let second = svc.run().await.unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.sent, 0);
    }

    #[tokio::test]
    async fn not_yet_due_introduction_is_left_alone() {
        let stores = Stores::memory();
        stores.introductions.create(introduced_introduction(5)).await.unwrap();
        let svc = scheduler(&stores, Arc::new(RecordingMailer::new()));

        let outcome = svc.run().await.unwrap();
        assert_eq!(outcome.introductions_processed, 1);
        assert_eq!(outcome.created, 0);
    }

    #[tokio::test]
    async fn terminal_introductions_are_skipped() {
        let stores = Stores::memory();
        let mut intro = introduced_introduction(31);
        intro.status = IntroductionStatus::Hired;
        stores.introductions.create(intro).await.unwrap();
        let svc = scheduler(&stores, Arc::new(RecordingMailer::new()));

        let outcome = svc.run().await.unwrap();
        assert_eq!(outcome.introductions_processed, 0);
        assert_eq!(outcome.created, 0);
    }

    #[tokio::test]
    async fn failed_send_is_retried_without_creating_a_second_check_in() {
        let stores = Stores::memory();
        let intro = introduced_introduction(31);
        let intro_id = intro.id;
        stores.introductions.create(intro).await.unwrap();
        let mailer = Arc::new(RecordingMailer::failing_first(1));
        let svc = scheduler(&stores, mailer.clone());

        let first = svc.run().await.unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.sent, 0);
        assert_eq!(first.errors.len(), 1);

        let pending = &stores.check_ins.list_for_introduction(intro_id).await.unwrap()[0];
        assert!(pending.sent_at.is_none());

        let second = svc.run().await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.sent, 1);
        assert!(second.errors.is_empty());

        let check_ins = stores.check_ins.list_for_introduction(intro_id).await.unwrap();
        assert_eq!(check_ins.len(), 1);
        assert!(check_ins[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn later_slots_get_sequential_numbers() {
        let stores = Stores::memory();
        let intro = introduced_introduction(65);
        let intro_id = intro.id;
        stores.introductions.create(intro).await.unwrap();
        let svc = scheduler(&stores, Arc::new(RecordingMailer::new()));

        // One slot per run; two runs catch up to day 60.
        svc.run().await.unwrap();
        svc.run().await.unwrap();

        let check_ins = stores.check_ins.list_for_introduction(intro_id).await.unwrap();
        let numbers: Vec<i32> = check_ins.iter().map(|c| c.check_in_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
