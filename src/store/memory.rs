//! In-memory store used by the test suite, mirroring the conditional-write
//! semantics of the Postgres implementation.

use super::{
    CheckInListFilter, CheckInStore, FlagStore, IntroductionStore, PlacementStore, ResponseWrite,
    SettingsStore,
};
use crate::error::{Error, Result};
use crate::models::check_in::CheckIn;
use crate::models::circumvention_flag::{CircumventionFlag, FlagStatus};
use crate::models::introduction::{Introduction, IntroductionStatus};
use crate::models::placement::{Placement, PlacementStatus};
use crate::models::settings::PlatformSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    introductions: HashMap<Uuid, Introduction>,
    check_ins: HashMap<Uuid, CheckIn>,
    flags: HashMap<Uuid, CircumventionFlag>,
    placements: HashMap<Uuid, Placement>,
    settings: Vec<PlatformSettings>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntroductionStore for MemoryStore {
    async fn create(&self, intro: Introduction) -> Result<Introduction> {
        let mut inner = self.lock();
        let duplicate = inner.introductions.values().any(|existing| {
            existing.employer_id == intro.employer_id && existing.candidate_id == intro.candidate_id
        });
        if duplicate {
            return Err(Error::Conflict(
                "Introduction already exists for this employer and candidate".to_string(),
            ));
        }
        inner.introductions.insert(intro.id, intro.clone());
        Ok(intro)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Introduction>> {
        Ok(self.lock().introductions.get(&id).cloned())
    }

    async fn list_by_status(&self, status: IntroductionStatus) -> Result<Vec<Introduction>> {
        let mut items: Vec<Introduction> = self
            .lock()
            .introductions
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    async fn mark_hired(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.lock();
        let Some(intro) = inner.introductions.get_mut(&id) else {
            return Err(Error::NotFound("Introduction not found".to_string()));
        };
        if intro.status.is_terminal() {
            return Ok(false);
        }
        intro.status = IntroductionStatus::Hired;
        intro.updated_at = at;
        Ok(true)
    }

    async fn mark_expired_if_introduced(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.lock();
        let Some(intro) = inner.introductions.get_mut(&id) else {
            return Err(Error::NotFound("Introduction not found".to_string()));
        };
        if intro.status != IntroductionStatus::Introduced {
            return Ok(false);
        }
        intro.status = IntroductionStatus::Expired;
        intro.updated_at = at;
        Ok(true)
    }

    async fn set_expiry_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock();
        let Some(intro) = inner.introductions.get_mut(&id) else {
            return Err(Error::NotFound("Introduction not found".to_string()));
        };
        intro.expiry_warning_sent_at = Some(at);
        intro.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl CheckInStore for MemoryStore {
    async fn create(&self, check_in: CheckIn) -> Result<CheckIn> {
        let mut inner = self.lock();
        let slot_taken = inner.check_ins.values().any(|existing| {
            existing.introduction_id == check_in.introduction_id
                && existing.check_in_number == check_in.check_in_number
        });
        if slot_taken {
            return Err(Error::Conflict(format!(
                "Check-in #{} already exists for this introduction",
                check_in.check_in_number
            )));
        }
        inner.check_ins.insert(check_in.id, check_in.clone());
        Ok(check_in)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CheckIn>> {
        Ok(self.lock().check_ins.get(&id).cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<CheckIn>> {
        Ok(self
            .lock()
            .check_ins
            .values()
            .find(|c| c.response_token == token)
            .cloned())
    }

    async fn list_for_introduction(&self, introduction_id: Uuid) -> Result<Vec<CheckIn>> {
        let mut items: Vec<CheckIn> = self
            .lock()
            .check_ins
            .values()
            .filter(|c| c.introduction_id == introduction_id)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.check_in_number);
        Ok(items)
    }

    async fn list_for_admin(&self, filter: CheckInListFilter) -> Result<Vec<CheckIn>> {
        let mut items: Vec<CheckIn> = self
            .lock()
            .check_ins
            .values()
            .filter(|c| match filter {
                CheckInListFilter::Pending => c.sent_at.is_some() && c.responded_at.is_none(),
                CheckInListFilter::Flagged => c.flagged_for_review,
                CheckInListFilter::All => true,
            })
            .cloned()
            .collect();
        items.sort_by_key(|c| c.scheduled_for);
        Ok(items)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock();
        let Some(check_in) = inner.check_ins.get_mut(&id) else {
            return Err(Error::NotFound("Check-in not found".to_string()));
        };
        check_in.sent_at = Some(at);
        check_in.updated_at = at;
        Ok(())
    }

    async fn finalize_response(&self, id: Uuid, write: ResponseWrite) -> Result<bool> {
        let mut inner = self.lock();
        let Some(check_in) = inner.check_ins.get_mut(&id) else {
            return Err(Error::NotFound("Check-in not found".to_string()));
        };
        if check_in.responded_at.is_some() {
            return Ok(false);
        }
        apply_write(check_in, write, false);
        Ok(true)
    }

    async fn overwrite_parse(&self, id: Uuid, write: ResponseWrite) -> Result<()> {
        let mut inner = self.lock();
        let Some(check_in) = inner.check_ins.get_mut(&id) else {
            return Err(Error::NotFound("Check-in not found".to_string()));
        };
        apply_write(check_in, write, true);
        Ok(())
    }
}

fn apply_write(check_in: &mut CheckIn, write: ResponseWrite, preserve_responded_at: bool) {
    if !(preserve_responded_at && check_in.responded_at.is_some()) {
        check_in.responded_at = Some(write.responded_at);
    }
    check_in.response_type = Some(write.response_type);
    check_in.response_raw = Some(write.response_raw);
    check_in.response_parsed = Some(write.response_parsed);
    check_in.risk_level = Some(write.risk_level);
    check_in.risk_reason = Some(write.risk_reason);
    check_in.flagged_for_review = write.flagged_for_review;
    check_in.updated_at = write.responded_at;
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn create(&self, flag: CircumventionFlag) -> Result<CircumventionFlag> {
        self.lock().flags.insert(flag.id, flag.clone());
        Ok(flag)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CircumventionFlag>> {
        Ok(self.lock().flags.get(&id).cloned())
    }

    async fn active_for_introduction(
        &self,
        introduction_id: Uuid,
    ) -> Result<Option<CircumventionFlag>> {
        Ok(self
            .lock()
            .flags
            .values()
            .find(|f| f.introduction_id == introduction_id && !f.status.is_terminal())
            .cloned())
    }

    async fn update(&self, mut flag: CircumventionFlag) -> Result<CircumventionFlag> {
        let mut inner = self.lock();
        let Some(existing) = inner.flags.get(&flag.id) else {
            return Err(Error::NotFound("Flag not found".to_string()));
        };
        // First resolved_at wins, whatever the caller supplied.
        if let Some(original) = existing.resolved_at {
            flag.resolved_at = Some(original);
        }
        inner.flags.insert(flag.id, flag.clone());
        Ok(flag)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        if inner.flags.remove(&id).is_none() {
            return Err(Error::NotFound("Flag not found".to_string()));
        }
        Ok(())
    }

    async fn list(&self, status: Option<FlagStatus>) -> Result<Vec<CircumventionFlag>> {
        let mut items: Vec<CircumventionFlag> = self
            .lock()
            .flags
            .values()
            .filter(|f| status.map_or(true, |s| f.status == s))
            .cloned()
            .collect();
        items.sort_by_key(|f| f.detected_at);
        Ok(items)
    }
}

#[async_trait]
impl PlacementStore for MemoryStore {
    async fn create(&self, placement: Placement) -> Result<Placement> {
        self.lock().placements.insert(placement.id, placement.clone());
        Ok(placement)
    }

    async fn list_active(&self) -> Result<Vec<Placement>> {
        let mut items: Vec<Placement> = self
            .lock()
            .placements
            .values()
            .filter(|p| p.status == PlacementStatus::Active)
            .cloned()
            .collect();
        items.sort_by_key(|p| p.hired_at);
        Ok(items)
    }

    async fn mark_guarantee_expired_if_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.lock();
        let Some(placement) = inner.placements.get_mut(&id) else {
            return Err(Error::NotFound("Placement not found".to_string()));
        };
        if placement.status != PlacementStatus::Active {
            return Ok(false);
        }
        placement.status = PlacementStatus::GuaranteeExpired;
        placement.updated_at = at;
        Ok(true)
    }

    async fn set_guarantee_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock();
        let Some(placement) = inner.placements.get_mut(&id) else {
            return Err(Error::NotFound("Placement not found".to_string()));
        };
        placement.guarantee_warning_sent_at = Some(at);
        placement.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn current(&self) -> Result<PlatformSettings> {
        Ok(self
            .lock()
            .settings
            .last()
            .cloned()
            .unwrap_or_default())
    }

    async fn put(&self, mut settings: PlatformSettings) -> Result<PlatformSettings> {
        let mut inner = self.lock();
        let next_version = inner.settings.last().map(|s| s.version + 1).unwrap_or(2);
        settings.version = next_version;
        settings.updated_at = Utc::now();
        inner.settings.push(settings.clone());
        Ok(settings)
    }
}
