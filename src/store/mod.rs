pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::models::check_in::{CheckIn, ResponseType};
use crate::models::circumvention_flag::{CircumventionFlag, FlagStatus};
use crate::models::introduction::{Introduction, IntroductionStatus};
use crate::models::parsed_response::{ParsedResponse, RiskLevel};
use crate::models::placement::Placement;
use crate::models::settings::PlatformSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Columns written when a check-in response lands, shared by the
/// single-shot structured path and the overwrite-able free-text path.
#[derive(Debug, Clone)]
pub struct ResponseWrite {
    pub responded_at: DateTime<Utc>,
    pub response_type: ResponseType,
    pub response_raw: String,
    pub response_parsed: ParsedResponse,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub flagged_for_review: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInListFilter {
    /// Sent, awaiting any response.
    Pending,
    /// Responded and flagged for review.
    Flagged,
    All,
}

#[async_trait]
pub trait IntroductionStore: Send + Sync {
    async fn create(&self, intro: Introduction) -> Result<Introduction>;
    async fn get(&self, id: Uuid) -> Result<Option<Introduction>>;
    async fn list_by_status(&self, status: IntroductionStatus) -> Result<Vec<Introduction>>;
    /// Marks the introduction HIRED unless it already sits in a terminal
    /// state. Returns whether the transition was applied.
    async fn mark_hired(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
    /// Compare-and-swap INTRODUCED -> EXPIRED; false when someone else got
    /// there first, so a re-run never double-counts.
    async fn mark_expired_if_introduced(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
    async fn set_expiry_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait CheckInStore: Send + Sync {
    /// Inserts a new check-in; conflicts when the (introduction,
    /// check_in_number) slot is already taken.
    async fn create(&self, check_in: CheckIn) -> Result<CheckIn>;
    async fn get(&self, id: Uuid) -> Result<Option<CheckIn>>;
    async fn get_by_token(&self, token: &str) -> Result<Option<CheckIn>>;
    async fn list_for_introduction(&self, introduction_id: Uuid) -> Result<Vec<CheckIn>>;
    async fn list_for_admin(&self, filter: CheckInListFilter) -> Result<Vec<CheckIn>>;
    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    /// First answer wins: writes only while responded_at is null. Returns
    /// whether the write landed.
    async fn finalize_response(&self, id: Uuid, write: ResponseWrite) -> Result<bool>;
    /// Re-parse path: replaces the parse fields but keeps an existing
    /// responded_at timestamp.
    async fn overwrite_parse(&self, id: Uuid, write: ResponseWrite) -> Result<()>;
}

#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn create(&self, flag: CircumventionFlag) -> Result<CircumventionFlag>;
    async fn get(&self, id: Uuid) -> Result<Option<CircumventionFlag>>;
    /// The non-terminal flag for an introduction, if any.
    async fn active_for_introduction(&self, introduction_id: Uuid)
        -> Result<Option<CircumventionFlag>>;
    /// Full-record update. Implementations keep an already-set resolved_at
    /// regardless of the value supplied.
    async fn update(&self, flag: CircumventionFlag) -> Result<CircumventionFlag>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn list(&self, status: Option<FlagStatus>) -> Result<Vec<CircumventionFlag>>;
}

#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn create(&self, placement: Placement) -> Result<Placement>;
    async fn list_active(&self) -> Result<Vec<Placement>>;
    async fn mark_guarantee_expired_if_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
    async fn set_guarantee_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Latest settings version, falling back to defaults before the first
    /// write.
    async fn current(&self) -> Result<PlatformSettings>;
    /// Persists a new version; the version counter is assigned by the store.
    async fn put(&self, settings: PlatformSettings) -> Result<PlatformSettings>;
}

/// Bundle of store handles handed to the services.
#[derive(Clone)]
pub struct Stores {
    pub introductions: Arc<dyn IntroductionStore>,
    pub check_ins: Arc<dyn CheckInStore>,
    pub flags: Arc<dyn FlagStore>,
    pub placements: Arc<dyn PlacementStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            introductions: store.clone(),
            check_ins: store.clone(),
            flags: store.clone(),
            placements: store.clone(),
            settings: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            introductions: store.clone(),
            check_ins: store.clone(),
            flags: store.clone(),
            placements: store.clone(),
            settings: store,
        }
    }
}
