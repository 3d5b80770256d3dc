//! Postgres-backed store. All conditional writes ride on `WHERE` guards so
//! concurrent sweeps and candidate clicks resolve at the database, not in
//! process memory.

use super::{
    CheckInListFilter, CheckInStore, FlagStore, IntroductionStore, PlacementStore, ResponseWrite,
    SettingsStore,
};
use crate::error::{Error, Result};
use crate::models::check_in::CheckIn;
use crate::models::circumvention_flag::{CircumventionFlag, FlagEvidence, FlagStatus};
use crate::models::introduction::{Introduction, IntroductionStatus};
use crate::models::placement::Placement;
use crate::models::settings::PlatformSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_enum<T>(raw: String) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(Error::Internal)
}

fn parse_enum_opt<T>(raw: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(parse_enum).transpose()
}

fn intro_from_row(row: &PgRow) -> Result<Introduction> {
    Ok(Introduction {
        id: row.try_get("id")?,
        employer_id: row.try_get("employer_id")?,
        candidate_id: row.try_get("candidate_id")?,
        employer_name: row.try_get("employer_name")?,
        employer_email: row.try_get("employer_email")?,
        employer_contact_email: row.try_get("employer_contact_email")?,
        candidate_name: row.try_get("candidate_name")?,
        candidate_email: row.try_get("candidate_email")?,
        status: parse_enum(row.try_get("status")?)?,
        profile_viewed_at: row.try_get("profile_viewed_at")?,
        intro_requested_at: row.try_get("intro_requested_at")?,
        candidate_responded_at: row.try_get("candidate_responded_at")?,
        candidate_response: parse_enum_opt(row.try_get("candidate_response")?)?,
        introduced_at: row.try_get("introduced_at")?,
        protection_starts_at: row.try_get("protection_starts_at")?,
        protection_ends_at: row.try_get("protection_ends_at")?,
        profile_views: row.try_get("profile_views")?,
        resume_downloads: row.try_get("resume_downloads")?,
        response_token: row.try_get("response_token")?,
        response_token_expiry: row.try_get("response_token_expiry")?,
        last_email_sent_at: row.try_get("last_email_sent_at")?,
        email_resend_count: row.try_get("email_resend_count")?,
        expiry_warning_sent_at: row.try_get("expiry_warning_sent_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn check_in_from_row(row: &PgRow) -> Result<CheckIn> {
    let parsed: Option<serde_json::Value> = row.try_get("response_parsed")?;
    Ok(CheckIn {
        id: row.try_get("id")?,
        introduction_id: row.try_get("introduction_id")?,
        check_in_number: row.try_get("check_in_number")?,
        scheduled_for: row.try_get("scheduled_for")?,
        sent_at: row.try_get("sent_at")?,
        response_token: row.try_get("response_token")?,
        response_token_expiry: row.try_get("response_token_expiry")?,
        responded_at: row.try_get("responded_at")?,
        response_type: parse_enum_opt(row.try_get("response_type")?)?,
        response_raw: row.try_get("response_raw")?,
        response_parsed: parsed.map(serde_json::from_value).transpose()?,
        risk_level: parse_enum_opt(row.try_get("risk_level")?)?,
        risk_reason: row.try_get("risk_reason")?,
        flagged_for_review: row.try_get("flagged_for_review")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn flag_from_row(row: &PgRow) -> Result<CircumventionFlag> {
    let evidence: serde_json::Value = row.try_get("evidence")?;
    let evidence: FlagEvidence = serde_json::from_value(evidence)?;
    Ok(CircumventionFlag {
        id: row.try_get("id")?,
        introduction_id: row.try_get("introduction_id")?,
        detection_method: parse_enum(row.try_get("detection_method")?)?,
        evidence,
        status: parse_enum(row.try_get("status")?)?,
        estimated_salary: row.try_get("estimated_salary")?,
        fee_percentage: row.try_get("fee_percentage")?,
        estimated_fee_owed: row.try_get("estimated_fee_owed")?,
        detected_at: row.try_get("detected_at")?,
        resolved_at: row.try_get("resolved_at")?,
        resolution: row.try_get("resolution")?,
        resolution_notes: row.try_get("resolution_notes")?,
        invoice_number: row.try_get("invoice_number")?,
        invoice_sent_at: row.try_get("invoice_sent_at")?,
        invoice_amount: row.try_get("invoice_amount")?,
        invoice_due_date: row.try_get("invoice_due_date")?,
        invoice_paid_at: row.try_get("invoice_paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn placement_from_row(row: &PgRow) -> Result<Placement> {
    Ok(Placement {
        id: row.try_get("id")?,
        introduction_id: row.try_get("introduction_id")?,
        hired_at: row.try_get("hired_at")?,
        guarantee_ends_at: row.try_get("guarantee_ends_at")?,
        guarantee_warning_sent_at: row.try_get("guarantee_warning_sent_at")?,
        status: parse_enum(row.try_get("status")?)?,
        fee_invoiced: row.try_get("fee_invoiced")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl IntroductionStore for PgStore {
    async fn create(&self, intro: Introduction) -> Result<Introduction> {
        let row = sqlx::query(
            r#"
            INSERT INTO introductions (
                id, employer_id, candidate_id, employer_name, employer_email,
                employer_contact_email, candidate_name, candidate_email, status,
                profile_viewed_at, intro_requested_at, candidate_responded_at,
                candidate_response, introduced_at, protection_starts_at,
                protection_ends_at, profile_views, resume_downloads,
                response_token, response_token_expiry, last_email_sent_at,
                email_resend_count, expiry_warning_sent_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            RETURNING *
            "#,
        )
        .bind(intro.id)
        .bind(intro.employer_id)
        .bind(intro.candidate_id)
        .bind(&intro.employer_name)
        .bind(&intro.employer_email)
        .bind(&intro.employer_contact_email)
        .bind(&intro.candidate_name)
        .bind(&intro.candidate_email)
        .bind(intro.status.as_str())
        .bind(intro.profile_viewed_at)
        .bind(intro.intro_requested_at)
        .bind(intro.candidate_responded_at)
        .bind(intro.candidate_response.map(|r| r.as_str()))
        .bind(intro.introduced_at)
        .bind(intro.protection_starts_at)
        .bind(intro.protection_ends_at)
        .bind(intro.profile_views)
        .bind(intro.resume_downloads)
        .bind(&intro.response_token)
        .bind(intro.response_token_expiry)
        .bind(intro.last_email_sent_at)
        .bind(intro.email_resend_count)
        .bind(intro.expiry_warning_sent_at)
        .bind(intro.created_at)
        .bind(intro.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Conflict(
                "Introduction already exists for this employer and candidate".to_string(),
            ),
            other => other.into(),
        })?;
        intro_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Introduction>> {
        let row = sqlx::query(r#"SELECT * FROM introductions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(intro_from_row).transpose()
    }

    async fn list_by_status(&self, status: IntroductionStatus) -> Result<Vec<Introduction>> {
        let rows =
            sqlx::query(r#"SELECT * FROM introductions WHERE status = $1 ORDER BY created_at"#)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(intro_from_row).collect()
    }

    async fn mark_hired(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE introductions
            SET status = 'HIRED', updated_at = $1
            WHERE id = $2
              AND status NOT IN ('HIRED', 'CANDIDATE_DECLINED', 'CLOSED_NO_HIRE', 'EXPIRED')
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_expired_if_introduced(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE introductions
            SET status = 'EXPIRED', updated_at = $1
            WHERE id = $2 AND status = 'INTRODUCED'
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_expiry_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"UPDATE introductions SET expiry_warning_sent_at = $1, updated_at = $1 WHERE id = $2"#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CheckInStore for PgStore {
    async fn create(&self, check_in: CheckIn) -> Result<CheckIn> {
        let parsed = check_in
            .response_parsed
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let row = sqlx::query(
            r#"
            INSERT INTO check_ins (
                id, introduction_id, check_in_number, scheduled_for, sent_at,
                response_token, response_token_expiry, responded_at,
                response_type, response_raw, response_parsed, risk_level,
                risk_reason, flagged_for_review, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            RETURNING *
            "#,
        )
        .bind(check_in.id)
        .bind(check_in.introduction_id)
        .bind(check_in.check_in_number)
        .bind(check_in.scheduled_for)
        .bind(check_in.sent_at)
        .bind(&check_in.response_token)
        .bind(check_in.response_token_expiry)
        .bind(check_in.responded_at)
        .bind(check_in.response_type.map(|t| t.as_str()))
        .bind(&check_in.response_raw)
        .bind(parsed)
        .bind(check_in.risk_level.map(|r| r.as_str()))
        .bind(&check_in.risk_reason)
        .bind(check_in.flagged_for_review)
        .bind(check_in.created_at)
        .bind(check_in.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Conflict(format!(
                "Check-in #{} already exists for this introduction",
                check_in.check_in_number
            )),
            other => other.into(),
        })?;
        check_in_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CheckIn>> {
        let row = sqlx::query(r#"SELECT * FROM check_ins WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(check_in_from_row).transpose()
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<CheckIn>> {
        let row = sqlx::query(r#"SELECT * FROM check_ins WHERE response_token = $1"#)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(check_in_from_row).transpose()
    }

    async fn list_for_introduction(&self, introduction_id: Uuid) -> Result<Vec<CheckIn>> {
        let rows = sqlx::query(
            r#"SELECT * FROM check_ins WHERE introduction_id = $1 ORDER BY check_in_number"#,
        )
        .bind(introduction_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(check_in_from_row).collect()
    }

    async fn list_for_admin(&self, filter: CheckInListFilter) -> Result<Vec<CheckIn>> {
        let query = match filter {
            CheckInListFilter::Pending => {
                r#"SELECT * FROM check_ins
                   WHERE sent_at IS NOT NULL AND responded_at IS NULL
                   ORDER BY scheduled_for"#
            }
            CheckInListFilter::Flagged => {
                r#"SELECT * FROM check_ins WHERE flagged_for_review ORDER BY scheduled_for"#
            }
            CheckInListFilter::All => r#"SELECT * FROM check_ins ORDER BY scheduled_for"#,
        };
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter().map(check_in_from_row).collect()
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(r#"UPDATE check_ins SET sent_at = $1, updated_at = $1 WHERE id = $2"#)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn finalize_response(&self, id: Uuid, write: ResponseWrite) -> Result<bool> {
        let parsed = serde_json::to_value(&write.response_parsed)?;
        let result = sqlx::query(
            r#"
            UPDATE check_ins
            SET responded_at = $1, response_type = $2, response_raw = $3,
                response_parsed = $4, risk_level = $5, risk_reason = $6,
                flagged_for_review = $7, updated_at = $1
            WHERE id = $8 AND responded_at IS NULL
            "#,
        )
        .bind(write.responded_at)
        .bind(write.response_type.as_str())
        .bind(&write.response_raw)
        .bind(parsed)
        .bind(write.risk_level.as_str())
        .bind(&write.risk_reason)
        .bind(write.flagged_for_review)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn overwrite_parse(&self, id: Uuid, write: ResponseWrite) -> Result<()> {
        let parsed = serde_json::to_value(&write.response_parsed)?;
        let result = sqlx::query(
            r#"
            UPDATE check_ins
            SET responded_at = COALESCE(responded_at, $1), response_type = $2,
                response_raw = $3, response_parsed = $4, risk_level = $5,
                risk_reason = $6, flagged_for_review = $7, updated_at = $1
            WHERE id = $8
            "#,
        )
        .bind(write.responded_at)
        .bind(write.response_type.as_str())
        .bind(&write.response_raw)
        .bind(parsed)
        .bind(write.risk_level.as_str())
        .bind(&write.risk_reason)
        .bind(write.flagged_for_review)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Check-in not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FlagStore for PgStore {
    async fn create(&self, flag: CircumventionFlag) -> Result<CircumventionFlag> {
        let evidence = serde_json::to_value(&flag.evidence)?;
        let row = sqlx::query(
            r#"
            INSERT INTO circumvention_flags (
                id, introduction_id, detection_method, evidence, status,
                estimated_salary, fee_percentage, estimated_fee_owed,
                detected_at, resolved_at, resolution, resolution_notes,
                invoice_number, invoice_sent_at, invoice_amount,
                invoice_due_date, invoice_paid_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19
            )
            RETURNING *
            "#,
        )
        .bind(flag.id)
        .bind(flag.introduction_id)
        .bind(flag.detection_method.as_str())
        .bind(evidence)
        .bind(flag.status.as_str())
        .bind(flag.estimated_salary)
        .bind(flag.fee_percentage)
        .bind(flag.estimated_fee_owed)
        .bind(flag.detected_at)
        .bind(flag.resolved_at)
        .bind(&flag.resolution)
        .bind(&flag.resolution_notes)
        .bind(&flag.invoice_number)
        .bind(flag.invoice_sent_at)
        .bind(flag.invoice_amount)
        .bind(flag.invoice_due_date)
        .bind(flag.invoice_paid_at)
        .bind(flag.created_at)
        .bind(flag.updated_at)
        .fetch_one(&self.pool)
        .await?;
        flag_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CircumventionFlag>> {
        let row = sqlx::query(r#"SELECT * FROM circumvention_flags WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(flag_from_row).transpose()
    }

    async fn active_for_introduction(
        &self,
        introduction_id: Uuid,
    ) -> Result<Option<CircumventionFlag>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM circumvention_flags
            WHERE introduction_id = $1
              AND status NOT IN ('PAID', 'FALSE_POSITIVE', 'WROTE_OFF')
            ORDER BY detected_at
            LIMIT 1
            "#,
        )
        .bind(introduction_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(flag_from_row).transpose()
    }

    async fn update(&self, flag: CircumventionFlag) -> Result<CircumventionFlag> {
        let evidence = serde_json::to_value(&flag.evidence)?;
        let row = sqlx::query(
            r#"
            UPDATE circumvention_flags
            SET detection_method = $1, evidence = $2, status = $3,
                estimated_salary = $4, fee_percentage = $5,
                estimated_fee_owed = $6,
                resolved_at = COALESCE(resolved_at, $7),
                resolution = $8, resolution_notes = $9, invoice_number = $10,
                invoice_sent_at = $11, invoice_amount = $12,
                invoice_due_date = $13, invoice_paid_at = $14, updated_at = $15
            WHERE id = $16
            RETURNING *
            "#,
        )
        .bind(flag.detection_method.as_str())
        .bind(evidence)
        .bind(flag.status.as_str())
        .bind(flag.estimated_salary)
        .bind(flag.fee_percentage)
        .bind(flag.estimated_fee_owed)
        .bind(flag.resolved_at)
        .bind(&flag.resolution)
        .bind(&flag.resolution_notes)
        .bind(&flag.invoice_number)
        .bind(flag.invoice_sent_at)
        .bind(flag.invoice_amount)
        .bind(flag.invoice_due_date)
        .bind(flag.invoice_paid_at)
        .bind(flag.updated_at)
        .bind(flag.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Flag not found".to_string()))?;
        flag_from_row(&row)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM circumvention_flags WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Flag not found".to_string()));
        }
        Ok(())
    }

    async fn list(&self, status: Option<FlagStatus>) -> Result<Vec<CircumventionFlag>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"SELECT * FROM circumvention_flags WHERE status = $1 ORDER BY detected_at"#,
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(r#"SELECT * FROM circumvention_flags ORDER BY detected_at"#)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(flag_from_row).collect()
    }
}

#[async_trait]
impl PlacementStore for PgStore {
    async fn create(&self, placement: Placement) -> Result<Placement> {
        let row = sqlx::query(
            r#"
            INSERT INTO placements (
                id, introduction_id, hired_at, guarantee_ends_at,
                guarantee_warning_sent_at, status, fee_invoiced, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(placement.id)
        .bind(placement.introduction_id)
        .bind(placement.hired_at)
        .bind(placement.guarantee_ends_at)
        .bind(placement.guarantee_warning_sent_at)
        .bind(placement.status.as_str())
        .bind(placement.fee_invoiced)
        .bind(placement.created_at)
        .bind(placement.updated_at)
        .fetch_one(&self.pool)
        .await?;
        placement_from_row(&row)
    }

    async fn list_active(&self) -> Result<Vec<Placement>> {
        let rows =
            sqlx::query(r#"SELECT * FROM placements WHERE status = 'ACTIVE' ORDER BY hired_at"#)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(placement_from_row).collect()
    }

    async fn mark_guarantee_expired_if_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE placements
            SET status = 'GUARANTEE_EXPIRED', updated_at = $1
            WHERE id = $2 AND status = 'ACTIVE'
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_guarantee_warning_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"UPDATE placements SET guarantee_warning_sent_at = $1, updated_at = $1 WHERE id = $2"#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn current(&self) -> Result<PlatformSettings> {
        let row = sqlx::query(
            r#"SELECT * FROM platform_settings ORDER BY version DESC LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(PlatformSettings::default());
        };
        Ok(PlatformSettings {
            version: row.try_get("version")?,
            default_fee_percentage: row.try_get("default_fee_percentage")?,
            protection_months: row.try_get::<i32, _>("protection_months")? as u32,
            check_in_interval_days: row.try_get::<i32, _>("check_in_interval_days")? as i64,
            response_token_ttl_days: row.try_get::<i32, _>("response_token_ttl_days")? as i64,
            invoice_due_days: row.try_get::<i32, _>("invoice_due_days")? as i64,
            batch_size: row.try_get::<i32, _>("batch_size")? as usize,
            batch_delay_ms: row.try_get::<i32, _>("batch_delay_ms")? as u64,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn put(&self, settings: PlatformSettings) -> Result<PlatformSettings> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO platform_settings (
                version, default_fee_percentage, protection_months,
                check_in_interval_days, response_token_ttl_days,
                invoice_due_days, batch_size, batch_delay_ms, updated_at
            )
            SELECT COALESCE(MAX(version), 1) + 1, $1, $2, $3, $4, $5, $6, $7, $8
            FROM platform_settings
            RETURNING version
            "#,
        )
        .bind(settings.default_fee_percentage)
        .bind(settings.protection_months as i32)
        .bind(settings.check_in_interval_days as i32)
        .bind(settings.response_token_ttl_days as i32)
        .bind(settings.invoice_due_days as i32)
        .bind(settings.batch_size as i32)
        .bind(settings.batch_delay_ms as i32)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        let version: i32 = row.try_get("version")?;
        Ok(PlatformSettings {
            version,
            updated_at: now,
            ..settings
        })
    }
}
