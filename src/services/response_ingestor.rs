use crate::error::{Error, Result};
use crate::models::check_in::{CheckIn, ResponseType};
use crate::models::circumvention_flag::{DetectionMethod, FlagEvidence};
use crate::models::parsed_response::{CandidateReportedStatus, ParsedResponse, RiskLevel};
use crate::services::flag_manager::FlagManager;
use crate::services::reply_parser::ReplyParser;
use crate::services::risk;
use crate::store::{CheckInListFilter, ResponseWrite, Stores};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Candidate-facing error codes. The response page renders these three
/// cases differently, so they must never collapse into one error.
pub const ERR_INVALID_LINK: &str = "invalid_link";
pub const ERR_LINK_EXPIRED: &str = "link_expired";
pub const ERR_ALREADY_RESPONDED: &str = "already_responded";

const MIN_PARSEABLE_CHARS: usize = 10;
const AUDIT_EXCERPT_CHARS: usize = 1000;

/// Normalizes candidate replies from either entry path and fans out to the
/// flag manager on a circumvention signal.
#[derive(Clone)]
pub struct ResponseIngestor {
    stores: Stores,
    parser: Arc<dyn ReplyParser>,
    flag_manager: FlagManager,
}

#[derive(Debug, Clone)]
pub struct StructuredReply {
    pub status: CandidateReportedStatus,
    pub message: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub role_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub check_in_id: Uuid,
    pub risk_level: RiskLevel,
    pub flag_opened: bool,
}

impl ResponseIngestor {
    pub fn new(stores: Stores, parser: Arc<dyn ReplyParser>, flag_manager: FlagManager) -> Self {
        Self {
            stores,
            parser,
            flag_manager,
        }
    }

    pub async fn check_in_by_token(&self, token: &str) -> Result<CheckIn> {
        self.stores
            .check_ins
            .get_by_token(token)
            .await?
            .ok_or_else(|| Error::NotFound(ERR_INVALID_LINK.to_string()))
    }

    pub async fn list_for_admin(&self, filter: CheckInListFilter) -> Result<Vec<CheckIn>> {
        self.stores.check_ins.list_for_admin(filter).await
    }

    /// Button-click path. First answer wins: the write is a
    /// compare-and-swap on responded_at, and a losing submission surfaces
    /// as a conflict with nothing mutated.
    pub async fn submit_structured(
        &self,
        token: &str,
        reply: StructuredReply,
    ) -> Result<CheckInReceipt> {
        let check_in = self.check_in_by_token(token).await?;
        let now = Utc::now();

        if check_in.responded_at.is_some() {
            return Err(Error::Conflict(ERR_ALREADY_RESPONDED.to_string()));
        }
        if check_in.token_expired(now) {
            return Err(Error::Validation(ERR_LINK_EXPIRED.to_string()));
        }

        let (risk_level, risk_reason) = risk::classify(reply.status);
        let mut parsed = ParsedResponse::new(reply.status, risk_level, risk_reason);
        parsed.summary = reply.message.clone();
        parsed.start_date_mentioned = reply.start_date;
        parsed.role_title_mentioned = reply.role_title.clone();
        if reply.status == CandidateReportedStatus::HiredThere {
            parsed.is_introduced_company = Some(true);
        }

        let raw = serde_json::json!({
            "status": reply.status,
            "message": reply.message,
            "start_date": reply.start_date,
            "role_title": reply.role_title,
        })
        .to_string();

        let write = ResponseWrite {
            responded_at: now,
            response_type: ResponseType::ClickedButton,
            response_raw: raw,
            response_parsed: parsed.clone(),
            risk_level,
            risk_reason: risk_reason.to_string(),
            flagged_for_review: risk_level.needs_review(),
        };
        let landed = self.stores.check_ins.finalize_response(check_in.id, write).await?;
        if !landed {
            return Err(Error::Conflict(ERR_ALREADY_RESPONDED.to_string()));
        }

        let mut flag_opened = false;
        if reply.status == CandidateReportedStatus::HiredThere {
            let evidence = FlagEvidence::CheckInResponse {
                check_in_id: check_in.id,
                parsed,
                detected_at: now,
            };
            self.flag_manager
                .open_flag(
                    check_in.introduction_id,
                    DetectionMethod::CheckInResponse,
                    evidence,
                    None,
                )
                .await?;
            flag_opened = true;
        }

        Ok(CheckInReceipt {
            check_in_id: check_in.id,
            risk_level,
            flag_opened,
        })
    }

    /// Free-text path. AI parses are probabilistic, so re-parsing an
    /// already-answered check-in overwrites the parse fields in place while
    /// keeping the original responded_at.
    pub async fn parse_free_text(&self, check_in_id: Uuid, raw_text: &str) -> Result<CheckInReceipt> {
        if raw_text.trim().chars().count() < MIN_PARSEABLE_CHARS {
            return Err(Error::Validation(
                "Email content too short to parse".to_string(),
            ));
        }

        let check_in = self
            .stores
            .check_ins
            .get(check_in_id)
            .await?
            .ok_or_else(|| Error::NotFound("Check-in not found".to_string()))?;
        let intro = self
            .stores
            .introductions
            .get(check_in.introduction_id)
            .await?
            .ok_or_else(|| Error::NotFound("Introduction not found".to_string()))?;

        let parsed = self.parser.parse(raw_text, &intro.employer_name).await?;
        let now = Utc::now();

        let write = ResponseWrite {
            responded_at: now,
            response_type: ResponseType::FreeText,
            response_raw: raw_text.to_string(),
            response_parsed: parsed.clone(),
            risk_level: parsed.risk_level,
            risk_reason: parsed.risk_reason.clone(),
            flagged_for_review: parsed.risk_level.needs_review(),
        };
        self.stores.check_ins.overwrite_parse(check_in.id, write).await?;

        let mut flag_opened = false;
        if parsed.status == CandidateReportedStatus::HiredThere
            && parsed.risk_level == RiskLevel::High
        {
            let raw_excerpt: String = raw_text.chars().take(AUDIT_EXCERPT_CHARS).collect();
            let evidence = FlagEvidence::EmailReplyParsing {
                check_in_id: check_in.id,
                parsed: parsed.clone(),
                raw_excerpt,
                detected_at: now,
            };
            self.flag_manager
                .open_flag(
                    check_in.introduction_id,
                    DetectionMethod::EmailReplyParsing,
                    evidence,
                    None,
                )
                .await?;
            flag_opened = true;
        }

        Ok(CheckInReceipt {
            check_in_id: check_in.id,
            risk_level: parsed.risk_level,
            flag_opened,
        })
    }
}
