use crate::error::{Error, Result};
use crate::models::parsed_response::{CandidateReportedStatus, ParseConfidence, ParsedResponse};
use crate::services::risk;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Natural-language understanding of a candidate's free-text reply.
#[async_trait]
pub trait ReplyParser: Send + Sync {
    async fn parse(&self, text: &str, employer_name: &str) -> Result<ParsedResponse>;
}

pub struct OpenAiReplyParser {
    client: Client,
    api_key: String,
}

impl OpenAiReplyParser {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::AiParse(format!("OpenAI API error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::AiParse("Invalid OpenAI response format".to_string()))
    }

    fn coerce(&self, raw: &JsonValue) -> Result<ParsedResponse> {
        let status_str = raw
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::AiParse("missing status field".to_string()))?;
        let status: CandidateReportedStatus = status_str
            .parse()
            .map_err(|e: String| Error::AiParse(e))?;

        // The risk table is authoritative; the model only decides status.
        let (risk_level, risk_reason) = risk::classify(status);

        let confidence = raw
            .get("confidence")
            .and_then(|v| v.as_str())
            .map(|c| match c.to_ascii_uppercase().as_str() {
                "HIGH" => ParseConfidence::High,
                "MEDIUM" => ParseConfidence::Medium,
                _ => ParseConfidence::Low,
            });

        let field = |name: &str| {
            raw.get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(ParsedResponse {
            status,
            risk_level,
            risk_reason: risk_reason.to_string(),
            confidence: confidence.or(Some(ParseConfidence::Low)),
            summary: field("summary"),
            suggested_action: field("suggested_action"),
            start_date_mentioned: raw
                .get("start_date_mentioned")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok()),
            role_title_mentioned: field("role_title_mentioned"),
            salary_mentioned: field("salary_mentioned"),
            company_mentioned: field("company_mentioned"),
            is_introduced_company: raw.get("is_introduced_company").and_then(|v| v.as_bool()),
        })
    }

    /// Deterministic keyword fallback for when the API call fails. Coarse on
    /// purpose; everything it produces carries LOW confidence.
    fn fallback_parse(text: &str) -> ParsedResponse {
        let lower = text.to_lowercase();
        let status = if lower.contains("start") && (lower.contains("hired") || lower.contains("joined") || lower.contains("accepted the offer")) {
            CandidateReportedStatus::HiredThere
        } else if lower.contains("hired") || lower.contains("joined") {
            CandidateReportedStatus::HiredThere
        } else if lower.contains("offer") {
            CandidateReportedStatus::Offer
        } else if lower.contains("interview") {
            CandidateReportedStatus::Interviewing
        } else if lower.contains("another company") || lower.contains("different company") || lower.contains("somewhere else") {
            CandidateReportedStatus::HiredElsewhere
        } else if lower.contains("rejected") || lower.contains("turned me down") {
            CandidateReportedStatus::Rejected
        } else if lower.contains("withdrew") || lower.contains("withdraw") || lower.contains("not interested") {
            CandidateReportedStatus::Withdrew
        } else if lower.contains("no response") || lower.contains("never heard") || lower.contains("haven't heard") {
            CandidateReportedStatus::NoResponse
        } else {
            CandidateReportedStatus::StillLooking
        };

        let (risk_level, risk_reason) = risk::classify(status);
        let mut parsed = ParsedResponse::new(status, risk_level, risk_reason);
        parsed.confidence = Some(ParseConfidence::Low);
        parsed.summary = Some("Keyword-based fallback parse".to_string());
        parsed
    }
}

#[async_trait]
impl ReplyParser for OpenAiReplyParser {
    async fn parse(&self, text: &str, employer_name: &str) -> Result<ParsedResponse> {
        let system_prompt = r#"You are an analyst for a recruitment marketplace. A candidate has replied to a periodic check-in email asking about their status with a specific employer they were introduced to through the platform.
Classify the reply. Return a JSON object with:
  status: one of "hired_there", "offer", "interviewing", "hired_elsewhere", "rejected", "withdrew", "no_response", "still_looking"
  confidence: "LOW" | "MEDIUM" | "HIGH"
  summary: one-sentence summary of the reply
  suggested_action: short recommendation for the operations team
  start_date_mentioned: ISO date if a start date is mentioned, else null
  role_title_mentioned: role title if mentioned, else null
  salary_mentioned: salary figure as written, else null
  company_mentioned: company name if mentioned, else null
  is_introduced_company: true if the reply is about the introduced employer, false if clearly another company, null if unclear
"hired_there" means hired by the introduced employer specifically."#;

        let user_data = serde_json::json!({
            "introduced_employer": employer_name,
            "candidate_reply": text,
        });

        let payload = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(&user_data)?}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.1
        });

        match self.chat_openai(payload).await {
            Ok(raw) => self.coerce(&raw),
            Err(e) => {
                tracing::warn!(error = ?e, "AI reply parse failed, using keyword fallback");
                Ok(Self::fallback_parse(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parsed_response::RiskLevel;

    #[test]
    fn fallback_detects_hire() {
        let parsed = OpenAiReplyParser::fallback_parse(
            "Yes, I joined them last month, started as a backend engineer.",
        );
        assert_eq!(parsed.status, CandidateReportedStatus::HiredThere);
        assert_eq!(parsed.risk_level, RiskLevel::High);
        assert_eq!(parsed.confidence, Some(ParseConfidence::Low));
    }

    #[test]
    fn fallback_detects_rejection() {
        let parsed = OpenAiReplyParser::fallback_parse("They rejected me after the onsite.");
        assert_eq!(parsed.status, CandidateReportedStatus::Rejected);
        assert_eq!(parsed.risk_level, RiskLevel::Clear);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns a canned response; records nothing.
    pub struct StubReplyParser {
        pub response: ParsedResponse,
    }

    #[async_trait]
    impl ReplyParser for StubReplyParser {
        async fn parse(&self, _text: &str, _employer_name: &str) -> Result<ParsedResponse> {
            Ok(self.response.clone())
        }
    }
}
