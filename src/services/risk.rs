//! Maps a candidate's reported employment status to a circumvention risk
//! level. Pure, exhaustive over the closed status set; out-of-set input
//! never reaches this table (the ingestor rejects it at the DTO boundary).

use crate::models::parsed_response::{CandidateReportedStatus, RiskLevel};

pub fn classify(status: CandidateReportedStatus) -> (RiskLevel, &'static str) {
    use CandidateReportedStatus::*;
    match status {
        HiredThere => (
            RiskLevel::High,
            "Candidate reports being hired by the introduced employer",
        ),
        Offer => (
            RiskLevel::Medium,
            "Candidate reports an outstanding offer from the introduced employer",
        ),
        Interviewing => (
            RiskLevel::Medium,
            "Candidate reports an active interview process with the introduced employer",
        ),
        HiredElsewhere => (RiskLevel::Clear, "Candidate was hired by a different company"),
        Rejected => (RiskLevel::Clear, "Employer rejected the candidate"),
        Withdrew => (RiskLevel::Clear, "Candidate withdrew from the process"),
        NoResponse => (RiskLevel::Clear, "No contact since the introduction"),
        StillLooking => (RiskLevel::Low, "Candidate is still searching"),
    }
}
