pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use crate::services::check_in_scheduler::CheckInScheduler;
use crate::services::expiry_monitor::ExpiryMonitor;
use crate::services::flag_manager::FlagManager;
use crate::services::mailer::{HttpMailer, Mailer};
use crate::services::reply_parser::{OpenAiReplyParser, ReplyParser};
use crate::services::response_ingestor::ResponseIngestor;
use crate::store::Stores;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub scheduler: CheckInScheduler,
    pub ingestor: ResponseIngestor,
    pub flag_manager: FlagManager,
    pub monitor: ExpiryMonitor,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("failed to build http client");

        let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        ));
        let parser: Arc<dyn ReplyParser> = Arc::new(OpenAiReplyParser::new(
            config.openai_api_key.clone(),
            http_client,
        ));

        Self::with_components(
            Stores::postgres(pool),
            mailer,
            parser,
            config.admin_email.clone(),
            config.webapp_url.clone(),
        )
    }

    /// Wires the services around explicit collaborators. Production uses
    /// `new`; tests hand in memory stores and doubles.
    pub fn with_components(
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        parser: Arc<dyn ReplyParser>,
        admin_email: String,
        webapp_url: String,
    ) -> Self {
        let flag_manager = FlagManager::new(stores.clone(), mailer.clone(), admin_email);
        let scheduler = CheckInScheduler::new(stores.clone(), mailer.clone(), webapp_url);
        let ingestor = ResponseIngestor::new(stores.clone(), parser, flag_manager.clone());
        let monitor = ExpiryMonitor::new(stores.clone(), mailer, scheduler.clone());
        Self {
            stores,
            scheduler,
            ingestor,
            flag_manager,
            monitor,
        }
    }
}

/// Full HTTP surface minus the outermost layers (CORS, tracing), which
/// main adds around it.
pub fn app_router(state: AppState, public_rps: u32, admin_rps: u32) -> axum::Router {
    use axum::routing::{get, post};

    let base = axum::Router::new().route("/health", get(routes::health::health));

    let public_api = axum::Router::new()
        .route(
            "/api/check-ins/respond/:token",
            get(routes::check_in_respond::get_respond_context)
                .post(routes::check_in_respond::submit_response),
        )
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(public_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let admin_api = axum::Router::new()
        .route(
            "/api/admin/check-ins",
            get(routes::admin_check_ins::list_check_ins),
        )
        .route(
            "/api/admin/check-ins/parse-reply",
            post(routes::admin_check_ins::parse_reply),
        )
        .route(
            "/api/admin/circumvention",
            get(routes::admin_circumvention::list_flags),
        )
        .route(
            "/api/admin/circumvention/:id",
            get(routes::admin_circumvention::get_flag)
                .patch(routes::admin_circumvention::update_flag)
                .delete(routes::admin_circumvention::delete_flag),
        )
        .route(
            "/api/admin/circumvention/:id/send-invoice",
            post(routes::admin_circumvention::send_invoice),
        )
        .route(
            "/api/admin/settings",
            get(routes::admin_settings::get_settings).put(routes::admin_settings::put_settings),
        )
        .route(
            "/api/admin/introductions/run-expiry-check",
            post(routes::cron::run_expiry_alerts),
        )
        .layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(admin_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let cron_api = axum::Router::new()
        .route("/api/cron/check-ins", post(routes::cron::run_check_ins))
        .route(
            "/api/cron/expiry-alerts",
            post(routes::cron::run_expiry_alerts),
        )
        .route(
            "/api/cron/guarantee-checks",
            post(routes::cron::run_guarantee_checks),
        )
        .layer(axum::middleware::from_fn(
            middleware::cron_auth::require_cron_secret,
        ));

    base.merge(public_api)
        .merge(admin_api)
        .merge(cron_api)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::models::check_in::CheckIn;
    use crate::models::introduction::{Introduction, IntroductionStatus};
    use crate::utils::time::protection_end;
    use crate::utils::token::generate_response_token;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    /// An INTRODUCED introduction whose introduction happened `days_ago`
    /// days back, with the standard 12-month protection window.
    pub fn introduced_introduction(days_ago: i64) -> Introduction {
        let now = Utc::now();
        let introduced_at = now - Duration::days(days_ago);
        Introduction {
            id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            employer_name: "Acme Robotics".to_string(),
            employer_email: "talent@acme.test".to_string(),
            employer_contact_email: None,
            candidate_name: "Jordan Reyes".to_string(),
            candidate_email: "jordan@candidates.test".to_string(),
            status: IntroductionStatus::Introduced,
            profile_viewed_at: Some(introduced_at - Duration::days(3)),
            intro_requested_at: Some(introduced_at - Duration::days(2)),
            candidate_responded_at: Some(introduced_at - Duration::days(1)),
            candidate_response: Some(crate::models::introduction::CandidateResponse::Accepted),
            introduced_at: Some(introduced_at),
            protection_starts_at: introduced_at,
            protection_ends_at: protection_end(introduced_at, 12),
            profile_views: 1,
            resume_downloads: 0,
            response_token: None,
            response_token_expiry: None,
            last_email_sent_at: None,
            email_resend_count: 0,
            expiry_warning_sent_at: None,
            created_at: introduced_at - Duration::days(4),
            updated_at: introduced_at,
        }
    }

    /// A check-in that has already been emailed and is awaiting its answer.
    pub fn sent_check_in(introduction_id: Uuid, number: i32) -> CheckIn {
        let now = Utc::now();
        CheckIn {
            id: Uuid::new_v4(),
            introduction_id,
            check_in_number: number,
            scheduled_for: now - Duration::hours(2),
            sent_at: Some(now - Duration::hours(1)),
            response_token: generate_response_token(),
            response_token_expiry: now + Duration::days(7),
            responded_at: None,
            response_type: None,
            response_raw: None,
            response_parsed: None,
            risk_level: None,
            risk_reason: None,
            flagged_for_review: false,
            created_at: now - Duration::hours(2),
            updated_at: now - Duration::hours(1),
        }
    }
}
