pub mod auth;
pub mod cron_auth;
pub mod rate_limit;
