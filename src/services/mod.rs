pub mod check_in_scheduler;
pub mod emails;
pub mod expiry_monitor;
pub mod flag_manager;
pub mod mailer;
pub mod reply_parser;
pub mod response_ingestor;
pub mod risk;
pub mod sweep;
