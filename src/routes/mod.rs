pub mod admin_check_ins;
pub mod admin_circumvention;
pub mod admin_settings;
pub mod check_in_respond;
pub mod cron;
pub mod health;
