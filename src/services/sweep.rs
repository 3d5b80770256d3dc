//! Generic time-window sweep pieces shared by the introduction-protection
//! monitor and the placement guarantee checks.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// What a daily sweep should do for one record's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Nothing,
    /// Window crosses the warning boundary and no warning was sent yet.
    Warn { days_left: i64 },
    /// Window has closed.
    Expire,
}

/// Warning fires when days-left sits inside [warn_days - tolerance,
/// warn_days + tolerance]. The tolerance absorbs daily-cron jitter; the
/// `already_warned` marker is what actually prevents re-sends inside the
/// window.
pub fn classify_window(
    now: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    warn_days: i64,
    tolerance_days: i64,
    already_warned: bool,
) -> WindowEvent {
    if ends_at <= now {
        return WindowEvent::Expire;
    }
    let days_left = (ends_at - now).num_days();
    if !already_warned
        && days_left >= warn_days - tolerance_days
        && days_left <= warn_days + tolerance_days
    {
        return WindowEvent::Warn { days_left };
    }
    WindowEvent::Nothing
}

/// Inter-batch pacing for batch jobs: no pause inside a batch, a short sleep
/// between batches to stay friendly to the email provider and pool.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl BatchPolicy {
    pub async fn pause_before(&self, index: usize) {
        if index > 0 && self.size > 0 && index % self.size == 0 {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn expired_window_wins_over_warning() {
        let now = Utc::now();
        assert_eq!(
            classify_window(now, now - ChronoDuration::days(1), 7, 1, false),
            WindowEvent::Expire
        );
    }

    #[test]
    fn warning_fires_only_near_the_boundary() {
        let now = Utc::now();
        let at = |days: i64| now + ChronoDuration::days(days) + ChronoDuration::hours(1);
        assert!(matches!(
            classify_window(now, at(7), 7, 1, false),
            WindowEvent::Warn { .. }
        ));
        assert!(matches!(
            classify_window(now, at(6), 7, 1, false),
            WindowEvent::Warn { .. }
        ));
        // Well before the boundary: nothing.
        assert_eq!(classify_window(now, at(20), 7, 1, false), WindowEvent::Nothing);
        // Inside the window but already warned: nothing.
        assert_eq!(classify_window(now, at(7), 7, 1, true), WindowEvent::Nothing);
        // Past the boundary but not yet expired, warning missed its slot.
        assert_eq!(classify_window(now, at(3), 7, 1, false), WindowEvent::Nothing);
    }
}
