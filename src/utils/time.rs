use chrono::{DateTime, Duration, Months, Utc};

/// End of a protection window that starts at `starts_at`. Saturates at the
/// last representable day for month-end edge dates.
pub fn protection_end(starts_at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    starts_at
        .checked_add_months(Months::new(months))
        .unwrap_or(starts_at + Duration::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn protection_end_adds_calendar_months() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let end = protection_end(start, 12);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap());
    }
}
