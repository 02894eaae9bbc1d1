//! Subscription windows use fixed 30-day months, not calendar months.

use chrono::{Duration, NaiveDate};

use crate::{
    dto::admin::SubscriptionStatus,
    error::{AppError, AppResult},
};

pub const DAYS_PER_MONTH: i64 = 30;
pub const MAX_MONTHS: i32 = 120;

pub fn subscription_end(start: NaiveDate, months: i32) -> AppResult<NaiveDate> {
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(AppError::BadRequest(format!(
            "months must be between 1 and {MAX_MONTHS}"
        )));
    }
    start
        .checked_add_signed(Duration::days(DAYS_PER_MONTH * i64::from(months)))
        .ok_or_else(|| AppError::BadRequest("subscription end is out of range".into()))
}

/// Both ends inclusive.
pub fn is_active_on(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> bool {
    start <= today && today <= end
}

pub fn status_on(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> SubscriptionStatus {
    if today < start {
        SubscriptionStatus::Scheduled
    } else if today > end {
        SubscriptionStatus::Expired
    } else {
        SubscriptionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn two_months_from_new_year_is_march_first() {
        assert_eq!(subscription_end(date(2024, 1, 1), 2).expect("end"), date(2024, 3, 1));
    }

    #[test]
    fn months_are_thirty_days() {
        // 2023 is not a leap year, so 30-day months drift from the calendar.
        assert_eq!(subscription_end(date(2023, 1, 31), 1).expect("end"), date(2023, 3, 2));
        assert_eq!(subscription_end(date(2024, 1, 1), 12).expect("end"), date(2024, 12, 26));
    }

    #[test]
    fn month_count_is_bounded() {
        assert!(subscription_end(date(2024, 1, 1), 0).is_err());
        assert!(subscription_end(date(2024, 1, 1), -3).is_err());
        assert!(subscription_end(date(2024, 1, 1), MAX_MONTHS + 1).is_err());
    }

    #[test]
    fn window_is_inclusive() {
        let (start, end) = (date(2024, 1, 1), date(2024, 3, 1));
        assert!(is_active_on(start, end, start));
        assert!(is_active_on(start, end, end));
        assert!(!is_active_on(start, end, date(2024, 3, 2)));
        assert!(!is_active_on(start, end, date(2023, 12, 31)));
    }

    #[test]
    fn status_tracks_today() {
        let (start, end) = (date(2024, 1, 1), date(2024, 3, 1));
        assert_eq!(status_on(start, end, date(2023, 12, 1)), SubscriptionStatus::Scheduled);
        assert_eq!(status_on(start, end, date(2024, 2, 1)), SubscriptionStatus::Active);
        assert_eq!(status_on(start, end, date(2024, 4, 1)), SubscriptionStatus::Expired);
    }
}
