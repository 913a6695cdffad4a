//! Weekly recurrence expansion

use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};

/// Dates of `weeks` weekly occurrences starting at `start` (inclusive).
///
/// `weeks` must be between 1 and `max_weeks`.
pub fn weekly_dates(start: NaiveDate, weeks: u32, max_weeks: u32) -> Result<Vec<NaiveDate>> {
    if weeks == 0 || weeks > max_weeks {
        return Err(Error::Validation(format!(
            "Recurrence must cover 1 to {} weeks, got {}",
            max_weeks, weeks
        )));
    }

    (0..weeks)
        .map(|i| {
            start
                .checked_add_days(Days::new(u64::from(i) * 7))
                .ok_or_else(|| Error::Validation(format!("Date out of range after {}", start)))
        })
        .collect()
}
