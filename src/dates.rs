use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::AppError;

/// Current UTC calendar day.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Longest span, in days, a plan or shopping-list range may cover.
pub const MAX_RANGE_DAYS: i64 = 30;

/// Inclusive calendar range, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Date,
    pub end_date: Date,
}

impl DateRange {
    pub fn new(start_date: Date, end_date: Date) -> Result<Self, AppError> {
        if end_date < start_date {
            return Err(AppError::validation("endDate must not be before startDate"));
        }
        if (end_date - start_date).whole_days() > MAX_RANGE_DAYS {
            return Err(AppError::validation(format!(
                "date range may span at most {MAX_RANGE_DAYS} days"
            )));
        }
        Ok(Self { start_date, end_date })
    }

    /// Closed-interval overlap test.
    pub fn overlaps(&self, start: Date, end: Date) -> bool {
        start <= self.end_date && end >= self.start_date
    }

    pub fn days(&self) -> impl Iterator<Item = Date> {
        let end = self.end_date;
        std::iter::successors(Some(self.start_date), move |d| {
            d.next_day().filter(|next| *next <= end)
        })
    }

    pub fn contains(&self, day: Date) -> bool {
        day >= self.start_date && day <= self.end_date
    }
}

/// Query-string shape shared by range-scoped list endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Date,
    pub end_date: Date,
}

impl RangeQuery {
    pub fn validate(&self) -> Result<DateRange, AppError> {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn rejects_reversed_range() {
        assert!(DateRange::new(date!(2024 - 06 - 09), date!(2024 - 06 - 03)).is_err());
    }

    #[test]
    fn thirty_days_is_the_ceiling() {
        assert!(DateRange::new(date!(2024 - 06 - 01), date!(2024 - 07 - 01)).is_ok());
        assert!(DateRange::new(date!(2024 - 06 - 01), date!(2024 - 07 - 02)).is_err());
    }

    #[test]
    fn single_day_range_is_valid() {
        let r = DateRange::new(date!(2024 - 06 - 03), date!(2024 - 06 - 03)).unwrap();
        assert_eq!(r.days().count(), 1);
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let r = DateRange::new(date!(2024 - 06 - 03), date!(2024 - 06 - 09)).unwrap();
        assert!(r.overlaps(date!(2024 - 06 - 09), date!(2024 - 06 - 15)));
        assert!(r.overlaps(date!(2024 - 05 - 27), date!(2024 - 06 - 03)));
        assert!(!r.overlaps(date!(2024 - 06 - 10), date!(2024 - 06 - 16)));
    }

    #[test]
    fn days_walks_every_date() {
        let r = DateRange::new(date!(2024 - 02 - 27), date!(2024 - 03 - 01)).unwrap();
        let days: Vec<_> = r.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], date!(2024 - 02 - 29));
    }
}
