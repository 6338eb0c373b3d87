use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Calendar-month window a usage counter is scoped to.
///
/// Always computed in UTC so that the boundaries match the stored keys no
/// matter where the request was served from. Both ends are inclusive dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// The period containing `now`.
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self::for_date(now.date_naive())
    }

    pub fn for_date(date: NaiveDate) -> Self {
        let start = date - Days::new(u64::from(date.day0()));
        let end = start + Months::new(1) - Days::new(1);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn next(&self) -> Self {
        Self::for_date(self.end + Days::new(1))
    }

    /// Midnight UTC on the first day of the period.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Short label such as `2026-02`.
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mid_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
        let period = BillingPeriod::containing(now);
        assert_eq!(period.start, date(2026, 10, 1));
        assert_eq!(period.end, date(2026, 10, 31));
        assert_eq!(period.label(), "2026-10");
    }

    #[test]
    fn test_first_and_last_instant_of_month() {
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(BillingPeriod::containing(first), BillingPeriod::containing(last));
        assert_eq!(BillingPeriod::containing(first).starts_at(), first);
    }

    #[test]
    fn test_february_lengths() {
        assert_eq!(BillingPeriod::for_date(date(2024, 2, 10)).end, date(2024, 2, 29));
        assert_eq!(BillingPeriod::for_date(date(2026, 2, 10)).end, date(2026, 2, 28));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let dec = BillingPeriod::for_date(date(2026, 12, 31));
        assert_eq!(dec.end, date(2026, 12, 31));
        let jan = dec.next();
        assert_eq!(jan.start, date(2027, 1, 1));
        assert_eq!(jan.end, date(2027, 1, 31));
    }

    #[test]
    fn test_adjacent_months_are_distinct() {
        let before = Utc.with_ymd_and_hms(2026, 4, 30, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert_ne!(BillingPeriod::containing(before), BillingPeriod::containing(after));
        assert!(!BillingPeriod::containing(before).contains(after.date_naive()));
    }

    #[test]
    fn test_is_pure_function_of_now() {
        let now = Utc.with_ymd_and_hms(2026, 7, 4, 12, 0, 0).unwrap();
        assert_eq!(BillingPeriod::containing(now), BillingPeriod::containing(now));
    }
}
