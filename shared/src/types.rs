//! Common types used across the ledger: calendar buckets and dashboard filters

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Granularity of the dashboard order timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DashboardPeriod {
    /// Last 7 days
    #[default]
    Day,
    /// Last 4 weeks
    Week,
    /// Last 12 calendar months
    Month,
}

/// Which orders count toward the dashboard's top products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderFilter {
    #[default]
    Completed,
    /// Completed and canceled
    All,
}

/// A half-open range of calendar days `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateBucket {
    /// UTC instants bounding this bucket in the given time zone
    pub fn bounds<Tz: TimeZone>(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (start_of_day(self.start, tz), start_of_day(self.end, tz))
    }
}

impl DashboardPeriod {
    /// Timeline buckets ending with the one containing `today`, oldest first
    pub fn buckets(self, today: NaiveDate) -> Vec<DateBucket> {
        match self {
            DashboardPeriod::Day => (0..7u64)
                .rev()
                .map(|back| {
                    let start = today - Days::new(back);
                    DateBucket {
                        label: start.format("%b %d").to_string(),
                        start,
                        end: start + Days::new(1),
                    }
                })
                .collect(),
            DashboardPeriod::Week => {
                let first = today - Days::new(27);
                (0..4u64)
                    .map(|week| {
                        let start = first + Days::new(week * 7);
                        DateBucket {
                            label: format!("Week {}", week + 1),
                            start,
                            end: start + Days::new(7),
                        }
                    })
                    .collect()
            }
            DashboardPeriod::Month => {
                let this_month = first_of_month(today);
                (0..12u32)
                    .rev()
                    .map(|back| {
                        let start = this_month - Months::new(back);
                        DateBucket {
                            label: start.format("%b %Y").to_string(),
                            start,
                            end: start + Months::new(1),
                        }
                    })
                    .collect()
            }
        }
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// First instant of `date` in `tz`, as UTC.
///
/// When local midnight does not exist (a DST gap) the naive time is taken as UTC.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// UTC bounds `[start, end)` of one calendar day in `tz`
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(date, tz), start_of_day(date + Days::new(1), tz))
}

/// Share of canceled orders as a percentage with two decimals, 0 when there are no orders
pub fn cancel_rate_percent(canceled: i64, total: i64) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(canceled) * Decimal::from(100) / Decimal::from(total)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_buckets() {
        let buckets = DashboardPeriod::Day.buckets(date(2026, 10, 17));
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].start, date(2026, 10, 11));
        assert_eq!(buckets[6].start, date(2026, 10, 17));
        assert_eq!(buckets[6].end, date(2026, 10, 18));
        assert_eq!(buckets[6].label, "Oct 17");
    }

    #[test]
    fn test_week_buckets_end_with_today() {
        let buckets = DashboardPeriod::Week.buckets(date(2026, 10, 17));
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].label, "Week 1");
        assert_eq!(buckets[3].end, date(2026, 10, 18));
    }

    #[test]
    fn test_month_buckets_are_calendar_months() {
        let buckets = DashboardPeriod::Month.buckets(date(2026, 3, 31));
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].start, date(2025, 4, 1));
        assert_eq!(buckets[11].start, date(2026, 3, 1));
        assert_eq!(buckets[11].end, date(2026, 4, 1));
        assert_eq!(buckets[11].label, "Mar 2026");
    }

    #[test]
    fn test_buckets_are_contiguous() {
        for period in [DashboardPeriod::Day, DashboardPeriod::Week, DashboardPeriod::Month] {
            let buckets = period.buckets(date(2026, 1, 5));
            for pair in buckets.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_day_bounds_utc() {
        let (start, end) = day_bounds(date(2026, 10, 17), &Utc);
        assert_eq!(end - start, chrono::Duration::days(1));
        assert_eq!(start.date_naive(), date(2026, 10, 17));
    }

    #[test]
    fn test_cancel_rate() {
        assert_eq!(cancel_rate_percent(0, 0), Decimal::ZERO);
        assert_eq!(cancel_rate_percent(1, 4), Decimal::from(25));
        assert_eq!(cancel_rate_percent(1, 3), Decimal::new(3333, 2));
    }
}
