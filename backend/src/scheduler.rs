//! Daily sales report scheduling

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use tokio::task::JoinHandle;

use crate::services::ReportingService;

/// Fallback delay when the next run cannot be computed
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Runs the sales report once a day at a fixed local time
#[derive(Clone)]
pub struct ReportScheduler {
    reporting: ReportingService,
    hour: u32,
    minute: u32,
    task: Arc<OnceLock<JoinHandle<()>>>,
}

impl ReportScheduler {
    pub fn new(reporting: ReportingService, hour: u32, minute: u32) -> Self {
        Self {
            reporting,
            hour,
            minute,
            task: Arc::new(OnceLock::new()),
        }
    }

    /// Start the daily job. Returns `false` if it is already registered.
    pub fn register_daily_sales_report(&self) -> bool {
        let mut registered = false;

        self.task.get_or_init(|| {
            registered = true;
            let reporting = self.reporting.clone();
            let (hour, minute) = (self.hour, self.minute);
            tokio::spawn(run_daily(reporting, hour, minute))
        });

        if registered {
            tracing::info!(hour = self.hour, minute = self.minute, "Daily sales report scheduled");
        } else {
            tracing::debug!("Daily sales report already scheduled");
        }

        registered
    }

    pub fn is_registered(&self) -> bool {
        self.task.get().is_some()
    }
}

async fn run_daily(reporting: ReportingService, hour: u32, minute: u32) {
    loop {
        let now = Local::now();
        let delay = match next_run_after(&now, hour, minute) {
            Some(next) => {
                tracing::debug!(next_run = %next, "Waiting for next sales report");
                (next - now).to_std().unwrap_or(RETRY_DELAY)
            }
            None => {
                tracing::warn!(hour, minute, "Could not compute next sales report time");
                RETRY_DELAY
            }
        };

        tokio::time::sleep(delay).await;

        let today = Local::now().date_naive();
        match reporting.run_sales_report(today).await {
            Ok(report) => {
                tracing::info!(report_id = %report.id, date = %today, "Scheduled sales report stored")
            }
            Err(e) => tracing::error!(error = %e, date = %today, "Scheduled sales report failed"),
        }
    }
}

/// Next instant strictly after `now` whose local wall-clock time is `hour:minute`.
///
/// Days where that time falls in a DST gap are skipped. Returns `None` for an
/// invalid time of day.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let at = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let tz = now.timezone();
    let today = now.date_naive();

    (0..=2u64)
        .filter_map(|ahead| today.checked_add_days(Days::new(ahead)))
        .filter_map(|day| tz.from_local_datetime(&day.and_time(at)).earliest())
        .find(|candidate| candidate > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike, Utc};

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let next = next_run_after(&now, 23, 59).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 17, 23, 59, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 23, 59, 0).unwrap();
        let next = next_run_after(&now, 23, 59).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 18, 23, 59, 0).unwrap());
    }

    #[test]
    fn test_next_run_uses_local_wall_clock() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 12, 31, 23, 59, 30).unwrap();
        let next = next_run_after(&now, 0, 5).unwrap();

        assert_eq!(next.date_naive(), chrono::NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
        assert_eq!((next.hour(), next.minute()), (0, 5));
    }

    #[test]
    fn test_invalid_time_of_day() {
        let now = Utc::now();
        assert!(next_run_after(&now, 24, 0).is_none());
        assert!(next_run_after(&now, 12, 60).is_none());
    }

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/warehouse_test")
            .unwrap();
        let scheduler = ReportScheduler::new(ReportingService::new(pool), 23, 59);

        assert!(!scheduler.is_registered());
        assert!(scheduler.register_daily_sales_report());
        assert!(!scheduler.register_daily_sales_report());

        let clone = scheduler.clone();
        assert!(!clone.register_daily_sales_report());
        assert!(scheduler.is_registered());
    }
}
