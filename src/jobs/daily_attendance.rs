use std::sync::Arc;

use actix_web::rt::time::sleep;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::config::Config;
use crate::service::DailyBatchProcessor;

/// Runs the daily batch once a day at `DAILY_BATCH_AT` business time. A
/// failed run is logged and the loop carries on to the next day.
pub async fn run_scheduler(processor: Arc<DailyBatchProcessor>, config: Config) {
    info!(at = %config.daily_batch_at, "Daily attendance batch scheduled");

    loop {
        let now = config.business_now();
        let next = next_run_after(now, config.daily_batch_at);
        let wait = (next - now).to_std().unwrap_or_default();
        sleep(wait).await;

        let report = processor.run(next.date(), config.business_now()).await;
        if !report.completed {
            warn!(
                run_id = %report.run_id,
                date = %report.date,
                error = report.error.as_deref().unwrap_or("unknown"),
                "Scheduled daily batch did not complete"
            );
        }
    }
}

pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn next_run_is_today_before_the_slot() {
        let at = NaiveTime::from_hms_opt(19, 30, 0).unwrap();
        assert_eq!(next_run_after(t(1, 8, 0), at), t(1, 19, 30));
        assert_eq!(next_run_after(t(1, 19, 29), at), t(1, 19, 30));
    }

    #[test]
    fn next_run_rolls_to_tomorrow_at_or_after_the_slot() {
        let at = NaiveTime::from_hms_opt(19, 30, 0).unwrap();
        assert_eq!(next_run_after(t(1, 19, 30), at), t(2, 19, 30));
        let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(next_run_after(t(31, 23, 0), at), june_first.and_time(at));
    }
}
