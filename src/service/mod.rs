use chrono::{Datelike, NaiveDate};

use crate::error::AppError;

pub mod attendance;
pub mod correction;
pub mod daily_batch;
pub mod payroll;
pub mod shift_policy;

pub use attendance::{AttendanceService, ClockEvent};
pub use correction::CorrectionService;
pub use daily_batch::{DailyBatchProcessor, DailyBatchReport};
pub use payroll::PayrollService;
pub use shift_policy::ShiftPolicy;

/// First day of the month and first day of the next one.
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let invalid = || AppError::validation(format!("Invalid month {month}/{year}"));
    let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let until = if from.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((from, until))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
