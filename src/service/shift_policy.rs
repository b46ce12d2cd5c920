use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AppError;
use crate::model::attendance::AttendanceStatus;

/// Shift boundaries and the full-day threshold. All inputs are
/// business-local wall clock times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftPolicy {
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub full_day_hours: f64,
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            shift_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            shift_end: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            full_day_hours: 8.0,
        }
    }
}

impl ShiftPolicy {
    pub fn is_late_check_in(&self, t: NaiveDateTime) -> bool {
        t.time() > self.shift_start
    }

    /// Compared against the shift end of `date`, so a clock-out past
    /// midnight is never early.
    pub fn is_early_clock_out(&self, date: NaiveDate, t: NaiveDateTime) -> bool {
        t < self.shift_end_on(date)
    }

    /// `[shift_start, shift_end)`
    pub fn accepts_clock_in(&self, t: NaiveDateTime) -> bool {
        let time = t.time();
        time >= self.shift_start && time < self.shift_end
    }

    pub fn shift_end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.shift_end)
    }

    /// Hours between the two stamps rounded to 2 decimals, `None` unless
    /// `check_out` is strictly after `check_in`.
    pub fn working_hours(&self, check_in: NaiveDateTime, check_out: NaiveDateTime) -> Option<f64> {
        if check_out <= check_in {
            return None;
        }
        let seconds = (check_out - check_in).num_seconds() as f64;
        Some((seconds / 36.0).round() / 100.0)
    }

    /// A full day needs both: stayed until shift end and worked the
    /// full-day threshold.
    pub fn classify_status(
        &self,
        date: NaiveDate,
        check_out: NaiveDateTime,
        hours: f64,
    ) -> AttendanceStatus {
        if self.is_early_clock_out(date, check_out) {
            AttendanceStatus::HalfDay
        } else if hours >= self.full_day_hours {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::HalfDay
        }
    }

    /// Hours and status for a closed pair of clock times on `date`.
    pub fn evaluate(
        &self,
        date: NaiveDate,
        check_in: NaiveDateTime,
        check_out: NaiveDateTime,
    ) -> Result<(f64, AttendanceStatus), AppError> {
        let hours = self
            .working_hours(check_in, check_out)
            .ok_or_else(|| AppError::validation("Check-out must be after check-in"))?;
        Ok((hours, self.classify_status(date, check_out, hours)))
    }
}
