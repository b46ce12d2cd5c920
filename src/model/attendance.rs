use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
    Absent,
    Unset,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClockMethod {
    Manual,
    Biometric,
}

/// One row of the `attendance` table: a single employee on a single
/// calendar day. All timestamps are business-local wall clock times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "employee_id": 7,
    "company_id": 1,
    "date": "2024-05-01",
    "check_in_time": "2024-05-01T09:15:00",
    "check_out_time": "2024-05-01T19:30:00",
    "working_hours": 10.25,
    "status": "present",
    "is_late": true,
    "is_auto_clocked_out": false,
    "is_manual": false,
    "is_processed": false,
    "processed_at": null,
    "clock_in_method": "manual",
    "clock_out_method": "manual",
    "biometric_device_id": null,
    "edited_by": null,
    "notes": null
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,

    pub working_hours: Option<f64>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub is_auto_clocked_out: bool,
    pub is_manual: bool,

    /// Set by the daily batch; a processed record only changes through an
    /// approved correction.
    pub is_processed: bool,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub processed_at: Option<NaiveDateTime>,

    pub clock_in_method: Option<ClockMethod>,
    pub clock_out_method: Option<ClockMethod>,
    pub biometric_device_id: Option<String>,
    pub edited_by: Option<u64>,
    pub notes: Option<String>,
}

/// First clock event of the day.
#[derive(Debug, Clone)]
pub struct NewClockIn {
    pub employee_id: u64,
    pub company_id: u64,
    pub date: NaiveDate,
    pub at: NaiveDateTime,
    pub is_late: bool,
    pub method: ClockMethod,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClockOutUpdate {
    pub at: NaiveDateTime,
    pub working_hours: f64,
    pub status: AttendanceStatus,
    pub method: ClockMethod,
    pub device_id: Option<String>,
}

/// Final field values written by an owner edit. The service resolves them
/// against the current record before handing them to the store.
#[derive(Debug, Clone)]
pub struct ManualEdit {
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub working_hours: Option<f64>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub notes: Option<String>,
    pub edited_by: u64,
}

/// Owner edit of an unprocessed record. Absent fields keep their current
/// value; hours and status are recomputed when both times end up set.
#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BiometricAction {
    ClockIn,
    ClockOut,
}

/// Employee row as seen by absentee synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmployeeRef {
    pub id: u64,
    pub company_id: u64,
}

/// Monthly tallies over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub total_working_hours: f64,
}

impl AttendanceSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => summary.present_days += 1,
                AttendanceStatus::HalfDay => summary.half_days += 1,
                AttendanceStatus::Absent => summary.absent_days += 1,
                AttendanceStatus::Unset => {}
            }
            summary.total_working_hours += record.working_hours.unwrap_or(0.0);
        }
        summary.total_working_hours = (summary.total_working_hours * 100.0).round() / 100.0;
        summary
    }

    /// Half days count for half.
    pub fn payable_days(&self) -> f64 {
        f64::from(self.present_days) + 0.5 * f64::from(self.half_days)
    }
}

/// One employee in the company overview, with today's record if any.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverviewEntry {
    pub employee_id: u64,
    pub name: String,
    pub email: String,
    pub record: Option<AttendanceRecord>,
}
