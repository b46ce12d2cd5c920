use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceCorrection {
    pub id: u64,
    pub attendance_id: u64,
    /// The employee who asked for the correction.
    pub user_id: u64,
    pub company_id: u64,

    #[schema(value_type = String, format = "date-time")]
    pub requested_check_in: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub requested_check_out: NaiveDateTime,

    pub reason: String,
    pub status: CorrectionStatus,
    pub reviewed_by: Option<u64>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub reviewed_at: Option<NaiveDateTime>,

    pub rejection_reason: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCorrection {
    pub attendance_id: u64,
    pub user_id: u64,
    pub company_id: u64,
    pub requested_check_in: NaiveDateTime,
    pub requested_check_out: NaiveDateTime,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

/// Values an approved correction writes into its attendance record.
#[derive(Debug, Clone)]
pub struct CorrectionApplied {
    pub reviewer_id: u64,
    pub reviewed_at: NaiveDateTime,
    pub check_in_time: NaiveDateTime,
    pub check_out_time: NaiveDateTime,
    pub working_hours: f64,
    pub status: AttendanceStatus,
    pub is_late: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionFilter {
    pub company_id: u64,
    pub requester_id: Option<u64>,
    pub status: Option<CorrectionStatus>,
}
