use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::NaiveTime;
use derive_more::Display;
use serde_json::json;

use crate::model::attendance::AttendanceRecord;
use crate::model::correction::CorrectionStatus;

/// Every way an attendance or payroll operation can be declined.
///
/// Business-rule variants render as 4xx with a machine readable `error`
/// kind; `Database` is the only one that becomes a 500.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "Clock-in is only accepted between {} and {}", start, end)]
    OutsideShiftWindow { start: NaiveTime, end: NaiveTime },

    #[display(fmt = "Already clocked in today")]
    AlreadyClockedIn(Box<AttendanceRecord>),

    #[display(fmt = "Already clocked out today")]
    AlreadyClockedOut(Box<AttendanceRecord>),

    #[display(fmt = "No clock-in found for today")]
    NoClockIn,

    #[display(fmt = "Attendance record is locked; submit a correction instead")]
    RecordLocked,

    #[display(fmt = "Payroll already exists for {} for {}/{}", email, month, year)]
    DuplicatePayroll { email: String, month: u32, year: i32 },

    #[display(fmt = "Employee not found")]
    EmployeeNotFound,

    #[display(fmt = "Biometric device is not registered or inactive")]
    DeviceNotRegistered,

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),

    #[display(fmt = "Correction has already been {}", _0)]
    AlreadyReviewed(CorrectionStatus),

    #[display(fmt = "Database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Stable identifier clients can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::OutsideShiftWindow { .. } => "outside_shift_window",
            AppError::AlreadyClockedIn(_) => "already_clocked_in",
            AppError::AlreadyClockedOut(_) => "already_clocked_out",
            AppError::NoClockIn => "no_clock_in",
            AppError::RecordLocked => "record_locked",
            AppError::DuplicatePayroll { .. } => "duplicate_payroll",
            AppError::EmployeeNotFound => "employee_not_found",
            AppError::DeviceNotRegistered => "device_not_registered",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::AlreadyReviewed(_) => "already_reviewed",
            AppError::Database(_) => "internal_error",
        }
    }

    fn existing_record(&self) -> Option<&AttendanceRecord> {
        match self {
            AppError::AlreadyClockedIn(record) | AppError::AlreadyClockedOut(record) => {
                Some(record.as_ref())
            }
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::OutsideShiftWindow { .. } | AppError::NoClockIn => {
                StatusCode::BAD_REQUEST
            }
            AppError::AlreadyClockedIn(_)
            | AppError::AlreadyClockedOut(_)
            | AppError::RecordLocked
            | AppError::DuplicatePayroll { .. }
            | AppError::AlreadyReviewed(_) => StatusCode::CONFLICT,
            AppError::EmployeeNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DeviceNotRegistered => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            tracing::error!(error = %e, "Database error");
            return HttpResponse::InternalServerError().json(json!({
                "error": self.kind(),
                "message": "Internal Server Error"
            }));
        }

        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Some(record) = self.existing_record() {
            body["record"] = json!(record);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
