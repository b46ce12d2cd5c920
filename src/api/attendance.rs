use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::auth::policy::Capability;
use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::{
    AttendancePatch, AttendanceRecord, AttendanceStatus, AttendanceSummary, ClockMethod,
    OverviewEntry,
};
use crate::service::{AttendanceService, ClockEvent, DailyBatchProcessor};

#[derive(Deserialize, IntoParams)]
pub struct MonthQuery {
    /// 1-12, defaults to the current month
    pub month: Option<u32>,
    /// Defaults to the current year
    pub year: Option<i32>,
}

/// Optional clock-in body; an empty body is a manual punch.
#[derive(Deserialize, Default, ToSchema)]
pub struct ClockInRequest {
    pub method: Option<ClockMethod>,

    #[schema(example = "GATE-1")]
    pub biometric_device_id: Option<String>,
}

/// Optional body of a manual batch run.
#[derive(Deserialize, Default, ToSchema)]
pub struct ProcessDailyRequest {
    #[schema(value_type = Option<String>, format = "date", example = "2024-05-01")]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// Defaults to today in business time
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyAttendanceResponse {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub records: Vec<AttendanceRecord>,
    pub summary: AttendanceSummary,
}

#[derive(Serialize, ToSchema)]
pub struct OverviewResponse {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub employees: Vec<OverviewEntry>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(value_type = Option<String>, format = "date-time", example = "2024-05-01T09:00:00")]
    pub check_in_time: Option<NaiveDateTime>,

    #[schema(value_type = Option<String>, format = "date-time", example = "2024-05-01T19:00:00")]
    pub check_out_time: Option<NaiveDateTime>,

    pub status: Option<AttendanceStatus>,

    #[schema(example = "Forgot to clock out")]
    pub notes: Option<String>,
}

/// Parses a JSON body that may be omitted entirely.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid body: {e}")))
}

impl MonthQuery {
    fn resolve(&self, config: &Config) -> (i32, u32) {
        let today = config.business_now().date();
        (
            self.year.unwrap_or_else(|| today.year()),
            self.month.unwrap_or_else(|| today.month()),
        )
    }
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body(content = ClockInRequest, description = "Omit for a manual punch"),
    responses(
        (status = 200, description = "Clocked in successfully", body = Object, example = json!({
            "message": "Clocked in successfully",
            "record": {"id": 42, "is_late": true}
        })),
        (status = 400, description = "Outside the shift window, or an invalid body"),
        (status = 401, description = "Biometric device not registered for the company"),
        (status = 409, description = "Already clocked in today, or the day is locked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ClockSelf)?;

    let request: ClockInRequest = optional_json(&body)?;

    let event = service
        .employee_event(
            auth.user_id,
            auth.company_id,
            config.business_now(),
            request.method.unwrap_or(ClockMethod::Manual),
            request.biometric_device_id,
        )
        .await?;
    let record = service.clock_in(event).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Clocked in successfully",
        "record": record
    })))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out successfully", body = Object, example = json!({
            "message": "Clocked out successfully",
            "record": {"id": 42, "working_hours": 10.25, "status": "present"}
        })),
        (status = 400, description = "No clock-in found for today"),
        (status = 409, description = "Already clocked out, or the day is locked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ClockSelf)?;

    let event = ClockEvent::manual(auth.user_id, auth.company_id, config.business_now());
    let record = service.clock_out(event).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Clocked out successfully",
        "record": record
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record, or null before clock-in", body = AttendanceRecord),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewOwnAttendance)?;

    let record = service
        .today(auth.user_id, config.business_now().date())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(MonthQuery),
    responses(
        (status = 200, body = MonthlyAttendanceResponse),
        (status = 400, description = "Invalid month"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewOwnAttendance)?;

    let (year, month) = query.resolve(&config);
    let (records, summary) = service.history(auth.user_id, year, month).await?;

    Ok(HttpResponse::Ok().json(MonthlyAttendanceResponse {
        employee_id: auth.user_id,
        month,
        year,
        records,
        summary,
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/overview",
    params(DateQuery),
    responses(
        (status = 200, body = OverviewResponse),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn overview(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewCompanyAttendance)?;

    let date = query.date.unwrap_or_else(|| config.business_now().date());
    let employees = service.overview(auth.company_id, date).await?;

    Ok(HttpResponse::Ok().json(OverviewResponse { date, employees }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}",
    params(
        ("employee_id", description = "Employee user id"),
        MonthQuery
    ),
    responses(
        (status = 200, body = MonthlyAttendanceResponse),
        (status = 404, description = "Employee not found"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_month(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewCompanyAttendance)?;

    let employee_id = path.into_inner();
    let (year, month) = query.resolve(&config);
    let (records, summary) = service
        .employee_month(auth.company_id, employee_id, year, month)
        .await?;

    Ok(HttpResponse::Ok().json(MonthlyAttendanceResponse {
        employee_id,
        month,
        year,
        records,
        summary,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/attendance/{attendance_id}",
    request_body = UpdateAttendance,
    params(("attendance_id", description = "Attendance record id")),
    responses(
        (status = 200, description = "Record updated", body = AttendanceRecord),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record is locked"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    body: web::Json<UpdateAttendance>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::EditAttendance)?;

    let body = body.into_inner();
    let patch = AttendancePatch {
        check_in_time: body.check_in_time,
        check_out_time: body.check_out_time,
        status: body.status,
        notes: body.notes,
    };
    let record = service
        .manual_edit(auth.user_id, auth.company_id, path.into_inner(), patch)
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Runs the end-of-day batch now. Same code path as the scheduled run. The
/// date comes from the body, then `?date=`, then business today.
#[utoipa::path(
    post,
    path = "/api/attendance/process-daily",
    params(DateQuery),
    request_body(content = ProcessDailyRequest, description = "Optional"),
    responses(
        (status = 200, description = "Batch completed", body = crate::service::DailyBatchReport),
        (status = 500, description = "Batch stopped early; counts show the work done", body = crate::service::DailyBatchReport),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn process_daily(
    auth: AuthUser,
    config: web::Data<Config>,
    processor: web::Data<DailyBatchProcessor>,
    query: web::Query<DateQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::RunDailyBatch)?;

    let request: ProcessDailyRequest = optional_json(&body)?;
    let now = config.business_now();
    let date = request
        .date
        .or(query.date)
        .unwrap_or_else(|| now.date());
    tracing::info!(
        user_id = auth.user_id,
        username = %auth.username,
        %date,
        "Daily batch triggered manually"
    );

    let report = processor.run(date, now).await;
    if report.completed {
        Ok(HttpResponse::Ok().json(report))
    } else {
        Ok(HttpResponse::InternalServerError().json(report))
    }
}
