use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::BiometricAction;
use crate::service::AttendanceService;

/// Event pushed by a registered device. The device id is the credential.
#[derive(Deserialize, ToSchema)]
pub struct BiometricEvent {
    #[schema(example = "GATE-1")]
    pub device_id: String,

    #[schema(example = 7)]
    pub employee_id: u64,

    pub action: BiometricAction,

    /// Business-local time of the punch; defaults to receipt time.
    #[schema(value_type = Option<String>, format = "date-time", example = "2024-05-01T09:02:00")]
    pub timestamp: Option<NaiveDateTime>,
}

#[utoipa::path(
    post,
    path = "/api/attendance/biometric/webhook",
    request_body = BiometricEvent,
    responses(
        (status = 200, description = "Event applied", body = Object, example = json!({
            "message": "Clocked in successfully",
            "record": {"id": 42, "clock_in_method": "biometric"}
        })),
        (status = 401, description = "Device not registered or inactive"),
        (status = 404, description = "Employee not found for this device"),
        (status = 409, description = "Already clocked in/out, or the day is locked")
    ),
    tag = "Biometric"
)]
pub async fn biometric_webhook(
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    body: web::Json<BiometricEvent>,
) -> Result<HttpResponse, AppError> {
    let event = body.into_inner();
    let at = event.timestamp.unwrap_or_else(|| config.business_now());

    let record = service
        .biometric_event(&event.device_id, event.employee_id, event.action, at)
        .await?;

    let message = match event.action {
        BiometricAction::ClockIn => "Clocked in successfully",
        BiometricAction::ClockOut => "Clocked out successfully",
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "record": record
    })))
}
