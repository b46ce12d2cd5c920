use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::auth::policy::Capability;
use crate::config::Config;
use crate::error::AppError;
use crate::model::correction::{AttendanceCorrection, CorrectionFilter, CorrectionStatus};
use crate::service::CorrectionService;

#[derive(Deserialize, ToSchema)]
pub struct SubmitCorrection {
    #[schema(example = 42)]
    pub attendance_id: u64,

    #[schema(value_type = String, format = "date-time", example = "2024-05-01T09:00:00")]
    pub requested_check_in: NaiveDateTime,

    #[schema(value_type = String, format = "date-time", example = "2024-05-01T19:00:00")]
    pub requested_check_out: NaiveDateTime,

    #[schema(example = "Badge reader was offline")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectCorrection {
    #[schema(example = "No supporting evidence")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams)]
pub struct CorrectionQuery {
    /// pending, approved or rejected
    #[param(value_type = Option<String>)]
    pub status: Option<CorrectionStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct CorrectionListResponse {
    pub data: Vec<AttendanceCorrection>,
}

#[utoipa::path(
    post,
    path = "/api/attendance/corrections",
    request_body = SubmitCorrection,
    responses(
        (status = 201, description = "Correction submitted", body = AttendanceCorrection),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Attendance record not found"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Corrections"
)]
pub async fn submit_correction(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<CorrectionService>,
    body: web::Json<SubmitCorrection>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::SubmitCorrection)?;

    let correction = service
        .submit(
            auth.user_id,
            auth.company_id,
            body.attendance_id,
            body.requested_check_in,
            body.requested_check_out,
            &body.reason,
            config.business_now(),
        )
        .await?;

    Ok(HttpResponse::Created().json(correction))
}

/// Employees see their own requests; owners see the whole company.
#[utoipa::path(
    get,
    path = "/api/attendance/corrections",
    params(CorrectionQuery),
    responses(
        (status = 200, body = CorrectionListResponse),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Corrections"
)]
pub async fn list_corrections(
    auth: AuthUser,
    service: web::Data<CorrectionService>,
    query: web::Query<CorrectionQuery>,
) -> Result<HttpResponse, AppError> {
    let requester_id = if auth.can(Capability::ReviewCorrection) {
        None
    } else {
        auth.require(Capability::SubmitCorrection)?;
        Some(auth.user_id)
    };

    let data = service
        .list(&CorrectionFilter {
            company_id: auth.company_id,
            requester_id,
            status: query.status,
        })
        .await?;

    Ok(HttpResponse::Ok().json(CorrectionListResponse { data }))
}

#[utoipa::path(
    patch,
    path = "/api/attendance/corrections/{correction_id}/approve",
    params(("correction_id", description = "Correction id")),
    responses(
        (status = 200, description = "Correction approved and applied", body = Object, example = json!({
            "message": "Correction approved",
            "record": {"id": 42, "working_hours": 10.0, "status": "present", "is_manual": true}
        })),
        (status = 404, description = "Correction not found"),
        (status = 409, description = "Correction already reviewed"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Corrections"
)]
pub async fn approve_correction(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<CorrectionService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ReviewCorrection)?;

    let record = service
        .approve(
            auth.user_id,
            auth.company_id,
            path.into_inner(),
            config.business_now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Correction approved",
        "record": record
    })))
}

#[utoipa::path(
    patch,
    path = "/api/attendance/corrections/{correction_id}/reject",
    request_body = RejectCorrection,
    params(("correction_id", description = "Correction id")),
    responses(
        (status = 200, description = "Correction rejected", body = AttendanceCorrection),
        (status = 400, description = "A reason is required"),
        (status = 404, description = "Correction not found"),
        (status = 409, description = "Correction already reviewed"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Corrections"
)]
pub async fn reject_correction(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<CorrectionService>,
    path: web::Path<u64>,
    body: web::Json<RejectCorrection>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ReviewCorrection)?;

    let correction = service
        .reject(
            auth.user_id,
            auth.company_id,
            path.into_inner(),
            &body.reason,
            config.business_now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(correction))
}
