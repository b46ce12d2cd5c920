use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::auth::policy::Capability;
use crate::config::Config;
use crate::error::AppError;
use crate::model::payroll::{PayrollDraft, PayrollFilter, PayrollRecord};
use crate::service::PayrollService;

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = "ravi@example.com")]
    pub employee_email: String,

    #[schema(example = 5)]
    #[serde(alias = "month")]
    pub payroll_month: u32,

    #[schema(example = 2024)]
    #[serde(alias = "year")]
    pub payroll_year: i32,

    #[schema(example = 2600.0)]
    pub base_salary: f64,

    #[schema(example = 0.0)]
    #[serde(default)]
    pub extra_amount: f64,

    #[schema(example = 0.0)]
    #[serde(default)]
    pub salary_increment: f64,

    #[schema(example = 0.0)]
    #[serde(default)]
    pub deduction: f64,

    #[schema(example = "May payroll")]
    pub remarks: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = 5)]
    pub month: Option<u32>,

    #[schema(example = 2024)]
    pub year: Option<i32>,

    /// Owners and admins only; employees always see their own payrolls
    #[schema(example = "ravi@example.com")]
    pub employee_email: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<PayrollRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created", body = PayrollRecord),
        (status = 400, description = "Invalid amounts or period"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll already exists for the period"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    config: web::Data<Config>,
    service: web::Data<PayrollService>,
    payload: web::Json<CreatePayroll>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePayroll)?;

    let payload = payload.into_inner();
    let draft = PayrollDraft {
        employee_email: payload.employee_email,
        month: payload.payroll_month,
        year: payload.payroll_year,
        base_salary: payload.base_salary,
        extra_amount: payload.extra_amount,
        salary_increment: payload.salary_increment,
        deduction: payload.deduction,
        remarks: payload.remarks,
    };

    let payroll = service
        .create(auth.user_id, auth.company_id, draft, config.business_now())
        .await?;

    Ok(HttpResponse::Created().json(payroll))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = PayrollRecord),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let owner_of = if auth.can(Capability::ManagePayroll) {
        None
    } else {
        auth.require(Capability::ViewOwnPayroll)?;
        Some(auth.user_id)
    };

    let payroll = service
        .get(auth.company_id, path.into_inner(), owner_of)
        .await?;
    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    query: web::Query<PayrollQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let mut filter = PayrollFilter {
        company_id: auth.company_id,
        employee_id: None,
        employee_email: query.employee_email,
        month: query.month,
        year: query.year,
        page,
        per_page,
    };
    if !auth.can(Capability::ManagePayroll) {
        auth.require(Capability::ViewOwnPayroll)?;
        filter.employee_id = Some(auth.user_id);
        filter.employee_email = None;
    }

    let (data, total) = service.list(&filter).await?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Employees of the caller's company, for the payroll form.
#[utoipa::path(
    get,
    path = "/api/payroll/employees",
    responses(
        (status = 200, body = Vec<crate::model::user::EmployeeOption>),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn payroll_employees(
    auth: AuthUser,
    service: web::Data<PayrollService>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePayroll)?;

    let employees = service.employees(auth.company_id).await?;
    Ok(HttpResponse::Ok().json(employees))
}
