use crate::api::attendance::{
    ClockInRequest, MonthlyAttendanceResponse, OverviewResponse, ProcessDailyRequest,
    UpdateAttendance,
};
use crate::api::biometric::BiometricEvent;
use crate::api::correction::{CorrectionListResponse, RejectCorrection, SubmitCorrection};
use crate::api::payroll::{CreatePayroll, PaginatedPayrollResponse, PayrollQuery};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, BiometricAction, ClockMethod,
    OverviewEntry,
};
use crate::model::correction::{AttendanceCorrection, CorrectionStatus};
use crate::model::payroll::PayrollRecord;
use crate::model::user::EmployeeOption;
use crate::service::DailyBatchReport;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ERP Attendance & Payroll API",
        version = "1.0.0",
        description = r#"
## Attendance & Payroll Reconciliation

Daily attendance for a multi-tenant ERP, reconciled into monthly payroll.

### 🔹 Key Features
- **Clock events**
  - Manual clock-in/out inside the shift window, plus a biometric device webhook
- **Daily batch**
  - Auto clock-out at shift end, absentee marking and locking of the day
- **Corrections**
  - Employees request fixes; owners approve or reject, even for locked days
- **Payroll**
  - One payroll per employee and month, prorated by locked attendance

### 🔐 Security
Endpoints under the API prefix require a **JWT Bearer** access token.
The biometric webhook is authenticated by the registered device id.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::overview,
        crate::api::attendance::employee_month,
        crate::api::attendance::update_attendance,
        crate::api::attendance::process_daily,

        crate::api::correction::submit_correction,
        crate::api::correction::list_corrections,
        crate::api::correction::approve_correction,
        crate::api::correction::reject_correction,

        crate::api::biometric::biometric_webhook,

        crate::api::payroll::create_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::payroll_employees
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            AttendanceSummary,
            ClockMethod,
            OverviewEntry,
            MonthlyAttendanceResponse,
            OverviewResponse,
            UpdateAttendance,
            ClockInRequest,
            ProcessDailyRequest,
            DailyBatchReport,
            BiometricAction,
            BiometricEvent,
            AttendanceCorrection,
            CorrectionStatus,
            SubmitCorrection,
            RejectCorrection,
            CorrectionListResponse,
            PayrollRecord,
            CreatePayroll,
            PayrollQuery,
            PaginatedPayrollResponse,
            EmployeeOption
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock events, views and the daily batch"),
        (name = "Corrections", description = "Attendance correction workflow"),
        (name = "Biometric", description = "Device webhook"),
        (name = "Payroll", description = "Payroll management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
