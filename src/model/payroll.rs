use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payroll for one employee and one month. Totals are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    pub employee_email: String,
    pub employee_name: String,
    pub payroll_month: u32,
    pub payroll_year: i32,
    pub base_salary: f64,
    pub extra_amount: f64,
    pub salary_increment: f64,
    pub deduction: f64,
    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub payable_days: f64,
    pub total_working_hours: f64,
    pub attendance_adjusted_salary: f64,
    pub total_salary: f64,
    pub remarks: Option<String>,
    pub created_by: u64,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Owner input for a new payroll, before attendance is aggregated.
#[derive(Debug, Clone, Default)]
pub struct PayrollDraft {
    pub employee_email: String,
    pub month: u32,
    pub year: i32,
    pub base_salary: f64,
    pub extra_amount: f64,
    pub salary_increment: f64,
    pub deduction: f64,
    pub remarks: Option<String>,
}

/// Everything needed to insert a payroll row; `id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPayroll {
    pub employee_id: u64,
    pub company_id: u64,
    pub employee_email: String,
    pub employee_name: String,
    pub payroll_month: u32,
    pub payroll_year: i32,
    pub base_salary: f64,
    pub extra_amount: f64,
    pub salary_increment: f64,
    pub deduction: f64,
    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub payable_days: f64,
    pub total_working_hours: f64,
    pub attendance_adjusted_salary: f64,
    pub total_salary: f64,
    pub remarks: Option<String>,
    pub created_by: u64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub company_id: u64,
    pub employee_id: Option<u64>,
    pub employee_email: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub page: u32,
    pub per_page: u32,
}
