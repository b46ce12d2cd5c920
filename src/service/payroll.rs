use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::model::attendance::AttendanceSummary;
use crate::model::payroll::{NewPayroll, PayrollDraft, PayrollFilter, PayrollRecord};
use crate::model::user::EmployeeOption;
use crate::notify::{Notification, Notifier, Priority};
use crate::service::{month_range, round2};
use crate::store::{AttendanceStore, Directory, PayrollStore};

/// Monthly payroll snapshots prorated by locked attendance.
pub struct PayrollService {
    payrolls: Arc<dyn PayrollStore>,
    attendance: Arc<dyn AttendanceStore>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    working_days: f64,
}

impl PayrollService {
    pub fn new(
        payrolls: Arc<dyn PayrollStore>,
        attendance: Arc<dyn AttendanceStore>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        working_days: u32,
    ) -> Self {
        Self {
            payrolls,
            attendance,
            directory,
            notifier,
            working_days: f64::from(working_days.max(1)),
        }
    }

    #[instrument(skip(self, draft), fields(email = %draft.employee_email, month = draft.month, year = draft.year))]
    pub async fn create(
        &self,
        creator_id: u64,
        company_id: u64,
        draft: PayrollDraft,
        now: NaiveDateTime,
    ) -> Result<PayrollRecord, AppError> {
        validate(&draft)?;
        let (from, until) = month_range(draft.year, draft.month)?;

        let employee = self
            .directory
            .find_employee_by_email(company_id, draft.employee_email.trim())
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        if self
            .payrolls
            .exists(employee.id, draft.month, draft.year)
            .await?
        {
            return Err(AppError::DuplicatePayroll {
                email: employee.email,
                month: draft.month,
                year: draft.year,
            });
        }

        // only days the batch has locked count toward pay
        let records = self
            .attendance
            .records_between(employee.id, from, until)
            .await?;
        let summary = AttendanceSummary::from_records(records.iter().filter(|r| r.is_processed));

        let payable_days = summary.payable_days();
        let adjusted = round2(draft.base_salary / self.working_days * payable_days);
        let total = round2(adjusted + draft.extra_amount + draft.salary_increment - draft.deduction);

        let payroll = self
            .payrolls
            .insert(NewPayroll {
                employee_id: employee.id,
                company_id,
                employee_email: employee.email.clone(),
                employee_name: employee.name.clone(),
                payroll_month: draft.month,
                payroll_year: draft.year,
                base_salary: draft.base_salary,
                extra_amount: draft.extra_amount,
                salary_increment: draft.salary_increment,
                deduction: draft.deduction,
                present_days: summary.present_days,
                absent_days: summary.absent_days,
                half_days: summary.half_days,
                payable_days,
                total_working_hours: summary.total_working_hours,
                attendance_adjusted_salary: adjusted,
                total_salary: total,
                remarks: draft.remarks.filter(|r| !r.trim().is_empty()),
                created_by: creator_id,
                created_at: now,
            })
            .await?;

        self.notifier
            .notify(Notification {
                user_id: employee.id,
                company_id,
                kind: "payroll_created",
                title: "Payroll generated".to_string(),
                message: format!(
                    "Your payroll for {:02}/{} is ready: {:.2}",
                    draft.month, draft.year, total
                ),
                priority: Priority::High,
            })
            .await;

        info!(payroll_id = payroll.id, payable_days, total, "Payroll created");
        Ok(payroll)
    }

    /// `owner_of` restricts the lookup to one employee's payrolls.
    pub async fn get(
        &self,
        company_id: u64,
        id: u64,
        owner_of: Option<u64>,
    ) -> Result<PayrollRecord, AppError> {
        self.payrolls
            .get(id)
            .await?
            .filter(|p| p.company_id == company_id)
            .filter(|p| owner_of.is_none_or(|employee_id| p.employee_id == employee_id))
            .ok_or(AppError::NotFound("Payroll"))
    }

    pub async fn list(&self, filter: &PayrollFilter) -> Result<(Vec<PayrollRecord>, i64), AppError> {
        if let Some(month) = filter.month {
            if !(1..=12).contains(&month) {
                return Err(AppError::validation("Month must be between 1 and 12"));
            }
        }
        self.payrolls.list(filter).await
    }

    pub async fn employees(&self, company_id: u64) -> Result<Vec<EmployeeOption>, AppError> {
        Ok(self
            .directory
            .list_employees(company_id)
            .await?
            .into_iter()
            .map(EmployeeOption::from)
            .collect())
    }
}

fn validate(draft: &PayrollDraft) -> Result<(), AppError> {
    if draft.employee_email.trim().is_empty() {
        return Err(AppError::validation("Employee email is required"));
    }
    if !(1..=12).contains(&draft.month) {
        return Err(AppError::validation("Month must be between 1 and 12"));
    }
    if !(2000..=2100).contains(&draft.year) {
        return Err(AppError::validation("Year is out of range"));
    }
    if !draft.base_salary.is_finite() || draft.base_salary <= 0.0 {
        return Err(AppError::validation("Base salary must be positive"));
    }
    for (name, value) in [
        ("Extra amount", draft.extra_amount),
        ("Salary increment", draft.salary_increment),
        ("Deduction", draft.deduction),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::validation(format!("{name} cannot be negative")));
        }
    }
    Ok(())
}
