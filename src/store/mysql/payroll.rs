use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::MySqlPool;

use super::is_duplicate_key;
use crate::error::AppError;
use crate::model::payroll::{NewPayroll, PayrollFilter, PayrollRecord};
use crate::store::PayrollStore;

const PAYROLL_COLUMNS: &str = r#"
    id, employee_id, company_id, employee_email, employee_name, payroll_month, payroll_year,
    base_salary, extra_amount, salary_increment, deduction, present_days, absent_days,
    half_days, payable_days, total_working_hours, attendance_adjusted_salary, total_salary,
    remarks, created_by, created_at
"#;

#[derive(sqlx::FromRow)]
struct PayrollRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    employee_email: String,
    employee_name: String,
    payroll_month: u32,
    payroll_year: i32,
    base_salary: f64,
    extra_amount: f64,
    salary_increment: f64,
    deduction: f64,
    present_days: u32,
    absent_days: u32,
    half_days: u32,
    payable_days: f64,
    total_working_hours: f64,
    attendance_adjusted_salary: f64,
    total_salary: f64,
    remarks: Option<String>,
    created_by: u64,
    created_at: NaiveDateTime,
}

impl From<PayrollRow> for PayrollRecord {
    fn from(row: PayrollRow) -> Self {
        PayrollRecord {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            employee_email: row.employee_email,
            employee_name: row.employee_name,
            payroll_month: row.payroll_month,
            payroll_year: row.payroll_year,
            base_salary: row.base_salary,
            extra_amount: row.extra_amount,
            salary_increment: row.salary_increment,
            deduction: row.deduction,
            present_days: row.present_days,
            absent_days: row.absent_days,
            half_days: row.half_days,
            payable_days: row.payable_days,
            total_working_hours: row.total_working_hours,
            attendance_adjusted_salary: row.attendance_adjusted_salary,
            total_salary: row.total_salary,
            remarks: row.remarks,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    U32(u32),
    I32(i32),
    Str(&'a str),
}

pub struct MySqlPayrollStore {
    pool: MySqlPool,
}

impl MySqlPayrollStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayrollStore for MySqlPayrollStore {
    async fn exists(&self, employee_id: u64, month: u32, year: i32) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM payroll
                WHERE employee_id = ? AND payroll_month = ? AND payroll_year = ?
            )
            "#,
        )
        .bind(employee_id)
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists > 0)
    }

    async fn insert(&self, payroll: NewPayroll) -> Result<PayrollRecord, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payroll
                (employee_id, company_id, employee_email, employee_name, payroll_month,
                 payroll_year, base_salary, extra_amount, salary_increment, deduction,
                 present_days, absent_days, half_days, payable_days, total_working_hours,
                 attendance_adjusted_salary, total_salary, remarks, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payroll.employee_id)
        .bind(payroll.company_id)
        .bind(&payroll.employee_email)
        .bind(&payroll.employee_name)
        .bind(payroll.payroll_month)
        .bind(payroll.payroll_year)
        .bind(payroll.base_salary)
        .bind(payroll.extra_amount)
        .bind(payroll.salary_increment)
        .bind(payroll.deduction)
        .bind(payroll.present_days)
        .bind(payroll.absent_days)
        .bind(payroll.half_days)
        .bind(payroll.payable_days)
        .bind(payroll.total_working_hours)
        .bind(payroll.attendance_adjusted_salary)
        .bind(payroll.total_salary)
        .bind(payroll.remarks.as_deref())
        .bind(payroll.created_by)
        .bind(payroll.created_at)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(r) => r,
            Err(e) if is_duplicate_key(&e) => {
                return Err(AppError::DuplicatePayroll {
                    email: payroll.employee_email,
                    month: payroll.payroll_month,
                    year: payroll.payroll_year,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.get(result.last_insert_id())
            .await?
            .ok_or(AppError::NotFound("Payroll"))
    }

    async fn get(&self, id: u64) -> Result<Option<PayrollRecord>, AppError> {
        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?");
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PayrollRecord::from))
    }

    async fn list(&self, filter: &PayrollFilter) -> Result<(Vec<PayrollRecord>, i64), AppError> {
        let mut where_sql = String::from(" WHERE company_id = ?");
        let mut args: Vec<FilterValue> = vec![FilterValue::U64(filter.company_id)];

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(email) = filter.employee_email.as_deref() {
            where_sql.push_str(" AND employee_email = ?");
            args.push(FilterValue::Str(email));
        }
        if let Some(month) = filter.month {
            where_sql.push_str(" AND payroll_month = ?");
            args.push(FilterValue::U32(month));
        }
        if let Some(year) = filter.year {
            where_sql.push_str(" AND payroll_year = ?");
            args.push(FilterValue::I32(year));
        }

        let count_sql = format!("SELECT COUNT(*) FROM payroll{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::U32(v) => count_q.bind(*v),
                FilterValue::I32(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let per_page = i64::from(filter.per_page.max(1));
        let offset = i64::from(filter.page.max(1) - 1) * per_page;
        let data_sql = format!(
            r#"
            SELECT {PAYROLL_COLUMNS}
            FROM payroll
            {where_sql}
            ORDER BY payroll_year DESC, payroll_month DESC, created_at DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, PayrollRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::U32(v) => data_q.bind(v),
                FilterValue::I32(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let rows = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(PayrollRecord::from).collect(), total))
    }
}
