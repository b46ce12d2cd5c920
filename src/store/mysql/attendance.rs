use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::{is_duplicate_key, parse_column};
use crate::error::AppError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, ClockOutUpdate, EmployeeRef, ManualEdit, NewClockIn,
    OverviewEntry,
};
use crate::model::correction::{
    AttendanceCorrection, CorrectionApplied, CorrectionFilter, CorrectionStatus, NewCorrection,
};
use crate::store::AttendanceStore;

const RECORD_COLUMNS: &str = r#"
    id, employee_id, company_id, date, check_in_time, check_out_time, working_hours,
    status, is_late, is_auto_clocked_out, is_manual, is_processed, processed_at,
    clock_in_method, clock_out_method, biometric_device_id, edited_by, notes
"#;

const CORRECTION_COLUMNS: &str = r#"
    id, attendance_id, user_id, company_id, requested_check_in, requested_check_out,
    reason, status, reviewed_by, reviewed_at, rejection_reason, created_at
"#;

/// Rows per multi-value INSERT during absentee synthesis.
const ABSENTEE_CHUNK: usize = 500;

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    date: NaiveDate,
    check_in_time: Option<NaiveDateTime>,
    check_out_time: Option<NaiveDateTime>,
    working_hours: Option<f64>,
    status: String,
    is_late: bool,
    is_auto_clocked_out: bool,
    is_manual: bool,
    is_processed: bool,
    processed_at: Option<NaiveDateTime>,
    clock_in_method: Option<String>,
    clock_out_method: Option<String>,
    biometric_device_id: Option<String>,
    edited_by: Option<u64>,
    notes: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            date: row.date,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            working_hours: row.working_hours,
            status: parse_column(&row.status)?,
            is_late: row.is_late,
            is_auto_clocked_out: row.is_auto_clocked_out,
            is_manual: row.is_manual,
            is_processed: row.is_processed,
            processed_at: row.processed_at,
            clock_in_method: row.clock_in_method.as_deref().map(parse_column).transpose()?,
            clock_out_method: row.clock_out_method.as_deref().map(parse_column).transpose()?,
            biometric_device_id: row.biometric_device_id,
            edited_by: row.edited_by,
            notes: row.notes,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CorrectionRow {
    id: u64,
    attendance_id: u64,
    user_id: u64,
    company_id: u64,
    requested_check_in: NaiveDateTime,
    requested_check_out: NaiveDateTime,
    reason: String,
    status: String,
    reviewed_by: Option<u64>,
    reviewed_at: Option<NaiveDateTime>,
    rejection_reason: Option<String>,
    created_at: NaiveDateTime,
}

impl TryFrom<CorrectionRow> for AttendanceCorrection {
    type Error = AppError;

    fn try_from(row: CorrectionRow) -> Result<Self, Self::Error> {
        Ok(AttendanceCorrection {
            id: row.id,
            attendance_id: row.attendance_id,
            user_id: row.user_id,
            company_id: row.company_id,
            requested_check_in: row.requested_check_in,
            requested_check_out: row.requested_check_out,
            reason: row.reason,
            status: parse_column(&row.status)?,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: u64,
    name: String,
    email: String,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Explains why a guarded correction transition touched no row.
    async fn review_conflict(&self, id: u64) -> Result<AppError, AppError> {
        Ok(match self.get_correction(id).await? {
            Some(existing) => AppError::AlreadyReviewed(existing.status),
            None => AppError::NotFound("Correction"),
        })
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, AppError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn upsert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, company_id, date, check_in_time, status, is_late,
                 clock_in_method, biometric_device_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.company_id)
        .bind(entry.date)
        .bind(entry.at)
        .bind(AttendanceStatus::Unset.as_ref())
        .bind(entry.is_late)
        .bind(entry.method.as_ref())
        .bind(entry.device_id.as_deref())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            // The (employee_id, date) row already exists: only an unlocked row
            // without a check-in may still be claimed.
            Err(e) if is_duplicate_key(&e) => {
                let claimed = sqlx::query(
                    r#"
                    UPDATE attendance
                    SET check_in_time = ?, is_late = ?, clock_in_method = ?, biometric_device_id = ?
                    WHERE employee_id = ? AND date = ?
                    AND check_in_time IS NULL
                    AND is_processed = FALSE
                    "#,
                )
                .bind(entry.at)
                .bind(entry.is_late)
                .bind(entry.method.as_ref())
                .bind(entry.device_id.as_deref())
                .bind(entry.employee_id)
                .bind(entry.date)
                .execute(&self.pool)
                .await?;

                if claimed.rows_affected() == 0 {
                    let existing = self
                        .get_by_employee_and_date(entry.employee_id, entry.date)
                        .await?
                        .ok_or(AppError::NotFound("Attendance record"))?;
                    return Err(match existing.check_in_time {
                        None => AppError::RecordLocked,
                        Some(_) => AppError::AlreadyClockedIn(Box::new(existing)),
                    });
                }
            }
            Err(e) => return Err(e.into()),
        }

        self.get_by_employee_and_date(entry.employee_id, entry.date)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))
    }

    async fn update_clock_out(&self, id: u64, update: ClockOutUpdate) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, working_hours = ?, status = ?, clock_out_method = ?,
                biometric_device_id = COALESCE(?, biometric_device_id)
            WHERE id = ?
            AND check_in_time IS NOT NULL
            AND check_out_time IS NULL
            AND is_processed = FALSE
            "#,
        )
        .bind(update.at)
        .bind(update.working_hours)
        .bind(update.status.as_ref())
        .bind(update.method.as_ref())
        .bind(update.device_id.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn manual_edit(&self, id: u64, edit: ManualEdit) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, check_out_time = ?, working_hours = ?, status = ?,
                is_late = ?, notes = ?, is_manual = TRUE, edited_by = ?
            WHERE id = ?
            AND is_processed = FALSE
            "#,
        )
        .bind(edit.check_in_time)
        .bind(edit.check_out_time)
        .bind(edit.working_hours)
        .bind(edit.status.as_ref())
        .bind(edit.is_late)
        .bind(edit.notes.as_deref())
        .bind(edit.edited_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn records_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND date >= ? AND date < ? ORDER BY date"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn overview_for_date(
        &self,
        company_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<OverviewEntry>, AppError> {
        let employees = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE company_id = ? AND role = 'employee'
            ORDER BY name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE company_id = ? AND date = ?");
        let mut by_employee: HashMap<u64, AttendanceRecord> = HashMap::new();
        for row in sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(company_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?
        {
            let record = AttendanceRecord::try_from(row)?;
            by_employee.insert(record.employee_id, record);
        }

        Ok(employees
            .into_iter()
            .map(|e| OverviewEntry {
                record: by_employee.remove(&e.id),
                employee_id: e.id,
                name: e.name,
                email: e.email,
            })
            .collect())
    }

    async fn open_records_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE date = ? AND check_in_time IS NOT NULL AND check_out_time IS NULL \
             AND is_processed = FALSE"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn auto_clock_out(
        &self,
        id: u64,
        at: NaiveDateTime,
        working_hours: f64,
        status: AttendanceStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, working_hours = ?, status = ?, is_auto_clocked_out = TRUE
            WHERE id = ?
            AND check_in_time IS NOT NULL
            AND check_out_time IS NULL
            AND is_processed = FALSE
            "#,
        )
        .bind(at)
        .bind(working_hours)
        .bind(status.as_ref())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn absentees_for_date(&self, date: NaiveDate) -> Result<Vec<EmployeeRef>, AppError> {
        let rows = sqlx::query_as::<_, (u64, u64)>(
            r#"
            SELECT u.id, u.company_id
            FROM users u
            WHERE u.role = 'employee'
            AND NOT EXISTS (
                SELECT 1 FROM attendance a
                WHERE a.employee_id = u.id AND a.date = ?
            )
            ORDER BY u.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, company_id)| EmployeeRef { id, company_id })
            .collect())
    }

    async fn insert_absent_records(
        &self,
        date: NaiveDate,
        employees: &[EmployeeRef],
    ) -> Result<u64, AppError> {
        let absent: &'static str = AttendanceStatus::Absent.into();
        let mut inserted = 0;

        for chunk in employees.chunks(ABSENTEE_CHUNK) {
            let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
                "INSERT INTO attendance (employee_id, company_id, date, status, is_processed) ",
            );
            builder.push_values(chunk, |mut row, employee| {
                row.push_bind(employee.id)
                    .push_bind(employee.company_id)
                    .push_bind(date)
                    .push_bind(absent)
                    .push_bind(false);
            });
            // a concurrent clock-in or batch run may have created the row meanwhile
            builder.push(" ON DUPLICATE KEY UPDATE id = id");

            inserted += builder.build().execute(&self.pool).await?.rows_affected();
        }

        Ok(inserted)
    }

    async fn lock_records_for_date(
        &self,
        date: NaiveDate,
        processed_at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET is_processed = TRUE, processed_at = ?
            WHERE date = ? AND is_processed = FALSE
            "#,
        )
        .bind(processed_at)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_correction(
        &self,
        correction: NewCorrection,
    ) -> Result<AttendanceCorrection, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_corrections
                (attendance_id, user_id, company_id, requested_check_in, requested_check_out,
                 reason, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(correction.attendance_id)
        .bind(correction.user_id)
        .bind(correction.company_id)
        .bind(correction.requested_check_in)
        .bind(correction.requested_check_out)
        .bind(&correction.reason)
        .bind(CorrectionStatus::Pending.as_ref())
        .bind(correction.created_at)
        .execute(&self.pool)
        .await?;

        self.get_correction(result.last_insert_id())
            .await?
            .ok_or(AppError::NotFound("Correction"))
    }

    async fn get_correction(&self, id: u64) -> Result<Option<AttendanceCorrection>, AppError> {
        let sql = format!("SELECT {CORRECTION_COLUMNS} FROM attendance_corrections WHERE id = ?");
        sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceCorrection::try_from)
            .transpose()
    }

    async fn list_corrections(
        &self,
        filter: &CorrectionFilter,
    ) -> Result<Vec<AttendanceCorrection>, AppError> {
        let mut where_sql = String::from(" WHERE company_id = ?");
        let mut args: Vec<FilterValue> = vec![FilterValue::U64(filter.company_id)];

        if let Some(requester) = filter.requester_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(requester));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.into()));
        }

        let sql = format!(
            "SELECT {CORRECTION_COLUMNS} FROM attendance_corrections{where_sql} ORDER BY created_at DESC"
        );
        let mut query = sqlx::query_as::<_, CorrectionRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceCorrection::try_from)
            .collect()
    }

    async fn approve_correction(
        &self,
        id: u64,
        applied: CorrectionApplied,
    ) -> Result<AttendanceRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let transitioned = sqlx::query(
            r#"
            UPDATE attendance_corrections
            SET status = ?, reviewed_by = ?, reviewed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(CorrectionStatus::Approved.as_ref())
        .bind(applied.reviewer_id)
        .bind(applied.reviewed_at)
        .bind(id)
        .bind(CorrectionStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await?;

        if transitioned.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.review_conflict(id).await?);
        }

        let attendance_id: u64 =
            sqlx::query_scalar("SELECT attendance_id FROM attendance_corrections WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        // no is_processed guard: approval is the sanctioned way past the lock
        sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, check_out_time = ?, working_hours = ?, status = ?,
                is_late = ?, is_manual = TRUE, edited_by = ?
            WHERE id = ?
            "#,
        )
        .bind(applied.check_in_time)
        .bind(applied.check_out_time)
        .bind(applied.working_hours)
        .bind(applied.status.as_ref())
        .bind(applied.is_late)
        .bind(applied.reviewer_id)
        .bind(attendance_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(attendance_id)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))
    }

    async fn reject_correction(
        &self,
        id: u64,
        reviewer_id: u64,
        reviewed_at: NaiveDateTime,
        reason: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_corrections
            SET status = ?, reviewed_by = ?, reviewed_at = ?, rejection_reason = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(CorrectionStatus::Rejected.as_ref())
        .bind(reviewer_id)
        .bind(reviewed_at)
        .bind(reason)
        .bind(id)
        .bind(CorrectionStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
