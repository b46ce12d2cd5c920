//! Persistence seams used by the services. `mysql` holds the production
//! implementations; tests run the services against `memory`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, ClockOutUpdate, EmployeeRef, ManualEdit, NewClockIn,
    OverviewEntry,
};
use crate::model::correction::{
    AttendanceCorrection, CorrectionApplied, CorrectionFilter, NewCorrection,
};
use crate::model::payroll::{NewPayroll, PayrollFilter, PayrollRecord};
use crate::model::user::{BiometricDevice, UserProfile};

pub mod mysql;

#[cfg(test)]
pub mod memory;

/// The single shared mutable resource of the attendance subsystem. Every
/// mutation is guarded on the row's current state so concurrent callers
/// race on the database, not in process.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, AppError>;

    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Claims the first clock-in slot of the day. Losing the race yields
    /// `AlreadyClockedIn` with the winner's record, or `RecordLocked` when the
    /// day was already synthesized and locked without a check-in.
    async fn upsert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, AppError>;

    /// Returns false when the record is already closed or processed.
    async fn update_clock_out(&self, id: u64, update: ClockOutUpdate) -> Result<bool, AppError>;

    /// Returns false when the record is processed.
    async fn manual_edit(&self, id: u64, edit: ManualEdit) -> Result<bool, AppError>;

    async fn records_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn overview_for_date(
        &self,
        company_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<OverviewEntry>, AppError>;

    // daily batch

    async fn open_records_for_date(&self, date: NaiveDate)
    -> Result<Vec<AttendanceRecord>, AppError>;

    /// Closes an open, unprocessed record at `at`. Returns false if another
    /// run got there first.
    async fn auto_clock_out(
        &self,
        id: u64,
        at: NaiveDateTime,
        working_hours: f64,
        status: AttendanceStatus,
    ) -> Result<bool, AppError>;

    async fn absentees_for_date(&self, date: NaiveDate) -> Result<Vec<EmployeeRef>, AppError>;

    /// Inserts `absent` rows, skipping any (employee, date) that already has
    /// one. Returns the number actually inserted.
    async fn insert_absent_records(
        &self,
        date: NaiveDate,
        employees: &[EmployeeRef],
    ) -> Result<u64, AppError>;

    async fn lock_records_for_date(
        &self,
        date: NaiveDate,
        processed_at: NaiveDateTime,
    ) -> Result<u64, AppError>;

    // corrections

    async fn create_correction(
        &self,
        correction: NewCorrection,
    ) -> Result<AttendanceCorrection, AppError>;

    async fn get_correction(&self, id: u64) -> Result<Option<AttendanceCorrection>, AppError>;

    async fn list_corrections(
        &self,
        filter: &CorrectionFilter,
    ) -> Result<Vec<AttendanceCorrection>, AppError>;

    /// Moves a pending correction to approved and overwrites its record,
    /// ignoring the record's lock. Fails with `AlreadyReviewed` when the
    /// correction is no longer pending.
    async fn approve_correction(
        &self,
        id: u64,
        applied: CorrectionApplied,
    ) -> Result<AttendanceRecord, AppError>;

    /// Returns false when the correction is no longer pending.
    async fn reject_correction(
        &self,
        id: u64,
        reviewer_id: u64,
        reviewed_at: NaiveDateTime,
        reason: &str,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn exists(&self, employee_id: u64, month: u32, year: i32) -> Result<bool, AppError>;

    /// Fails with `DuplicatePayroll` if the period is already taken.
    async fn insert(&self, payroll: NewPayroll) -> Result<PayrollRecord, AppError>;

    async fn get(&self, id: u64) -> Result<Option<PayrollRecord>, AppError>;

    async fn list(&self, filter: &PayrollFilter) -> Result<(Vec<PayrollRecord>, i64), AppError>;
}

/// Read-only view of the user directory and device registry.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, user_id: u64) -> Result<Option<UserProfile>, AppError>;

    async fn find_employee_by_email(
        &self,
        company_id: u64,
        email: &str,
    ) -> Result<Option<UserProfile>, AppError>;

    async fn list_employees(&self, company_id: u64) -> Result<Vec<UserProfile>, AppError>;

    async fn find_device(&self, device_id: &str) -> Result<Option<BiometricDevice>, AppError>;
}
