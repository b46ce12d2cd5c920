//! In-process backend for service tests. Each method applies the same
//! row guards as the MySQL statements under a single lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, ClockOutUpdate, EmployeeRef, ManualEdit, NewClockIn,
    OverviewEntry,
};
use crate::model::correction::{
    AttendanceCorrection, CorrectionApplied, CorrectionFilter, CorrectionStatus, NewCorrection,
};
use crate::model::payroll::{NewPayroll, PayrollFilter, PayrollRecord};
use crate::model::role::Role;
use crate::model::user::{BiometricDevice, UserProfile};
use crate::notify::{Notification, Notifier};
use crate::store::{AttendanceStore, Directory, PayrollStore};

#[derive(Default)]
struct State {
    next_id: u64,
    records: BTreeMap<u64, AttendanceRecord>,
    corrections: BTreeMap<u64, AttendanceCorrection>,
    payrolls: BTreeMap<u64, PayrollRecord>,
    users: Vec<UserProfile>,
    devices: Vec<BiometricDevice>,
    notifications: Vec<Notification>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record_for(&self, employee_id: u64, date: NaiveDate) -> Option<&AttendanceRecord> {
        self.records
            .values()
            .find(|r| r.employee_id == employee_id && r.date == date)
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_user(&self, id: u64, company_id: u64, role: Role, name: &str) -> UserProfile {
        let profile = UserProfile {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            company_id,
        };
        self.lock().users.push(profile.clone());
        profile
    }

    pub fn add_device(&self, device_id: &str, company_id: u64, is_active: bool) {
        self.lock().devices.push(BiometricDevice {
            device_id: device_id.to_string(),
            company_id,
            is_active,
        });
    }

    /// Seeds a record as if written by earlier activity; returns its id.
    pub fn seed_record(&self, mut record: AttendanceRecord) -> u64 {
        let mut state = self.lock();
        let id = state.next_id();
        record.id = id;
        state.records.insert(id, record);
        id
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }
}

/// A blank unprocessed record for seeding.
pub fn blank_record(employee_id: u64, company_id: u64, date: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        id: 0,
        employee_id,
        company_id,
        date,
        check_in_time: None,
        check_out_time: None,
        working_hours: None,
        status: AttendanceStatus::Unset,
        is_late: false,
        is_auto_clocked_out: false,
        is_manual: false,
        is_processed: false,
        processed_at: None,
        clock_in_method: None,
        clock_out_method: None,
        biometric_device_id: None,
        edited_by: None,
        notes: None,
    }
}

#[async_trait]
impl AttendanceStore for MemoryBackend {
    async fn get_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self.lock().records.get(&id).cloned())
    }

    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self.lock().record_for(employee_id, date).cloned())
    }

    async fn upsert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, AppError> {
        let mut state = self.lock();

        if let Some(existing) = state.record_for(entry.employee_id, entry.date).cloned() {
            if existing.check_in_time.is_some() {
                return Err(AppError::AlreadyClockedIn(Box::new(existing)));
            }
            if existing.is_processed {
                return Err(AppError::RecordLocked);
            }
            let record = state
                .records
                .get_mut(&existing.id)
                .ok_or(AppError::NotFound("Attendance record"))?;
            record.check_in_time = Some(entry.at);
            record.is_late = entry.is_late;
            record.clock_in_method = Some(entry.method);
            record.biometric_device_id = entry.device_id;
            return Ok(record.clone());
        }

        let id = state.next_id();
        let mut record = blank_record(entry.employee_id, entry.company_id, entry.date);
        record.id = id;
        record.check_in_time = Some(entry.at);
        record.is_late = entry.is_late;
        record.clock_in_method = Some(entry.method);
        record.biometric_device_id = entry.device_id;
        state.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update_clock_out(&self, id: u64, update: ClockOutUpdate) -> Result<bool, AppError> {
        let mut state = self.lock();
        match state.records.get_mut(&id) {
            Some(r) if r.check_in_time.is_some() && r.check_out_time.is_none() && !r.is_processed => {
                r.check_out_time = Some(update.at);
                r.working_hours = Some(update.working_hours);
                r.status = update.status;
                r.clock_out_method = Some(update.method);
                if update.device_id.is_some() {
                    r.biometric_device_id = update.device_id;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn manual_edit(&self, id: u64, edit: ManualEdit) -> Result<bool, AppError> {
        let mut state = self.lock();
        match state.records.get_mut(&id) {
            Some(r) if !r.is_processed => {
                r.check_in_time = edit.check_in_time;
                r.check_out_time = edit.check_out_time;
                r.working_hours = edit.working_hours;
                r.status = edit.status;
                r.is_late = edit.is_late;
                r.notes = edit.notes;
                r.is_manual = true;
                r.edited_by = Some(edit.edited_by);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn records_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let mut records: Vec<_> = self
            .lock()
            .records
            .values()
            .filter(|r| r.employee_id == employee_id && r.date >= from && r.date < until)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn overview_for_date(
        &self,
        company_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<OverviewEntry>, AppError> {
        let state = self.lock();
        let mut employees: Vec<_> = state
            .users
            .iter()
            .filter(|u| u.company_id == company_id && u.role == Role::Employee)
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(employees
            .into_iter()
            .map(|u| OverviewEntry {
                employee_id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                record: state.record_for(u.id, date).cloned(),
            })
            .collect())
    }

    async fn open_records_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|r| {
                r.date == date
                    && r.check_in_time.is_some()
                    && r.check_out_time.is_none()
                    && !r.is_processed
            })
            .cloned()
            .collect())
    }

    async fn auto_clock_out(
        &self,
        id: u64,
        at: NaiveDateTime,
        working_hours: f64,
        status: AttendanceStatus,
    ) -> Result<bool, AppError> {
        let mut state = self.lock();
        match state.records.get_mut(&id) {
            Some(r) if r.check_in_time.is_some() && r.check_out_time.is_none() && !r.is_processed => {
                r.check_out_time = Some(at);
                r.working_hours = Some(working_hours);
                r.status = status;
                r.is_auto_clocked_out = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn absentees_for_date(&self, date: NaiveDate) -> Result<Vec<EmployeeRef>, AppError> {
        let state = self.lock();
        Ok(state
            .users
            .iter()
            .filter(|u| u.role == Role::Employee && state.record_for(u.id, date).is_none())
            .map(|u| EmployeeRef {
                id: u.id,
                company_id: u.company_id,
            })
            .collect())
    }

    async fn insert_absent_records(
        &self,
        date: NaiveDate,
        employees: &[EmployeeRef],
    ) -> Result<u64, AppError> {
        let mut state = self.lock();
        let mut inserted = 0;
        for employee in employees {
            if state.record_for(employee.id, date).is_some() {
                continue;
            }
            let id = state.next_id();
            let mut record = blank_record(employee.id, employee.company_id, date);
            record.id = id;
            record.status = AttendanceStatus::Absent;
            state.records.insert(id, record);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn lock_records_for_date(
        &self,
        date: NaiveDate,
        processed_at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        let mut state = self.lock();
        let mut locked = 0;
        for r in state.records.values_mut() {
            if r.date == date && !r.is_processed {
                r.is_processed = true;
                r.processed_at = Some(processed_at);
                locked += 1;
            }
        }
        Ok(locked)
    }

    async fn create_correction(
        &self,
        correction: NewCorrection,
    ) -> Result<AttendanceCorrection, AppError> {
        let mut state = self.lock();
        let id = state.next_id();
        let created = AttendanceCorrection {
            id,
            attendance_id: correction.attendance_id,
            user_id: correction.user_id,
            company_id: correction.company_id,
            requested_check_in: correction.requested_check_in,
            requested_check_out: correction.requested_check_out,
            reason: correction.reason,
            status: CorrectionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: correction.created_at,
        };
        state.corrections.insert(id, created.clone());
        Ok(created)
    }

    async fn get_correction(&self, id: u64) -> Result<Option<AttendanceCorrection>, AppError> {
        Ok(self.lock().corrections.get(&id).cloned())
    }

    async fn list_corrections(
        &self,
        filter: &CorrectionFilter,
    ) -> Result<Vec<AttendanceCorrection>, AppError> {
        Ok(self
            .lock()
            .corrections
            .values()
            .rev()
            .filter(|c| c.company_id == filter.company_id)
            .filter(|c| filter.requester_id.is_none_or(|id| c.user_id == id))
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .cloned()
            .collect())
    }

    async fn approve_correction(
        &self,
        id: u64,
        applied: CorrectionApplied,
    ) -> Result<AttendanceRecord, AppError> {
        let mut state = self.lock();
        let correction = state
            .corrections
            .get_mut(&id)
            .ok_or(AppError::NotFound("Correction"))?;
        if correction.status != CorrectionStatus::Pending {
            return Err(AppError::AlreadyReviewed(correction.status));
        }
        correction.status = CorrectionStatus::Approved;
        correction.reviewed_by = Some(applied.reviewer_id);
        correction.reviewed_at = Some(applied.reviewed_at);
        let attendance_id = correction.attendance_id;

        let record = state
            .records
            .get_mut(&attendance_id)
            .ok_or(AppError::NotFound("Attendance record"))?;
        record.check_in_time = Some(applied.check_in_time);
        record.check_out_time = Some(applied.check_out_time);
        record.working_hours = Some(applied.working_hours);
        record.status = applied.status;
        record.is_late = applied.is_late;
        record.is_manual = true;
        record.edited_by = Some(applied.reviewer_id);
        Ok(record.clone())
    }

    async fn reject_correction(
        &self,
        id: u64,
        reviewer_id: u64,
        reviewed_at: NaiveDateTime,
        reason: &str,
    ) -> Result<bool, AppError> {
        let mut state = self.lock();
        match state.corrections.get_mut(&id) {
            Some(c) if c.status == CorrectionStatus::Pending => {
                c.status = CorrectionStatus::Rejected;
                c.reviewed_by = Some(reviewer_id);
                c.reviewed_at = Some(reviewed_at);
                c.rejection_reason = Some(reason.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PayrollStore for MemoryBackend {
    async fn exists(&self, employee_id: u64, month: u32, year: i32) -> Result<bool, AppError> {
        Ok(self.lock().payrolls.values().any(|p| {
            p.employee_id == employee_id && p.payroll_month == month && p.payroll_year == year
        }))
    }

    async fn insert(&self, payroll: NewPayroll) -> Result<PayrollRecord, AppError> {
        let mut state = self.lock();
        let taken = state.payrolls.values().any(|p| {
            p.employee_id == payroll.employee_id
                && p.payroll_month == payroll.payroll_month
                && p.payroll_year == payroll.payroll_year
        });
        if taken {
            return Err(AppError::DuplicatePayroll {
                email: payroll.employee_email,
                month: payroll.payroll_month,
                year: payroll.payroll_year,
            });
        }

        let id = state.next_id();
        let record = PayrollRecord {
            id,
            employee_id: payroll.employee_id,
            company_id: payroll.company_id,
            employee_email: payroll.employee_email,
            employee_name: payroll.employee_name,
            payroll_month: payroll.payroll_month,
            payroll_year: payroll.payroll_year,
            base_salary: payroll.base_salary,
            extra_amount: payroll.extra_amount,
            salary_increment: payroll.salary_increment,
            deduction: payroll.deduction,
            present_days: payroll.present_days,
            absent_days: payroll.absent_days,
            half_days: payroll.half_days,
            payable_days: payroll.payable_days,
            total_working_hours: payroll.total_working_hours,
            attendance_adjusted_salary: payroll.attendance_adjusted_salary,
            total_salary: payroll.total_salary,
            remarks: payroll.remarks,
            created_by: payroll.created_by,
            created_at: payroll.created_at,
        };
        state.payrolls.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: u64) -> Result<Option<PayrollRecord>, AppError> {
        Ok(self.lock().payrolls.get(&id).cloned())
    }

    async fn list(&self, filter: &PayrollFilter) -> Result<(Vec<PayrollRecord>, i64), AppError> {
        let state = self.lock();
        let matching: Vec<_> = state
            .payrolls
            .values()
            .filter(|p| p.company_id == filter.company_id)
            .filter(|p| filter.employee_id.is_none_or(|id| p.employee_id == id))
            .filter(|p| {
                filter
                    .employee_email
                    .as_deref()
                    .is_none_or(|email| p.employee_email == email)
            })
            .filter(|p| filter.month.is_none_or(|m| p.payroll_month == m))
            .filter(|p| filter.year.is_none_or(|y| p.payroll_year == y))
            .cloned()
            .collect();

        let total = matching.len() as i64;
        let per_page = filter.per_page.max(1) as usize;
        let skip = (filter.page.max(1) as usize - 1) * per_page;
        Ok((matching.into_iter().skip(skip).take(per_page).collect(), total))
    }
}

#[async_trait]
impl Directory for MemoryBackend {
    async fn find_user(&self, user_id: u64) -> Result<Option<UserProfile>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_employee_by_email(
        &self,
        company_id: u64,
        email: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email == email && u.company_id == company_id && u.role == Role::Employee)
            .cloned())
    }

    async fn list_employees(&self, company_id: u64) -> Result<Vec<UserProfile>, AppError> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| u.company_id == company_id && u.role == Role::Employee)
            .cloned()
            .collect())
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<BiometricDevice>, AppError> {
        Ok(self
            .lock()
            .devices
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned())
    }
}

#[async_trait]
impl Notifier for MemoryBackend {
    async fn notify(&self, notification: Notification) {
        self.lock().notifications.push(notification);
    }
}
