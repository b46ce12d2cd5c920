use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::model::attendance::{
    AttendancePatch, AttendanceRecord, AttendanceSummary, BiometricAction, ClockMethod,
    ClockOutUpdate, ManualEdit, NewClockIn, OverviewEntry,
};
use crate::model::role::Role;
use crate::model::user::BiometricDevice;
use crate::notify::{Notification, Notifier, Priority};
use crate::service::{ShiftPolicy, month_range};
use crate::store::{AttendanceStore, Directory};

/// A clock event after the caller's identity has been resolved.
#[derive(Debug, Clone)]
pub struct ClockEvent {
    pub employee_id: u64,
    pub company_id: u64,
    pub at: NaiveDateTime,
    pub method: ClockMethod,
    pub device_id: Option<String>,
}

impl ClockEvent {
    pub fn manual(employee_id: u64, company_id: u64, at: NaiveDateTime) -> Self {
        Self {
            employee_id,
            company_id,
            at,
            method: ClockMethod::Manual,
            device_id: None,
        }
    }
}

pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    policy: ShiftPolicy,
}

impl AttendanceService {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        policy: ShiftPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            policy,
        }
    }

    #[instrument(skip(self, event), fields(employee_id = event.employee_id, method = %event.method))]
    pub async fn clock_in(&self, event: ClockEvent) -> Result<AttendanceRecord, AppError> {
        if !self.policy.accepts_clock_in(event.at) {
            return Err(AppError::OutsideShiftWindow {
                start: self.policy.shift_start,
                end: self.policy.shift_end,
            });
        }

        let is_late = self.policy.is_late_check_in(event.at);
        let record = self
            .store
            .upsert_clock_in(NewClockIn {
                employee_id: event.employee_id,
                company_id: event.company_id,
                date: event.at.date(),
                at: event.at,
                is_late,
                method: event.method,
                device_id: event.device_id,
            })
            .await?;

        if is_late {
            self.notifier
                .notify(Notification {
                    user_id: event.employee_id,
                    company_id: event.company_id,
                    kind: "attendance_late",
                    title: "Late check-in".to_string(),
                    message: format!(
                        "You checked in at {}, after the shift start of {}",
                        event.at.format("%H:%M"),
                        self.policy.shift_start.format("%H:%M")
                    ),
                    priority: Priority::Medium,
                })
                .await;
        }

        info!(record_id = record.id, is_late, "Clocked in");
        Ok(record)
    }

    #[instrument(skip(self, event), fields(employee_id = event.employee_id, method = %event.method))]
    pub async fn clock_out(&self, event: ClockEvent) -> Result<AttendanceRecord, AppError> {
        let record = self
            .store
            .get_by_employee_and_date(event.employee_id, event.at.date())
            .await?
            .filter(|r| r.check_in_time.is_some())
            .ok_or(AppError::NoClockIn)?;

        if record.check_out_time.is_some() {
            return Err(AppError::AlreadyClockedOut(Box::new(record)));
        }
        if record.is_processed {
            return Err(AppError::RecordLocked);
        }

        let check_in = record.check_in_time.ok_or(AppError::NoClockIn)?;
        let (working_hours, status) = self.policy.evaluate(record.date, check_in, event.at)?;

        let updated = self
            .store
            .update_clock_out(
                record.id,
                ClockOutUpdate {
                    at: event.at,
                    working_hours,
                    status,
                    method: event.method,
                    device_id: event.device_id,
                },
            )
            .await?;

        let current = self
            .store
            .get_by_id(record.id)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;

        if !updated {
            warn!(record_id = record.id, "Clock-out lost a race");
            return Err(if current.check_out_time.is_some() {
                AppError::AlreadyClockedOut(Box::new(current))
            } else {
                AppError::RecordLocked
            });
        }

        info!(record_id = current.id, working_hours, status = %status, "Clocked out");
        Ok(current)
    }

    /// Builds the event for a punch made by the authenticated employee. A
    /// biometric punch must name an active device of the employee's company.
    pub async fn employee_event(
        &self,
        employee_id: u64,
        company_id: u64,
        at: NaiveDateTime,
        method: ClockMethod,
        device_id: Option<String>,
    ) -> Result<ClockEvent, AppError> {
        let device_id = match method {
            ClockMethod::Manual => None,
            ClockMethod::Biometric => {
                let device_id = device_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::validation("biometric_device_id is required for biometric punches")
                    })?;
                let device = self.active_device(&device_id).await?;
                if device.company_id != company_id {
                    return Err(AppError::DeviceNotRegistered);
                }
                Some(device.device_id)
            }
        };

        Ok(ClockEvent {
            employee_id,
            company_id,
            at,
            method,
            device_id,
        })
    }

    async fn active_device(&self, device_id: &str) -> Result<BiometricDevice, AppError> {
        self.directory
            .find_device(device_id)
            .await?
            .filter(|d| d.is_active)
            .ok_or(AppError::DeviceNotRegistered)
    }

    /// Clock event posted by a registered device on behalf of an employee of
    /// the device's company.
    #[instrument(skip(self))]
    pub async fn biometric_event(
        &self,
        device_id: &str,
        employee_id: u64,
        action: BiometricAction,
        at: NaiveDateTime,
    ) -> Result<AttendanceRecord, AppError> {
        let device = self.active_device(device_id).await?;

        let employee = self
            .directory
            .find_user(employee_id)
            .await?
            .filter(|u| u.role == Role::Employee && u.company_id == device.company_id)
            .ok_or(AppError::EmployeeNotFound)?;

        let event = ClockEvent {
            employee_id: employee.id,
            company_id: employee.company_id,
            at,
            method: ClockMethod::Biometric,
            device_id: Some(device.device_id),
        };

        match action {
            BiometricAction::ClockIn => self.clock_in(event).await,
            BiometricAction::ClockOut => self.clock_out(event).await,
        }
    }

    pub async fn today(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        self.store.get_by_employee_and_date(employee_id, date).await
    }

    pub async fn history(
        &self,
        employee_id: u64,
        year: i32,
        month: u32,
    ) -> Result<(Vec<AttendanceRecord>, AttendanceSummary), AppError> {
        let (from, until) = month_range(year, month)?;
        let records = self.store.records_between(employee_id, from, until).await?;
        let summary = AttendanceSummary::from_records(&records);
        Ok((records, summary))
    }

    pub async fn overview(
        &self,
        company_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<OverviewEntry>, AppError> {
        self.store.overview_for_date(company_id, date).await
    }

    /// Monthly view of one employee, restricted to the caller's company.
    pub async fn employee_month(
        &self,
        company_id: u64,
        employee_id: u64,
        year: i32,
        month: u32,
    ) -> Result<(Vec<AttendanceRecord>, AttendanceSummary), AppError> {
        self.directory
            .find_user(employee_id)
            .await?
            .filter(|u| u.role == Role::Employee && u.company_id == company_id)
            .ok_or(AppError::EmployeeNotFound)?;

        self.history(employee_id, year, month).await
    }

    #[instrument(skip(self, patch))]
    pub async fn manual_edit(
        &self,
        editor_id: u64,
        company_id: u64,
        record_id: u64,
        patch: AttendancePatch,
    ) -> Result<AttendanceRecord, AppError> {
        let record = self
            .store
            .get_by_id(record_id)
            .await?
            .filter(|r| r.company_id == company_id)
            .ok_or(AppError::NotFound("Attendance record"))?;

        if record.is_processed {
            return Err(AppError::RecordLocked);
        }
        if let Some(t) = patch.check_in_time {
            if t.date() != record.date {
                return Err(AppError::validation("Check-in must fall on the record's date"));
            }
            // batch auto clock-out needs a check-in before shift end
            if !self.policy.accepts_clock_in(t) {
                return Err(AppError::validation(format!(
                    "Check-in must be between {} and {}",
                    self.policy.shift_start.format("%H:%M"),
                    self.policy.shift_end.format("%H:%M")
                )));
            }
        }

        let check_in = patch.check_in_time.or(record.check_in_time);
        let check_out = patch.check_out_time.or(record.check_out_time);
        let (working_hours, computed_status) = match (check_in, check_out) {
            (Some(i), Some(o)) => {
                let (hours, status) = self.policy.evaluate(record.date, i, o)?;
                (Some(hours), status)
            }
            (None, Some(_)) => {
                return Err(AppError::validation("Check-out requires a check-in"));
            }
            _ => (record.working_hours, record.status),
        };
        let is_late = check_in
            .map(|t| self.policy.is_late_check_in(t))
            .unwrap_or(record.is_late);

        let edit = ManualEdit {
            check_in_time: check_in,
            check_out_time: check_out,
            working_hours,
            status: patch.status.unwrap_or(computed_status),
            is_late,
            notes: patch.notes.or(record.notes),
            edited_by: editor_id,
        };

        let updated = self.store.manual_edit(record_id, edit).await?;
        let current = self
            .store
            .get_by_id(record_id)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;

        // zero affected rows also means nothing changed
        if !updated && current.is_processed {
            return Err(AppError::RecordLocked);
        }

        info!(record_id, editor_id, "Attendance edited");
        Ok(current)
    }
}
