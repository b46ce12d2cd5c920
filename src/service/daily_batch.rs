use std::sync::Arc;
use std::time::Duration;

use actix_web::rt::time::timeout;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::service::ShiftPolicy;
use crate::store::AttendanceStore;

/// Per-step counts of one batch run. Counts reflect work done even when the
/// run stops early.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyBatchReport {
    pub run_id: String,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    pub auto_clocked_out: u64,
    pub absentees_marked: u64,
    pub records_locked: u64,
    pub completed: bool,
    pub error: Option<String>,
}

impl DailyBatchReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            date,
            auto_clocked_out: 0,
            absentees_marked: 0,
            records_locked: 0,
            completed: false,
            error: None,
        }
    }
}

/// End-of-day reconciliation: close open records at shift end, mark
/// absentees, then lock the day. Every step only touches unprocessed rows,
/// so repeated or overlapping runs converge.
pub struct DailyBatchProcessor {
    store: Arc<dyn AttendanceStore>,
    policy: ShiftPolicy,
    max_runtime: Duration,
}

impl DailyBatchProcessor {
    pub fn new(store: Arc<dyn AttendanceStore>, policy: ShiftPolicy, max_runtime: Duration) -> Self {
        Self {
            store,
            policy,
            max_runtime,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, date: NaiveDate, now: NaiveDateTime) -> DailyBatchReport {
        let mut report = DailyBatchReport::new(date);
        let outcome = timeout(self.max_runtime, self.process(date, now, &mut report)).await;

        match outcome {
            Ok(Ok(())) => {
                report.completed = true;
                info!(
                    run_id = %report.run_id,
                    %date,
                    auto_clocked_out = report.auto_clocked_out,
                    absentees_marked = report.absentees_marked,
                    records_locked = report.records_locked,
                    "Daily attendance batch finished"
                );
            }
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    run_id = %report.run_id,
                    %date,
                    auto_clocked_out = report.auto_clocked_out,
                    absentees_marked = report.absentees_marked,
                    "Daily attendance batch failed"
                );
                report.error = Some(e.to_string());
            }
            Err(_) => {
                warn!(
                    run_id = %report.run_id,
                    %date,
                    max_secs = self.max_runtime.as_secs(),
                    "Daily attendance batch exceeded its time limit"
                );
                report.error = Some(format!(
                    "Run exceeded {} seconds",
                    self.max_runtime.as_secs()
                ));
            }
        }

        report
    }

    async fn process(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
        report: &mut DailyBatchReport,
    ) -> Result<(), AppError> {
        let shift_end = self.policy.shift_end_on(date);
        for record in self.store.open_records_for_date(date).await? {
            let Some(check_in) = record.check_in_time else {
                continue;
            };
            let Some(hours) = self.policy.working_hours(check_in, shift_end) else {
                warn!(record_id = record.id, "Open record checked in after shift end");
                continue;
            };
            let status = self.policy.classify_status(date, shift_end, hours);
            if self
                .store
                .auto_clock_out(record.id, shift_end, hours, status)
                .await?
            {
                report.auto_clocked_out += 1;
            }
        }

        let absentees = self.store.absentees_for_date(date).await?;
        if !absentees.is_empty() {
            report.absentees_marked = self.store.insert_absent_records(date, &absentees).await?;
        }

        report.records_locked = self.store.lock_records_for_date(date, now).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceStatus, ClockMethod, NewClockIn};
    use crate::model::role::Role;
    use crate::store::memory::MemoryBackend;
    use futures::future::join_all;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryBackend>, DailyBatchProcessor) {
        let backend = MemoryBackend::new();
        backend.add_user(1, 10, Role::Owner, "Olivia");
        backend.add_user(7, 10, Role::Employee, "Ravi");
        backend.add_user(8, 10, Role::Employee, "Meera");
        backend.add_user(20, 99, Role::Employee, "Outsider");
        let processor = DailyBatchProcessor::new(
            backend.clone(),
            ShiftPolicy::default(),
            Duration::from_secs(30),
        );
        (backend, processor)
    }

    async fn clock_in(backend: &MemoryBackend, employee_id: u64, t: NaiveDateTime) {
        backend
            .upsert_clock_in(NewClockIn {
                employee_id,
                company_id: 10,
                date: t.date(),
                at: t,
                is_late: false,
                method: ClockMethod::Manual,
                device_id: None,
            })
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn missing_employees_are_marked_absent_and_locked() {
        let (backend, processor) = setup();
        clock_in(&backend, 7, at(9, 0)).await;

        let report = processor.run(day(), at(19, 30)).await;
        assert!(report.completed);
        assert_eq!(report.absentees_marked, 2);

        let absent = backend.get_by_employee_and_date(8, day()).await.unwrap().unwrap();
        assert_eq!(absent.status, AttendanceStatus::Absent);
        assert!(absent.is_processed);
        assert_eq!(absent.processed_at, Some(at(19, 30)));
        assert_eq!(absent.check_in_time, None);

        let other = backend.get_by_employee_and_date(20, day()).await.unwrap().unwrap();
        assert_eq!(other.company_id, 99);
        assert!(backend.get_by_employee_and_date(1, day()).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn open_records_close_at_shift_end() {
        let (backend, processor) = setup();
        clock_in(&backend, 7, at(9, 0)).await;

        let report = processor.run(day(), at(19, 30)).await;
        assert_eq!(report.auto_clocked_out, 1);
        assert_eq!(report.records_locked, 3);

        let record = backend.get_by_employee_and_date(7, day()).await.unwrap().unwrap();
        assert_eq!(record.check_out_time, Some(at(19, 0)));
        assert_eq!(record.working_hours, Some(10.0));
        assert_eq!(record.status, AttendanceStatus::Present);
        assert!(record.is_auto_clocked_out);
        assert!(record.is_processed);
    }

    #[actix_web::test]
    async fn late_open_record_closes_as_half_day() {
        let (backend, processor) = setup();
        clock_in(&backend, 7, at(12, 0)).await;

        processor.run(day(), at(19, 30)).await;

        let record = backend.get_by_employee_and_date(7, day()).await.unwrap().unwrap();
        assert_eq!(record.working_hours, Some(7.0));
        assert_eq!(record.status, AttendanceStatus::HalfDay);
    }

    #[actix_web::test]
    async fn second_run_changes_nothing() {
        let (backend, processor) = setup();
        clock_in(&backend, 7, at(9, 0)).await;

        processor.run(day(), at(19, 30)).await;
        let snapshot = backend.records();

        let report = processor.run(day(), at(19, 45)).await;
        assert!(report.completed);
        assert_eq!(report.auto_clocked_out, 0);
        assert_eq!(report.absentees_marked, 0);
        assert_eq!(report.records_locked, 0);
        assert_eq!(backend.records(), snapshot);
    }

    #[actix_web::test]
    async fn concurrent_runs_converge() {
        let (backend, processor) = setup();
        clock_in(&backend, 7, at(9, 0)).await;

        let reports = join_all((0..3).map(|_| processor.run(day(), at(19, 30)))).await;

        assert_eq!(reports.iter().map(|r| r.auto_clocked_out).sum::<u64>(), 1);
        assert_eq!(reports.iter().map(|r| r.absentees_marked).sum::<u64>(), 2);
        assert_eq!(reports.iter().map(|r| r.records_locked).sum::<u64>(), 3);
        assert_eq!(backend.records().len(), 3);
        assert!(backend.records().iter().all(|r| r.is_processed));
    }

    #[actix_web::test]
    async fn each_run_gets_its_own_id() {
        let (_, processor) = setup();
        let first = processor.run(day(), at(19, 30)).await;
        let second = processor.run(day(), at(19, 30)).await;
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.date, day());
    }
}
