use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::model::correction::{
    AttendanceCorrection, CorrectionApplied, CorrectionFilter, CorrectionStatus, NewCorrection,
};
use crate::notify::{Notification, Notifier, Priority};
use crate::service::ShiftPolicy;
use crate::store::AttendanceStore;

/// Employee-requested fixes to attendance, reviewed by an owner. Approval is
/// the only path that rewrites a processed record.
pub struct CorrectionService {
    store: Arc<dyn AttendanceStore>,
    notifier: Arc<dyn Notifier>,
    policy: ShiftPolicy,
}

impl CorrectionService {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        notifier: Arc<dyn Notifier>,
        policy: ShiftPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    #[instrument(skip(self, reason))]
    pub async fn submit(
        &self,
        requester_id: u64,
        company_id: u64,
        attendance_id: u64,
        requested_check_in: NaiveDateTime,
        requested_check_out: NaiveDateTime,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<AttendanceCorrection, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A reason is required"));
        }

        let record = self
            .store
            .get_by_id(attendance_id)
            .await?
            .filter(|r| r.company_id == company_id)
            .ok_or(AppError::NotFound("Attendance record"))?;

        if record.employee_id != requester_id {
            return Err(AppError::Forbidden(
                "Corrections can only be requested for your own attendance",
            ));
        }
        if requested_check_in.date() != record.date {
            return Err(AppError::validation(
                "Requested check-in must fall on the record's date",
            ));
        }
        if requested_check_out <= requested_check_in {
            return Err(AppError::validation(
                "Requested check-out must be after check-in",
            ));
        }

        let correction = self
            .store
            .create_correction(NewCorrection {
                attendance_id,
                user_id: requester_id,
                company_id,
                requested_check_in,
                requested_check_out,
                reason: reason.to_string(),
                created_at: now,
            })
            .await?;

        info!(
            correction_id = correction.id,
            locked = record.is_processed,
            "Correction submitted"
        );
        Ok(correction)
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        reviewer_id: u64,
        company_id: u64,
        correction_id: u64,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, AppError> {
        let correction = self.scoped(correction_id, company_id).await?;
        if correction.status != CorrectionStatus::Pending {
            return Err(AppError::AlreadyReviewed(correction.status));
        }

        let record = self
            .store
            .get_by_id(correction.attendance_id)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;

        let (working_hours, status) = self.policy.evaluate(
            record.date,
            correction.requested_check_in,
            correction.requested_check_out,
        )?;

        let updated = self
            .store
            .approve_correction(
                correction_id,
                CorrectionApplied {
                    reviewer_id,
                    reviewed_at: now,
                    check_in_time: correction.requested_check_in,
                    check_out_time: correction.requested_check_out,
                    working_hours,
                    status,
                    is_late: self.policy.is_late_check_in(correction.requested_check_in),
                },
            )
            .await?;

        self.notifier
            .notify(Notification {
                user_id: correction.user_id,
                company_id,
                kind: "correction_approved",
                title: "Attendance correction approved".to_string(),
                message: format!(
                    "Your correction for {} was approved",
                    record.date.format("%Y-%m-%d")
                ),
                priority: Priority::Medium,
            })
            .await;

        info!(correction_id, record_id = updated.id, "Correction approved");
        Ok(updated)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        reviewer_id: u64,
        company_id: u64,
        correction_id: u64,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<AttendanceCorrection, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }

        let correction = self.scoped(correction_id, company_id).await?;
        if correction.status != CorrectionStatus::Pending {
            return Err(AppError::AlreadyReviewed(correction.status));
        }

        let rejected = self
            .store
            .reject_correction(correction_id, reviewer_id, now, reason)
            .await?;
        let current = self.scoped(correction_id, company_id).await?;
        if !rejected {
            return Err(AppError::AlreadyReviewed(current.status));
        }

        self.notifier
            .notify(Notification {
                user_id: correction.user_id,
                company_id,
                kind: "correction_rejected",
                title: "Attendance correction rejected".to_string(),
                message: format!("Your correction was rejected: {reason}"),
                priority: Priority::Low,
            })
            .await;

        info!(correction_id, "Correction rejected");
        Ok(current)
    }

    pub async fn list(
        &self,
        filter: &CorrectionFilter,
    ) -> Result<Vec<AttendanceCorrection>, AppError> {
        self.store.list_corrections(filter).await
    }

    async fn scoped(
        &self,
        correction_id: u64,
        company_id: u64,
    ) -> Result<AttendanceCorrection, AppError> {
        self.store
            .get_correction(correction_id)
            .await?
            .filter(|c| c.company_id == company_id)
            .ok_or(AppError::NotFound("Correction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use crate::store::memory::{MemoryBackend, blank_record};
    use chrono::NaiveDate;
    use futures::future::join_all;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn later() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    /// Employee 7 of company 10 with a locked absent record for `day()`.
    fn setup() -> (Arc<MemoryBackend>, CorrectionService, u64) {
        let backend = MemoryBackend::new();
        let mut record = blank_record(7, 10, day());
        record.status = AttendanceStatus::Absent;
        record.is_processed = true;
        record.processed_at = Some(at(19, 30));
        let record_id = backend.seed_record(record);

        let service = CorrectionService::new(backend.clone(), backend.clone(), ShiftPolicy::default());
        (backend, service, record_id)
    }

    #[actix_web::test]
    async fn approval_rewrites_a_locked_record() {
        let (backend, service, record_id) = setup();

        let correction = service
            .submit(7, 10, record_id, at(9, 20), at(19, 5), "Card reader was down", later())
            .await
            .unwrap();
        assert_eq!(correction.status, CorrectionStatus::Pending);

        let record = service.approve(1, 10, correction.id, later()).await.unwrap();
        assert_eq!(record.check_in_time, Some(at(9, 20)));
        assert_eq!(record.check_out_time, Some(at(19, 5)));
        assert_eq!(record.working_hours, Some(9.75));
        assert_eq!(record.status, AttendanceStatus::Present);
        assert!(record.is_late);
        assert!(record.is_manual);
        assert!(record.is_processed);
        assert_eq!(record.edited_by, Some(1));

        let stored = backend.get_correction(correction.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CorrectionStatus::Approved);
        assert_eq!(stored.reviewed_by, Some(1));

        let notes = backend.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, "correction_approved");
        assert_eq!(notes[0].user_id, 7);
    }

    #[actix_web::test]
    async fn second_review_is_rejected() {
        let (_, service, record_id) = setup();
        let correction = service
            .submit(7, 10, record_id, at(9, 0), at(19, 0), "Forgot", later())
            .await
            .unwrap();

        service.approve(1, 10, correction.id, later()).await.unwrap();

        let err = service.approve(1, 10, correction.id, later()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReviewed(CorrectionStatus::Approved)));
        let err = service
            .reject(1, 10, correction.id, "too late", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyReviewed(CorrectionStatus::Approved)));
    }

    #[actix_web::test]
    async fn concurrent_approvals_apply_once() {
        let (backend, service, record_id) = setup();
        let correction = service
            .submit(7, 10, record_id, at(9, 0), at(19, 0), "Forgot", later())
            .await
            .unwrap();

        let results = join_all((0..4).map(|_| service.approve(1, 10, correction.id, later()))).await;
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(AppError::AlreadyReviewed(_))))
        );
        assert_eq!(backend.notifications().len(), 1);
    }

    #[actix_web::test]
    async fn rejection_leaves_the_record_untouched() {
        let (backend, service, record_id) = setup();
        let before = backend.get_by_id(record_id).await.unwrap().unwrap();
        let correction = service
            .submit(7, 10, record_id, at(9, 0), at(19, 0), "Forgot", later())
            .await
            .unwrap();

        let err = service.reject(1, 10, correction.id, "  ", later()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let rejected = service
            .reject(1, 10, correction.id, "No evidence", later())
            .await
            .unwrap();
        assert_eq!(rejected.status, CorrectionStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("No evidence"));

        let after = backend.get_by_id(record_id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(backend.notifications()[0].kind, "correction_rejected");
    }

    #[actix_web::test]
    async fn submission_is_validated() {
        let (backend, service, record_id) = setup();
        backend.add_user(8, 10, crate::model::role::Role::Employee, "Meera");

        let err = service
            .submit(7, 10, record_id, at(9, 0), at(19, 0), " ", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .submit(8, 10, record_id, at(9, 0), at(19, 0), "mine", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .submit(7, 99, record_id, at(9, 0), at(19, 0), "other company", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .submit(7, 10, record_id, at(19, 0), at(9, 0), "inverted", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .submit(7, 10, record_id, later(), later(), "wrong day", later())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn listing_filters_by_requester_and_status() {
        let (_, service, record_id) = setup();
        let first = service
            .submit(7, 10, record_id, at(9, 0), at(19, 0), "one", later())
            .await
            .unwrap();
        service
            .submit(7, 10, record_id, at(9, 10), at(19, 0), "two", later())
            .await
            .unwrap();
        service.approve(1, 10, first.id, later()).await.unwrap();

        let pending = service
            .list(&CorrectionFilter {
                company_id: 10,
                requester_id: Some(7),
                status: Some(CorrectionStatus::Pending),
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason, "two");

        let other_company = service
            .list(&CorrectionFilter {
                company_id: 99,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other_company.is_empty());
    }
}
