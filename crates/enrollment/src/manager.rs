use crate::error::EnrollmentError;
use configuration::EnrollmentSettings;
use core_types::{Enrollment, NewEnrollment};
use database::{DbError, TransactionalStore, TxHandle};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Creates and removes enrollments while keeping `subjects.available_slots`
/// in step with the enrollment rows.
///
/// Every operation runs in one SERIALIZABLE transaction owned by the manager.
/// Validation failures abort it with a typed error; serialization failures
/// re-run the whole protocol in a fresh transaction, up to `max_retries` times.
#[derive(Clone)]
pub struct EnrollmentManager {
    store: Arc<dyn TransactionalStore>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl EnrollmentManager {
    pub fn new(store: Arc<dyn TransactionalStore>, settings: &EnrollmentSettings) -> Self {
        Self {
            store,
            max_retries: settings.max_retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }

    /// Enrolls a student in a subject for an academic period, taking one seat.
    pub async fn create_enrollment(
        &self,
        request: NewEnrollment,
    ) -> Result<Enrollment, EnrollmentError> {
        let request = request.normalize()?;

        let enrollment = self
            .run_serializable("create_enrollment", |tx| {
                let request = request.clone();
                Box::pin(async move { create_steps(tx, &request).await })
            })
            .await?;

        tracing::info!(
            enrollment_id = enrollment.id,
            student_id = enrollment.student_id,
            subject_id = enrollment.subject_id,
            academic_period = %enrollment.academic_period,
            "Enrollment created."
        );
        Ok(enrollment)
    }

    /// Deletes an enrollment and gives its seat back. Returns the deleted row.
    ///
    /// The student's current state is not re-checked, so historical
    /// enrollments can always be removed. Any id that matches no row,
    /// including non-positive ones, is `NotFound`.
    pub async fn remove_enrollment(&self, id: i32) -> Result<Enrollment, EnrollmentError> {
        let enrollment = self
            .run_serializable("remove_enrollment", move |tx| Box::pin(remove_steps(tx, id)))
            .await?;

        tracing::info!(
            enrollment_id = enrollment.id,
            subject_id = enrollment.subject_id,
            "Enrollment removed, seat released."
        );
        Ok(enrollment)
    }

    /// Runs `steps` inside a serializable transaction, committing on success
    /// and rolling back on any error.
    async fn run_serializable<T, F>(
        &self,
        operation: &'static str,
        mut steps: F,
    ) -> Result<T, EnrollmentError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut TxHandle) -> BoxFuture<'t, Result<T, EnrollmentError>> + Send,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt_once(&mut steps).await {
                Err(err) if err.is_serialization_failure() => {
                    if attempt > self.max_retries {
                        tracing::warn!(operation, attempts = attempt, "Giving up after repeated serialization failures.");
                        return Err(EnrollmentError::TransactionConflict { attempts: attempt });
                    }
                    tracing::warn!(operation, attempt, error = %err, "Serialization failure, retrying.");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(EnrollmentError::StorageFailure(source)) => {
                    tracing::error!(operation, attempt, error = ?source, "Storage failure, transaction rolled back.");
                    return Err(EnrollmentError::StorageFailure(source));
                }
                other => return other,
            }
        }
    }

    async fn attempt_once<T, F>(&self, steps: &mut F) -> Result<T, EnrollmentError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut TxHandle) -> BoxFuture<'t, Result<T, EnrollmentError>> + Send,
    {
        let mut tx = self.store.begin_serializable().await?;
        let outcome = steps(&mut tx).await;

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed; the transaction is discarded with its connection.");
                }
                Err(err)
            }
        }
    }
}

async fn create_steps(
    tx: &mut TxHandle,
    request: &NewEnrollment,
) -> Result<Enrollment, EnrollmentError> {
    let student = tx
        .find_student(request.student_id)
        .await?
        .ok_or_else(|| EnrollmentError::not_found("Student", request.student_id))?;
    if !student.is_active {
        return Err(EnrollmentError::InvalidState(format!(
            "Student {} is not active",
            student.full_name()
        )));
    }

    let subject = tx
        .find_subject(request.subject_id)
        .await?
        .ok_or_else(|| EnrollmentError::not_found("Subject", request.subject_id))?;
    // Checked before the insert so an over-capacity row never exists, even transiently.
    if !subject.has_free_seat() {
        return Err(EnrollmentError::CapacityExceeded {
            subject_id: subject.id,
            subject_name: subject.name,
        });
    }

    let duplicate = || EnrollmentError::DuplicateEnrollment {
        student_id: request.student_id,
        subject_id: request.subject_id,
        academic_period: request.academic_period.clone(),
    };

    if tx
        .find_enrollment_by_key(request.student_id, request.subject_id, &request.academic_period)
        .await?
        .is_some()
    {
        return Err(duplicate());
    }

    let enrollment = tx.insert_enrollment(request).await.map_err(|err| match err {
        DbError::UniqueViolation(_) => duplicate(),
        other => other.into(),
    })?;

    if tx.adjust_available_slots(subject.id, -1).await? != 1 {
        return Err(DbError::Backend(format!(
            "subject {} vanished while taking a seat",
            subject.id
        ))
        .into());
    }

    Ok(enrollment)
}

async fn remove_steps(tx: &mut TxHandle, id: i32) -> Result<Enrollment, EnrollmentError> {
    let enrollment = tx
        .find_enrollment(id)
        .await?
        .ok_or_else(|| EnrollmentError::not_found("Enrollment", id))?;

    if tx.delete_enrollment(id).await? == 0 {
        return Err(EnrollmentError::not_found("Enrollment", id));
    }

    // A missing subject here means the data is already inconsistent; abort
    // rather than silently dropping the increment.
    if tx.adjust_available_slots(enrollment.subject_id, 1).await? == 0 {
        return Err(DbError::Backend(format!(
            "subject {} referenced by enrollment {} does not exist",
            enrollment.subject_id, enrollment.id
        ))
        .into());
    }

    Ok(enrollment)
}
