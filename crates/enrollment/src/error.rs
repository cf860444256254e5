use core_types::CoreError;
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("{0}")]
    InvalidInput(#[from] CoreError),

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The student exists but may not take new enrollments.
    #[error("{0}")]
    InvalidState(String),

    #[error("Subject {subject_name} has no available slots")]
    CapacityExceeded { subject_id: i32, subject_name: String },

    #[error("Student {student_id} is already enrolled in subject {subject_id} for period {academic_period}")]
    DuplicateEnrollment {
        student_id: i32,
        subject_id: i32,
        academic_period: String,
    },

    /// Serialization failures persisted through every retry.
    #[error("Enrollment transaction conflicted with concurrent requests after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] DbError),
}

impl EnrollmentError {
    pub(crate) fn not_found(entity: &'static str, id: i32) -> Self {
        EnrollmentError::NotFound { entity, id }
    }

    /// True when the storage layer aborted the transaction because of a
    /// concurrent writer, the one case the manager retries.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, EnrollmentError::StorageFailure(err) if err.is_serialization_failure())
    }
}
