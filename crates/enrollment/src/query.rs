use crate::error::EnrollmentError;
use core_types::{Enrollment, EnrollmentFilter};
use database::{AcademicStore, DbError};
use std::sync::Arc;

/// Read-only views over the enrollments table.
#[derive(Clone)]
pub struct EnrollmentQueryService {
    store: Arc<dyn AcademicStore>,
}

impl EnrollmentQueryService {
    pub fn new(store: Arc<dyn AcademicStore>) -> Self {
        Self { store }
    }

    /// Enrollments matching every set field of `filter`, most recent first.
    /// No match is an empty list, not an error.
    pub async fn find_all(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        self.store
            .list_enrollments(filter)
            .await
            .map_err(|err| storage_failure("find_all", err))
    }

    pub async fn find_one(&self, id: i32) -> Result<Enrollment, EnrollmentError> {
        self.store
            .get_enrollment(id)
            .await
            .map_err(|err| storage_failure("find_one", err))?
            .ok_or_else(|| EnrollmentError::not_found("Enrollment", id))
    }

    /// A student's enrollments for one academic period. The student's
    /// existence is not checked; an unknown student simply has none.
    pub async fn find_by_student_and_period(
        &self,
        student_id: i32,
        academic_period: &str,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        let filter = EnrollmentFilter::for_student_period(student_id, academic_period);
        self.store
            .list_enrollments(&filter)
            .await
            .map_err(|err| storage_failure("find_by_student_and_period", err))
    }

    /// Enrollments of an existing student, optionally narrowed to one period.
    /// Unlike [`Self::find_by_student_and_period`], an unknown student is
    /// `NotFound`.
    pub async fn find_for_student(
        &self,
        student_id: i32,
        academic_period: Option<&str>,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        self.store
            .get_student(student_id)
            .await
            .map_err(|err| storage_failure("find_for_student", err))?
            .ok_or_else(|| EnrollmentError::not_found("Student", student_id))?;

        let filter = EnrollmentFilter {
            student_id: Some(student_id),
            academic_period: academic_period.map(str::to_string),
            ..EnrollmentFilter::default()
        };
        self.store
            .list_enrollments(&filter)
            .await
            .map_err(|err| storage_failure("find_for_student", err))
    }
}

fn storage_failure(operation: &'static str, err: DbError) -> EnrollmentError {
    tracing::error!(operation, error = ?err, "Error fetching enrollments.");
    EnrollmentError::StorageFailure(err)
}
