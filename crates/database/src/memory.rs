use crate::gateway::{AcademicStore, StoreTransaction, TransactionalStore, TxHandle};
use crate::DbError;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    Enrollment, EnrollmentFilter, NewEnrollment, NewStudent, NewSubject, Student, StudentFilter,
    Subject,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct AcademicState {
    students: BTreeMap<i32, Student>,
    subjects: BTreeMap<i32, Subject>,
    enrollments: BTreeMap<i32, Enrollment>,
    last_student_id: i32,
    last_subject_id: i32,
    last_enrollment_id: i32,
}

impl AcademicState {
    fn find_enrollment_by_key(
        &self,
        student_id: i32,
        subject_id: i32,
        academic_period: &str,
    ) -> Option<&Enrollment> {
        self.enrollments.values().find(|e| {
            e.student_id == student_id
                && e.subject_id == subject_id
                && e.academic_period == academic_period
        })
    }
}

/// A process-local academic store.
///
/// A transaction holds the store's lock from `begin_serializable` until it is
/// committed or dropped, and works on a private copy of the state. Transactions
/// therefore run strictly one at a time, and an abandoned transaction leaves
/// the published state untouched.
///
/// Opening a transaction clones the whole state, so every enrollment write
/// costs time proportional to the number of stored rows. Fine for tests and
/// local runs; use `DbRepository` for real data volumes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<AcademicState>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionalStore for InMemoryRepository {
    async fn begin_serializable(&self) -> Result<TxHandle, DbError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

#[async_trait]
impl AcademicStore for InMemoryRepository {
    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, DbError> {
        let state = self.state.lock().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| {
            b.enrollment_date
                .cmp(&a.enrollment_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(enrollments)
    }

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, DbError> {
        Ok(self.state.lock().await.enrollments.get(&id).cloned())
    }

    async fn create_student(&self, student: &NewStudent) -> Result<Student, DbError> {
        let mut state = self.state.lock().await;
        let email = student.email.trim();
        if state.students.values().any(|s| s.email == email) {
            return Err(DbError::UniqueViolation(format!(
                "student email '{email}' already exists"
            )));
        }

        state.last_student_id += 1;
        let created = Student {
            id: state.last_student_id,
            first_name: student.first_name.trim().to_string(),
            last_name: student.last_name.trim().to_string(),
            email: email.to_string(),
            degree_id: student.degree_id,
            cycle_id: student.cycle_id,
            is_active: student.is_active.unwrap_or(true),
            created_at: Utc::now(),
        };
        state.students.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_student(&self, id: i32) -> Result<Option<Student>, DbError> {
        Ok(self.state.lock().await.students.get(&id).cloned())
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, DbError> {
        let state = self.state.lock().await;
        let mut students: Vec<Student> = state
            .students
            .values()
            .filter(|s| filter.matches(s))
            .filter(|s| {
                filter.academic_period.as_deref().is_none_or(|period| {
                    state
                        .enrollments
                        .values()
                        .any(|e| e.student_id == s.id && e.academic_period == period)
                })
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| a.last_name.cmp(&b.last_name).then_with(|| a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, DbError> {
        let mut state = self.state.lock().await;
        state.last_subject_id += 1;
        let created = Subject {
            id: state.last_subject_id,
            name: subject.name.trim().to_string(),
            description: subject.description.clone(),
            degree_id: subject.degree_id,
            cycle_id: subject.cycle_id,
            max_slots: subject.max_slots,
            available_slots: subject.max_slots,
        };
        state.subjects.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_subject(&self, id: i32) -> Result<Option<Subject>, DbError> {
        Ok(self.state.lock().await.subjects.get(&id).cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, DbError> {
        let state = self.state.lock().await;
        let mut subjects: Vec<Subject> = state.subjects.values().cloned().collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(subjects)
    }

    async fn list_subjects_by_degree(&self, degree_id: i32) -> Result<Vec<Subject>, DbError> {
        let state = self.state.lock().await;
        let mut subjects: Vec<Subject> = state
            .subjects
            .values()
            .filter(|s| s.degree_id == Some(degree_id))
            .cloned()
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(subjects)
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<AcademicState>,
    working: AcademicState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_student(&mut self, id: i32) -> Result<Option<Student>, DbError> {
        Ok(self.working.students.get(&id).cloned())
    }

    async fn find_subject(&mut self, id: i32) -> Result<Option<Subject>, DbError> {
        Ok(self.working.subjects.get(&id).cloned())
    }

    async fn find_enrollment(&mut self, id: i32) -> Result<Option<Enrollment>, DbError> {
        Ok(self.working.enrollments.get(&id).cloned())
    }

    async fn find_enrollment_by_key(
        &mut self,
        student_id: i32,
        subject_id: i32,
        academic_period: &str,
    ) -> Result<Option<Enrollment>, DbError> {
        Ok(self
            .working
            .find_enrollment_by_key(student_id, subject_id, academic_period)
            .cloned())
    }

    async fn insert_enrollment(&mut self, enrollment: &NewEnrollment) -> Result<Enrollment, DbError> {
        let state = &mut self.working;
        if !state.students.contains_key(&enrollment.student_id) {
            return Err(DbError::Backend(format!(
                "foreign key violation: student {} does not exist",
                enrollment.student_id
            )));
        }
        if !state.subjects.contains_key(&enrollment.subject_id) {
            return Err(DbError::Backend(format!(
                "foreign key violation: subject {} does not exist",
                enrollment.subject_id
            )));
        }
        if state
            .find_enrollment_by_key(
                enrollment.student_id,
                enrollment.subject_id,
                &enrollment.academic_period,
            )
            .is_some()
        {
            return Err(DbError::UniqueViolation(format!(
                "enrollment ({}, {}, {}) already exists",
                enrollment.student_id, enrollment.subject_id, enrollment.academic_period
            )));
        }

        state.last_enrollment_id += 1;
        let created = Enrollment {
            id: state.last_enrollment_id,
            student_id: enrollment.student_id,
            subject_id: enrollment.subject_id,
            academic_period: enrollment.academic_period.clone(),
            status: enrollment.effective_status(),
            enrollment_date: Utc::now(),
        };
        state.enrollments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_enrollment(&mut self, id: i32) -> Result<u64, DbError> {
        Ok(u64::from(self.working.enrollments.remove(&id).is_some()))
    }

    async fn adjust_available_slots(&mut self, subject_id: i32, delta: i32) -> Result<u64, DbError> {
        let Some(subject) = self.working.subjects.get_mut(&subject_id) else {
            return Ok(0);
        };
        let updated = subject.available_slots + delta;
        // Mirrors the `subjects_available_slots_range` check constraint.
        if updated < 0 || updated > subject.max_slots {
            return Err(DbError::Backend(format!(
                "check constraint violated: available_slots {updated} outside 0..={} for subject {subject_id}",
                subject.max_slots
            )));
        }
        subject.available_slots = updated;
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        Ok(())
    }
}
