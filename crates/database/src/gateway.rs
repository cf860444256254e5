use crate::DbError;
use async_trait::async_trait;
use core_types::{
    Enrollment, EnrollmentFilter, NewEnrollment, NewStudent, NewSubject, Student, StudentFilter,
    Subject,
};

/// An open transaction, boxed so either backend can sit behind it.
pub type TxHandle = Box<dyn StoreTransaction>;

/// The operations the enrollment workflow performs inside one transaction.
///
/// Every read observes the transaction's snapshot and every write stays
/// invisible to other sessions until [`StoreTransaction::commit`]. Dropping a
/// handle without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_student(&mut self, id: i32) -> Result<Option<Student>, DbError>;

    async fn find_subject(&mut self, id: i32) -> Result<Option<Subject>, DbError>;

    async fn find_enrollment(&mut self, id: i32) -> Result<Option<Enrollment>, DbError>;

    /// Looks up the enrollment for a `(student, subject, period)` triple.
    async fn find_enrollment_by_key(
        &mut self,
        student_id: i32,
        subject_id: i32,
        academic_period: &str,
    ) -> Result<Option<Enrollment>, DbError>;

    /// Inserts a row; the id and `enrollment_date` are assigned by the store.
    async fn insert_enrollment(&mut self, enrollment: &NewEnrollment) -> Result<Enrollment, DbError>;

    /// Returns the number of rows deleted (0 or 1).
    async fn delete_enrollment(&mut self, id: i32) -> Result<u64, DbError>;

    /// Adds `delta` to a subject's `available_slots`. Returns the number of
    /// subject rows touched, so 0 means the subject does not exist.
    async fn adjust_available_slots(&mut self, subject_id: i32, delta: i32) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// A store that can open serializable transactions.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Opens a transaction running at SERIALIZABLE isolation.
    async fn begin_serializable(&self) -> Result<TxHandle, DbError>;
}

/// The full read/write surface over the academic tables.
///
/// Plain reads run outside any explicit transaction with the store's default
/// consistency. `available_slots` is never written here except for its
/// initial value when a subject is created.
#[async_trait]
pub trait AcademicStore: TransactionalStore {
    /// Matching enrollments, most recent first.
    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, DbError>;

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, DbError>;

    async fn create_student(&self, student: &NewStudent) -> Result<Student, DbError>;

    async fn get_student(&self, id: i32) -> Result<Option<Student>, DbError>;

    /// Matching students ordered by last name. `academic_period` keeps only
    /// students with at least one enrollment in that period.
    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, DbError>;

    async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, DbError>;

    async fn get_subject(&self, id: i32) -> Result<Option<Subject>, DbError>;

    /// All subjects ordered by name.
    async fn list_subjects(&self) -> Result<Vec<Subject>, DbError>;

    /// Subjects of one degree ordered by name.
    async fn list_subjects_by_degree(&self, degree_id: i32) -> Result<Vec<Subject>, DbError>;
}
