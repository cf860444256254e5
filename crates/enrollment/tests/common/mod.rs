#![allow(dead_code)]

use async_trait::async_trait;
use configuration::EnrollmentSettings;
use core_types::{Enrollment, NewEnrollment, NewStudent, NewSubject, Student, Subject};
use database::{
    AcademicStore, DbError, InMemoryRepository, StoreTransaction, TransactionalStore, TxHandle,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

pub fn settings(max_retries: u32) -> EnrollmentSettings {
    EnrollmentSettings {
        max_retries,
        retry_backoff_ms: 1,
    }
}

pub async fn student(repo: &InMemoryRepository, email: &str, active: bool) -> Student {
    repo.create_student(&NewStudent {
        first_name: "Test".to_string(),
        last_name: email.split('@').next().unwrap_or("student").to_string(),
        email: email.to_string(),
        degree_id: None,
        cycle_id: None,
        is_active: Some(active),
    })
    .await
    .expect("student insert should succeed")
}

pub async fn subject(repo: &InMemoryRepository, name: &str, max_slots: i32) -> Subject {
    repo.create_subject(&NewSubject {
        name: name.to_string(),
        description: None,
        degree_id: None,
        cycle_id: None,
        max_slots,
    })
    .await
    .expect("subject insert should succeed")
}

pub async fn available_slots(repo: &InMemoryRepository, subject_id: i32) -> i32 {
    repo.get_subject(subject_id)
        .await
        .expect("subject lookup should succeed")
        .expect("subject should exist")
        .available_slots
}

/// What a [`FaultyStore`] breaks inside every transaction it opens.
pub enum Fault {
    /// Counter updates fail with a storage error.
    FailCounter,
    /// Counter updates find no subject row.
    SubjectGone,
    /// The next `n` commits report a serialization failure.
    ConflictOnCommit(AtomicU32),
    /// The next `n` counter updates report a serialization failure, the way
    /// PostgreSQL aborts an `UPDATE` that races a concurrent writer.
    ConflictOnCounter(AtomicU32),
    /// The next `n` enrollment inserts report a serialization failure.
    ConflictOnInsert(AtomicU32),
}

impl Fault {
    /// Consumes one pending conflict, if any remain.
    fn take(remaining: &AtomicU32) -> Option<DbError> {
        remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| DbError::SerializationFailure("injected serialization failure".to_string()))
    }
}

/// Wraps the in-memory store and injects a [`Fault`] into its transactions.
pub struct FaultyStore {
    inner: InMemoryRepository,
    fault: Arc<Fault>,
}

impl FaultyStore {
    pub fn new(inner: InMemoryRepository, fault: Fault) -> Self {
        Self {
            inner,
            fault: Arc::new(fault),
        }
    }

    pub fn commit_conflicts(conflicts: u32) -> Fault {
        Fault::ConflictOnCommit(AtomicU32::new(conflicts))
    }

    pub fn counter_conflicts(conflicts: u32) -> Fault {
        Fault::ConflictOnCounter(AtomicU32::new(conflicts))
    }

    pub fn insert_conflicts(conflicts: u32) -> Fault {
        Fault::ConflictOnInsert(AtomicU32::new(conflicts))
    }
}

#[async_trait]
impl TransactionalStore for FaultyStore {
    async fn begin_serializable(&self) -> Result<TxHandle, DbError> {
        let inner = self.inner.begin_serializable().await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            fault: self.fault.clone(),
        }))
    }
}

struct FaultyTransaction {
    inner: TxHandle,
    fault: Arc<Fault>,
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn find_student(&mut self, id: i32) -> Result<Option<Student>, DbError> {
        self.inner.find_student(id).await
    }

    async fn find_subject(&mut self, id: i32) -> Result<Option<Subject>, DbError> {
        self.inner.find_subject(id).await
    }

    async fn find_enrollment(&mut self, id: i32) -> Result<Option<Enrollment>, DbError> {
        self.inner.find_enrollment(id).await
    }

    async fn find_enrollment_by_key(
        &mut self,
        student_id: i32,
        subject_id: i32,
        academic_period: &str,
    ) -> Result<Option<Enrollment>, DbError> {
        self.inner
            .find_enrollment_by_key(student_id, subject_id, academic_period)
            .await
    }

    async fn insert_enrollment(&mut self, enrollment: &NewEnrollment) -> Result<Enrollment, DbError> {
        if let Fault::ConflictOnInsert(remaining) = self.fault.as_ref() {
            if let Some(err) = Fault::take(remaining) {
                return Err(err);
            }
        }
        self.inner.insert_enrollment(enrollment).await
    }

    async fn delete_enrollment(&mut self, id: i32) -> Result<u64, DbError> {
        self.inner.delete_enrollment(id).await
    }

    async fn adjust_available_slots(&mut self, subject_id: i32, delta: i32) -> Result<u64, DbError> {
        match self.fault.as_ref() {
            Fault::FailCounter => Err(DbError::Backend("injected counter failure".to_string())),
            Fault::SubjectGone => Ok(0),
            Fault::ConflictOnCounter(remaining) => match Fault::take(remaining) {
                Some(err) => Err(err),
                None => self.inner.adjust_available_slots(subject_id, delta).await,
            },
            Fault::ConflictOnCommit(_) | Fault::ConflictOnInsert(_) => {
                self.inner.adjust_available_slots(subject_id, delta).await
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        if let Fault::ConflictOnCommit(remaining) = self.fault.as_ref() {
            if let Some(err) = Fault::take(remaining) {
                // Dropping `inner` discards the transaction's writes.
                return Err(err);
            }
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.inner.rollback().await
    }
}
