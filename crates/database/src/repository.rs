use crate::gateway::{AcademicStore, StoreTransaction, TransactionalStore, TxHandle};
use crate::DbError;
use async_trait::async_trait;
use core_types::{
    Enrollment, EnrollmentFilter, NewEnrollment, NewStudent, NewSubject, Student, StudentFilter,
    Subject,
};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{QueryBuilder, Transaction};

const STUDENT_COLUMNS: &str =
    "id, first_name, last_name, email, degree_id, cycle_id, is_active, created_at";
const SUBJECT_COLUMNS: &str =
    "id, name, description, degree_id, cycle_id, max_slots, available_slots";
const ENROLLMENT_COLUMNS: &str =
    "id, student_id, subject_id, academic_period, status, enrollment_date";

/// The `DbRepository` provides the PostgreSQL implementation of the academic
/// store. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a degree, or returns the id of the existing one with that name.
    pub async fn upsert_degree(&self, name: &str, duration: Option<&str>) -> Result<i32, DbError> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO degrees (name, duration) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET duration = EXCLUDED.duration
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(duration)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Inserts a cycle, or returns the id of the existing one with that name.
    pub async fn upsert_cycle(&self, name: &str, description: Option<&str>) -> Result<i32, DbError> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO cycles (name, description) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Fetches a student by email. Used to keep seeding idempotent.
    pub async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, DbError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    /// Fetches a subject by name. Used to keep seeding idempotent.
    pub async fn find_subject_by_name(&self, name: &str) -> Result<Option<Subject>, DbError> {
        let subject = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }
}

#[async_trait]
impl TransactionalStore for DbRepository {
    async fn begin_serializable(&self) -> Result<TxHandle, DbError> {
        let mut tx = self.pool.begin().await?;
        // Must be the first statement of the transaction.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

#[async_trait]
impl AcademicStore for DbRepository {
    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, DbError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments"));
        push_enrollment_filters(&mut builder, filter);
        builder.push(" ORDER BY enrollment_date DESC, id DESC");

        let enrollments = builder
            .build_query_as::<Enrollment>()
            .fetch_all(&self.pool)
            .await?;
        Ok(enrollments)
    }

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, DbError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn create_student(&self, student: &NewStudent) -> Result<Student, DbError> {
        let created = sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (first_name, last_name, email, degree_id, cycle_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(student.first_name.trim())
        .bind(student.last_name.trim())
        .bind(student.email.trim())
        .bind(student.degree_id)
        .bind(student.cycle_id)
        .bind(student.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_student(&self, id: i32) -> Result<Option<Student>, DbError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, DbError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {STUDENT_COLUMNS} FROM students"));
        let mut has_where = false;

        if let Some(is_active) = filter.is_active {
            push_where_prefix(&mut builder, &mut has_where);
            builder.push("is_active = ").push_bind(is_active);
        }
        if let Some(degree_id) = filter.degree_id {
            push_where_prefix(&mut builder, &mut has_where);
            builder.push("degree_id = ").push_bind(degree_id);
        }
        if let Some(cycle_id) = filter.cycle_id {
            push_where_prefix(&mut builder, &mut has_where);
            builder.push("cycle_id = ").push_bind(cycle_id);
        }
        if let Some(period) = filter.academic_period.as_deref() {
            push_where_prefix(&mut builder, &mut has_where);
            builder
                .push("EXISTS (SELECT 1 FROM enrollments e WHERE e.student_id = students.id AND e.academic_period = ")
                .push_bind(period)
                .push(")");
        }
        builder.push(" ORDER BY last_name ASC, id ASC");

        let students = builder
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await?;
        Ok(students)
    }

    async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, DbError> {
        let created = sqlx::query_as::<_, Subject>(&format!(
            r#"
            INSERT INTO subjects (name, description, degree_id, cycle_id, max_slots, available_slots)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {SUBJECT_COLUMNS}
            "#
        ))
        .bind(subject.name.trim())
        .bind(subject.description.as_deref())
        .bind(subject.degree_id)
        .bind(subject.cycle_id)
        .bind(subject.max_slots)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_subject(&self, id: i32) -> Result<Option<Subject>, DbError> {
        let subject = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, DbError> {
        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY name ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn list_subjects_by_degree(&self, degree_id: i32) -> Result<Vec<Subject>, DbError> {
        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE degree_id = $1 ORDER BY name ASC, id ASC"
        ))
        .bind(degree_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }
}

/// A SERIALIZABLE PostgreSQL transaction. If it is dropped without a commit,
/// sqlx issues the rollback when the connection returns to the pool.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn find_student(&mut self, id: i32) -> Result<Option<Student>, DbError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(student)
    }

    async fn find_subject(&mut self, id: i32) -> Result<Option<Subject>, DbError> {
        let subject = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(subject)
    }

    async fn find_enrollment(&mut self, id: i32) -> Result<Option<Enrollment>, DbError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    async fn find_enrollment_by_key(
        &mut self,
        student_id: i32,
        subject_id: i32,
        academic_period: &str,
    ) -> Result<Option<Enrollment>, DbError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            SELECT {ENROLLMENT_COLUMNS} FROM enrollments
            WHERE student_id = $1 AND subject_id = $2 AND academic_period = $3
            "#
        ))
        .bind(student_id)
        .bind(subject_id)
        .bind(academic_period)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    async fn insert_enrollment(&mut self, enrollment: &NewEnrollment) -> Result<Enrollment, DbError> {
        let created = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            INSERT INTO enrollments (student_id, subject_id, academic_period, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {ENROLLMENT_COLUMNS}
            "#
        ))
        .bind(enrollment.student_id)
        .bind(enrollment.subject_id)
        .bind(&enrollment.academic_period)
        .bind(enrollment.effective_status())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }

    async fn delete_enrollment(&mut self, id: i32) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn adjust_available_slots(&mut self, subject_id: i32, delta: i32) -> Result<u64, DbError> {
        let result =
            sqlx::query("UPDATE subjects SET available_slots = available_slots + $2 WHERE id = $1")
                .bind(subject_id)
                .bind(delta)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn push_where_prefix(builder: &mut QueryBuilder<'_, Postgres>, has_where: &mut bool) {
    if *has_where {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_where = true;
    }
}

fn push_enrollment_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a EnrollmentFilter) {
    let mut has_where = false;

    if let Some(student_id) = filter.student_id {
        push_where_prefix(builder, &mut has_where);
        builder.push("student_id = ").push_bind(student_id);
    }
    if let Some(subject_id) = filter.subject_id {
        push_where_prefix(builder, &mut has_where);
        builder.push("subject_id = ").push_bind(subject_id);
    }
    if let Some(period) = filter.academic_period.as_deref() {
        push_where_prefix(builder, &mut has_where);
        builder.push("academic_period = ").push_bind(period);
    }
    if let Some(status) = filter.status {
        push_where_prefix(builder, &mut has_where);
        builder.push("status = ").push_bind(status);
    }
}
