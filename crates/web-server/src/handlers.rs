use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_types::{
    Enrollment, EnrollmentFilter, NewEnrollment, NewStudent, NewSubject, Student, StudentFilter,
    Subject, SubjectAvailability,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query string of `GET /students/:id/enrollments`.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

/// # GET /api/health
pub async fn health() -> &'static str {
    "OK"
}

/// # POST /enrollments
/// Enrolls a student in a subject, taking one of its seats.
pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewEnrollment>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state.enrollments.create_enrollment(payload).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// # GET /enrollments?studentId=1&academicPeriod=2024-1
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<EnrollmentFilter>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = state.queries.find_all(&filter).await?;
    Ok(Json(enrollments))
}

/// # GET /enrollments/:id
pub async fn get_enrollment(
    Path(id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state.queries.find_one(id).await?;
    Ok(Json(enrollment))
}

/// # GET /enrollments/student/:student_id/period/:period
pub async fn get_student_period_enrollments(
    Path((student_id, period)): Path<(i32, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = state
        .queries
        .find_by_student_and_period(student_id, &period)
        .await?;
    Ok(Json(enrollments))
}

/// # DELETE /enrollments/:id
/// Removes the enrollment, releases its seat and returns the deleted record.
pub async fn delete_enrollment(
    Path(id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Enrollment>, AppError> {
    let removed = state.enrollments.remove_enrollment(id).await?;
    Ok(Json(removed))
}

/// # GET /students?isActive=true&degreeId=1
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<StudentFilter>,
) -> Result<Json<Vec<Student>>, AppError> {
    let students = state.store.list_students(&filter).await?;
    Ok(Json(students))
}

/// # GET /students/:id
pub async fn get_student(
    Path(id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Student>, AppError> {
    let student = state
        .store
        .get_student(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student with ID {id} not found")))?;
    Ok(Json(student))
}

/// # GET /students/:id/enrollments?period=2024-1
/// Unlike the enrollment routes, this one answers 404 for an unknown student.
pub async fn get_student_enrollments(
    Path(id): Path<i32>,
    Query(query): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = state
        .queries
        .find_for_student(id, query.period.as_deref())
        .await?;
    Ok(Json(enrollments))
}

/// # POST /students
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewStudent>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    payload.validate()?;
    let student = state.store.create_student(&payload).await?;
    tracing::info!(student_id = student.id, "Student created.");
    Ok((StatusCode::CREATED, Json(student)))
}

/// # GET /subjects
pub async fn list_subjects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Subject>>, AppError> {
    let subjects = state.store.list_subjects().await?;
    Ok(Json(subjects))
}

/// # GET /subjects/by-degree/:degree_id
pub async fn list_subjects_by_degree(
    Path(degree_id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Subject>>, AppError> {
    let subjects = state.store.list_subjects_by_degree(degree_id).await?;
    Ok(Json(subjects))
}

/// # GET /subjects/:id
pub async fn get_subject(
    Path(id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Subject>, AppError> {
    let subject = find_subject(&state, id).await?;
    Ok(Json(subject))
}

/// # POST /subjects
/// New subjects start with every seat available.
pub async fn create_subject(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewSubject>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    payload.validate()?;
    let subject = state.store.create_subject(&payload).await?;
    tracing::info!(subject_id = subject.id, max_slots = subject.max_slots, "Subject created.");
    Ok((StatusCode::CREATED, Json(subject)))
}

/// # GET /subjects/:id/availability
pub async fn get_subject_availability(
    Path(id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SubjectAvailability>, AppError> {
    let subject = find_subject(&state, id).await?;
    Ok(Json(SubjectAvailability::from(&subject)))
}

async fn find_subject(state: &AppState, id: i32) -> Result<Subject, AppError> {
    state
        .store
        .get_subject(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subject with ID {id} not found")))
}
