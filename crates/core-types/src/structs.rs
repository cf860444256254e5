use crate::enums::EnrollmentStatus;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `students` table.
///
/// Students are owned by the registration flows; the enrollment workflow only
/// reads them to check eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub degree_id: Option<i32>,
    pub cycle_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A row of the `subjects` table.
///
/// `available_slots` is a denormalized count of the seats not yet taken by
/// enrollments. It stays within `0..=max_slots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub degree_id: Option<i32>,
    pub cycle_id: Option<i32>,
    pub max_slots: i32,
    pub available_slots: i32,
}

impl Subject {
    pub fn has_free_seat(&self) -> bool {
        self.available_slots > 0
    }
}

/// A row of the `enrollments` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub academic_period: String,
    pub status: EnrollmentStatus,
    pub enrollment_date: DateTime<Utc>,
}

/// Request body for creating an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub student_id: i32,
    pub subject_id: i32,
    pub academic_period: String,
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
}

impl NewEnrollment {
    pub fn new(student_id: i32, subject_id: i32, academic_period: impl Into<String>) -> Self {
        Self {
            student_id,
            subject_id,
            academic_period: academic_period.into(),
            status: None,
        }
    }

    /// Checks identifiers and trims the academic period token.
    pub fn normalize(mut self) -> Result<Self, CoreError> {
        if self.student_id <= 0 {
            return Err(CoreError::invalid("studentId", "must be a positive integer"));
        }
        if self.subject_id <= 0 {
            return Err(CoreError::invalid("subjectId", "must be a positive integer"));
        }
        let period = self.academic_period.trim();
        if period.is_empty() {
            return Err(CoreError::invalid("academicPeriod", "must not be empty"));
        }
        self.academic_period = period.to_string();
        Ok(self)
    }

    /// The status a new row is stored with.
    pub fn effective_status(&self) -> EnrollmentStatus {
        self.status.unwrap_or_default()
    }
}

/// Conjunction of optional constraints over enrollments.
/// Unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollmentFilter {
    pub student_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub academic_period: Option<String>,
    pub status: Option<EnrollmentStatus>,
}

impl EnrollmentFilter {
    pub fn for_student_period(student_id: i32, academic_period: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id),
            academic_period: Some(academic_period.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        self.student_id.is_none_or(|id| id == enrollment.student_id)
            && self.subject_id.is_none_or(|id| id == enrollment.subject_id)
            && self
                .academic_period
                .as_deref()
                .is_none_or(|period| period == enrollment.academic_period)
            && self.status.is_none_or(|status| status == enrollment.status)
    }
}

/// Request body for registering a student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub degree_id: Option<i32>,
    #[serde(default)]
    pub cycle_id: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_name.trim().is_empty() {
            return Err(CoreError::invalid("firstName", "must not be empty"));
        }
        if self.last_name.trim().is_empty() {
            return Err(CoreError::invalid("lastName", "must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(CoreError::invalid("email", "must be a valid email address"));
        }
        Ok(())
    }
}

/// Filters for the student listing. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentFilter {
    pub is_active: Option<bool>,
    pub degree_id: Option<i32>,
    pub cycle_id: Option<i32>,
    /// Keeps only students holding at least one enrollment in this period.
    pub academic_period: Option<String>,
}

impl StudentFilter {
    /// Checks the columns of the student row itself. `academic_period` needs
    /// the enrollments table and is applied by the store.
    pub fn matches(&self, student: &Student) -> bool {
        self.is_active.is_none_or(|active| active == student.is_active)
            && self.degree_id.is_none_or(|id| Some(id) == student.degree_id)
            && self.cycle_id.is_none_or(|id| Some(id) == student.cycle_id)
    }
}

/// Request body for creating a subject. New subjects start with every seat free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub degree_id: Option<i32>,
    #[serde(default)]
    pub cycle_id: Option<i32>,
    pub max_slots: i32,
}

impl NewSubject {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("name", "must not be empty"));
        }
        if self.max_slots <= 0 {
            return Err(CoreError::invalid("maxSlots", "must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAvailability {
    pub available: bool,
    pub available_slots: i32,
    pub max_slots: i32,
}

impl From<&Subject> for SubjectAvailability {
    fn from(subject: &Subject) -> Self {
        Self {
            available: subject.has_free_seat(),
            available_slots: subject.available_slots,
            max_slots: subject.max_slots,
        }
    }
}
