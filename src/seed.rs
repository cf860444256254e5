use configuration::EnrollmentSettings;
use core_types::{NewEnrollment, NewStudent, NewSubject};
use database::{AcademicStore, DbRepository};
use enrollment::{EnrollmentError, EnrollmentManager};
use sqlx::PgPool;
use std::sync::Arc;

const SEED_PERIOD: &str = "2024-1";

/// Populates a demo degree, cycle, student and subject, then enrolls the
/// student through the regular enrollment workflow. Safe to run repeatedly.
pub async fn run(db_pool: PgPool, settings: &EnrollmentSettings) -> anyhow::Result<()> {
    let repo = Arc::new(DbRepository::new(db_pool));

    let degree_id = repo
        .upsert_degree("Computer Science", Some("5 years"))
        .await?;
    let cycle_id = repo
        .upsert_cycle("Cycle I", Some("First year, first semester"))
        .await?;

    let student = match repo.find_student_by_email("ada.lovelace@academia.edu").await? {
        Some(student) => student,
        None => {
            repo.create_student(&NewStudent {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada.lovelace@academia.edu".to_string(),
                degree_id: Some(degree_id),
                cycle_id: Some(cycle_id),
                is_active: Some(true),
            })
            .await?
        }
    };

    let subject = match repo.find_subject_by_name("Introduction to Programming").await? {
        Some(subject) => subject,
        None => {
            repo.create_subject(&NewSubject {
                name: "Introduction to Programming".to_string(),
                description: Some("Fundamentals of algorithms and structured programming".to_string()),
                degree_id: Some(degree_id),
                cycle_id: Some(cycle_id),
                max_slots: 30,
            })
            .await?
        }
    };

    let manager = EnrollmentManager::new(repo, settings);
    match manager
        .create_enrollment(NewEnrollment::new(student.id, subject.id, SEED_PERIOD))
        .await
    {
        Ok(enrollment) => tracing::info!(
            enrollment_id = enrollment.id,
            student = %student.full_name(),
            subject = %subject.name,
            "Seed enrollment created."
        ),
        Err(EnrollmentError::DuplicateEnrollment { .. }) => {
            tracing::info!("Seed enrollment already present.");
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        student_id = student.id,
        subject_id = subject.id,
        "Seed data is in place."
    );
    Ok(())
}
