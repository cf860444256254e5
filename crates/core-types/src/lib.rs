pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::EnrollmentStatus;
pub use error::CoreError;
pub use structs::{
    Enrollment, EnrollmentFilter, NewEnrollment, NewStudent, NewSubject, Student, StudentFilter,
    Subject, SubjectAvailability,
};
