//! # Academia Enrollment Crate
//!
//! The enrollment workflow: creating and removing enrollments while a
//! subject's `available_slots` counter stays consistent with the enrollment
//! rows, plus the read paths over enrollments.
//!
//! ## Public API
//!
//! - `EnrollmentManager`: the create/remove protocol, each run in a single
//!   serializable transaction with bounded retry on serialization failures.
//! - `EnrollmentQueryService`: filtered listing and lookups, no mutation.
//! - `EnrollmentError`: the typed failure taxonomy callers map to responses.

pub mod error;
pub mod manager;
pub mod query;

pub use error::EnrollmentError;
pub use manager::EnrollmentManager;
pub use query::EnrollmentQueryService;
