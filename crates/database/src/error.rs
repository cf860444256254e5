use thiserror::Error;

/// SQLSTATE codes the rest of the system reacts to.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// The transaction lost a serialization race and must be re-run from the start.
    #[error("Transaction could not be serialized: {0}")]
    SerializationFailure(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl DbError {
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, DbError::SerializationFailure(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        let code = error
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                DbError::SerializationFailure(error.to_string())
            }
            Some(UNIQUE_VIOLATION) => DbError::UniqueViolation(error.to_string()),
            _ => DbError::Query(error),
        }
    }
}
