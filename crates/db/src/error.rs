/// Errors raised by a [`CategoryStore`](crate::CategoryStore) or
/// [`PosterStore`](crate::PosterStore).
///
/// Constraint violations are classified so services can turn them into
/// domain errors; everything else is carried through as a driver error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A foreign key constraint rejected the write (PostgreSQL `23503`).
    #[error("Foreign key violation: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// A unique constraint rejected the write (PostgreSQL `23505`).
    #[error("Unique violation: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

/// PostgreSQL SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => {
                    return StoreError::ForeignKeyViolation { constraint }
                }
                Some(UNIQUE_VIOLATION) => return StoreError::UniqueViolation { constraint },
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}
