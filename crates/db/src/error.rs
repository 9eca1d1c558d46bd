//! Store error classification.

/// Errors surfaced by the repository layer.
///
/// Unique-constraint violations are classified by constraint name so the
/// admission path can distinguish an idempotency-key race (resolved by
/// read-back) from a genuine template-name conflict (surfaced to the
/// caller).
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("row not found")]
    NotFound,

    #[error("idempotency key conflict")]
    IdempotencyConflict,

    #[error("duplicate template name")]
    DuplicateTemplateName,

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique constraint violation: error code 23505.
                if db_err.code().as_deref() == Some("23505") {
                    match db_err.constraint() {
                        Some(c) if c.contains("idempotency_key") => {
                            return DbError::IdempotencyConflict;
                        }
                        Some(c) if c.contains("templates_name") => {
                            return DbError::DuplicateTemplateName;
                        }
                        _ => {}
                    }
                }
                DbError::Sqlx(err)
            }
            _ => DbError::Sqlx(err),
        }
    }
}
