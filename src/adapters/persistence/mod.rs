use serde_json::Value;
use sqlx::PgPool;

use crate::app_error::AppError;

pub mod gallery_item;
pub mod profile;
pub mod referral;
pub mod stripe_event;
pub mod user_credits;

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// True when the insert hit a unique constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                || db_err.message().to_lowercase().contains("duplicate")
        }
        _ => false,
    }
}

/// First of `keys` present in `row` with a usable integer value.
///
/// Rows read through `to_jsonb` carry whatever counter columns the table
/// had over time; numbers stored as text are accepted as well.
pub fn first_i64(row: &Value, keys: &[&str]) -> Option<i64> {
    first_present(row, keys).map(|(_, value)| value)
}

/// Like `first_i64`, also naming the key the value came from.
pub fn first_present<'k>(row: &Value, keys: &[&'k str]) -> Option<(&'k str, i64)> {
    keys.iter().find_map(|key| {
        let value = match row.get(*key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        Some((*key, value))
    })
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if is_unique_violation(&err) {
                    AppError::InvalidInput("A record with this value already exists".into())
                }
                // PostgreSQL foreign key violation
                else if msg.contains("foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    // Log the actual error for debugging, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
