//! Error types for the Postgres-backed repository.

use thiserror::Error;

/// SQLSTATE for `undefined_table` ("relation does not exist"); the prescribed trigger for
/// auto-creating bookkeeping tables, in place of string-matching the error message.
const UNDEFINED_TABLE: &str = "42P01";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("pool build error: {0}")]
    Build(#[from] deadpool_postgres::BuildError),

    #[error("query error: {0}")]
    Query(#[source] tokio_postgres::Error),

    /// SQLSTATE 42P01 on a bookkeeping table. [`crate::repository::PgRepository`] catches
    /// this variant to create the table and retry once.
    #[error("relation does not exist: {0}")]
    UndefinedTable(#[source] tokio_postgres::Error),

    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),
}

impl DbError {
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code();
            if is_undefined_table_code(code) {
                return Self::UndefinedTable(err);
            }
            if is_unique_violation_code(code) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return Self::UniqueViolation(format!("{constraint}: {}", db_err.message()));
            }
        }
        Self::Query(err)
    }

    pub fn is_undefined_table(&self) -> bool {
        matches!(self, Self::UndefinedTable(_))
    }
}

fn is_undefined_table_code(code: &str) -> bool {
    code == UNDEFINED_TABLE
}

fn is_unique_violation_code(code: &str) -> bool {
    code == UNIQUE_VIOLATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_undefined_table_sqlstate() {
        assert!(is_undefined_table_code("42P01"));
        assert!(!is_undefined_table_code("23505"));
    }

    #[test]
    fn recognizes_unique_violation_sqlstate() {
        assert!(is_unique_violation_code("23505"));
        assert!(!is_unique_violation_code("42P01"));
    }
}
