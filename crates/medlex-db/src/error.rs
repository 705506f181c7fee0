//! Database error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Uniqueness constraint hit at write time. The citation that raised
    /// it is skipped; the row already in the store wins.
    #[error("duplicate citation: PMID {0} already stored")]
    Duplicate(i64),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
