//! Error type for `shelfmark-store-sqlite`.

use rusqlite::ErrorCode;
use shelfmark_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] shelfmark_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored text column held a value no domain type accepts.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// Whether the caller may retry with different input (uniqueness
  /// conflicts only).
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_retryable())
  }
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self { Self::Core(e.into()) }
}

/// UNIQUE violations surface as [`shelfmark_core::Error::Conflict`] naming
/// the constraint (`table.column[, column]`); everything else stays a
/// database error.
impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &e
      && failure.code == ErrorCode::ConstraintViolation
      && let Some(constraint) = message.strip_prefix("UNIQUE constraint failed: ")
    {
      return Self::Core(shelfmark_core::Error::Conflict {
        constraint: constraint.to_owned(),
      });
    }
    Self::Sqlite(e)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
