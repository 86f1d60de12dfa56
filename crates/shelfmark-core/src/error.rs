//! Error types for `shelfmark-core`.
//!
//! Three families matter to callers: precondition violations (the save
//! cannot even be attempted), validation failures (a named rule rejected the
//! input), and uniqueness conflicts (storage refused the write; retry with
//! different input).

use thiserror::Error;

/// A rule that rejected an entity before anything was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error(
    "a document titled {title:?} by {first_name} {last_name} already exists in \
     library {library_id}"
  )]
  DuplicateDocument {
    library_id: i64,
    title:      String,
    first_name: String,
    last_name:  String,
  },

  #[error("a document offered for sale must have a price")]
  PriceRequiredForSale,

  #[error("partial access requires the number of preview pages")]
  PreviewPagesRequired,

  #[error("registration number must not be blank")]
  EmptyNumber,

  #[error("document title must not be blank")]
  EmptyTitle,

  #[error("membership id must not be blank")]
  EmptyMembershipId,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Preconditions ─────────────────────────────────────────────────────

  #[error("copy refers to document {0}, which does not exist")]
  CopyWithoutDocument(i64),

  #[error("document {0} has no library")]
  DocumentWithoutLibrary(i64),

  #[error("placement mismatch: {0}")]
  PlacementMismatch(String),

  #[error("copy {copy_id} is not available (status: {status})")]
  CopyUnavailable { copy_id: i64, status: String },

  #[error("member {member_id} is not active (status: {status})")]
  MemberNotActive { member_id: i64, status: String },

  #[error("loan {0} is already returned")]
  LoanAlreadyReturned(i64),

  #[error("reservation {0} is not active")]
  ReservationNotActive(i64),

  // ── Validation ────────────────────────────────────────────────────────

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  // ── Storage-level ─────────────────────────────────────────────────────

  /// A uniqueness constraint refused the write, e.g. a duplicate
  /// `(number, library)` pair or a colliding location code.
  #[error("uniqueness conflict on {constraint}")]
  Conflict { constraint: String },

  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },

  #[error("label rendering failed: {0}")]
  Label(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
    Self::NotFound { kind, id: id.to_string() }
  }

  /// Whether the caller may retry the same operation with different input.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Conflict { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_conflicts_are_retryable() {
    let conflict = Error::Conflict { constraint: "copies.location_code".into() };
    assert!(conflict.is_retryable());
    assert!(!Error::DocumentWithoutLibrary(4).is_retryable());
    assert!(!Error::from(ValidationError::EmptyTitle).is_retryable());
  }

  #[test]
  fn validation_error_names_the_rule() {
    let err = Error::from(ValidationError::PriceRequiredForSale);
    assert_eq!(
      err.to_string(),
      "validation failed: a document offered for sale must have a price"
    );
  }
}
