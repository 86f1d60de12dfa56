//! The `LibraryStore` trait: durable records plus named artifacts.
//!
//! The trait is implemented by storage backends (e.g.
//! `shelfmark-store-sqlite`). Each save method is one atomic write: the
//! backend resolves what it needs, runs the pure rules from this crate, and
//! either commits everything or nothing.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  catalog::{Author, Document, DocumentAccess, NewAuthor, NewDocument, NewDocumentAccess},
  circulation::{Loan, LoanQuery, NewLoan, NewReservation, Reservation},
  copy::{CopyChanges, NewCopy, RegistrationNumber},
  label::{Artifact, NewArtifact},
  location::{
    City, Library, LibraryFloor, LibrarySection, NewArea, NewCity, NewFloor,
    NewLibrary, NewSection, Province, Region,
  },
  member::{Member, MemberStatus, NewMember},
};

/// Abstraction over a Shelfmark storage backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait LibraryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Location registry ─────────────────────────────────────────────────

  fn add_province(
    &self,
    input: NewArea,
  ) -> impl Future<Output = Result<Province, Self::Error>> + Send + '_;

  fn add_region(
    &self,
    input: NewArea,
  ) -> impl Future<Output = Result<Region, Self::Error>> + Send + '_;

  fn add_city(
    &self,
    input: NewCity,
  ) -> impl Future<Output = Result<City, Self::Error>> + Send + '_;

  /// Register a library under its caller-chosen `library_id`.
  fn add_library(
    &self,
    input: NewLibrary,
  ) -> impl Future<Output = Result<Library, Self::Error>> + Send + '_;

  fn get_library(
    &self,
    library_id: i64,
  ) -> impl Future<Output = Result<Option<Library>, Self::Error>> + Send + '_;

  fn add_floor(
    &self,
    input: NewFloor,
  ) -> impl Future<Output = Result<LibraryFloor, Self::Error>> + Send + '_;

  fn list_floors(
    &self,
    library_id: i64,
  ) -> impl Future<Output = Result<Vec<LibraryFloor>, Self::Error>> + Send + '_;

  fn add_section(
    &self,
    input: NewSection,
  ) -> impl Future<Output = Result<LibrarySection, Self::Error>> + Send + '_;

  fn list_sections(
    &self,
    floor_id: i64,
  ) -> impl Future<Output = Result<Vec<LibrarySection>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn add_author(
    &self,
    input: NewAuthor,
  ) -> impl Future<Output = Result<Author, Self::Error>> + Send + '_;

  /// Create a document. Runs the duplicate guard and, when
  /// `record_number` is unset, takes the next number from the catalog
  /// sequence, all inside the insert's transaction.
  fn add_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Replace a document's fields. The duplicate guard runs again, excluding
  /// the document itself; an unset `record_number` keeps the stored one.
  /// Moving the document to another library moves its copies with it.
  fn update_document(
    &self,
    document_id: i64,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  fn get_document(
    &self,
    document_id: i64,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// List documents, optionally restricted to one library.
  fn list_documents(
    &self,
    library_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Create or replace the access policy of a document, after validation.
  fn set_access_policy(
    &self,
    document_id: i64,
    input: NewDocumentAccess,
  ) -> impl Future<Output = Result<DocumentAccess, Self::Error>> + Send + '_;

  fn get_access_policy(
    &self,
    document_id: i64,
  ) -> impl Future<Output = Result<Option<DocumentAccess>, Self::Error>> + Send + '_;

  // ── Copy ledger ───────────────────────────────────────────────────────

  /// Register a physical copy: inherit the document's library, trim the
  /// number, write the label, fix the location code, write the row.
  fn register_copy(
    &self,
    input: NewCopy,
  ) -> impl Future<Output = Result<RegistrationNumber, Self::Error>> + Send + '_;

  /// Apply `changes` and re-run the save path. The location code is never
  /// regenerated.
  fn update_copy(
    &self,
    copy_id: i64,
    changes: CopyChanges,
  ) -> impl Future<Output = Result<RegistrationNumber, Self::Error>> + Send + '_;

  fn get_copy(
    &self,
    copy_id: i64,
  ) -> impl Future<Output = Result<Option<RegistrationNumber>, Self::Error>> + Send + '_;

  fn find_copy_by_location_code<'a>(
    &'a self,
    location_code: &'a str,
  ) -> impl Future<Output = Result<Option<RegistrationNumber>, Self::Error>> + Send + 'a;

  fn list_copies(
    &self,
    document_id: i64,
  ) -> impl Future<Output = Result<Vec<RegistrationNumber>, Self::Error>> + Send + '_;

  // ── Members ───────────────────────────────────────────────────────────

  fn add_member(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  fn get_member(
    &self,
    member_id: i64,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn set_member_status(
    &self,
    member_id: i64,
    status: MemberStatus,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  // ── Circulation ───────────────────────────────────────────────────────

  /// Lend an available copy to an active member. The copy becomes loaned.
  fn open_loan(
    &self,
    input: NewLoan,
  ) -> impl Future<Output = Result<Loan, Self::Error>> + Send + '_;

  /// Close a loan (on `return_date`, or today). The copy becomes available.
  fn return_loan(
    &self,
    loan_id: i64,
    return_date: Option<NaiveDate>,
  ) -> impl Future<Output = Result<Loan, Self::Error>> + Send + '_;

  /// Re-save a loan, recomputing its debt against today.
  fn refresh_loan(
    &self,
    loan_id: i64,
  ) -> impl Future<Output = Result<Loan, Self::Error>> + Send + '_;

  fn get_loan(
    &self,
    loan_id: i64,
  ) -> impl Future<Output = Result<Option<Loan>, Self::Error>> + Send + '_;

  fn list_loans<'a>(
    &'a self,
    query: &'a LoanQuery,
  ) -> impl Future<Output = Result<Vec<Loan>, Self::Error>> + Send + 'a;

  fn place_reservation(
    &self,
    input: NewReservation,
  ) -> impl Future<Output = Result<Reservation, Self::Error>> + Send + '_;

  fn get_reservation(
    &self,
    reservation_id: i64,
  ) -> impl Future<Output = Result<Option<Reservation>, Self::Error>> + Send + '_;

  fn cancel_reservation(
    &self,
    reservation_id: i64,
  ) -> impl Future<Output = Result<Reservation, Self::Error>> + Send + '_;

  fn complete_reservation(
    &self,
    reservation_id: i64,
  ) -> impl Future<Output = Result<Reservation, Self::Error>> + Send + '_;

  /// Active reservations whose expiry lies strictly before `as_of`.
  fn expired_reservations(
    &self,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Reservation>, Self::Error>> + Send + '_;

  /// Cancel every reservation [`expired_reservations`] would return.
  /// Nothing calls this implicitly.
  ///
  /// [`expired_reservations`]: LibraryStore::expired_reservations
  fn cancel_expired_reservations(
    &self,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Reservation>, Self::Error>> + Send + '_;

  // ── Artifacts ─────────────────────────────────────────────────────────

  /// Store (or replace) a named blob.
  fn put_artifact(
    &self,
    input: NewArtifact,
  ) -> impl Future<Output = Result<Artifact, Self::Error>> + Send + '_;

  fn get_artifact<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Artifact>, Self::Error>> + Send + 'a;

  /// Returns whether an artifact was removed.
  fn delete_artifact<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
