//! Synchronous queries run on the connection thread.
//!
//! Everything here takes a plain `&Connection` so the same helpers serve
//! one-shot reads and the steps of a transactional save path (a
//! `Transaction` derefs to its connection).

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Params, Row, params};
use sha2::{Digest, Sha256};
use shelfmark_core::{
  Error as CoreError,
  catalog::{Author, CatalogKey, Document, DocumentAccess, next_record_number},
  circulation::{Loan, Reservation},
  copy::{CopyContext, RegistrationNumber},
  label::Artifact,
  location::{City, Library, LibraryFloor, LibrarySection, Province, Region},
  member::Member,
};

use crate::{
  Result,
  encode::{
    RawArtifact, RawAuthor, RawCopy, RawDocument, RawDocumentAccess, RawLibrary, RawLoan,
    RawMember, RawReservation, encode_date, encode_dt,
  },
};

// ─── Plumbing ────────────────────────────────────────────────────────────────

fn query_one<T>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
  Ok(conn.query_row(sql, params, map).optional()?)
}

pub fn query_all<T>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, map)?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Location registry ───────────────────────────────────────────────────────

pub fn province(conn: &Connection, province_id: i64) -> Result<Option<Province>> {
  query_one(
    conn,
    "SELECT province_id, code, name FROM provinces WHERE province_id = ?1",
    params![province_id],
    |r| Ok(Province { province_id: r.get(0)?, code: r.get(1)?, name: r.get(2)? }),
  )
}

pub fn region(conn: &Connection, region_id: i64) -> Result<Option<Region>> {
  query_one(
    conn,
    "SELECT region_id, code, name FROM regions WHERE region_id = ?1",
    params![region_id],
    |r| Ok(Region { region_id: r.get(0)?, code: r.get(1)?, name: r.get(2)? }),
  )
}

pub fn city(conn: &Connection, city_id: i64) -> Result<Option<City>> {
  query_one(
    conn,
    "SELECT city_id, code, name, province_id, region_id FROM cities WHERE city_id = ?1",
    params![city_id],
    |r| {
      Ok(City {
        city_id:     r.get(0)?,
        code:        r.get(1)?,
        name:        r.get(2)?,
        province_id: r.get(3)?,
        region_id:   r.get(4)?,
      })
    },
  )
}

pub fn library(conn: &Connection, library_id: i64) -> Result<Option<Library>> {
  let sql = format!("SELECT {} FROM libraries WHERE library_id = ?1", RawLibrary::COLUMNS);
  query_one(conn, &sql, params![library_id], RawLibrary::from_row)?
    .map(RawLibrary::into_library)
    .transpose()
}

fn floor_from_row(r: &Row<'_>) -> rusqlite::Result<LibraryFloor> {
  Ok(LibraryFloor {
    floor_id:   r.get(0)?,
    library_id: r.get(1)?,
    floor_code: r.get(2)?,
    floor_name: r.get(3)?,
  })
}

fn section_from_row(r: &Row<'_>) -> rusqlite::Result<LibrarySection> {
  Ok(LibrarySection {
    section_id:   r.get(0)?,
    floor_id:     r.get(1)?,
    section_code: r.get(2)?,
    section_name: r.get(3)?,
  })
}

pub fn floor(conn: &Connection, floor_id: i64) -> Result<Option<LibraryFloor>> {
  query_one(
    conn,
    "SELECT floor_id, library_id, floor_code, floor_name FROM library_floors WHERE floor_id = ?1",
    params![floor_id],
    floor_from_row,
  )
}

pub fn floors(conn: &Connection, library_id: i64) -> Result<Vec<LibraryFloor>> {
  query_all(
    conn,
    "SELECT floor_id, library_id, floor_code, floor_name FROM library_floors
     WHERE library_id = ?1 ORDER BY floor_id",
    params![library_id],
    floor_from_row,
  )
}

pub fn section(conn: &Connection, section_id: i64) -> Result<Option<LibrarySection>> {
  query_one(
    conn,
    "SELECT section_id, floor_id, section_code, section_name FROM library_sections
     WHERE section_id = ?1",
    params![section_id],
    section_from_row,
  )
}

pub fn sections(conn: &Connection, floor_id: i64) -> Result<Vec<LibrarySection>> {
  query_all(
    conn,
    "SELECT section_id, floor_id, section_code, section_name FROM library_sections
     WHERE floor_id = ?1 ORDER BY section_id",
    params![floor_id],
    section_from_row,
  )
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub fn author(conn: &Connection, author_id: i64) -> Result<Option<Author>> {
  let sql = format!("SELECT {} FROM authors WHERE author_id = ?1", RawAuthor::COLUMNS);
  query_one(conn, &sql, params![author_id], RawAuthor::from_row)?
    .map(RawAuthor::into_author)
    .transpose()
}

pub fn document(conn: &Connection, document_id: i64) -> Result<Option<Document>> {
  let sql = format!("SELECT {} FROM documents WHERE document_id = ?1", RawDocument::COLUMNS);
  query_one(conn, &sql, params![document_id], RawDocument::from_row)?
    .map(RawDocument::into_document)
    .transpose()
}

pub fn documents(conn: &Connection, library_id: Option<i64>) -> Result<Vec<Document>> {
  let sql = format!(
    "SELECT {} FROM documents WHERE (?1 IS NULL OR library_id = ?1) ORDER BY record_number",
    RawDocument::COLUMNS
  );
  query_all(conn, &sql, params![library_id], RawDocument::from_row)?
    .into_iter()
    .map(RawDocument::into_document)
    .collect()
}

/// Duplicate-guard keys of every document in `library_id` titled `title`.
pub fn catalog_keys(conn: &Connection, library_id: i64, title: &str) -> Result<Vec<CatalogKey>> {
  query_all(
    conn,
    "SELECT d.document_id, d.library_id, d.title, a.first_name, a.last_name
     FROM documents d LEFT JOIN authors a ON a.author_id = d.author_id
     WHERE d.library_id = ?1 AND d.title = ?2",
    params![library_id, title],
    |r| {
      let first: Option<String> = r.get(3)?;
      let last: Option<String> = r.get(4)?;
      Ok(CatalogKey {
        document_id: Some(r.get(0)?),
        library_id:  r.get(1)?,
        title:       r.get(2)?,
        author:      first.zip(last),
      })
    },
  )
}

/// Issue a record number inside the caller's transaction.
///
/// With no `requested` number (or `0`) the next one follows the highest ever
/// issued. A requested number is taken as-is and raises the counter if it is
/// higher.
pub fn issue_record_number(conn: &Connection, requested: Option<u32>) -> Result<u32> {
  let highest: Option<u32> = query_one(
    conn,
    "SELECT value FROM sequences WHERE name = 'record_number'",
    [],
    |r| r.get(0),
  )?
  .filter(|value| *value > 0);

  let number = match requested.filter(|n| *n > 0) {
    Some(n) => n,
    None => next_record_number(highest).ok_or_else(|| CoreError::Conflict {
      constraint: "documents.record_number".into(),
    })?,
  };
  conn.execute(
    "UPDATE sequences SET value = MAX(value, ?1) WHERE name = 'record_number'",
    params![number],
  )?;
  Ok(number)
}

pub fn access(conn: &Connection, document_id: i64) -> Result<Option<DocumentAccess>> {
  let sql = format!(
    "SELECT {} FROM document_access WHERE document_id = ?1",
    RawDocumentAccess::COLUMNS
  );
  query_one(conn, &sql, params![document_id], RawDocumentAccess::from_row)?
    .map(RawDocumentAccess::into_access)
    .transpose()
}

// ─── Copy ledger ─────────────────────────────────────────────────────────────

pub fn copy(conn: &Connection, copy_id: i64) -> Result<Option<RegistrationNumber>> {
  let sql = format!("SELECT {} FROM copies WHERE copy_id = ?1", RawCopy::COLUMNS);
  query_one(conn, &sql, params![copy_id], RawCopy::from_row)?
    .map(RawCopy::into_copy)
    .transpose()
}

pub fn copy_by_location_code(
  conn: &Connection,
  location_code: &str,
) -> Result<Option<RegistrationNumber>> {
  let sql = format!("SELECT {} FROM copies WHERE location_code = ?1", RawCopy::COLUMNS);
  query_one(conn, &sql, params![location_code], RawCopy::from_row)?
    .map(RawCopy::into_copy)
    .transpose()
}

pub fn copies(conn: &Connection, document_id: i64) -> Result<Vec<RegistrationNumber>> {
  let sql = format!(
    "SELECT {} FROM copies WHERE document_id = ?1 ORDER BY copy_id",
    RawCopy::COLUMNS
  );
  query_all(conn, &sql, params![document_id], RawCopy::from_row)?
    .into_iter()
    .map(RawCopy::into_copy)
    .collect()
}

/// The registry records a copy's save path reads, owned so a
/// [`CopyContext`] can borrow them.
pub struct CopyRecords {
  pub document: Document,
  pub library:  Option<Library>,
  pub province: Option<Province>,
  pub region:   Option<Region>,
  pub city:     Option<City>,
  pub floor:    Option<LibraryFloor>,
  pub section:  Option<LibrarySection>,
}

impl CopyRecords {
  pub fn context(&self) -> CopyContext<'_> {
    CopyContext {
      document: &self.document,
      library:  self.library.as_ref(),
      province: self.province.as_ref(),
      region:   self.region.as_ref(),
      city:     self.city.as_ref(),
      floor:    self.floor.as_ref(),
      section:  self.section.as_ref(),
    }
  }
}

/// Resolve the document, its library with the library's area codes, and the
/// chosen floor and section.
pub fn copy_records(
  conn: &Connection,
  document_id: i64,
  floor_id: Option<i64>,
  section_id: Option<i64>,
) -> Result<CopyRecords> {
  let document = document(conn, document_id)?.ok_or(CoreError::CopyWithoutDocument(document_id))?;
  let library = library(conn, document.library_id)?;

  let (province, region, city) = match &library {
    Some(l) => (
      l.province_id.map(|id| province(conn, id)).transpose()?.flatten(),
      l.region_id.map(|id| region(conn, id)).transpose()?.flatten(),
      l.city_id.map(|id| city(conn, id)).transpose()?.flatten(),
    ),
    None => (None, None, None),
  };

  let floor = match floor_id {
    Some(id) => Some(floor(conn, id)?.ok_or_else(|| CoreError::not_found("floor", id))?),
    None => None,
  };
  let section = match section_id {
    Some(id) => Some(section(conn, id)?.ok_or_else(|| CoreError::not_found("section", id))?),
    None => None,
  };

  Ok(CopyRecords { document, library, province, region, city, floor, section })
}

// ─── Members ─────────────────────────────────────────────────────────────────

pub fn member(conn: &Connection, member_id: i64) -> Result<Option<Member>> {
  let sql = format!(
    "SELECT {} FROM members m JOIN accounts a ON a.account_id = m.account_id
     WHERE m.account_id = ?1",
    RawMember::COLUMNS
  );
  query_one(conn, &sql, params![member_id], RawMember::from_row)?
    .map(RawMember::into_member)
    .transpose()
}

// ─── Circulation ─────────────────────────────────────────────────────────────

pub fn loan(conn: &Connection, loan_id: i64) -> Result<Option<Loan>> {
  let sql = format!("SELECT {} FROM loans WHERE loan_id = ?1", RawLoan::COLUMNS);
  query_one(conn, &sql, params![loan_id], RawLoan::from_row)?
    .map(RawLoan::into_loan)
    .transpose()
}

/// Write back a loan's mutable columns.
pub fn save_loan(conn: &Connection, loan: &Loan) -> Result<()> {
  conn.execute(
    "UPDATE loans SET due_date = ?1, return_date = ?2, is_returned = ?3, debt = ?4,
       financial_status = ?5, status = ?6
     WHERE loan_id = ?7",
    params![
      encode_date(loan.due_date),
      loan.return_date.map(encode_date),
      loan.is_returned,
      loan.debt,
      loan.financial_status.as_ref(),
      loan.status.as_ref(),
      loan.loan_id,
    ],
  )?;
  Ok(())
}

pub fn reservation(conn: &Connection, reservation_id: i64) -> Result<Option<Reservation>> {
  let sql = format!(
    "SELECT {} FROM reservations WHERE reservation_id = ?1",
    RawReservation::COLUMNS
  );
  query_one(conn, &sql, params![reservation_id], RawReservation::from_row)?
    .map(RawReservation::into_reservation)
    .transpose()
}

pub fn active_reservations(conn: &Connection) -> Result<Vec<Reservation>> {
  let sql = format!(
    "SELECT {} FROM reservations WHERE status = 'active' ORDER BY reservation_id",
    RawReservation::COLUMNS
  );
  query_all(conn, &sql, [], RawReservation::from_row)?
    .into_iter()
    .map(RawReservation::into_reservation)
    .collect()
}

pub fn save_reservation_status(conn: &Connection, reservation: &Reservation) -> Result<()> {
  conn.execute(
    "UPDATE reservations SET status = ?1 WHERE reservation_id = ?2",
    params![reservation.status.as_ref(), reservation.reservation_id],
  )?;
  Ok(())
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

pub fn artifact(conn: &Connection, name: &str) -> Result<Option<Artifact>> {
  let sql = format!("SELECT {} FROM artifacts WHERE name = ?1", RawArtifact::COLUMNS);
  query_one(conn, &sql, params![name], RawArtifact::from_row)?
    .map(RawArtifact::into_artifact)
    .transpose()
}

/// Insert or replace a named blob, recording its SHA-256.
pub fn store_artifact(
  conn: &Connection,
  name: &str,
  media_type: &str,
  content: Vec<u8>,
  now: DateTime<Utc>,
) -> Result<Artifact> {
  let mut hasher = Sha256::new();
  hasher.update(&content);
  let content_hash = hex::encode(hasher.finalize());
  conn.execute(
    "INSERT INTO artifacts (name, media_type, content, content_hash, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(name) DO UPDATE SET
       media_type = excluded.media_type,
       content = excluded.content,
       content_hash = excluded.content_hash,
       created_at = excluded.created_at",
    params![name, media_type, content, content_hash, encode_dt(now)],
  )?;
  Ok(Artifact {
    name: name.to_owned(),
    media_type: media_type.to_owned(),
    content,
    content_hash,
    created_at: now,
  })
}

pub fn remove_artifact(conn: &Connection, name: &str) -> Result<bool> {
  Ok(conn.execute("DELETE FROM artifacts WHERE name = ?1", params![name])? > 0)
}
