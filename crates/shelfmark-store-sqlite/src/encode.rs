//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! `YYYY-MM-DD`. Status enums are stored under their snake_case names.
//! Bibliographic details are stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use shelfmark_core::{
  catalog::{Author, Document, DocumentAccess},
  circulation::{Loan, Reservation},
  copy::RegistrationNumber,
  label::Artifact,
  location::{Library, LocationCode},
  member::{Account, Member, MemberProfile},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `COLUMNS` constant lists the columns its `from_row` reads, in order.

/// Raw values read directly from a `libraries` row.
pub struct RawLibrary {
  pub library_id:  i64,
  pub name:        String,
  pub address:     Option<String>,
  pub province_id: Option<i64>,
  pub region_id:   Option<i64>,
  pub city_id:     Option<i64>,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawLibrary {
  pub const COLUMNS: &'static str = "library_id, name, address, province_id, region_id, city_id, \
                             phone, email, description, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      library_id:  row.get(0)?,
      name:        row.get(1)?,
      address:     row.get(2)?,
      province_id: row.get(3)?,
      region_id:   row.get(4)?,
      city_id:     row.get(5)?,
      phone:       row.get(6)?,
      email:       row.get(7)?,
      description: row.get(8)?,
      created_at:  row.get(9)?,
    })
  }

  pub fn into_library(self) -> Result<Library> {
    Ok(Library {
      library_id:  self.library_id,
      name:        self.name,
      address:     self.address,
      province_id: self.province_id,
      region_id:   self.region_id,
      city_id:     self.city_id,
      phone:       self.phone,
      email:       self.email,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `authors` row.
pub struct RawAuthor {
  pub author_id:  i64,
  pub first_name: String,
  pub last_name:  String,
  pub birth_date: Option<String>,
  pub death_date: Option<String>,
}

impl RawAuthor {
  pub const COLUMNS: &'static str = "author_id, first_name, last_name, birth_date, death_date";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      author_id:  row.get(0)?,
      first_name: row.get(1)?,
      last_name:  row.get(2)?,
      birth_date: row.get(3)?,
      death_date: row.get(4)?,
    })
  }

  pub fn into_author(self) -> Result<Author> {
    Ok(Author {
      author_id:  self.author_id,
      first_name: self.first_name,
      last_name:  self.last_name,
      birth_date: decode_opt_date(self.birth_date)?,
      death_date: decode_opt_date(self.death_date)?,
    })
  }
}

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:     i64,
  pub library_id:      i64,
  pub author_id:       Option<i64>,
  pub title:           String,
  pub document_type:   String,
  pub reference_type:  String,
  pub language:        String,
  pub record_number:   u32,
  pub document_number: Option<u32>,
  pub details_json:    String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawDocument {
  pub const COLUMNS: &'static str = "document_id, library_id, author_id, title, document_type, \
                             reference_type, language, record_number, document_number, \
                             details_json, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:     row.get(0)?,
      library_id:      row.get(1)?,
      author_id:       row.get(2)?,
      title:           row.get(3)?,
      document_type:   row.get(4)?,
      reference_type:  row.get(5)?,
      language:        row.get(6)?,
      record_number:   row.get(7)?,
      document_number: row.get(8)?,
      details_json:    row.get(9)?,
      created_at:      row.get(10)?,
      updated_at:      row.get(11)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:     self.document_id,
      library_id:      self.library_id,
      author_id:       self.author_id,
      title:           self.title,
      document_type:   decode_enum("document type", &self.document_type)?,
      reference_type:  decode_enum("reference type", &self.reference_type)?,
      language:        decode_enum("language", &self.language)?,
      record_number:   self.record_number,
      document_number: self.document_number,
      details:         serde_json::from_str(&self.details_json)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `document_access` row.
pub struct RawDocumentAccess {
  pub document_id:   i64,
  pub access_type:   String,
  pub preview_pages: Option<u32>,
  pub is_for_sale:   bool,
  pub price:         Option<i64>,
}

impl RawDocumentAccess {
  pub const COLUMNS: &'static str = "document_id, access_type, preview_pages, is_for_sale, price";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:   row.get(0)?,
      access_type:   row.get(1)?,
      preview_pages: row.get(2)?,
      is_for_sale:   row.get(3)?,
      price:         row.get(4)?,
    })
  }

  pub fn into_access(self) -> Result<DocumentAccess> {
    Ok(DocumentAccess {
      document_id:   self.document_id,
      access_type:   decode_enum("access type", &self.access_type)?,
      preview_pages: self.preview_pages,
      is_for_sale:   self.is_for_sale,
      price:         self.price,
    })
  }
}

/// Raw values read directly from a `copies` row.
pub struct RawCopy {
  pub copy_id:       i64,
  pub document_id:   i64,
  pub library_id:    i64,
  pub number:        String,
  pub status:        String,
  pub floor_id:      Option<i64>,
  pub section_id:    Option<i64>,
  pub location_code: String,
  pub label:         Option<String>,
  pub created_at:    String,
}

impl RawCopy {
  pub const COLUMNS: &'static str = "copy_id, document_id, library_id, number, status, floor_id, \
                             section_id, location_code, label, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      copy_id:       row.get(0)?,
      document_id:   row.get(1)?,
      library_id:    row.get(2)?,
      number:        row.get(3)?,
      status:        row.get(4)?,
      floor_id:      row.get(5)?,
      section_id:    row.get(6)?,
      location_code: row.get(7)?,
      label:         row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_copy(self) -> Result<RegistrationNumber> {
    Ok(RegistrationNumber {
      copy_id:       self.copy_id,
      document_id:   self.document_id,
      library_id:    self.library_id,
      number:        self.number,
      status:        decode_enum("copy status", &self.status)?,
      floor_id:      self.floor_id,
      section_id:    self.section_id,
      location_code: LocationCode::from(self.location_code),
      label:         self.label,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from `members` joined with `accounts`.
pub struct RawMember {
  pub account_id:       i64,
  pub username:         String,
  pub email:            Option<String>,
  pub created_at:       String,
  pub membership_id:    String,
  pub library_id:       Option<i64>,
  pub first_name:       String,
  pub last_name:        String,
  pub member_type:      String,
  pub status:           String,
  pub join_date:        String,
  pub phone:            Option<String>,
  pub national_code:    Option<String>,
  pub student_id:       Option<String>,
  pub personnel_number: Option<String>,
}

impl RawMember {
  pub const COLUMNS: &'static str = "a.account_id, a.username, a.email, a.created_at, m.membership_id, \
                             m.library_id, m.first_name, m.last_name, m.member_type, m.status, \
                             m.join_date, m.phone, m.national_code, m.student_id, \
                             m.personnel_number";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:       row.get(0)?,
      username:         row.get(1)?,
      email:            row.get(2)?,
      created_at:       row.get(3)?,
      membership_id:    row.get(4)?,
      library_id:       row.get(5)?,
      first_name:       row.get(6)?,
      last_name:        row.get(7)?,
      member_type:      row.get(8)?,
      status:           row.get(9)?,
      join_date:        row.get(10)?,
      phone:            row.get(11)?,
      national_code:    row.get(12)?,
      student_id:       row.get(13)?,
      personnel_number: row.get(14)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      account: Account {
        account_id: self.account_id,
        username:   self.username,
        email:      self.email,
        created_at: decode_dt(&self.created_at)?,
      },
      profile: MemberProfile {
        membership_id:    self.membership_id,
        library_id:       self.library_id,
        first_name:       self.first_name,
        last_name:        self.last_name,
        member_type:      decode_enum("member type", &self.member_type)?,
        status:           decode_enum("member status", &self.status)?,
        join_date:        decode_date(&self.join_date)?,
        phone:            self.phone,
        national_code:    self.national_code,
        student_id:       self.student_id,
        personnel_number: self.personnel_number,
      },
    })
  }
}

/// Raw values read directly from a `loans` row.
pub struct RawLoan {
  pub loan_id:          i64,
  pub copy_id:          i64,
  pub document_id:      i64,
  pub member_id:        i64,
  pub loan_date:        String,
  pub due_date:         String,
  pub return_date:      Option<String>,
  pub is_returned:      bool,
  pub debt:             i64,
  pub financial_status: String,
  pub status:           String,
}

impl RawLoan {
  pub const COLUMNS: &'static str = "loan_id, copy_id, document_id, member_id, loan_date, due_date, \
                             return_date, is_returned, debt, financial_status, status";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      loan_id:          row.get(0)?,
      copy_id:          row.get(1)?,
      document_id:      row.get(2)?,
      member_id:        row.get(3)?,
      loan_date:        row.get(4)?,
      due_date:         row.get(5)?,
      return_date:      row.get(6)?,
      is_returned:      row.get(7)?,
      debt:             row.get(8)?,
      financial_status: row.get(9)?,
      status:           row.get(10)?,
    })
  }

  pub fn into_loan(self) -> Result<Loan> {
    Ok(Loan {
      loan_id:          self.loan_id,
      copy_id:          self.copy_id,
      document_id:      self.document_id,
      member_id:        self.member_id,
      loan_date:        decode_date(&self.loan_date)?,
      due_date:         decode_date(&self.due_date)?,
      return_date:      decode_opt_date(self.return_date)?,
      is_returned:      self.is_returned,
      debt:             self.debt,
      financial_status: decode_enum("financial status", &self.financial_status)?,
      status:           decode_enum("loan status", &self.status)?,
    })
  }
}

/// Raw values read directly from a `reservations` row.
pub struct RawReservation {
  pub reservation_id:     i64,
  pub member_id:          i64,
  pub document_id:        i64,
  pub reservation_date:   String,
  pub reservation_expiry: String,
  pub status:             String,
}

impl RawReservation {
  pub const COLUMNS: &'static str = "reservation_id, member_id, document_id, reservation_date, \
                             reservation_expiry, status";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reservation_id:     row.get(0)?,
      member_id:          row.get(1)?,
      document_id:        row.get(2)?,
      reservation_date:   row.get(3)?,
      reservation_expiry: row.get(4)?,
      status:             row.get(5)?,
    })
  }

  pub fn into_reservation(self) -> Result<Reservation> {
    Ok(Reservation {
      reservation_id:     self.reservation_id,
      member_id:          self.member_id,
      document_id:        self.document_id,
      reservation_date:   decode_dt(&self.reservation_date)?,
      reservation_expiry: decode_dt(&self.reservation_expiry)?,
      status:             decode_enum("reservation status", &self.status)?,
    })
  }
}

/// Raw values read directly from an `artifacts` row.
pub struct RawArtifact {
  pub name:         String,
  pub media_type:   String,
  pub content:      Vec<u8>,
  pub content_hash: String,
  pub created_at:   String,
}

impl RawArtifact {
  pub const COLUMNS: &'static str = "name, media_type, content, content_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      name:         row.get(0)?,
      media_type:   row.get(1)?,
      content:      row.get(2)?,
      content_hash: row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_artifact(self) -> Result<Artifact> {
    Ok(Artifact {
      name:         self.name,
      media_type:   self.media_type,
      content:      self.content,
      content_hash: self.content_hash,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
