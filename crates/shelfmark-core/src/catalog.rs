//! Catalog: documents, their authors, and their access/sale policy.
//!
//! Two rules run on every document save: the duplicate guard (no two
//! documents in one library share a title and an author's name) and
//! record-number assignment (an unset number becomes the highest issued so
//! far plus one).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ValidationError;

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
  #[default]
  Book,
  Thesis,
  DoctoralThesis,
  Article,
  Deed,
  Project,
  Report,
  Multimedia,
  Other,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceType {
  Reference,
  #[default]
  NonReference,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Language {
  #[default]
  Persian,
  Latin,
}

/// The part the author played in producing the document.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContributorRole {
  #[default]
  Translator,
  Compiler,
  Editor,
  Supervisor,
  Advisor,
  ThesisWriter,
  Singer,
  Programmer,
  Producer,
  Actor,
  Illustrator,
  Photographer,
}

// ─── Authors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub author_id:  i64,
  pub first_name: String,
  pub last_name:  String,
  pub birth_date: Option<NaiveDate>,
  pub death_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuthor {
  pub first_name: String,
  pub last_name:  String,
  pub birth_date: Option<NaiveDate>,
  pub death_date: Option<NaiveDate>,
}

impl NewAuthor {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self {
      first_name: first_name.into(),
      last_name:  last_name.into(),
      birth_date: None,
      death_date: None,
    }
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Classification marks; every scheme is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
  pub lcc:            Option<String>,
  pub lcc_main_class: Option<String>,
  pub cutter_number:  Option<String>,
  pub nlm:            Option<String>,
  pub dewey:          Option<String>,
}

/// Descriptive fields with no behaviour attached. Stored as one JSON column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibliographicDetails {
  pub sub_title:              Option<String>,
  pub uniform_title:          Option<String>,
  pub role:                   Option<ContributorRole>,
  pub other_contributors:     Option<String>,
  pub publication_year:       Option<u32>,
  pub publication_place:      Option<String>,
  pub publisher:              Option<String>,
  pub isbn:                   Option<String>,
  pub pages:                  Option<String>,
  pub edition:                Option<String>,
  pub main_entry:             Option<String>,
  pub added_entries:          Vec<String>,
  pub subject:                Option<String>,
  pub description:            Option<String>,
  pub classification:         Classification,
  pub previous_registrations: Option<String>,
  pub cataloger:              Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:     i64,
  pub library_id:      i64,
  pub author_id:       Option<i64>,
  pub title:           String,
  pub document_type:   DocumentType,
  pub reference_type:  ReferenceType,
  pub language:        Language,
  /// Catalog-wide unique, assigned from a monotonic sequence when unset.
  pub record_number:   u32,
  pub document_number: Option<u32>,
  pub details:         BibliographicDetails,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to both [`crate::store::LibraryStore::add_document`] and
/// [`crate::store::LibraryStore::update_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
  pub library_id:      i64,
  pub author_id:       Option<i64>,
  pub title:           String,
  pub document_type:   DocumentType,
  pub reference_type:  ReferenceType,
  pub language:        Language,
  /// Leave unset to take the next number from the catalog sequence.
  pub record_number:   Option<u32>,
  pub document_number: Option<u32>,
  pub details:         BibliographicDetails,
}

impl NewDocument {
  pub fn new(library_id: i64, title: impl Into<String>) -> Self {
    Self {
      library_id,
      author_id: None,
      title: title.into(),
      document_type: DocumentType::default(),
      reference_type: ReferenceType::default(),
      language: Language::default(),
      record_number: None,
      document_number: None,
      details: BibliographicDetails::default(),
    }
  }

  pub fn by(mut self, author_id: i64) -> Self {
    self.author_id = Some(author_id);
    self
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::EmptyTitle);
    }
    Ok(())
  }
}

// ─── Duplicate guard ─────────────────────────────────────────────────────────

/// The fields the duplicate guard compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogKey {
  /// `None` for a document that has not been saved yet.
  pub document_id: Option<i64>,
  pub library_id:  i64,
  pub title:       String,
  /// `(first_name, last_name)` of the document's author, if any.
  pub author:      Option<(String, String)>,
}

/// Reject `candidate` if any other entry in `existing` has the same library,
/// title and author name. A candidate without an author is never a duplicate.
/// The candidate's own saved row is skipped, so re-saving is not a conflict.
pub fn guard_duplicate<'a>(
  candidate: &CatalogKey,
  existing: impl IntoIterator<Item = &'a CatalogKey>,
) -> Result<(), ValidationError> {
  let Some((first, last)) = &candidate.author else {
    return Ok(());
  };

  let clash = existing.into_iter().any(|other| {
    let is_self = candidate.document_id.is_some() && other.document_id == candidate.document_id;
    !is_self
      && other.library_id == candidate.library_id
      && other.title == candidate.title
      && other.author == candidate.author
  });

  if clash {
    return Err(ValidationError::DuplicateDocument {
      library_id: candidate.library_id,
      title:      candidate.title.clone(),
      first_name: first.clone(),
      last_name:  last.clone(),
    });
  }
  Ok(())
}

/// The record number that follows `highest_issued`; `1` for an empty catalog.
/// `None` once the number space is used up.
pub fn next_record_number(highest_issued: Option<u32>) -> Option<u32> {
  match highest_issued {
    Some(n) => n.checked_add(1),
    None => Some(1),
  }
}

// ─── Access policy ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessType {
  Full,
  Partial,
  #[default]
  Restricted,
}

/// Preview and sale policy of a document's electronic file. One per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAccess {
  pub document_id:   i64,
  pub access_type:   AccessType,
  pub preview_pages: Option<u32>,
  pub is_for_sale:   bool,
  /// Sale price in minor currency units.
  pub price:         Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocumentAccess {
  pub access_type:   AccessType,
  pub preview_pages: Option<u32>,
  pub is_for_sale:   bool,
  pub price:         Option<i64>,
}

impl NewDocumentAccess {
  /// A zero price or zero preview pages count as missing.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.is_for_sale && self.price.unwrap_or(0) == 0 {
      return Err(ValidationError::PriceRequiredForSale);
    }
    if self.access_type == AccessType::Partial && self.preview_pages.unwrap_or(0) == 0 {
      return Err(ValidationError::PreviewPagesRequired);
    }
    Ok(())
  }
}
