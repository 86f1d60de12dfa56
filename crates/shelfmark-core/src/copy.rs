//! Copy ledger: registration numbers, one per physical copy.
//!
//! The write-time workflow is split in two. [`prepare_copy`] is pure: given a
//! copy's resolved document, library and placement it checks preconditions,
//! normalises the number, builds the label job, and fixes the location code.
//! The store then renders the label and writes label and row together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  Error, Result,
  catalog::Document,
  error::ValidationError,
  location::{
    City, Library, LibraryFloor, LibrarySection, LocationCode, LocationInputs,
    Province, Region, generate_location_code,
  },
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CopyStatus {
  #[default]
  Available,
  Loaned,
  Lost,
  Weeding,
}

/// One physical copy of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationNumber {
  pub copy_id:       i64,
  pub document_id:   i64,
  /// Always the document's library as of the last save.
  pub library_id:    i64,
  /// Copy sequence within the library; stored trimmed.
  pub number:        String,
  pub status:        CopyStatus,
  pub floor_id:      Option<i64>,
  pub section_id:    Option<i64>,
  /// Frozen at registration.
  pub location_code: LocationCode,
  /// Name of the stored label artifact, if a renderer was configured.
  pub label:         Option<String>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::LibraryStore::register_copy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCopy {
  pub document_id:   i64,
  pub number:        String,
  #[serde(default)]
  pub status:        CopyStatus,
  pub floor_id:      Option<i64>,
  pub section_id:    Option<i64>,
  /// A code carried over from elsewhere (e.g. an import). When unset the
  /// code is generated from the copy's placement.
  pub location_code: Option<LocationCode>,
}

impl NewCopy {
  pub fn new(document_id: i64, number: impl Into<String>) -> Self {
    Self {
      document_id,
      number: number.into(),
      status: CopyStatus::default(),
      floor_id: None,
      section_id: None,
      location_code: None,
    }
  }

  pub fn placed(mut self, floor_id: Option<i64>, section_id: Option<i64>) -> Self {
    self.floor_id = floor_id;
    self.section_id = section_id;
    self
  }
}

/// Edits to an existing copy, passed to
/// [`crate::store::LibraryStore::update_copy`].
///
/// There is no location-code field: a copy's code is fixed when
/// it is registered.
#[derive(Debug, Clone, Default)]
pub struct CopyChanges {
  pub document_id: Option<i64>,
  pub number:      Option<String>,
  pub status:      Option<CopyStatus>,
  /// `Some(None)` clears the floor.
  pub floor_id:    Option<Option<i64>>,
  /// `Some(None)` clears the section.
  pub section_id:  Option<Option<i64>>,
}

// ─── Save-path preparation ───────────────────────────────────────────────────

/// Registry records resolved for a copy being saved.
#[derive(Debug, Clone, Copy)]
pub struct CopyContext<'a> {
  pub document: &'a Document,
  pub library:  Option<&'a Library>,
  pub province: Option<&'a Province>,
  pub region:   Option<&'a Region>,
  pub city:     Option<&'a City>,
  pub floor:    Option<&'a LibraryFloor>,
  pub section:  Option<&'a LibrarySection>,
}

/// A label to render: the human-readable payload and the artifact name stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelJob {
  pub payload: String,
  /// File name without extension; the renderer supplies the extension.
  pub stem:    String,
}

impl LabelJob {
  pub fn file_name(&self, extension: &str) -> String { format!("{}.{extension}", self.stem) }
}

/// Everything a store needs to write the copy row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCopy {
  pub library_id:    i64,
  pub number:        String,
  pub location_code: LocationCode,
  pub label:         LabelJob,
}

/// Run the pure steps of the copy save path, in order:
///
/// 1. the document must have a library;
/// 2. the copy inherits that library;
/// 3. the number is trimmed (and must not be blank);
/// 4. the label payload and name are derived;
/// 5. `existing_code` is kept if present, otherwise a code is generated.
///
/// Placement is also checked: the floor must belong to the library and the
/// section to the floor.
pub fn prepare_copy(
  ctx: &CopyContext<'_>,
  number: &str,
  existing_code: Option<&LocationCode>,
) -> Result<PreparedCopy> {
  let library = ctx
    .library
    .ok_or(Error::DocumentWithoutLibrary(ctx.document.document_id))?;

  let number = normalize_number(number)?;
  check_placement(library.library_id, ctx.floor, ctx.section)?;

  let label = LabelJob {
    payload: label_payload(&ctx.document.title, &number, &library.name),
    stem:    format!("qrcode_{}_{}", ctx.document.document_id, number),
  };

  let location_code = match existing_code {
    Some(code) => code.clone(),
    None => generate_location_code(&LocationInputs::resolve(
      library,
      ctx.province,
      ctx.region,
      ctx.city,
      ctx.floor,
      ctx.section,
      &number,
    )),
  };

  Ok(PreparedCopy {
    library_id: library.library_id,
    number,
    location_code,
    label,
  })
}

/// Trim surrounding whitespace; a blank number is rejected.
pub fn normalize_number(number: &str) -> Result<String, ValidationError> {
  let trimmed = number.trim();
  if trimmed.is_empty() {
    return Err(ValidationError::EmptyNumber);
  }
  Ok(trimmed.to_owned())
}

/// The text encoded into a copy's scannable label.
pub fn label_payload(title: &str, number: &str, library_name: &str) -> String {
  format!("Document: {title} | Registration: {number} | Library: {library_name}")
}

pub fn check_placement(
  library_id: i64,
  floor: Option<&LibraryFloor>,
  section: Option<&LibrarySection>,
) -> Result<()> {
  if let Some(floor) = floor
    && floor.library_id != library_id
  {
    return Err(Error::PlacementMismatch(format!(
      "floor {} belongs to library {}, not {library_id}",
      floor.floor_id, floor.library_id
    )));
  }

  match (floor, section) {
    (None, Some(section)) => Err(Error::PlacementMismatch(format!(
      "section {} chosen without a floor",
      section.section_id
    ))),
    (Some(floor), Some(section)) if section.floor_id != floor.floor_id => {
      Err(Error::PlacementMismatch(format!(
        "section {} belongs to floor {}, not {}",
        section.section_id, section.floor_id, floor.floor_id
      )))
    }
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::catalog::NewDocument;

  fn document() -> Document {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let input = NewDocument::new(3, "Kelileh va Demneh");
    Document {
      document_id:     17,
      library_id:      input.library_id,
      author_id:       None,
      title:           input.title,
      document_type:   input.document_type,
      reference_type:  input.reference_type,
      language:        input.language,
      record_number:   1,
      document_number: None,
      details:         input.details,
      created_at:      at,
      updated_at:      at,
    }
  }

  fn library() -> Library {
    Library {
      library_id:  3,
      name:        "Central Library".into(),
      address:     None,
      province_id: Some(1),
      region_id:   Some(1),
      city_id:     Some(1),
      phone:       None,
      email:       None,
      description: None,
      created_at:  Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn floor(floor_id: i64, library_id: i64) -> LibraryFloor {
    LibraryFloor { floor_id, library_id, floor_code: "2".into(), floor_name: None }
  }

  fn section(section_id: i64, floor_id: i64) -> LibrarySection {
    LibrarySection { section_id, floor_id, section_code: "B".into(), section_name: None }
  }

  #[test]
  fn prepares_code_label_and_library() {
    let doc = document();
    let lib = library();
    let province = Province { province_id: 1, code: 7, name: "Tehran".into() };
    let region = Region { region_id: 1, code: 12, name: "Center".into() };
    let city = City { city_id: 1, code: 45, name: "Tehran".into(), province_id: 1, region_id: 1 };
    let fl = floor(9, 3);
    let sec = section(4, 9);
    let ctx = CopyContext {
      document: &doc,
      library:  Some(&lib),
      province: Some(&province),
      region:   Some(&region),
      city:     Some(&city),
      floor:    Some(&fl),
      section:  Some(&sec),
    };

    let prepared = prepare_copy(&ctx, " 5 ", None).unwrap();
    assert_eq!(prepared.library_id, 3);
    assert_eq!(prepared.number, "5");
    assert_eq!(prepared.location_code.as_str(), "07-12-045-003-2-B-005");
    assert_eq!(prepared.label.file_name("png"), "qrcode_17_5.png");
    assert_eq!(
      prepared.label.payload,
      "Document: Kelileh va Demneh | Registration: 5 | Library: Central Library"
    );
  }

  #[test]
  fn existing_code_is_kept() {
    let doc = document();
    let lib = library();
    let ctx = CopyContext {
      document: &doc,
      library:  Some(&lib),
      province: None,
      region:   None,
      city:     None,
      floor:    None,
      section:  None,
    };
    let frozen = LocationCode::from("01-01-001-001-1-A-001".to_owned());

    let prepared = prepare_copy(&ctx, "5", Some(&frozen)).unwrap();
    assert_eq!(prepared.location_code, frozen);
  }

  #[test]
  fn missing_library_is_a_precondition_failure() {
    let doc = document();
    let ctx = CopyContext {
      document: &doc,
      library:  None,
      province: None,
      region:   None,
      city:     None,
      floor:    None,
      section:  None,
    };
    assert!(matches!(
      prepare_copy(&ctx, "5", None),
      Err(Error::DocumentWithoutLibrary(17))
    ));
  }

  #[test]
  fn blank_numbers_are_rejected() {
    assert_eq!(normalize_number("   "), Err(ValidationError::EmptyNumber));
    assert_eq!(normalize_number("\t12\n").unwrap(), "12");
  }

  #[test]
  fn placement_must_follow_the_hierarchy() {
    assert!(check_placement(3, Some(&floor(9, 3)), Some(&section(4, 9))).is_ok());
    assert!(check_placement(3, None, None).is_ok());

    assert!(matches!(
      check_placement(3, Some(&floor(9, 8)), None),
      Err(Error::PlacementMismatch(_))
    ));
    assert!(matches!(
      check_placement(3, Some(&floor(9, 3)), Some(&section(4, 10))),
      Err(Error::PlacementMismatch(_))
    ));
    assert!(matches!(
      check_placement(3, None, Some(&section(4, 9))),
      Err(Error::PlacementMismatch(_))
    ));
  }
}
