//! Location registry and the location-code generator.
//!
//! The registry is a strict hierarchy: province, region and city above a
//! library, floors inside a library, sections inside a floor. It exists to
//! feed [`generate_location_code`], which composes the path into a fixed-width
//! identifier of the form `PP-RR-CCC-LLL-FF-SS-NNN`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Reference tables ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
  pub province_id: i64,
  pub code:        u32,
  pub name:        String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
  pub region_id: i64,
  pub code:      u32,
  pub name:      String,
}

/// A city sits under one province and one region; its code is only unique
/// within that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
  pub city_id:     i64,
  pub code:        u32,
  pub name:        String,
  pub province_id: i64,
  pub region_id:   i64,
}

/// Input for provinces and regions, which share a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArea {
  pub code: u32,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCity {
  pub code:        u32,
  pub name:        String,
  pub province_id: i64,
  pub region_id:   i64,
}

// ─── Libraries ───────────────────────────────────────────────────────────────

/// A library branch. `library_id` is chosen by the operator and appears in
/// every location code of the branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
  pub library_id:  i64,
  pub name:        String,
  pub address:     Option<String>,
  pub province_id: Option<i64>,
  pub region_id:   Option<i64>,
  pub city_id:     Option<i64>,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLibrary {
  pub library_id:  i64,
  pub name:        String,
  pub address:     Option<String>,
  pub province_id: Option<i64>,
  pub region_id:   Option<i64>,
  pub city_id:     Option<i64>,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub description: Option<String>,
}

impl NewLibrary {
  pub fn new(library_id: i64, name: impl Into<String>) -> Self {
    Self { library_id, name: name.into(), ..Default::default() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFloor {
  pub floor_id:   i64,
  pub library_id: i64,
  /// Short, numeric-like code, e.g. `"2"` or `"01"`.
  pub floor_code: String,
  pub floor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFloor {
  pub library_id: i64,
  pub floor_code: String,
  pub floor_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySection {
  pub section_id:   i64,
  pub floor_id:     i64,
  pub section_code: String,
  pub section_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSection {
  pub floor_id:     i64,
  pub section_code: String,
  pub section_name: Option<String>,
}

// ─── Location code ───────────────────────────────────────────────────────────

/// The composite identifier of a copy's physical location. Assigned once,
/// when the copy is registered, and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCode(String);

impl LocationCode {
  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_inner(self) -> String { self.0 }
}

impl From<String> for LocationCode {
  fn from(s: String) -> Self { Self(s) }
}

impl AsRef<str> for LocationCode {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for LocationCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Everything the generator reads, already resolved from the registry.
/// Absent parts render as zero-filled placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationInputs<'a> {
  pub province_code: Option<u32>,
  pub region_code:   Option<u32>,
  pub city_code:     Option<u32>,
  pub library_id:    i64,
  pub floor_code:    Option<&'a str>,
  pub section_code:  Option<&'a str>,
  /// The copy's registration number; trimmed by the generator.
  pub number:        &'a str,
}

impl<'a> LocationInputs<'a> {
  /// Collect inputs from resolved registry records.
  pub fn resolve(
    library: &Library,
    province: Option<&Province>,
    region: Option<&Region>,
    city: Option<&City>,
    floor: Option<&'a LibraryFloor>,
    section: Option<&'a LibrarySection>,
    number: &'a str,
  ) -> Self {
    Self {
      province_code: province.map(|p| p.code),
      region_code: region.map(|r| r.code),
      city_code: city.map(|c| c.code),
      library_id: library.library_id,
      floor_code: floor.map(|f| f.floor_code.as_str()),
      section_code: section.map(|s| s.section_code.as_str()),
      number,
    }
  }
}

/// Compose `PP-RR-CCC-LLL-FF-SS-NNN` from `inputs`.
///
/// Numeric parts are zero-padded to their width; the registration number is
/// left-padded to at least three characters and never truncated. Floor and
/// section codes are used verbatim, or `"00"` when absent or empty.
pub fn generate_location_code(inputs: &LocationInputs<'_>) -> LocationCode {
  let province = inputs
    .province_code
    .map_or_else(|| "00".to_owned(), |c| format!("{c:02}"));
  let region = inputs
    .region_code
    .map_or_else(|| "00".to_owned(), |c| format!("{c:02}"));
  let city = inputs
    .city_code
    .map_or_else(|| "000".to_owned(), |c| format!("{c:03}"));
  let library = format!("{:03}", inputs.library_id);
  let floor = non_empty(inputs.floor_code).unwrap_or("00");
  let section = non_empty(inputs.section_code).unwrap_or("00");
  let number = zero_pad(inputs.number.trim(), 3);

  LocationCode(format!(
    "{province}-{region}-{city}-{library}-{floor}-{section}-{number}"
  ))
}

fn non_empty(s: Option<&str>) -> Option<&str> { s.filter(|s| !s.is_empty()) }

/// Left-pad `s` with `'0'` up to `width` characters.
fn zero_pad(s: &str, width: usize) -> String {
  let len = s.chars().count();
  if len >= width {
    return s.to_owned();
  }
  let mut out = "0".repeat(width - len);
  out.push_str(s);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn full_inputs() -> LocationInputs<'static> {
    LocationInputs {
      province_code: Some(7),
      region_code:   Some(12),
      city_code:     Some(45),
      library_id:    3,
      floor_code:    Some("2"),
      section_code:  Some("B"),
      number:        "5",
    }
  }

  #[test]
  fn composes_full_path() {
    let code = generate_location_code(&full_inputs());
    assert_eq!(code.as_str(), "07-12-045-003-2-B-005");
  }

  #[test]
  fn absent_parts_render_as_placeholders() {
    let inputs = LocationInputs { library_id: 3, number: "5", ..Default::default() };
    assert_eq!(generate_location_code(&inputs).as_str(), "00-00-000-003-00-00-005");
  }

  #[test]
  fn empty_floor_and_section_codes_render_as_placeholders() {
    let inputs = LocationInputs {
      floor_code: Some(""),
      section_code: Some(""),
      ..full_inputs()
    };
    assert_eq!(generate_location_code(&inputs).as_str(), "07-12-045-003-00-00-005");
  }

  #[test]
  fn every_presence_combination_matches_template() {
    for mask in 0u8..32 {
      let inputs = LocationInputs {
        province_code: (mask & 1 != 0).then_some(7),
        region_code:   (mask & 2 != 0).then_some(12),
        city_code:     (mask & 4 != 0).then_some(45),
        library_id:    3,
        floor_code:    (mask & 8 != 0).then_some("2"),
        section_code:  (mask & 16 != 0).then_some("B"),
        number:        "5",
      };
      let code = generate_location_code(&inputs);
      let parts: Vec<&str> = code.as_str().split('-').collect();

      assert_eq!(parts.len(), 7, "mask {mask}: {code}");
      assert_eq!(parts[0], if mask & 1 != 0 { "07" } else { "00" });
      assert_eq!(parts[1], if mask & 2 != 0 { "12" } else { "00" });
      assert_eq!(parts[2], if mask & 4 != 0 { "045" } else { "000" });
      assert_eq!(parts[3], "003");
      assert_eq!(parts[4], if mask & 8 != 0 { "2" } else { "00" });
      assert_eq!(parts[5], if mask & 16 != 0 { "B" } else { "00" });
      assert_eq!(parts[6], "005");
    }
  }

  #[test]
  fn number_is_trimmed_then_padded() {
    let inputs = LocationInputs { number: "  42 ", ..full_inputs() };
    assert!(generate_location_code(&inputs).as_str().ends_with("-042"));
  }

  #[test]
  fn long_numbers_are_not_truncated() {
    let inputs = LocationInputs { number: "123456", ..full_inputs() };
    assert!(generate_location_code(&inputs).as_str().ends_with("-123456"));
  }

  #[test]
  fn wide_codes_keep_all_digits() {
    let inputs = LocationInputs {
      province_code: Some(123),
      city_code: Some(4567),
      library_id: 1024,
      ..full_inputs()
    };
    assert_eq!(generate_location_code(&inputs).as_str(), "123-12-4567-1024-2-B-005");
  }

  #[test]
  fn padding_equivalent_numbers_share_a_code() {
    let a = generate_location_code(&LocationInputs { number: "7", ..full_inputs() });
    let b = generate_location_code(&LocationInputs { number: "007", ..full_inputs() });
    let c = generate_location_code(&LocationInputs { number: "70", ..full_inputs() });
    // "7" and "007" pad to the same segment; the (number, library) constraint
    // is what keeps them apart in storage.
    assert_eq!(a, b);
    assert_ne!(a, c);
  }
}
