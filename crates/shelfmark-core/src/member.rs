//! Members: a library profile attached to a generic account.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ValidationError;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemberType {
  #[default]
  Student,
  Faculty,
  Staff,
  FreeMember,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemberStatus {
  #[default]
  Active,
  Inactive,
  Blocked,
  Graduated,
}

/// Login identity. Knows nothing about libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub account_id: i64,
  pub username:   String,
  pub email:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// The library-membership role of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
  pub membership_id:    String,
  pub library_id:       Option<i64>,
  pub first_name:       String,
  pub last_name:        String,
  pub member_type:      MemberType,
  pub status:           MemberStatus,
  pub join_date:        NaiveDate,
  pub phone:            Option<String>,
  pub national_code:    Option<String>,
  pub student_id:       Option<String>,
  pub personnel_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
  pub account: Account,
  pub profile: MemberProfile,
}

impl Member {
  pub fn member_id(&self) -> i64 { self.account.account_id }

  pub fn is_active(&self) -> bool { self.profile.status == MemberStatus::Active }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.profile.first_name, self.profile.last_name)
  }
}

/// Input to [`crate::store::LibraryStore::add_member`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMember {
  /// Login name; falls back to the membership id when unset or blank.
  pub username:         Option<String>,
  pub email:            Option<String>,
  pub membership_id:    String,
  pub library_id:       Option<i64>,
  pub first_name:       String,
  pub last_name:        String,
  pub member_type:      MemberType,
  /// Defaults to the store's "today".
  pub join_date:        Option<NaiveDate>,
  pub phone:            Option<String>,
  pub national_code:    Option<String>,
  pub student_id:       Option<String>,
  pub personnel_number: Option<String>,
}

impl NewMember {
  pub fn new(
    membership_id: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
  ) -> Self {
    Self {
      membership_id: membership_id.into(),
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Default::default()
    }
  }

  /// The login name this member will be stored under.
  pub fn resolve_username(&self) -> Result<String, ValidationError> {
    let membership_id = self.membership_id.trim();
    if membership_id.is_empty() {
      return Err(ValidationError::EmptyMembershipId);
    }
    Ok(
      self
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(membership_id)
        .to_owned(),
    )
  }
}
