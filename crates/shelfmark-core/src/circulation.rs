//! Circulation: loans of copies and reservations of documents.
//!
//! A loan's `debt` is derived state: it is recomputed from the loan's dates
//! and "today" every time the loan is saved, never lazily on read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, policy::CirculationPolicy};

// ─── Late fees ───────────────────────────────────────────────────────────────

/// Whole days a loan is overdue.
///
/// An open loan counts from `due_date` to `today`; a returned loan counts from
/// `due_date` to its return date. Anything on or before the due date is zero.
pub fn delay_days(due_date: NaiveDate, return_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
  let end = return_date.unwrap_or(today);
  if end > due_date { (end - due_date).num_days() } else { 0 }
}

/// The late fee owed on a loan: overdue days times the per-day fee.
pub fn compute_debt(
  due_date: NaiveDate,
  return_date: Option<NaiveDate>,
  today: NaiveDate,
  policy: &CirculationPolicy,
) -> i64 {
  delay_days(due_date, return_date, today) * policy.late_fee_per_day
}

// ─── Loans ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoanStatus {
  #[default]
  Loaned,
  Returned,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinancialStatus {
  Debtor,
  #[default]
  NoDebt,
}

impl FinancialStatus {
  pub fn for_debt(debt: i64) -> Self { if debt > 0 { Self::Debtor } else { Self::NoDebt } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
  pub loan_id:          i64,
  pub copy_id:          i64,
  /// The copy's document at the time the loan was opened.
  pub document_id:      i64,
  pub member_id:        i64,
  pub loan_date:        NaiveDate,
  pub due_date:         NaiveDate,
  pub return_date:      Option<NaiveDate>,
  pub is_returned:      bool,
  /// Late fee in currency units, as of the last save.
  pub debt:             i64,
  pub financial_status: FinancialStatus,
  pub status:           LoanStatus,
}

impl Loan {
  /// Recompute the derived financial fields. Called on every save.
  pub fn settle(&mut self, today: NaiveDate, policy: &CirculationPolicy) {
    self.debt = compute_debt(self.due_date, self.return_date, today, policy);
    self.financial_status = FinancialStatus::for_debt(self.debt);
  }

  /// Mark the loan returned on `on`.
  pub fn mark_returned(&mut self, on: NaiveDate) -> Result<()> {
    if self.is_returned {
      return Err(Error::LoanAlreadyReturned(self.loan_id));
    }
    self.return_date = Some(on);
    self.is_returned = true;
    self.status = LoanStatus::Returned;
    Ok(())
  }

  /// The return date the loan period implies, independent of `due_date`.
  pub fn expected_return_date(&self, policy: &CirculationPolicy) -> NaiveDate {
    policy.due_date(self.loan_date)
  }
}

/// Input to [`crate::store::LibraryStore::open_loan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
  pub copy_id:   i64,
  pub member_id: i64,
  /// Defaults to the store's "today".
  pub loan_date: Option<NaiveDate>,
  /// Defaults to `loan_date` plus the policy's loan period.
  pub due_date:  Option<NaiveDate>,
}

impl NewLoan {
  pub fn new(copy_id: i64, member_id: i64) -> Self {
    Self { copy_id, member_id, loan_date: None, due_date: None }
  }
}

/// Parameters for [`crate::store::LibraryStore::list_loans`].
#[derive(Debug, Clone, Default)]
pub struct LoanQuery {
  pub member_id: Option<i64>,
  pub status:    Option<LoanStatus>,
}

// ─── Reservations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
  #[default]
  Active,
  Canceled,
  Completed,
}

/// A member's hold on a document (not on a particular copy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
  pub reservation_id:     i64,
  pub member_id:          i64,
  pub document_id:        i64,
  pub reservation_date:   DateTime<Utc>,
  pub reservation_expiry: DateTime<Utc>,
  pub status:             ReservationStatus,
}

/// True iff `now` is strictly after `expiry`.
pub fn is_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool { now > expiry }

impl Reservation {
  /// Expiry is a pure predicate; it never changes `status` by itself.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { is_expired(self.reservation_expiry, now) }

  /// Move an active reservation to `to`. Only active reservations move.
  pub fn transition(&mut self, to: ReservationStatus) -> Result<()> {
    if self.status != ReservationStatus::Active || to == ReservationStatus::Active {
      return Err(Error::ReservationNotActive(self.reservation_id));
    }
    self.status = to;
    Ok(())
  }
}

/// Input to [`crate::store::LibraryStore::place_reservation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
  pub member_id:        i64,
  pub document_id:      i64,
  /// Defaults to the store's "now".
  pub reservation_date: Option<DateTime<Utc>>,
}
