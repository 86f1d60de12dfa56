//! Circulation policy: the tunable constants behind loans and reservations.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Late fee charged per day when none is configured, in currency units.
pub const DEFAULT_LATE_FEE_PER_DAY: i64 = 200;

/// Loan length when none is configured.
pub const DEFAULT_LOAN_PERIOD_DAYS: u64 = 15;

/// Reservation hold length when none is configured.
pub const DEFAULT_RESERVATION_PERIOD_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculationPolicy {
  pub late_fee_per_day:        i64,
  pub loan_period_days:        u64,
  pub reservation_period_days: u64,
}

impl Default for CirculationPolicy {
  fn default() -> Self {
    Self {
      late_fee_per_day:        DEFAULT_LATE_FEE_PER_DAY,
      loan_period_days:        DEFAULT_LOAN_PERIOD_DAYS,
      reservation_period_days: DEFAULT_RESERVATION_PERIOD_DAYS,
    }
  }
}

impl CirculationPolicy {
  /// Due date for a loan issued on `loan_date`.
  pub fn due_date(&self, loan_date: NaiveDate) -> NaiveDate {
    loan_date + Days::new(self.loan_period_days)
  }

  /// Expiry for a reservation placed at `placed_at`.
  pub fn reservation_expiry(&self, placed_at: DateTime<Utc>) -> DateTime<Utc> {
    placed_at + Duration::days(self.reservation_period_days as i64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_branch_rules() {
    let p = CirculationPolicy::default();
    assert_eq!(p.late_fee_per_day, 200);

    let issued = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
    assert_eq!(p.due_date(issued), NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
  }

  #[test]
  fn partial_config_falls_back_to_defaults() {
    let p: CirculationPolicy =
      serde_json::from_str(r#"{"late_fee_per_day": 500}"#).unwrap();
    assert_eq!(p.late_fee_per_day, 500);
    assert_eq!(p.loan_period_days, DEFAULT_LOAN_PERIOD_DAYS);
    assert_eq!(p.reservation_period_days, DEFAULT_RESERVATION_PERIOD_DAYS);
  }
}
