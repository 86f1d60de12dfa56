//! Wall-clock abstraction.
//!
//! Debt accrual and default loan/reservation dates depend on "now". Stores
//! hold a [`Clock`] so that dependency can be pinned in tests.

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock stopped at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
  /// A clock stopped at midnight UTC on `date`.
  pub fn on(date: NaiveDate) -> Self { Self(date.and_time(chrono::NaiveTime::MIN).and_utc()) }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}
