//! One function per `shelfmark` subcommand. Each returns data; printing is
//! left to the binary.

use std::path::Path;

use anyhow::{Context as _, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shelfmark_core::{
  circulation::{LoanQuery, LoanStatus, Reservation},
  copy::{NewCopy, RegistrationNumber},
  location::{LocationCode, LocationInputs, generate_location_code},
  store::LibraryStore,
};
use shelfmark_store_sqlite::SqliteStore;
use tracing::{debug, info};

/// Arguments of `location-code`; absent parts become placeholders.
#[derive(Debug, Clone, Default)]
pub struct LocationArgs {
  pub library:  i64,
  pub province: Option<u32>,
  pub region:   Option<u32>,
  pub city:     Option<u32>,
  pub floor:    Option<String>,
  pub section:  Option<String>,
  pub number:   String,
}

pub fn location_code(args: &LocationArgs) -> LocationCode {
  generate_location_code(&LocationInputs {
    province_code: args.province,
    region_code:   args.region,
    city_code:     args.city,
    library_id:    args.library,
    floor_code:    args.floor.as_deref(),
    section_code:  args.section.as_deref(),
    number:        &args.number,
  })
}

pub async fn find_copy(store: &SqliteStore, code: &str) -> anyhow::Result<RegistrationNumber> {
  store
    .find_copy_by_location_code(code.trim())
    .await?
    .with_context(|| format!("no copy with location code {code:?}"))
}

pub async fn register_copy(store: &SqliteStore, input: NewCopy) -> anyhow::Result<RegistrationNumber> {
  let document_id = input.document_id;
  store
    .register_copy(input)
    .await
    .with_context(|| format!("failed to register a copy of document {document_id}"))
}

/// Write the stored label of the copy at `code` to `out`.
pub async fn export_label(store: &SqliteStore, code: &str, out: &Path) -> anyhow::Result<()> {
  let copy = find_copy(store, code).await?;
  let Some(name) = copy.label else {
    bail!("copy {} has no label", copy.copy_id);
  };
  let artifact = store
    .get_artifact(&name)
    .await?
    .with_context(|| format!("label artifact {name:?} is missing"))?;

  tokio::fs::write(out, &artifact.content)
    .await
    .with_context(|| format!("failed to write {out:?}"))?;
  info!(name = %name, bytes = artifact.content.len(), ?out, "label exported");
  Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebtSummary {
  pub open_loans: usize,
  pub debtors:    usize,
  pub total_debt: i64,
}

/// Re-save every open loan so its debt reflects today.
pub async fn recompute_debts(store: &SqliteStore) -> anyhow::Result<DebtSummary> {
  let open = LoanQuery { member_id: None, status: Some(LoanStatus::Loaned) };
  let mut summary = DebtSummary::default();

  for loan in store.list_loans(&open).await? {
    let loan = store.refresh_loan(loan.loan_id).await?;
    debug!(loan_id = loan.loan_id, debt = loan.debt, "loan refreshed");
    summary.open_loans += 1;
    if loan.debt > 0 {
      summary.debtors += 1;
      summary.total_debt += loan.debt;
    }
  }
  Ok(summary)
}

/// List, or with `cancel` cancel, the reservations expired as of `now`.
pub async fn sweep_reservations(
  store: &SqliteStore,
  now: DateTime<Utc>,
  cancel: bool,
) -> anyhow::Result<Vec<Reservation>> {
  let swept = if cancel {
    store.cancel_expired_reservations(now).await?
  } else {
    store.expired_reservations(now).await?
  };
  Ok(swept)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, NaiveDate};
  use shelfmark_core::{
    catalog::NewDocument,
    circulation::{NewLoan, NewReservation, ReservationStatus},
    clock::FixedClock,
    location::NewLibrary,
    member::NewMember,
  };
  use shelfmark_label::QrLabelRenderer;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  async fn store_on(day: NaiveDate) -> SqliteStore {
    SqliteStore::open_in_memory().await.unwrap().with_clock(FixedClock::on(day))
  }

  /// Library 3 with one document, one copy and one member.
  async fn seeded(s: &SqliteStore) -> (RegistrationNumber, i64) {
    s.add_library(NewLibrary::new(3, "Central Library")).await.unwrap();
    let doc = s.add_document(NewDocument::new(3, "Golestan")).await.unwrap();
    let copy = s.register_copy(NewCopy::new(doc.document_id, "5")).await.unwrap();
    let member = s.add_member(NewMember::new("M-1", "Parvin", "Etesami")).await.unwrap();
    (copy, member.member_id())
  }

  #[test]
  fn location_code_from_flags() {
    let args = LocationArgs {
      library:  3,
      province: Some(7),
      region:   Some(12),
      city:     Some(45),
      floor:    Some("2".into()),
      section:  Some("B".into()),
      number:   "5".into(),
    };
    assert_eq!(location_code(&args).as_str(), "07-12-045-003-2-B-005");

    let bare = LocationArgs { library: 3, number: "5".into(), ..Default::default() };
    assert_eq!(location_code(&bare).as_str(), "00-00-000-003-00-00-005");
  }

  #[tokio::test]
  async fn finds_copies_by_code() {
    let s = store_on(date(2024, 3, 1)).await;
    let (copy, _) = seeded(&s).await;

    let found = find_copy(&s, &format!(" {} ", copy.location_code)).await.unwrap();
    assert_eq!(found, copy);
    assert!(find_copy(&s, "99-99-999-999-00-00-000").await.is_err());
  }

  #[tokio::test]
  async fn debts_are_summed_over_open_loans() {
    let s = store_on(date(2024, 3, 1)).await;
    let (copy, member_id) = seeded(&s).await;
    s.open_loan(NewLoan::new(copy.copy_id, member_id)).await.unwrap();

    assert_eq!(
      recompute_debts(&s).await.unwrap(),
      DebtSummary { open_loans: 1, debtors: 0, total_debt: 0 }
    );

    // Due 2024-03-16; five days late.
    let later = s.clone().with_clock(FixedClock::on(date(2024, 3, 21)));
    assert_eq!(
      recompute_debts(&later).await.unwrap(),
      DebtSummary { open_loans: 1, debtors: 1, total_debt: 1_000 }
    );
  }

  #[tokio::test]
  async fn sweep_lists_before_it_cancels() {
    let s = store_on(date(2024, 3, 1)).await;
    let (copy, member_id) = seeded(&s).await;
    let r = s
      .place_reservation(NewReservation {
        member_id,
        document_id: copy.document_id,
        reservation_date: None,
      })
      .await
      .unwrap();
    let after = r.reservation_expiry + Duration::hours(1);

    let listed = sweep_reservations(&s, after, false).await.unwrap();
    assert_eq!(listed[0].status, ReservationStatus::Active);

    let canceled = sweep_reservations(&s, after, true).await.unwrap();
    assert_eq!(canceled[0].status, ReservationStatus::Canceled);
    assert!(sweep_reservations(&s, after, false).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn exports_the_rendered_label() {
    let s = store_on(date(2024, 3, 1)).await.with_renderer(QrLabelRenderer::new());
    let (copy, _) = seeded(&s).await;
    let out = std::env::temp_dir().join(format!("shelfmark-label-{}.png", std::process::id()));

    export_label(&s, copy.location_code.as_str(), &out).await.unwrap();
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
    std::fs::remove_file(&out).ok();
  }

  #[tokio::test]
  async fn unlabelled_copy_has_nothing_to_export() {
    let s = store_on(date(2024, 3, 1)).await;
    let (copy, _) = seeded(&s).await;
    let out = std::env::temp_dir().join("never-written.png");
    assert!(export_label(&s, copy.location_code.as_str(), &out).await.is_err());
  }
}
