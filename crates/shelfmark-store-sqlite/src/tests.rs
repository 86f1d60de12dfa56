//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate};
use shelfmark_core::{
  Error as CoreError, ValidationError,
  catalog::{AccessType, NewAuthor, NewDocument, NewDocumentAccess},
  circulation::{FinancialStatus, LoanQuery, LoanStatus, NewLoan, NewReservation, ReservationStatus},
  clock::FixedClock,
  copy::{CopyChanges, CopyStatus, NewCopy},
  label::{LabelRenderer, NewArtifact},
  location::{LibraryFloor, LibrarySection, NewArea, NewCity, NewFloor, NewLibrary, NewSection},
  member::{MemberStatus, NewMember},
  store::LibraryStore,
};

use crate::{Error, SqliteStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
    .with_clock(FixedClock::on(date(2024, 3, 1)))
}

/// Echoes the payload back as the "image".
struct EchoRenderer;

impl LabelRenderer for EchoRenderer {
  fn media_type(&self) -> &'static str { "text/plain" }

  fn extension(&self) -> &'static str { "txt" }

  fn render(&self, payload: &str) -> shelfmark_core::Result<Vec<u8>> {
    Ok(payload.as_bytes().to_vec())
  }
}

struct BrokenRenderer;

impl LabelRenderer for BrokenRenderer {
  fn media_type(&self) -> &'static str { "image/png" }

  fn extension(&self) -> &'static str { "png" }

  fn render(&self, _payload: &str) -> shelfmark_core::Result<Vec<u8>> {
    Err(CoreError::Label("printer on fire".into()))
  }
}

/// Province 7, region 12, city 45, library 3 with floor "2" and section "B".
struct Fixture {
  floor:   LibraryFloor,
  section: LibrarySection,
}

async fn fixture(s: &SqliteStore) -> Fixture {
  let province = s.add_province(NewArea { code: 7, name: "Tehran".into() }).await.unwrap();
  let region = s.add_region(NewArea { code: 12, name: "Central".into() }).await.unwrap();
  let city = s
    .add_city(NewCity {
      code:        45,
      name:        "Tehran".into(),
      province_id: province.province_id,
      region_id:   region.region_id,
    })
    .await
    .unwrap();

  let mut library = NewLibrary::new(3, "Central Library");
  library.province_id = Some(province.province_id);
  library.region_id = Some(region.region_id);
  library.city_id = Some(city.city_id);
  s.add_library(library).await.unwrap();

  let floor = s
    .add_floor(NewFloor { library_id: 3, floor_code: "2".into(), floor_name: None })
    .await
    .unwrap();
  let section = s
    .add_section(NewSection { floor_id: floor.floor_id, section_code: "B".into(), section_name: None })
    .await
    .unwrap();

  Fixture { floor, section }
}

fn placed(document_id: i64, number: &str, f: &Fixture) -> NewCopy {
  NewCopy::new(document_id, number).placed(Some(f.floor.floor_id), Some(f.section.section_id))
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_version_is_recorded() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), 1);
}

// ─── Location registry ───────────────────────────────────────────────────────

#[tokio::test]
async fn floors_and_sections_are_listed_per_parent() {
  let s = store().await;
  let f = fixture(&s).await;
  s.add_floor(NewFloor { library_id: 3, floor_code: "3".into(), floor_name: Some("Top".into()) })
    .await
    .unwrap();

  let floors = s.list_floors(3).await.unwrap();
  assert_eq!(floors.len(), 2);
  assert_eq!(floors[0], f.floor);

  let sections = s.list_sections(f.floor.floor_id).await.unwrap();
  assert_eq!(sections, vec![f.section]);
}

#[tokio::test]
async fn floor_for_unknown_library_is_not_found() {
  let s = store().await;
  let err = s
    .add_floor(NewFloor { library_id: 99, floor_code: "1".into(), floor_name: None })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::NotFound { kind: "library", .. })));
}

#[tokio::test]
async fn duplicate_province_code_conflicts() {
  let s = store().await;
  s.add_province(NewArea { code: 7, name: "Tehran".into() }).await.unwrap();
  let err = s.add_province(NewArea { code: 7, name: "Alborz".into() }).await.unwrap_err();
  assert!(err.is_retryable());
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_numbers_follow_the_highest_issued() {
  let s = store().await;
  fixture(&s).await;

  let first = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let second = s.add_document(NewDocument::new(3, "Masnavi")).await.unwrap();
  assert_eq!((first.record_number, second.record_number), (1, 2));

  let mut explicit = NewDocument::new(3, "Golestan");
  explicit.record_number = Some(10);
  assert_eq!(s.add_document(explicit).await.unwrap().record_number, 10);

  let next = s.add_document(NewDocument::new(3, "Bustan")).await.unwrap();
  assert_eq!(next.record_number, 11);
}

#[tokio::test]
async fn explicit_record_number_already_taken_conflicts() {
  let s = store().await;
  fixture(&s).await;
  s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let mut clash = NewDocument::new(3, "Masnavi");
  clash.record_number = Some(1);
  let err = s.add_document(clash).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Conflict { .. })));
}

#[tokio::test]
async fn exhausted_record_numbers_conflict_without_breaking_the_store() {
  let s = store().await;
  fixture(&s).await;

  let mut last = NewDocument::new(3, "Shahnameh");
  last.record_number = Some(u32::MAX);
  assert_eq!(s.add_document(last).await.unwrap().record_number, u32::MAX);

  let err = s.add_document(NewDocument::new(3, "Masnavi")).await.unwrap_err();
  assert!(matches!(
    &err,
    Error::Core(CoreError::Conflict { constraint }) if constraint == "documents.record_number"
  ));

  let mut explicit = NewDocument::new(3, "Masnavi");
  explicit.record_number = Some(7);
  assert_eq!(s.add_document(explicit).await.unwrap().record_number, 7);
  assert_eq!(s.list_documents(Some(3)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn zero_record_number_counts_as_unset() {
  let s = store().await;
  fixture(&s).await;

  let mut zero = NewDocument::new(3, "Shahnameh");
  zero.record_number = Some(0);
  let doc = s.add_document(zero).await.unwrap();
  assert_eq!(doc.record_number, 1);

  let mut edit = NewDocument::new(3, "Shahnameh");
  edit.record_number = Some(0);
  let updated = s.update_document(doc.document_id, edit).await.unwrap();
  assert_eq!(updated.record_number, 1);
}

#[tokio::test]
async fn concurrent_saves_issue_distinct_consecutive_numbers() {
  let s = store().await;
  fixture(&s).await;

  let (s1, s2, s3) = (s.clone(), s.clone(), s.clone());

  let (a, b, c, d) = tokio::join!(
    s.add_document(NewDocument::new(3, "A")),
    s1.add_document(NewDocument::new(3, "B")),
    s2.add_document(NewDocument::new(3, "C")),
    s3.add_document(NewDocument::new(3, "D")),
  );
  let mut numbers: Vec<u32> =
    [a, b, c, d].into_iter().map(|doc| doc.unwrap().record_number).collect();
  numbers.sort_unstable();
  assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn two_connections_to_one_file_serialise_their_saves() {
  let path = std::env::temp_dir().join(format!("shelfmark-race-{}.db", std::process::id()));
  std::fs::remove_file(&path).ok();
  let first = SqliteStore::open(&path).await.unwrap();
  let second = SqliteStore::open(&path).await.unwrap();
  fixture(&first).await;
  let author = first.add_author(NewAuthor::new("Abolqasem", "Ferdowsi")).await.unwrap();

  let (x, y) = tokio::join!(
    first.add_document(NewDocument::new(3, "Shahnameh").by(author.author_id)),
    second.add_document(NewDocument::new(3, "Shahnameh").by(author.author_id)),
  );
  let (won, lost): (Vec<_>, Vec<_>) = [x, y].into_iter().partition(|r| r.is_ok());
  assert_eq!((won.len(), lost.len()), (1, 1));
  assert!(matches!(
    &lost[0],
    Err(Error::Core(CoreError::Validation(ValidationError::DuplicateDocument { .. })))
  ));

  let (x, y) = tokio::join!(
    first.add_document(NewDocument::new(3, "Masnavi")),
    second.add_document(NewDocument::new(3, "Golestan")),
  );
  let mut numbers = vec![x.unwrap().record_number, y.unwrap().record_number];
  numbers.sort_unstable();
  assert_eq!(numbers, vec![2, 3]);

  drop((first, second));
  std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn update_keeps_an_unset_record_number() {
  let s = store().await;
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let mut edit = NewDocument::new(3, "Shahnameh (2nd ed.)");
  edit.details.edition = Some("2".into());
  let updated = s.update_document(doc.document_id, edit).await.unwrap();

  assert_eq!(updated.record_number, doc.record_number);
  assert_eq!(updated.created_at, doc.created_at);
  let stored = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(stored.title, "Shahnameh (2nd ed.)");
  assert_eq!(stored.details.edition.as_deref(), Some("2"));
}

#[tokio::test]
async fn duplicate_guard_is_scoped_to_library_and_author() {
  let s = store().await;
  fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  let author = s.add_author(NewAuthor::new("Abolqasem", "Ferdowsi")).await.unwrap();

  s.add_document(NewDocument::new(3, "Shahnameh").by(author.author_id)).await.unwrap();

  let err = s
    .add_document(NewDocument::new(3, "Shahnameh").by(author.author_id))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Validation(ValidationError::DuplicateDocument { library_id: 3, .. }))
  ));
  assert!(!err.is_retryable());

  // Another library, or no author at all, is not a duplicate.
  s.add_document(NewDocument::new(4, "Shahnameh").by(author.author_id)).await.unwrap();
  s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
}

#[tokio::test]
async fn resaving_a_document_does_not_trip_its_own_guard() {
  let s = store().await;
  fixture(&s).await;
  let author = s.add_author(NewAuthor::new("Saadi", "Shirazi")).await.unwrap();
  let doc = s.add_document(NewDocument::new(3, "Golestan").by(author.author_id)).await.unwrap();

  s.update_document(doc.document_id, NewDocument::new(3, "Golestan").by(author.author_id))
    .await
    .unwrap();
}

#[tokio::test]
async fn document_needs_an_existing_library() {
  let s = store().await;
  let err = s.add_document(NewDocument::new(99, "Orphan")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::NotFound { kind: "library", .. })));
}

#[tokio::test]
async fn documents_are_listed_per_library() {
  let s = store().await;
  fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  s.add_document(NewDocument::new(3, "A")).await.unwrap();
  s.add_document(NewDocument::new(4, "B")).await.unwrap();
  s.add_document(NewDocument::new(3, "C")).await.unwrap();

  assert_eq!(s.list_documents(None).await.unwrap().len(), 3);
  let titles: Vec<_> =
    s.list_documents(Some(3)).await.unwrap().into_iter().map(|d| d.title).collect();
  assert_eq!(titles, ["A", "C"]);
}

#[tokio::test]
async fn access_policy_is_validated_and_replaced() {
  let s = store().await;
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Divan")).await.unwrap();

  let unpriced = NewDocumentAccess { is_for_sale: true, price: Some(0), ..Default::default() };
  let err = s.set_access_policy(doc.document_id, unpriced).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Validation(ValidationError::PriceRequiredForSale))
  ));

  let no_preview = NewDocumentAccess { access_type: AccessType::Partial, ..Default::default() };
  let err = s.set_access_policy(doc.document_id, no_preview).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Validation(ValidationError::PreviewPagesRequired))
  ));
  assert!(s.get_access_policy(doc.document_id).await.unwrap().is_none());

  let first = NewDocumentAccess {
    access_type:   AccessType::Partial,
    preview_pages: Some(12),
    ..Default::default()
  };
  s.set_access_policy(doc.document_id, first).await.unwrap();
  let second = NewDocumentAccess {
    access_type: AccessType::Full,
    is_for_sale: true,
    price:       Some(150_000),
    ..Default::default()
  };
  s.set_access_policy(doc.document_id, second).await.unwrap();

  let stored = s.get_access_policy(doc.document_id).await.unwrap().unwrap();
  assert_eq!(stored.access_type, AccessType::Full);
  assert_eq!(stored.price, Some(150_000));
  assert_eq!(stored.preview_pages, None);
}

// ─── Copy ledger ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn registering_a_copy_fixes_its_location_code() {
  let s = store().await;
  let f = fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let copy = s.register_copy(placed(doc.document_id, " 5 ", &f)).await.unwrap();
  assert_eq!(copy.location_code.as_str(), "07-12-045-003-2-B-005");
  assert_eq!(copy.number, "5");
  assert_eq!(copy.library_id, 3);
  assert_eq!(copy.status, CopyStatus::Available);
  assert_eq!(copy.label, None);

  let found = s.find_copy_by_location_code("07-12-045-003-2-B-005").await.unwrap();
  assert_eq!(found, Some(copy));
}

#[tokio::test]
async fn unplaced_copy_uses_placeholders() {
  let s = store().await;
  s.add_library(NewLibrary::new(3, "Central Library")).await.unwrap();
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let copy = s.register_copy(NewCopy::new(doc.document_id, "42")).await.unwrap();
  assert_eq!(copy.location_code.as_str(), "00-00-000-003-00-00-042");
}

#[tokio::test]
async fn location_code_survives_every_later_save() {
  let s = store().await;
  let f = fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  let branch_floor = s
    .add_floor(NewFloor { library_id: 4, floor_code: "1".into(), floor_name: None })
    .await
    .unwrap();

  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let copy = s.register_copy(placed(doc.document_id, "5", &f)).await.unwrap();

  s.update_document(doc.document_id, NewDocument::new(4, "Shahnameh")).await.unwrap();
  let moved = s.get_copy(copy.copy_id).await.unwrap().unwrap();
  assert_eq!(moved.library_id, 4);

  let changes = CopyChanges {
    number: Some("9".into()),
    floor_id: Some(Some(branch_floor.floor_id)),
    section_id: Some(None),
    status: Some(CopyStatus::Weeding),
    ..Default::default()
  };
  let updated = s.update_copy(copy.copy_id, changes).await.unwrap();

  assert_eq!(updated.location_code, copy.location_code);
  assert_eq!(updated.number, "9");
  assert_eq!(updated.library_id, 4);
  assert_eq!(updated.status, CopyStatus::Weeding);
  assert_eq!(updated.created_at, copy.created_at);
}

#[tokio::test]
async fn copy_inherits_the_document_library_on_every_save() {
  let s = store().await;
  fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  let doc_a = s.add_document(NewDocument::new(3, "A")).await.unwrap();
  let doc_b = s.add_document(NewDocument::new(4, "B")).await.unwrap();

  let copy = s.register_copy(NewCopy::new(doc_a.document_id, "1")).await.unwrap();
  let changes = CopyChanges { document_id: Some(doc_b.document_id), ..Default::default() };
  let updated = s.update_copy(copy.copy_id, changes).await.unwrap();

  assert_eq!(updated.library_id, 4);
  assert_eq!(updated.location_code, copy.location_code);
}

#[tokio::test]
async fn moving_a_document_unshelves_its_copies() {
  let s = store().await;
  let f = fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  let doc = s.add_document(NewDocument::new(3, "Masnavi")).await.unwrap();
  let copy = s.register_copy(placed(doc.document_id, "1", &f)).await.unwrap();

  s.update_document(doc.document_id, NewDocument::new(4, "Masnavi")).await.unwrap();
  let moved = s.get_copy(copy.copy_id).await.unwrap().unwrap();
  assert_eq!(moved.library_id, 4);
  assert_eq!((moved.floor_id, moved.section_id), (None, None));
  assert_eq!(moved.location_code, copy.location_code);

  let changes = CopyChanges { status: Some(CopyStatus::Lost), ..Default::default() };
  let lost = s.update_copy(copy.copy_id, changes).await.unwrap();
  assert_eq!(lost.status, CopyStatus::Lost);
  assert_eq!(lost.location_code, copy.location_code);
}

#[tokio::test]
async fn copy_of_missing_document_is_rejected() {
  let s = store().await;
  let err = s.register_copy(NewCopy::new(999, "1")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::CopyWithoutDocument(999))));
}

#[tokio::test]
async fn blank_copy_number_is_rejected() {
  let s = store().await;
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let err = s.register_copy(NewCopy::new(doc.document_id, "   ")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(ValidationError::EmptyNumber))));
}

#[tokio::test]
async fn floor_of_another_library_is_a_placement_mismatch() {
  let s = store().await;
  fixture(&s).await;
  s.add_library(NewLibrary::new(4, "Branch Library")).await.unwrap();
  let foreign = s
    .add_floor(NewFloor { library_id: 4, floor_code: "1".into(), floor_name: None })
    .await
    .unwrap();
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let err = s
    .register_copy(NewCopy::new(doc.document_id, "1").placed(Some(foreign.floor_id), None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::PlacementMismatch(_))));
}

#[tokio::test]
async fn same_number_twice_in_a_library_conflicts() {
  let s = store().await;
  let f = fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let other = s.add_document(NewDocument::new(3, "Masnavi")).await.unwrap();

  s.register_copy(NewCopy::new(doc.document_id, "5")).await.unwrap();
  let err = s.register_copy(placed(other.document_id, "5", &f)).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Conflict { .. })));
  assert!(err.is_retryable());
}

#[tokio::test]
async fn padding_equivalent_numbers_collide_on_location_code() {
  let s = store().await;
  let f = fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  s.register_copy(placed(doc.document_id, "5", &f)).await.unwrap();
  let err = s.register_copy(placed(doc.document_id, "005", &f)).await.unwrap_err();
  match err {
    Error::Core(CoreError::Conflict { constraint }) => {
      assert_eq!(constraint, "copies.location_code");
    }
    other => panic!("expected a conflict, got {other:?}"),
  }
  assert_eq!(s.list_copies(doc.document_id).await.unwrap().len(), 1);
}

// ─── Labels and artifacts ────────────────────────────────────────────────────

#[tokio::test]
async fn label_is_written_with_the_copy() {
  let s = store().await.with_renderer(EchoRenderer);
  let f = fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let copy = s.register_copy(placed(doc.document_id, "5", &f)).await.unwrap();
  let name = format!("qrcode_{}_5.txt", doc.document_id);
  assert_eq!(copy.label.as_deref(), Some(name.as_str()));

  let artifact = s.get_artifact(&name).await.unwrap().unwrap();
  assert_eq!(artifact.media_type, "text/plain");
  assert_eq!(
    String::from_utf8(artifact.content).unwrap(),
    "Document: Shahnameh | Registration: 5 | Library: Central Library"
  );
  assert_eq!(artifact.content_hash.len(), 64);
}

#[tokio::test]
async fn renumbering_replaces_the_label() {
  let s = store().await.with_renderer(EchoRenderer);
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let copy = s.register_copy(NewCopy::new(doc.document_id, "5")).await.unwrap();
  let old = copy.label.clone().unwrap();

  let changes = CopyChanges { number: Some("6".into()), ..Default::default() };
  let updated = s.update_copy(copy.copy_id, changes).await.unwrap();
  let new = updated.label.unwrap();

  assert_ne!(new, old);
  assert!(s.get_artifact(&old).await.unwrap().is_none());
  assert!(s.get_artifact(&new).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_label_rolls_back_the_copy() {
  let s = store().await.with_renderer(BrokenRenderer);
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();

  let err = s.register_copy(NewCopy::new(doc.document_id, "5")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Label(_))));
  assert!(s.list_copies(doc.document_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_copy_insert_leaves_no_label() {
  let s = store().await.with_renderer(EchoRenderer);
  fixture(&s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let other = s.add_document(NewDocument::new(3, "Masnavi")).await.unwrap();
  s.register_copy(NewCopy::new(doc.document_id, "5")).await.unwrap();

  s.register_copy(NewCopy::new(other.document_id, "5")).await.unwrap_err();
  let orphan = format!("qrcode_{}_5.txt", other.document_id);
  assert!(s.get_artifact(&orphan).await.unwrap().is_none());
}

#[tokio::test]
async fn artifacts_round_trip_and_delete() {
  let s = store().await;
  let input = NewArtifact {
    name:       "cover_1.jpg".into(),
    media_type: "image/jpeg".into(),
    content:    vec![0xff, 0xd8, 0xff],
  };
  let stored = s.put_artifact(input).await.unwrap();
  assert_eq!(s.get_artifact("cover_1.jpg").await.unwrap(), Some(stored));

  assert!(s.delete_artifact("cover_1.jpg").await.unwrap());
  assert!(!s.delete_artifact("cover_1.jpg").await.unwrap());
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn member_username_defaults_to_membership_id() {
  let s = store().await;
  let member = s.add_member(NewMember::new(" M-1001 ", "Parvin", "Etesami")).await.unwrap();

  assert_eq!(member.account.username, "M-1001");
  assert_eq!(member.profile.membership_id, "M-1001");
  assert_eq!(member.profile.join_date, date(2024, 3, 1));
  assert!(member.is_active());
  assert_eq!(s.get_member(member.member_id()).await.unwrap(), Some(member));
}

#[tokio::test]
async fn membership_ids_are_unique() {
  let s = store().await;
  s.add_member(NewMember::new("M-1001", "Parvin", "Etesami")).await.unwrap();

  let mut again = NewMember::new("M-1001", "Forough", "Farrokhzad");
  again.username = Some("forough".into());
  let err = s.add_member(again).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Conflict { .. })));
}

// ─── Circulation ─────────────────────────────────────────────────────────────

async fn lendable(s: &SqliteStore) -> (i64, i64) {
  fixture(s).await;
  let doc = s.add_document(NewDocument::new(3, "Shahnameh")).await.unwrap();
  let copy = s.register_copy(NewCopy::new(doc.document_id, "1")).await.unwrap();
  let member = s.add_member(NewMember::new("M-1", "Parvin", "Etesami")).await.unwrap();
  (copy.copy_id, member.member_id())
}

#[tokio::test]
async fn loan_lifecycle_accrues_and_freezes_debt() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;

  let loan = s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap();
  assert_eq!(loan.loan_date, date(2024, 3, 1));
  assert_eq!(loan.due_date, date(2024, 3, 16));
  assert_eq!((loan.debt, loan.financial_status), (0, FinancialStatus::NoDebt));
  let copy = s.get_copy(copy_id).await.unwrap().unwrap();
  assert_eq!(copy.status, CopyStatus::Loaned);

  // Three days past due.
  let later = s.clone().with_clock(FixedClock::on(date(2024, 3, 19)));
  let refreshed = later.refresh_loan(loan.loan_id).await.unwrap();
  assert_eq!((refreshed.debt, refreshed.financial_status), (600, FinancialStatus::Debtor));

  let returned = later.return_loan(loan.loan_id, Some(date(2024, 3, 18))).await.unwrap();
  assert_eq!(returned.debt, 400);
  assert_eq!(returned.status, LoanStatus::Returned);
  assert!(returned.is_returned);

  // Returned loans stop accruing.
  let much_later = s.clone().with_clock(FixedClock::on(date(2025, 1, 1)));
  assert_eq!(much_later.refresh_loan(loan.loan_id).await.unwrap().debt, 400);
  assert_eq!(s.get_loan(loan.loan_id).await.unwrap().unwrap().return_date, Some(date(2024, 3, 18)));

  let copy = s.get_copy(copy_id).await.unwrap().unwrap();
  assert_eq!(copy.status, CopyStatus::Available);

  let err = later.return_loan(loan.loan_id, None).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::LoanAlreadyReturned(_))));
}

#[tokio::test]
async fn loaned_copy_cannot_be_lent_again() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;
  s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap();

  let err = s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::CopyUnavailable { .. })));
}

#[tokio::test]
async fn inactive_members_cannot_borrow_or_reserve() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;
  let blocked = s.set_member_status(member_id, MemberStatus::Blocked).await.unwrap();
  assert_eq!(blocked.profile.status, MemberStatus::Blocked);

  let err = s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::MemberNotActive { .. })));

  let copy = s.get_copy(copy_id).await.unwrap().unwrap();
  let err = s
    .place_reservation(NewReservation {
      member_id,
      document_id: copy.document_id,
      reservation_date: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::MemberNotActive { .. })));
}

#[tokio::test]
async fn loans_are_filtered_by_member_and_status() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;
  let loan = s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap();
  s.return_loan(loan.loan_id, None).await.unwrap();
  s.open_loan(NewLoan::new(copy_id, member_id)).await.unwrap();

  let all = s.list_loans(&LoanQuery { member_id: Some(member_id), status: None }).await.unwrap();
  assert_eq!(all.len(), 2);

  let open = LoanQuery { member_id: None, status: Some(LoanStatus::Loaned) };
  assert_eq!(s.list_loans(&open).await.unwrap().len(), 1);

  let nobody = LoanQuery { member_id: Some(member_id + 100), status: None };
  assert!(s.list_loans(&nobody).await.unwrap().is_empty());
}

#[tokio::test]
async fn reservations_expire_only_when_swept() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;
  let document_id = s.get_copy(copy_id).await.unwrap().unwrap().document_id;

  let r = s
    .place_reservation(NewReservation { member_id, document_id, reservation_date: None })
    .await
    .unwrap();
  assert_eq!(r.reservation_expiry - r.reservation_date, Duration::days(7));

  let at_expiry = r.reservation_expiry;
  assert!(s.expired_reservations(at_expiry).await.unwrap().is_empty());

  let past = at_expiry + Duration::seconds(1);
  let expired = s.expired_reservations(past).await.unwrap();
  assert_eq!(expired.len(), 1);

  // Reporting expiry changes nothing.
  let stored = s.get_reservation(r.reservation_id).await.unwrap().unwrap();
  assert_eq!(stored.status, ReservationStatus::Active);

  let canceled = s.cancel_expired_reservations(past).await.unwrap();
  assert_eq!(canceled.len(), 1);
  assert_eq!(canceled[0].status, ReservationStatus::Canceled);
  assert!(s.expired_reservations(past).await.unwrap().is_empty());

  let err = s.cancel_reservation(r.reservation_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ReservationNotActive(_))));
}

#[tokio::test]
async fn active_reservation_can_be_completed_once() {
  let s = store().await;
  let (copy_id, member_id) = lendable(&s).await;
  let document_id = s.get_copy(copy_id).await.unwrap().unwrap().document_id;
  let r = s
    .place_reservation(NewReservation { member_id, document_id, reservation_date: None })
    .await
    .unwrap();

  let done = s.complete_reservation(r.reservation_id).await.unwrap();
  assert_eq!(done.status, ReservationStatus::Completed);
  assert!(s.complete_reservation(r.reservation_id).await.is_err());
}
