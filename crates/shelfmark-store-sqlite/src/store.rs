//! [`SqliteStore`]: the SQLite implementation of [`LibraryStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::{debug, info, warn};

use shelfmark_core::{
  Error as CoreError,
  catalog::{
    Author, CatalogKey, Document, DocumentAccess, NewAuthor, NewDocument, NewDocumentAccess,
    guard_duplicate,
  },
  circulation::{
    FinancialStatus, Loan, LoanQuery, LoanStatus, NewLoan, NewReservation, Reservation,
    ReservationStatus,
  },
  clock::{Clock, SystemClock},
  copy::{CopyChanges, CopyStatus, LabelJob, NewCopy, RegistrationNumber, prepare_copy},
  label::{Artifact, LabelRenderer, NewArtifact},
  location::{
    City, Library, LibraryFloor, LibrarySection, NewArea, NewCity, NewFloor, NewLibrary,
    NewSection, Province, Region,
  },
  member::{Account, Member, MemberProfile, MemberStatus, NewMember},
  policy::CirculationPolicy,
  store::LibraryStore,
};

use crate::{
  Error, Result,
  encode::{RawLoan, encode_date, encode_dt},
  queries,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Shelfmark library store backed by a single SQLite file.
///
/// Cloning is cheap: the connection handle, clock and renderer are all
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  policy:   CirculationPolicy,
  clock:    Arc<dyn Clock>,
  renderer: Option<Arc<dyn LabelRenderer>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      policy: CirculationPolicy::default(),
      clock: Arc::new(SystemClock),
      renderer: None,
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn with_policy(self, policy: CirculationPolicy) -> Self { Self { policy, ..self } }

  /// Replace the clock used for "today" and "now".
  pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
    Self { clock: Arc::new(clock), ..self }
  }

  /// Render a scannable label for every copy saved from now on.
  pub fn with_renderer(self, renderer: impl LabelRenderer + 'static) -> Self {
    Self { renderer: Some(Arc::new(renderer)), ..self }
  }

  pub fn policy(&self) -> &CirculationPolicy { &self.policy }

  /// The `PRAGMA user_version` of the open database.
  pub async fn schema_version(&self) -> Result<i64> {
    self
      .read(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await
  }

  /// Run `f` on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction. The transaction
  /// commits only if `f` succeeds; on error every write `f` made is rolled
  /// back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&tx);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    if let Err(e) = &outcome {
      warn!(error = %e, "write rolled back");
    }
    outcome
  }
}

// ─── Save-path steps ─────────────────────────────────────────────────────────

/// Check the library and author exist, then run the duplicate guard against
/// every same-titled document in the library.
fn guard_document(conn: &Connection, document_id: Option<i64>, input: &NewDocument) -> Result<()> {
  if queries::library(conn, input.library_id)?.is_none() {
    return Err(CoreError::not_found("library", input.library_id).into());
  }

  let author = match input.author_id {
    Some(id) => Some(queries::author(conn, id)?.ok_or_else(|| CoreError::not_found("author", id))?),
    None => None,
  };

  let candidate = CatalogKey {
    document_id,
    library_id: input.library_id,
    title: input.title.clone(),
    author: author.map(|a| (a.first_name, a.last_name)),
  };
  let existing = queries::catalog_keys(conn, input.library_id, &input.title)?;
  guard_duplicate(&candidate, &existing)?;
  Ok(())
}

/// Render and store a copy's label, replacing the copy's `previous` label
/// artifact if the name changed. Without a renderer the previous label is
/// kept as it is.
fn write_label(
  conn: &Connection,
  renderer: Option<&dyn LabelRenderer>,
  job: &LabelJob,
  previous: Option<&str>,
  now: DateTime<Utc>,
) -> Result<Option<String>> {
  let Some(renderer) = renderer else {
    return Ok(previous.map(str::to_owned));
  };

  let name = job.file_name(renderer.extension());
  let content = renderer.render(&job.payload)?;
  queries::store_artifact(conn, &name, renderer.media_type(), content, now)?;

  if let Some(old) = previous
    && old != name
  {
    queries::remove_artifact(conn, old)?;
  }
  Ok(Some(name))
}

fn require_active(member: &Member) -> Result<()> {
  if member.is_active() {
    return Ok(());
  }
  Err(
    CoreError::MemberNotActive {
      member_id: member.member_id(),
      status:    member.profile.status.to_string(),
    }
    .into(),
  )
}

// ─── LibraryStore impl ───────────────────────────────────────────────────────

impl LibraryStore for SqliteStore {
  type Error = Error;

  // ── Location registry ─────────────────────────────────────────────────────

  async fn add_province(&self, input: NewArea) -> Result<Province> {
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO provinces (code, name) VALUES (?1, ?2)",
          params![input.code, input.name],
        )?;
        Ok(Province { province_id: conn.last_insert_rowid(), code: input.code, name: input.name })
      })
      .await
  }

  async fn add_region(&self, input: NewArea) -> Result<Region> {
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO regions (code, name) VALUES (?1, ?2)",
          params![input.code, input.name],
        )?;
        Ok(Region { region_id: conn.last_insert_rowid(), code: input.code, name: input.name })
      })
      .await
  }

  async fn add_city(&self, input: NewCity) -> Result<City> {
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO cities (code, name, province_id, region_id) VALUES (?1, ?2, ?3, ?4)",
          params![input.code, input.name, input.province_id, input.region_id],
        )?;
        Ok(City {
          city_id:     conn.last_insert_rowid(),
          code:        input.code,
          name:        input.name,
          province_id: input.province_id,
          region_id:   input.region_id,
        })
      })
      .await
  }

  async fn add_library(&self, input: NewLibrary) -> Result<Library> {
    let now = self.clock.now();
    let library = self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO libraries (
             library_id, name, address, province_id, region_id, city_id,
             phone, email, description, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          params![
            input.library_id,
            input.name,
            input.address,
            input.province_id,
            input.region_id,
            input.city_id,
            input.phone,
            input.email,
            input.description,
            encode_dt(now),
          ],
        )?;
        Ok(Library {
          library_id:  input.library_id,
          name:        input.name,
          address:     input.address,
          province_id: input.province_id,
          region_id:   input.region_id,
          city_id:     input.city_id,
          phone:       input.phone,
          email:       input.email,
          description: input.description,
          created_at:  now,
        })
      })
      .await?;

    info!(library_id = library.library_id, name = %library.name, "library added");
    Ok(library)
  }

  async fn get_library(&self, library_id: i64) -> Result<Option<Library>> {
    self.read(move |conn| queries::library(conn, library_id)).await
  }

  async fn add_floor(&self, input: NewFloor) -> Result<LibraryFloor> {
    self
      .write(move |conn| {
        if queries::library(conn, input.library_id)?.is_none() {
          return Err(CoreError::not_found("library", input.library_id).into());
        }
        conn.execute(
          "INSERT INTO library_floors (library_id, floor_code, floor_name) VALUES (?1, ?2, ?3)",
          params![input.library_id, input.floor_code, input.floor_name],
        )?;
        Ok(LibraryFloor {
          floor_id:   conn.last_insert_rowid(),
          library_id: input.library_id,
          floor_code: input.floor_code,
          floor_name: input.floor_name,
        })
      })
      .await
  }

  async fn list_floors(&self, library_id: i64) -> Result<Vec<LibraryFloor>> {
    self.read(move |conn| queries::floors(conn, library_id)).await
  }

  async fn add_section(&self, input: NewSection) -> Result<LibrarySection> {
    self
      .write(move |conn| {
        if queries::floor(conn, input.floor_id)?.is_none() {
          return Err(CoreError::not_found("floor", input.floor_id).into());
        }
        conn.execute(
          "INSERT INTO library_sections (floor_id, section_code, section_name)
           VALUES (?1, ?2, ?3)",
          params![input.floor_id, input.section_code, input.section_name],
        )?;
        Ok(LibrarySection {
          section_id:   conn.last_insert_rowid(),
          floor_id:     input.floor_id,
          section_code: input.section_code,
          section_name: input.section_name,
        })
      })
      .await
  }

  async fn list_sections(&self, floor_id: i64) -> Result<Vec<LibrarySection>> {
    self.read(move |conn| queries::sections(conn, floor_id)).await
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_author(&self, input: NewAuthor) -> Result<Author> {
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO authors (first_name, last_name, birth_date, death_date)
           VALUES (?1, ?2, ?3, ?4)",
          params![
            input.first_name,
            input.last_name,
            input.birth_date.map(encode_date),
            input.death_date.map(encode_date),
          ],
        )?;
        Ok(Author {
          author_id:  conn.last_insert_rowid(),
          first_name: input.first_name,
          last_name:  input.last_name,
          birth_date: input.birth_date,
          death_date: input.death_date,
        })
      })
      .await
  }

  async fn add_document(&self, input: NewDocument) -> Result<Document> {
    input.validate()?;
    let now = self.clock.now();

    let document = self
      .write(move |conn| {
        guard_document(conn, None, &input)?;
        let record_number = queries::issue_record_number(conn, input.record_number)?;
        let details_json = serde_json::to_string(&input.details)?;

        conn.execute(
          "INSERT INTO documents (
             library_id, author_id, title, document_type, reference_type, language,
             record_number, document_number, details_json, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          params![
            input.library_id,
            input.author_id,
            input.title,
            input.document_type.as_ref(),
            input.reference_type.as_ref(),
            input.language.as_ref(),
            record_number,
            input.document_number,
            details_json,
            encode_dt(now),
          ],
        )?;

        Ok(Document {
          document_id: conn.last_insert_rowid(),
          library_id: input.library_id,
          author_id: input.author_id,
          title: input.title,
          document_type: input.document_type,
          reference_type: input.reference_type,
          language: input.language,
          record_number,
          document_number: input.document_number,
          details: input.details,
          created_at: now,
          updated_at: now,
        })
      })
      .await?;

    info!(
      document_id = document.document_id,
      record_number = document.record_number,
      "document added"
    );
    Ok(document)
  }

  async fn update_document(&self, document_id: i64, input: NewDocument) -> Result<Document> {
    input.validate()?;
    let now = self.clock.now();

    self
      .write(move |conn| {
        let current = queries::document(conn, document_id)?
          .ok_or_else(|| CoreError::not_found("document", document_id))?;
        guard_document(conn, Some(document_id), &input)?;

        let record_number = match input.record_number.filter(|n| *n > 0) {
          Some(n) if n != current.record_number => queries::issue_record_number(conn, Some(n))?,
          _ => current.record_number,
        };
        let details_json = serde_json::to_string(&input.details)?;

        conn.execute(
          "UPDATE documents SET
             library_id = ?1, author_id = ?2, title = ?3, document_type = ?4,
             reference_type = ?5, language = ?6, record_number = ?7,
             document_number = ?8, details_json = ?9, updated_at = ?10
           WHERE document_id = ?11",
          params![
            input.library_id,
            input.author_id,
            input.title,
            input.document_type.as_ref(),
            input.reference_type.as_ref(),
            input.language.as_ref(),
            record_number,
            input.document_number,
            details_json,
            encode_dt(now),
            document_id,
          ],
        )?;

        if current.library_id != input.library_id {
          let moved = conn.execute(
            "UPDATE copies SET library_id = ?1 WHERE document_id = ?2",
            params![input.library_id, document_id],
          )?;
          // Shelf placement does not travel; location codes stay as issued.
          let unshelved = conn.execute(
            "UPDATE copies SET floor_id = NULL, section_id = NULL
             WHERE document_id = ?2
               AND (floor_id IS NOT NULL OR section_id IS NOT NULL)
               AND (floor_id IS NULL OR floor_id NOT IN (
                 SELECT floor_id FROM library_floors WHERE library_id = ?1
               ))",
            params![input.library_id, document_id],
          )?;
          debug!(
            document_id,
            moved,
            unshelved,
            to = input.library_id,
            "copies moved with document"
          );
        }

        Ok(Document {
          document_id,
          library_id: input.library_id,
          author_id: input.author_id,
          title: input.title,
          document_type: input.document_type,
          reference_type: input.reference_type,
          language: input.language,
          record_number,
          document_number: input.document_number,
          details: input.details,
          created_at: current.created_at,
          updated_at: now,
        })
      })
      .await
  }

  async fn get_document(&self, document_id: i64) -> Result<Option<Document>> {
    self.read(move |conn| queries::document(conn, document_id)).await
  }

  async fn list_documents(&self, library_id: Option<i64>) -> Result<Vec<Document>> {
    self.read(move |conn| queries::documents(conn, library_id)).await
  }

  async fn set_access_policy(
    &self,
    document_id: i64,
    input: NewDocumentAccess,
  ) -> Result<DocumentAccess> {
    input.validate()?;

    self
      .write(move |conn| {
        if queries::document(conn, document_id)?.is_none() {
          return Err(CoreError::not_found("document", document_id).into());
        }
        conn.execute(
          "INSERT INTO document_access (document_id, access_type, preview_pages, is_for_sale, price)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(document_id) DO UPDATE SET
             access_type = excluded.access_type,
             preview_pages = excluded.preview_pages,
             is_for_sale = excluded.is_for_sale,
             price = excluded.price",
          params![
            document_id,
            input.access_type.as_ref(),
            input.preview_pages,
            input.is_for_sale,
            input.price,
          ],
        )?;
        Ok(DocumentAccess {
          document_id,
          access_type: input.access_type,
          preview_pages: input.preview_pages,
          is_for_sale: input.is_for_sale,
          price: input.price,
        })
      })
      .await
  }

  async fn get_access_policy(&self, document_id: i64) -> Result<Option<DocumentAccess>> {
    self.read(move |conn| queries::access(conn, document_id)).await
  }

  // ── Copy ledger ───────────────────────────────────────────────────────────

  async fn register_copy(&self, input: NewCopy) -> Result<RegistrationNumber> {
    let now = self.clock.now();
    let renderer = self.renderer.clone();

    let copy = self
      .write(move |conn| {
        let records =
          queries::copy_records(conn, input.document_id, input.floor_id, input.section_id)?;
        let prepared = prepare_copy(&records.context(), &input.number, input.location_code.as_ref())?;
        let label = write_label(conn, renderer.as_deref(), &prepared.label, None, now)?;

        conn.execute(
          "INSERT INTO copies (
             document_id, library_id, number, status, floor_id, section_id,
             location_code, label, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            input.document_id,
            prepared.library_id,
            prepared.number,
            input.status.as_ref(),
            input.floor_id,
            input.section_id,
            prepared.location_code.as_str(),
            label,
            encode_dt(now),
          ],
        )?;

        Ok(RegistrationNumber {
          copy_id: conn.last_insert_rowid(),
          document_id: input.document_id,
          library_id: prepared.library_id,
          number: prepared.number,
          status: input.status,
          floor_id: input.floor_id,
          section_id: input.section_id,
          location_code: prepared.location_code,
          label,
          created_at: now,
        })
      })
      .await?;

    info!(
      copy_id = copy.copy_id,
      location_code = %copy.location_code,
      labelled = copy.label.is_some(),
      "copy registered"
    );
    Ok(copy)
  }

  async fn update_copy(&self, copy_id: i64, changes: CopyChanges) -> Result<RegistrationNumber> {
    let now = self.clock.now();
    let renderer = self.renderer.clone();

    self
      .write(move |conn| {
        let current =
          queries::copy(conn, copy_id)?.ok_or_else(|| CoreError::not_found("copy", copy_id))?;

        let document_id = changes.document_id.unwrap_or(current.document_id);
        let floor_id = changes.floor_id.unwrap_or(current.floor_id);
        let section_id = changes.section_id.unwrap_or(current.section_id);
        let status = changes.status.unwrap_or(current.status);
        let number = changes.number.unwrap_or(current.number);

        let records = queries::copy_records(conn, document_id, floor_id, section_id)?;
        let prepared = prepare_copy(&records.context(), &number, Some(&current.location_code))?;
        let label =
          write_label(conn, renderer.as_deref(), &prepared.label, current.label.as_deref(), now)?;

        conn.execute(
          "UPDATE copies SET
             document_id = ?1, library_id = ?2, number = ?3, status = ?4,
             floor_id = ?5, section_id = ?6, label = ?7
           WHERE copy_id = ?8",
          params![
            document_id,
            prepared.library_id,
            prepared.number,
            status.as_ref(),
            floor_id,
            section_id,
            label,
            copy_id,
          ],
        )?;

        Ok(RegistrationNumber {
          copy_id,
          document_id,
          library_id: prepared.library_id,
          number: prepared.number,
          status,
          floor_id,
          section_id,
          location_code: prepared.location_code,
          label,
          created_at: current.created_at,
        })
      })
      .await
  }

  async fn get_copy(&self, copy_id: i64) -> Result<Option<RegistrationNumber>> {
    self.read(move |conn| queries::copy(conn, copy_id)).await
  }

  async fn find_copy_by_location_code(
    &self,
    location_code: &str,
  ) -> Result<Option<RegistrationNumber>> {
    let location_code = location_code.to_owned();
    self
      .read(move |conn| queries::copy_by_location_code(conn, &location_code))
      .await
  }

  async fn list_copies(&self, document_id: i64) -> Result<Vec<RegistrationNumber>> {
    self.read(move |conn| queries::copies(conn, document_id)).await
  }

  // ── Members ───────────────────────────────────────────────────────────────

  async fn add_member(&self, input: NewMember) -> Result<Member> {
    let username = input.resolve_username()?;
    let now = self.clock.now();
    let join_date = input.join_date.unwrap_or_else(|| self.clock.today());

    let member = self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO accounts (username, email, created_at) VALUES (?1, ?2, ?3)",
          params![username, input.email, encode_dt(now)],
        )?;
        let account_id = conn.last_insert_rowid();
        let membership_id = input.membership_id.trim().to_owned();

        conn.execute(
          "INSERT INTO members (
             account_id, membership_id, library_id, first_name, last_name,
             member_type, status, join_date, phone, national_code,
             student_id, personnel_number
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          params![
            account_id,
            membership_id,
            input.library_id,
            input.first_name,
            input.last_name,
            input.member_type.as_ref(),
            MemberStatus::Active.as_ref(),
            encode_date(join_date),
            input.phone,
            input.national_code,
            input.student_id,
            input.personnel_number,
          ],
        )?;

        Ok(Member {
          account: Account { account_id, username, email: input.email, created_at: now },
          profile: MemberProfile {
            membership_id,
            library_id: input.library_id,
            first_name: input.first_name,
            last_name: input.last_name,
            member_type: input.member_type,
            status: MemberStatus::Active,
            join_date,
            phone: input.phone,
            national_code: input.national_code,
            student_id: input.student_id,
            personnel_number: input.personnel_number,
          },
        })
      })
      .await?;

    info!(member_id = member.member_id(), username = %member.account.username, "member added");
    Ok(member)
  }

  async fn get_member(&self, member_id: i64) -> Result<Option<Member>> {
    self.read(move |conn| queries::member(conn, member_id)).await
  }

  async fn set_member_status(&self, member_id: i64, status: MemberStatus) -> Result<Member> {
    self
      .write(move |conn| {
        let updated = conn.execute(
          "UPDATE members SET status = ?1 WHERE account_id = ?2",
          params![status.as_ref(), member_id],
        )?;
        if updated == 0 {
          return Err(CoreError::not_found("member", member_id).into());
        }
        queries::member(conn, member_id)?
          .ok_or_else(|| CoreError::not_found("member", member_id).into())
      })
      .await
  }

  // ── Circulation ───────────────────────────────────────────────────────────

  async fn open_loan(&self, input: NewLoan) -> Result<Loan> {
    let today = self.clock.today();
    let policy = self.policy;

    let loan = self
      .write(move |conn| {
        let member = queries::member(conn, input.member_id)?
          .ok_or_else(|| CoreError::not_found("member", input.member_id))?;
        require_active(&member)?;

        let copy = queries::copy(conn, input.copy_id)?
          .ok_or_else(|| CoreError::not_found("copy", input.copy_id))?;
        if copy.status != CopyStatus::Available {
          return Err(
            CoreError::CopyUnavailable { copy_id: copy.copy_id, status: copy.status.to_string() }
              .into(),
          );
        }

        let loan_date = input.loan_date.unwrap_or(today);
        let mut loan = Loan {
          loan_id: 0,
          copy_id: copy.copy_id,
          document_id: copy.document_id,
          member_id: input.member_id,
          loan_date,
          due_date: input.due_date.unwrap_or_else(|| policy.due_date(loan_date)),
          return_date: None,
          is_returned: false,
          debt: 0,
          financial_status: FinancialStatus::NoDebt,
          status: LoanStatus::Loaned,
        };
        loan.settle(today, &policy);

        conn.execute(
          "INSERT INTO loans (
             copy_id, document_id, member_id, loan_date, due_date, return_date,
             is_returned, debt, financial_status, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, ?6, ?7, ?8)",
          params![
            loan.copy_id,
            loan.document_id,
            loan.member_id,
            encode_date(loan.loan_date),
            encode_date(loan.due_date),
            loan.debt,
            loan.financial_status.as_ref(),
            loan.status.as_ref(),
          ],
        )?;
        loan.loan_id = conn.last_insert_rowid();

        conn.execute(
          "UPDATE copies SET status = ?1 WHERE copy_id = ?2",
          params![CopyStatus::Loaned.as_ref(), loan.copy_id],
        )?;
        Ok(loan)
      })
      .await?;

    info!(
      loan_id = loan.loan_id,
      copy_id = loan.copy_id,
      member_id = loan.member_id,
      due = %loan.due_date,
      "loan opened"
    );
    Ok(loan)
  }

  async fn return_loan(&self, loan_id: i64, return_date: Option<NaiveDate>) -> Result<Loan> {
    let today = self.clock.today();
    let policy = self.policy;

    let loan = self
      .write(move |conn| {
        let mut loan =
          queries::loan(conn, loan_id)?.ok_or_else(|| CoreError::not_found("loan", loan_id))?;
        loan.mark_returned(return_date.unwrap_or(today))?;
        loan.settle(today, &policy);
        queries::save_loan(conn, &loan)?;

        conn.execute(
          "UPDATE copies SET status = ?1 WHERE copy_id = ?2 AND status = ?3",
          params![CopyStatus::Available.as_ref(), loan.copy_id, CopyStatus::Loaned.as_ref()],
        )?;
        Ok(loan)
      })
      .await?;

    info!(loan_id, debt = loan.debt, "loan returned");
    Ok(loan)
  }

  async fn refresh_loan(&self, loan_id: i64) -> Result<Loan> {
    let today = self.clock.today();
    let policy = self.policy;

    self
      .write(move |conn| {
        let mut loan =
          queries::loan(conn, loan_id)?.ok_or_else(|| CoreError::not_found("loan", loan_id))?;
        loan.settle(today, &policy);
        queries::save_loan(conn, &loan)?;
        Ok(loan)
      })
      .await
  }

  async fn get_loan(&self, loan_id: i64) -> Result<Option<Loan>> {
    self.read(move |conn| queries::loan(conn, loan_id)).await
  }

  async fn list_loans(&self, query: &LoanQuery) -> Result<Vec<Loan>> {
    let member_id = query.member_id;
    let status = query.status.map(|s| s.as_ref().to_owned());

    self
      .read(move |conn| {
        let sql = format!(
          "SELECT {} FROM loans
           WHERE (?1 IS NULL OR member_id = ?1) AND (?2 IS NULL OR status = ?2)
           ORDER BY loan_id",
          RawLoan::COLUMNS
        );
        queries::query_all(conn, &sql, params![member_id, status], RawLoan::from_row)?
          .into_iter()
          .map(RawLoan::into_loan)
          .collect()
      })
      .await
  }

  async fn place_reservation(&self, input: NewReservation) -> Result<Reservation> {
    let now = self.clock.now();
    let policy = self.policy;

    let reservation = self
      .write(move |conn| {
        let member = queries::member(conn, input.member_id)?
          .ok_or_else(|| CoreError::not_found("member", input.member_id))?;
        require_active(&member)?;
        if queries::document(conn, input.document_id)?.is_none() {
          return Err(CoreError::not_found("document", input.document_id).into());
        }

        let reservation_date = input.reservation_date.unwrap_or(now);
        let reservation_expiry = policy.reservation_expiry(reservation_date);
        conn.execute(
          "INSERT INTO reservations (
             member_id, document_id, reservation_date, reservation_expiry, status
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            input.member_id,
            input.document_id,
            encode_dt(reservation_date),
            encode_dt(reservation_expiry),
            ReservationStatus::Active.as_ref(),
          ],
        )?;

        Ok(Reservation {
          reservation_id: conn.last_insert_rowid(),
          member_id: input.member_id,
          document_id: input.document_id,
          reservation_date,
          reservation_expiry,
          status: ReservationStatus::Active,
        })
      })
      .await?;

    info!(
      reservation_id = reservation.reservation_id,
      expires = %reservation.reservation_expiry,
      "reservation placed"
    );
    Ok(reservation)
  }

  async fn get_reservation(&self, reservation_id: i64) -> Result<Option<Reservation>> {
    self.read(move |conn| queries::reservation(conn, reservation_id)).await
  }

  async fn cancel_reservation(&self, reservation_id: i64) -> Result<Reservation> {
    self.transition_reservation(reservation_id, ReservationStatus::Canceled).await
  }

  async fn complete_reservation(&self, reservation_id: i64) -> Result<Reservation> {
    self.transition_reservation(reservation_id, ReservationStatus::Completed).await
  }

  async fn expired_reservations(&self, as_of: DateTime<Utc>) -> Result<Vec<Reservation>> {
    self
      .read(move |conn| {
        let mut active = queries::active_reservations(conn)?;
        active.retain(|r| r.is_expired(as_of));
        Ok(active)
      })
      .await
  }

  async fn cancel_expired_reservations(&self, as_of: DateTime<Utc>) -> Result<Vec<Reservation>> {
    let canceled = self
      .write(move |conn| {
        let mut expired = queries::active_reservations(conn)?;
        expired.retain(|r| r.is_expired(as_of));
        for reservation in &mut expired {
          reservation.transition(ReservationStatus::Canceled)?;
          queries::save_reservation_status(conn, reservation)?;
        }
        Ok(expired)
      })
      .await?;

    info!(count = canceled.len(), %as_of, "expired reservations canceled");
    Ok(canceled)
  }

  // ── Artifacts ─────────────────────────────────────────────────────────────

  async fn put_artifact(&self, input: NewArtifact) -> Result<Artifact> {
    let now = self.clock.now();
    self
      .write(move |conn| {
        queries::store_artifact(conn, &input.name, &input.media_type, input.content, now)
      })
      .await
  }

  async fn get_artifact(&self, name: &str) -> Result<Option<Artifact>> {
    let name = name.to_owned();
    self.read(move |conn| queries::artifact(conn, &name)).await
  }

  async fn delete_artifact(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();
    self.write(move |conn| queries::remove_artifact(conn, &name)).await
  }
}

impl SqliteStore {
  async fn transition_reservation(
    &self,
    reservation_id: i64,
    to: ReservationStatus,
  ) -> Result<Reservation> {
    let reservation = self
      .write(move |conn| {
        let mut reservation = queries::reservation(conn, reservation_id)?
          .ok_or_else(|| CoreError::not_found("reservation", reservation_id))?;
        reservation.transition(to)?;
        queries::save_reservation_status(conn, &reservation)?;
        Ok(reservation)
      })
      .await?;

    debug!(reservation_id, status = %reservation.status, "reservation updated");
    Ok(reservation)
  }
}
