//! SQL schema for the Shelfmark SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Current schema version, written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Location registry ───────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS provinces (
    province_id INTEGER PRIMARY KEY,
    code        INTEGER NOT NULL UNIQUE,
    name        TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS regions (
    region_id INTEGER PRIMARY KEY,
    code      INTEGER NOT NULL UNIQUE,
    name      TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS cities (
    city_id     INTEGER PRIMARY KEY,
    code        INTEGER NOT NULL,
    name        TEXT    NOT NULL,
    province_id INTEGER NOT NULL REFERENCES provinces(province_id),
    region_id   INTEGER NOT NULL REFERENCES regions(region_id),
    UNIQUE (code, province_id, region_id)
);

-- library_id is operator-chosen and appears in every location code.
CREATE TABLE IF NOT EXISTS libraries (
    library_id  INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    address     TEXT,
    province_id INTEGER REFERENCES provinces(province_id),
    region_id   INTEGER REFERENCES regions(region_id),
    city_id     INTEGER REFERENCES cities(city_id),
    phone       TEXT,
    email       TEXT,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS library_floors (
    floor_id   INTEGER PRIMARY KEY,
    library_id INTEGER NOT NULL REFERENCES libraries(library_id) ON DELETE CASCADE,
    floor_code TEXT    NOT NULL,
    floor_name TEXT
);

CREATE TABLE IF NOT EXISTS library_sections (
    section_id   INTEGER PRIMARY KEY,
    floor_id     INTEGER NOT NULL REFERENCES library_floors(floor_id) ON DELETE CASCADE,
    section_code TEXT    NOT NULL,
    section_name TEXT
);

-- ── Catalog ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS authors (
    author_id  INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    birth_date TEXT,
    death_date TEXT
);

CREATE TABLE IF NOT EXISTS documents (
    document_id     INTEGER PRIMARY KEY,
    library_id      INTEGER NOT NULL REFERENCES libraries(library_id) ON DELETE CASCADE,
    author_id       INTEGER REFERENCES authors(author_id) ON DELETE SET NULL,
    title           TEXT    NOT NULL,
    document_type   TEXT    NOT NULL,
    reference_type  TEXT    NOT NULL,
    language        TEXT    NOT NULL,
    record_number   INTEGER NOT NULL UNIQUE,
    document_number INTEGER,
    details_json    TEXT    NOT NULL DEFAULT '{}',
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS document_access (
    document_id   INTEGER PRIMARY KEY REFERENCES documents(document_id) ON DELETE CASCADE,
    access_type   TEXT    NOT NULL DEFAULT 'restricted',
    preview_pages INTEGER,
    is_for_sale   INTEGER NOT NULL DEFAULT 0,
    price         INTEGER
);

-- Monotonic counters owned by the store. 'record_number' holds the highest
-- record number ever issued; it only moves forward.
CREATE TABLE IF NOT EXISTS sequences (
    name  TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO sequences (name, value) VALUES ('record_number', 0);

-- ── Copy ledger ─────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS copies (
    copy_id       INTEGER PRIMARY KEY,
    document_id   INTEGER NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    library_id    INTEGER NOT NULL REFERENCES libraries(library_id),
    number        TEXT    NOT NULL,
    status        TEXT    NOT NULL DEFAULT 'available',
    floor_id      INTEGER REFERENCES library_floors(floor_id) ON DELETE RESTRICT,
    section_id    INTEGER REFERENCES library_sections(section_id) ON DELETE RESTRICT,
    location_code TEXT    NOT NULL UNIQUE,
    label         TEXT,
    created_at    TEXT    NOT NULL,
    UNIQUE (number, library_id)
);

-- A location code is fixed at registration.
CREATE TRIGGER IF NOT EXISTS copies_location_code_frozen
BEFORE UPDATE OF location_code ON copies
WHEN NEW.location_code IS NOT OLD.location_code
BEGIN
    SELECT RAISE(ABORT, 'location_code is immutable');
END;

-- ── Members ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS accounts (
    account_id INTEGER PRIMARY KEY,
    username   TEXT NOT NULL UNIQUE,
    email      TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    account_id       INTEGER PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    membership_id    TEXT NOT NULL UNIQUE,
    library_id       INTEGER REFERENCES libraries(library_id) ON DELETE CASCADE,
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    member_type      TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'active',
    join_date        TEXT NOT NULL,
    phone            TEXT,
    national_code    TEXT,
    student_id       TEXT,
    personnel_number TEXT
);

-- ── Circulation ─────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS loans (
    loan_id          INTEGER PRIMARY KEY,
    copy_id          INTEGER NOT NULL REFERENCES copies(copy_id) ON DELETE CASCADE,
    document_id      INTEGER NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    member_id        INTEGER NOT NULL REFERENCES members(account_id) ON DELETE CASCADE,
    loan_date        TEXT    NOT NULL,
    due_date         TEXT    NOT NULL,
    return_date      TEXT,
    is_returned      INTEGER NOT NULL DEFAULT 0,
    debt             INTEGER NOT NULL DEFAULT 0,
    financial_status TEXT    NOT NULL DEFAULT 'no_debt',
    status           TEXT    NOT NULL DEFAULT 'loaned'
);

CREATE TABLE IF NOT EXISTS reservations (
    reservation_id     INTEGER PRIMARY KEY,
    member_id          INTEGER NOT NULL REFERENCES members(account_id) ON DELETE CASCADE,
    document_id        INTEGER NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    reservation_date   TEXT    NOT NULL,
    reservation_expiry TEXT    NOT NULL,
    status             TEXT    NOT NULL DEFAULT 'active'
);

-- ── Artifacts ───────────────────────────────────────────────────────────────

-- Named binary blobs: copy labels, cover images, profile photos.
CREATE TABLE IF NOT EXISTS artifacts (
    name         TEXT PRIMARY KEY,
    media_type   TEXT NOT NULL,
    content      BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_library_title_idx ON documents(library_id, title);
CREATE INDEX IF NOT EXISTS copies_document_idx         ON copies(document_id);
CREATE INDEX IF NOT EXISTS loans_member_idx            ON loans(member_id);
CREATE INDEX IF NOT EXISTS reservations_status_idx     ON reservations(status);

PRAGMA user_version = 1;
";
