//! SQL schema for the COVID SQLite store.
//!
//! There is no migration machinery and no version marker; the DDL is
//! idempotent and runs on every open.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Country versions. Rows are never updated or deleted; a metadata change
-- appends a new row with the same code. The highest id per code is current.
CREATE TABLE IF NOT EXISTS countries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    code        TEXT    NOT NULL,
    geo_id      TEXT    NOT NULL,
    name        TEXT    NOT NULL COLLATE NOCASE,
    population  INTEGER,
    continent   TEXT    NOT NULL
);

-- Daily facts, append-only. `date` is the local midnight of the day in
-- seconds since the Unix epoch.
CREATE TABLE IF NOT EXISTS cases (
    date        INTEGER NOT NULL,
    country_id  INTEGER NOT NULL REFERENCES countries(id),
    cases       INTEGER NOT NULL,
    deaths      INTEGER NOT NULL,
    cumulative  REAL    NOT NULL DEFAULT 0,
    PRIMARY KEY (date, country_id)
);

CREATE INDEX IF NOT EXISTS countries_code_idx   ON countries(code);
CREATE INDEX IF NOT EXISTS countries_geo_id_idx ON countries(geo_id);
CREATE INDEX IF NOT EXISTS countries_name_idx   ON countries(name);
CREATE INDEX IF NOT EXISTS cases_country_idx    ON cases(country_id);
";

/// Statements that fail to prepare if an existing database has an
/// incompatible layout under the same table names.
pub const PROBES: &[&str] = &[
  "SELECT id, code, geo_id, name, population, continent FROM countries LIMIT 0",
  "SELECT date, country_id, cases, deaths, cumulative FROM cases LIMIT 0",
];

pub const COUNTRY_COLUMNS: &str = "id, code, geo_id, name, population, continent";

pub const INSERT_COUNTRY: &str = "
INSERT INTO countries (code, geo_id, name, population, continent)
VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_CASE: &str = "
INSERT INTO cases (date, country_id, cases, deaths, cumulative)
VALUES (?1, ?2, ?3, ?4, ?5)";
