//! `covid`: import and query daily COVID-19 statistics per country.
//!
//! # Usage
//!
//! ```
//! covid import
//! covid query DEU --since 2020-12-01
//! covid query "united kingdom"
//! covid info --country DEU
//! ```
//!
//! Country arguments are matched by shape: two upper-case characters are a
//! geo id (`DE`), three are a country code (`DEU`), anything else is a
//! case-insensitive name.

mod config;
mod output;

use std::{
  io::{self, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covid_core::{
  import::{ImportPolicy, import},
  lookup::LookupKey,
  store::CaseStore,
};
use covid_ecdc::EcdcClient;
use covid_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "covid", version, about = "Daily COVID-19 statistics per country")]
struct Cli {
  /// Path to a TOML config file (db_path, ecdc_url, import_policy).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Import the most recent data from the configured source.
  Import {
    /// How to decide which records are already stored
    /// (`watermark` or `known_dates`).
    #[arg(long)]
    policy: Option<ImportPolicy>,
  },
  /// Print the time series for one country.
  Query {
    /// Geo id (`DE`), country code (`DEU`) or name (`Germany`).
    country: String,

    /// Only show days on or after this date (YYYY-MM-DD).
    #[arg(long)]
    since:   Option<NaiveDate>,
  },
  /// Print the database location, data source and store statistics.
  Info {
    /// Also list every stored version of this country code.
    #[arg(long)]
    country: Option<String>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr; stdout carries the table output.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(cli.config.as_deref())?;
  let store = open_store(&settings.db_path).await?;
  let mut out = io::stdout().lock();

  match cli.command {
    Command::Import { policy } => {
      let policy = policy.unwrap_or(settings.import_policy);
      run_import(&store, &settings, policy, &mut out).await
    }
    Command::Query { country, since } => {
      run_query(&store, &settings, LookupKey::infer(&country), since, &mut out).await
    }
    Command::Info { country } => run_info(&store, &settings, country, &mut out).await,
  }
}

async fn open_store(path: &Path) -> Result<SqliteStore> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run_import(
  store: &SqliteStore,
  settings: &Settings,
  policy: ImportPolicy,
  out: &mut impl Write,
) -> Result<()> {
  writeln!(
    out,
    "Importing from {} into {}",
    settings.ecdc_url,
    settings.db_path.display()
  )?;

  let client = EcdcClient::new().context("failed to build HTTP client")?;
  let batch = client
    .fetch_records(&settings.ecdc_url)
    .await
    .with_context(|| format!("failed to fetch {}", settings.ecdc_url))?;

  let summary = import(store, &batch.records, policy)
    .await
    .context("import failed")?;
  output::write_summary(out, &summary)?;
  Ok(())
}

async fn run_query(
  store: &SqliteStore,
  settings: &Settings,
  key: LookupKey,
  since: Option<NaiveDate>,
  out: &mut impl Write,
) -> Result<()> {
  let mut cases = store
    .query(key.clone(), since)
    .await
    .with_context(|| format!("failed to query {key}"))?;

  output::write_header(out)?;
  while let Some(item) = cases.next().await {
    let record = item.with_context(|| format!("failed to read results for {key}"))?;
    output::write_row(out, &record)?;
  }
  writeln!(out, "Data source:\t{}", settings.ecdc_url)?;
  Ok(())
}

async fn run_info(
  store: &SqliteStore,
  settings: &Settings,
  country: Option<String>,
  out: &mut impl Write,
) -> Result<()> {
  writeln!(out, "Database:\t{}", settings.db_path.display())?;
  writeln!(out, "Data source:\t{}", settings.ecdc_url)?;
  writeln!(out, "Import policy:\t{}", settings.import_policy)?;
  writeln!(out, "Stored facts:\t{}", store.fact_count().await?)?;

  if let Some(code) = country {
    let versions = store
      .country_versions(&code)
      .await
      .with_context(|| format!("failed to read versions of {code}"))?;
    writeln!(out, "Versions of {code}: {}", versions.len())?;
    for version in &versions {
      output::write_country(out, version)?;
    }
  }
  Ok(())
}
