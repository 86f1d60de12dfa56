//! `shelfmark`: operator commands over a Shelfmark store.
//!
//! Reads `shelfmark.toml` (or the path given with `--config`) and any
//! `SHELFMARK_*` environment variables, opens the SQLite store, and runs one
//! command.
//!
//! ```text
//! shelfmark init
//! shelfmark location-code --library 3 --province 7 --region 12 --city 45 \
//!   --floor 2 --section B --number 5
//! shelfmark register-copy --document 17 --number 5 --floor 2 --section 4
//! shelfmark copy 07-12-045-003-2-B-005
//! shelfmark label 07-12-045-003-2-B-005 --out label.png
//! shelfmark recompute-debts
//! shelfmark sweep-reservations --cancel
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shelfmark_cli::{
  AppConfig,
  commands::{self, LocationArgs},
  open_store,
};
use shelfmark_core::copy::NewCopy;
use shelfmark_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Shelfmark library store tools")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "shelfmark.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the store if needed and report its schema version.
  Init,

  /// Compute a location code without touching the store.
  LocationCode {
    #[arg(long)]
    library:  i64,
    #[arg(long)]
    province: Option<u32>,
    #[arg(long)]
    region:   Option<u32>,
    #[arg(long)]
    city:     Option<u32>,
    #[arg(long)]
    floor:    Option<String>,
    #[arg(long)]
    section:  Option<String>,
    #[arg(long)]
    number:   String,
  },

  /// Register a copy of a document and print it as JSON.
  RegisterCopy {
    #[arg(long)]
    document: i64,
    #[arg(long)]
    number:   String,
    /// Floor id.
    #[arg(long)]
    floor:    Option<i64>,
    /// Section id.
    #[arg(long)]
    section:  Option<i64>,
  },

  /// Print the copy with this location code as JSON.
  Copy { location_code: String },

  /// Write the copy's label image to a file.
  Label {
    location_code: String,
    #[arg(short, long)]
    out: PathBuf,
  },

  /// Recompute the debt of every open loan against today.
  RecomputeDebts,

  /// List reservations past their expiry.
  SweepReservations {
    /// Cancel them instead of only listing them.
    #[arg(long)]
    cancel: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Init => {
      let (cfg, store) = connect(&cli.config).await?;
      let version = store.schema_version().await?;
      println!("store at {:?} is at schema version {version}", cfg.store_path);
    }
    Command::LocationCode { library, province, region, city, floor, section, number } => {
      let args = LocationArgs { library, province, region, city, floor, section, number };
      println!("{}", commands::location_code(&args));
    }
    Command::RegisterCopy { document, number, floor, section } => {
      let (_, store) = connect(&cli.config).await?;
      let input = NewCopy::new(document, number).placed(floor, section);
      let copy = commands::register_copy(&store, input).await?;
      print_json(&copy)?;
    }
    Command::Copy { location_code } => {
      let (_, store) = connect(&cli.config).await?;
      let copy = commands::find_copy(&store, &location_code).await?;
      print_json(&copy)?;
    }
    Command::Label { location_code, out } => {
      let (_, store) = connect(&cli.config).await?;
      commands::export_label(&store, &location_code, &out).await?;
      println!("{}", out.display());
    }
    Command::RecomputeDebts => {
      let (_, store) = connect(&cli.config).await?;
      let summary = commands::recompute_debts(&store).await?;
      print_json(&summary)?;
    }
    Command::SweepReservations { cancel } => {
      let (_, store) = connect(&cli.config).await?;
      let swept = commands::sweep_reservations(&store, Utc::now(), cancel).await?;
      tracing::info!(count = swept.len(), cancel, "reservation sweep finished");
      print_json(&swept)?;
    }
  }

  Ok(())
}

async fn connect(config: &Path) -> anyhow::Result<(AppConfig, SqliteStore)> {
  let cfg = AppConfig::load(config)?;
  let store = open_store(&cfg).await?;
  Ok((cfg, store))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{json}");
  Ok(())
}
