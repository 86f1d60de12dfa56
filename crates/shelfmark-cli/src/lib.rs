//! Operator tooling for a Shelfmark store.
//!
//! The `shelfmark` binary is a thin clap front end over [`commands`]; the
//! configuration and store wiring live here so they can be exercised in tests.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use shelfmark_core::policy::CirculationPolicy;
use shelfmark_label::{DEFAULT_MIN_SIZE, QrLabelRenderer};
use shelfmark_store_sqlite::SqliteStore;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings read from the TOML file and `SHELFMARK_*` environment variables.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `SHELFMARK_POLICY__LATE_FEE_PER_DAY=500`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path: PathBuf,
  /// Render a QR label for every saved copy.
  pub labels:     bool,
  /// Minimum edge of a rendered label, in pixels.
  pub label_size: u32,
  pub policy:     CirculationPolicy,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("shelfmark.db"),
      labels:     true,
      label_size: DEFAULT_MIN_SIZE,
      policy:     CirculationPolicy::default(),
    }
  }
}

impl AppConfig {
  /// Layer the optional file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SHELFMARK")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings.try_deserialize().context("failed to deserialise AppConfig")
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Open the configured store with its policy and, if enabled, the label
/// renderer.
pub async fn open_store(cfg: &AppConfig) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))?
    .with_policy(cfg.policy);

  Ok(if cfg.labels {
    store.with_renderer(QrLabelRenderer::new().with_min_size(cfg.label_size))
  } else {
    store
  })
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/shelfmark.toml")).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("shelfmark.db"));
    assert!(cfg.labels);
    assert_eq!(cfg.policy, CirculationPolicy::default());
  }

  #[test]
  fn file_overrides_policy_piecewise() {
    let dir = std::env::temp_dir().join(format!("shelfmark-cfg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("shelfmark.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
      file,
      "store_path = \"/var/lib/shelfmark/library.db\"\nlabels = false\n\n[policy]\nlate_fee_per_day = 500"
    )
    .unwrap();

    let cfg = AppConfig::load(&path).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/shelfmark/library.db"));
    assert!(!cfg.labels);
    assert_eq!(cfg.policy.late_fee_per_day, 500);
    assert_eq!(cfg.policy.loan_period_days, CirculationPolicy::default().loan_period_days);

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
