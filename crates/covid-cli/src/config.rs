//! Runtime configuration: defaults, then an optional TOML file, then
//! `COVID_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use covid_core::import::ImportPolicy;
use serde::Deserialize;

/// Settings as read from all sources; `db_path` has no default when no home
/// directory can be detected.
#[derive(Deserialize)]
struct RawSettings {
  db_path:       Option<PathBuf>,
  ecdc_url:      String,
  #[serde(default)]
  import_policy: ImportPolicy,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
  pub db_path:       PathBuf,
  pub ecdc_url:      String,
  pub import_policy: ImportPolicy,
}

impl Settings {
  /// Load settings. An explicit `file` must exist; the default config file
  /// is optional.
  pub fn load(file: Option<&Path>) -> Result<Self> {
    let xdg_data = std::env::var("XDG_DATA_HOME").ok();
    let xdg_config = std::env::var("XDG_CONFIG_HOME").ok();
    let home = std::env::var("HOME").ok();

    let mut builder = config::Config::builder()
      .set_default("ecdc_url", covid_ecdc::DEFAULT_URL)?
      .set_default("import_policy", ImportPolicy::default().to_string())?;

    if let Some(path) = default_db_path(xdg_data.as_deref(), home.as_deref()) {
      builder = builder.set_default("db_path", path.to_string_lossy().into_owned())?;
    }

    builder = match file {
      Some(path) => builder.add_source(config::File::from(path.to_path_buf()).required(true)),
      None => match default_config_path(xdg_config.as_deref(), home.as_deref()) {
        Some(path) => builder.add_source(config::File::from(path).required(false)),
        None => builder,
      },
    };

    let raw: RawSettings = builder
      .add_source(config::Environment::with_prefix("COVID"))
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise configuration")?;

    let db_path = raw
      .db_path
      .ok_or_else(|| anyhow!("unable to detect user home directory: empty $HOME"))?;

    Ok(Self {
      db_path:       expand_tilde(&db_path, home.as_deref()),
      ecdc_url:      raw.ecdc_url,
      import_policy: raw.import_policy,
    })
  }
}

/// `$XDG_DATA_HOME/covid.db`, else `$HOME/.local/share/covid.db`.
fn default_db_path(xdg_data_home: Option<&str>, home: Option<&str>) -> Option<PathBuf> {
  match (non_empty(xdg_data_home), non_empty(home)) {
    (Some(xdg), _) => Some(Path::new(xdg).join("covid.db")),
    (None, Some(home)) => Some(Path::new(home).join(".local/share/covid.db")),
    (None, None) => None,
  }
}

/// `$XDG_CONFIG_HOME/covid/config.toml`, else `$HOME/.config/covid/config.toml`.
fn default_config_path(xdg_config_home: Option<&str>, home: Option<&str>) -> Option<PathBuf> {
  match (non_empty(xdg_config_home), non_empty(home)) {
    (Some(xdg), _) => Some(Path::new(xdg).join("covid/config.toml")),
    (None, Some(home)) => Some(Path::new(home).join(".config/covid/config.toml")),
    (None, None) => None,
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> { value.filter(|v| !v.is_empty()) }

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path, home: Option<&str>) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Some(home) = non_empty(home)
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn db_path_prefers_xdg_data_home() {
    assert_eq!(
      default_db_path(Some("/data"), Some("/home/ana")),
      Some(PathBuf::from("/data/covid.db"))
    );
  }

  #[test]
  fn db_path_falls_back_to_home() {
    assert_eq!(
      default_db_path(Some(""), Some("/home/ana")),
      Some(PathBuf::from("/home/ana/.local/share/covid.db"))
    );
  }

  #[test]
  fn db_path_needs_some_home() {
    assert_eq!(default_db_path(None, None), None);
    assert_eq!(default_db_path(Some(""), Some("")), None);
  }

  #[test]
  fn config_path_defaults() {
    assert_eq!(
      default_config_path(None, Some("/home/ana")),
      Some(PathBuf::from("/home/ana/.config/covid/config.toml"))
    );
  }

  #[test]
  fn tilde_is_expanded() {
    assert_eq!(
      expand_tilde(Path::new("~/covid.db"), Some("/home/ana")),
      PathBuf::from("/home/ana/covid.db")
    );
    assert_eq!(
      expand_tilde(Path::new("/tmp/covid.db"), Some("/home/ana")),
      PathBuf::from("/tmp/covid.db")
    );
  }
}
