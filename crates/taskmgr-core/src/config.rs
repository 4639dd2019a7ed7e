use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::DEFAULT_INDICATOR_LIMIT;
use crate::countdown::DEFAULT_TICK;
use crate::filter::FilterKey;

pub const CONFIG_FILE_NAME: &str =
  "taskmgr.toml";
const APP_DIR_NAME: &str = "taskmgr";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub data_dir:        Option<PathBuf>,
  /// IANA zone id; unset means host
  /// local time.
  pub timezone:        Option<String>,
  pub default_filter:  String,
  pub indicator_limit: usize,
  pub tick_millis:     u64,
  #[serde(skip)]
  pub loaded_from:     Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir:        None,
      timezone:        None,
      default_filter:  FilterKey::All
        .as_key()
        .to_string(),
      indicator_limit:
        DEFAULT_INDICATOR_LIMIT,
      tick_millis:     DEFAULT_TICK
        .as_millis()
        as u64,
      loaded_from:     None
    }
  }
}

/// Zone used for "today" and for local
/// midnight of due dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
  Local,
  Named(Tz)
}

impl Config {
  /// An explicit path must exist;
  /// otherwise the first file found in
  /// the working directory or the user
  /// config directory is used, falling
  /// back to defaults.
  #[tracing::instrument]
  pub fn load(
    path_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = match path_override {
      | Some(path) => {
        if !path.exists() {
          return Err(anyhow!(
            "config file not found: {}",
            path.display()
          ));
        }
        Some(path.to_path_buf())
      }
      | None => discover_config_path()
    };

    let Some(path) = path else {
      info!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    let mut cfg =
      Self::load_file(&path)?;
    cfg.sanitize();
    Ok(cfg)
  }

  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed reading {}",
          path.display()
        )
      })?;
    let mut cfg = Self::parse(&raw)
      .with_context(|| {
        format!(
          "failed parsing {}",
          path.display()
        )
      })?;
    info!(file = %path.display(), "loaded config");
    cfg.loaded_from =
      Some(path.to_path_buf());
    Ok(cfg)
  }

  pub fn parse(
    raw: &str
  ) -> anyhow::Result<Self> {
    let cfg = toml::from_str::<Self>(raw)?;
    Ok(cfg)
  }

  /// Replaces out-of-range values with
  /// defaults.
  pub fn sanitize(&mut self) {
    let defaults = Self::default();
    if self.indicator_limit == 0 {
      warn!(
        "indicator_limit must be \
         positive; using default"
      );
      self.indicator_limit =
        defaults.indicator_limit;
    }
    if self.tick_millis == 0 {
      warn!(
        "tick_millis must be \
         positive; using default"
      );
      self.tick_millis =
        defaults.tick_millis;
    }
    let normalized =
      FilterKey::parse_lenient(
        &self.default_filter
      );
    if normalized.as_key()
      != self
        .default_filter
        .trim()
        .to_ascii_lowercase()
    {
      warn!(
        value = %self.default_filter,
        "unknown default_filter; using all"
      );
    }
    self.default_filter =
      normalized.as_key().to_string();
  }

  #[must_use]
  pub fn default_filter_key(
    &self
  ) -> FilterKey {
    FilterKey::parse_lenient(
      &self.default_filter
    )
  }

  #[must_use]
  pub fn tick(&self) -> Duration {
    Duration::from_millis(
      self.tick_millis.max(1)
    )
  }

  #[must_use]
  pub fn zone(&self) -> Zone {
    let Some(raw) =
      self.timezone.as_deref()
    else {
      return Zone::Local;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty()
      || trimmed
        .eq_ignore_ascii_case("local")
    {
      return Zone::Local;
    }
    match trimmed.parse::<Tz>() {
      | Ok(tz) => {
        debug!(timezone = %trimmed, "configured timezone");
        Zone::Named(tz)
      }
      | Err(err) => {
        warn!(
          timezone = %trimmed,
          error = %err,
          "invalid timezone id; using host local time"
        );
        Zone::Local
      }
    }
  }
}

/// `--data` wins, then `data_dir` from
/// the config, then the platform data
/// directory.
pub fn resolve_data_dir(
  cfg: &Config,
  cli_override: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = cli_override {
    return Ok(expand_tilde(path));
  }
  if let Some(path) =
    cfg.data_dir.as_deref()
  {
    return Ok(expand_tilde(path));
  }
  default_data_dir().ok_or_else(|| {
    anyhow!(
      "could not determine a data \
       directory; pass --data"
    )
  })
}

fn discover_config_path()
-> Option<PathBuf> {
  let local = std::env::current_dir()
    .ok()
    .map(|dir| {
      dir.join(CONFIG_FILE_NAME)
    });
  let user = dirs::config_dir().map(
    |dir| {
      dir
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
    }
  );

  [local, user]
    .into_iter()
    .flatten()
    .find(|path| path.exists())
}

fn default_data_dir() -> Option<PathBuf>
{
  dirs::data_local_dir()
    .or_else(dirs::home_dir)
    .map(|dir| dir.join(APP_DIR_NAME))
}

fn expand_tilde(path: &Path) -> PathBuf {
  let Ok(rest) = path.strip_prefix("~")
  else {
    return path.to_path_buf();
  };
  match dirs::home_dir() {
    | Some(home) => home.join(rest),
    | None => path.to_path_buf()
  }
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use tempfile::tempdir;

  use super::{
    Config,
    Zone,
    resolve_data_dir
  };
  use crate::filter::FilterKey;

  #[test]
  fn empty_file_uses_defaults() {
    let cfg =
      Config::parse("").expect("parse");
    assert_eq!(cfg.indicator_limit, 3);
    assert_eq!(cfg.tick_millis, 1_000);
    assert_eq!(
      cfg.default_filter_key(),
      FilterKey::All
    );
    assert_eq!(cfg.zone(), Zone::Local);
  }

  #[test]
  fn parses_all_fields() {
    let cfg = Config::parse(
      r#"
data_dir = "/tmp/tasks"
timezone = "Europe/Berlin"
default_filter = "active"
indicator_limit = 5
tick_millis = 250
"#
    )
    .expect("parse");
    assert_eq!(
      cfg.zone(),
      Zone::Named(
        chrono_tz::Europe::Berlin
      )
    );
    assert_eq!(
      cfg.default_filter_key(),
      FilterKey::Active
    );
    assert_eq!(cfg.indicator_limit, 5);
    assert_eq!(
      cfg.tick().as_millis(),
      250
    );
    assert_eq!(
      resolve_data_dir(&cfg, None)
        .expect("data dir"),
      Path::new("/tmp/tasks")
    );
  }

  #[test]
  fn sanitize_repairs_bad_values() {
    let mut cfg = Config::parse(
      r#"
timezone = "Mars/Olympus"
default_filter = "someday"
indicator_limit = 0
tick_millis = 0
"#
    )
    .expect("parse");
    cfg.sanitize();
    assert_eq!(cfg.indicator_limit, 3);
    assert_eq!(cfg.tick_millis, 1_000);
    assert_eq!(cfg.default_filter, "all");
    assert_eq!(cfg.zone(), Zone::Local);
  }

  #[test]
  fn cli_data_dir_wins() {
    let cfg = Config {
      data_dir: Some(
        "/tmp/from-config".into()
      ),
      ..Config::default()
    };
    assert_eq!(
      resolve_data_dir(
        &cfg,
        Some(Path::new("/tmp/from-cli"))
      )
      .expect("data dir"),
      Path::new("/tmp/from-cli")
    );
  }

  #[test]
  fn explicit_missing_file_is_an_error() {
    let temp =
      tempdir().expect("tempdir");
    let missing =
      temp.path().join("nope.toml");
    assert!(
      Config::load(Some(&missing))
        .is_err()
    );

    let present =
      temp.path().join("taskmgr.toml");
    std::fs::write(
      &present,
      "indicator_limit = 4\n"
    )
    .expect("write");
    let cfg = Config::load(Some(&present))
      .expect("load");
    assert_eq!(cfg.indicator_limit, 4);
    assert_eq!(
      cfg.loaded_from.as_deref(),
      Some(present.as_path())
    );
  }
}
