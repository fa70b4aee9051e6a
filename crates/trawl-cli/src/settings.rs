//! Layered configuration: TOML file, then `TRAWL_*` environment variables,
//! then command-line overrides applied by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use trawl_core::run::IndexRefresh;

/// Runtime configuration, deserialised from `trawl.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrawlConfig {
  /// SQLite database file.
  #[serde(default = "default_store_path")]
  pub store_path:    PathBuf,
  /// Directory holding one `<topic>.json` post feed per topic.
  #[serde(default = "default_posts_dir")]
  pub posts_dir:     PathBuf,
  /// Topics harvested on every run, in addition to the store's tracked list.
  #[serde(default)]
  pub topics:        Vec<String>,
  #[serde(default)]
  pub index_refresh: IndexRefresh,
}

fn default_store_path() -> PathBuf { PathBuf::from("trawl.db") }

fn default_posts_dir() -> PathBuf { PathBuf::from("posts") }

impl TrawlConfig {
  /// Read `path` (optional) and the `TRAWL_*` environment.
  pub fn load(path: &Path) -> Result<Self> { Self::load_with_env(path, None) }

  /// Like [`load`](Self::load), reading `TRAWL_*` variables from `env`
  /// instead of the process environment when it is `Some`.
  fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("TRAWL")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("topics")
          .source(env),
      )
      .build()
      .with_context(|| format!("failed to read config {}", path.display()))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise TrawlConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.posts_dir = expand_tilde(&cfg.posts_dir);
    Ok(cfg)
  }
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
