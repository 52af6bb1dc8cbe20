//! Configuration loading for the-scribe hosts.
//!
//! Settings come from two `config.toml` files: the user's, in the config
//! directory, and the workspace's, in `.the-scribe/` at the workspace root.
//! Workspace values are merged over user values.

use std::{
  fs,
  io::{
    Error as IOError,
    ErrorKind,
  },
  path::{
    Path,
    PathBuf,
  },
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use serde::Deserialize;
use the_lib::config::EditorConfig;
use thiserror::Error;
use toml::{
  Value,
  de::Error as TomlError,
};

/// Overrides the user config directory.
pub const CONFIG_DIR_ENV: &str = "THE_SCRIBE_CONFIG_DIR";

const WORKSPACE_DIR: &str = ".the-scribe";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
  pub editor: EditorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
  editor: Option<Value>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("bad config: {0}")]
  BadConfig(#[from] TomlError),
  #[error(transparent)]
  Error(#[from] IOError),
}

impl Config {
  /// Combines the user (`global`) and workspace (`local`) config sources.
  ///
  /// A missing source is skipped. A source that fails to parse is an error
  /// even when the other one is fine.
  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let parse = |file: String| toml::from_str::<ConfigRaw>(&file).map_err(ConfigLoadError::BadConfig);
    let global_config = global.and_then(parse);
    let local_config = local.and_then(parse);

    let editor = match (global_config, local_config) {
      (Ok(global), Ok(local)) => {
        match (global.editor, local.editor) {
          (None, None) => EditorConfig::default(),
          (None, Some(val)) | (Some(val), None) => val.try_into()?,
          (Some(global), Some(local)) => merge_toml_values(global, local, 3).try_into()?,
        }
      },
      (_, Err(ConfigLoadError::BadConfig(err))) | (Err(ConfigLoadError::BadConfig(err)), _) => {
        return Err(ConfigLoadError::BadConfig(err));
      },
      (Ok(config), Err(_)) | (Err(_), Ok(config)) => {
        config
          .editor
          .map_or_else(|| Ok(EditorConfig::default()), |val| val.try_into())?
      },
      (Err(err), Err(_)) => return Err(err),
    };

    Ok(Config { editor })
  }

  /// Loads the user and workspace config files.
  pub fn load_user() -> Result<Config, ConfigLoadError> {
    let global = read_config(config_file());
    let local = read_config(workspace_config_file());
    Self::load(global, local)
  }

  /// Like [`Config::load_user`], falling back to the defaults when neither
  /// file exists. Parse errors are still reported.
  pub fn load_or_default() -> Result<Config, ConfigLoadError> {
    match Self::load_user() {
      Err(ConfigLoadError::Error(err)) if err.kind() == ErrorKind::NotFound => {
        tracing::debug!("no config files found, using defaults");
        Ok(Config::default())
      },
      result => result,
    }
  }
}

fn read_config(path: Option<PathBuf>) -> Result<String, ConfigLoadError> {
  let path = path.ok_or_else(|| IOError::new(ErrorKind::NotFound, "no config directory"))?;
  let contents = fs::read_to_string(&path)?;
  tracing::debug!(path = %path.display(), "read config file");
  Ok(contents)
}

/// The user config directory, `$THE_SCRIBE_CONFIG_DIR` when set.
pub fn config_dir() -> Option<PathBuf> {
  if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
    return Some(expand_tilde(Path::new(&dir)));
  }
  let strategy = choose_base_strategy().ok()?;
  Some(strategy.config_dir().join("the-scribe"))
}

pub fn config_file() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join("config.toml"))
}

pub fn workspace_config_file() -> Option<PathBuf> {
  let cwd = std::env::current_dir().ok()?;
  Some(
    find_workspace_in(cwd)
      .0
      .join(WORKSPACE_DIR)
      .join("config.toml"),
  )
}

/// Walks up from `dir` to the first directory holding `.git` or
/// `.the-scribe`. Returns `(dir, true)` when there is none.
pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists() || ancestor.join(WORKSPACE_DIR).exists() {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), etcetera::home_dir()) {
    (Ok(rest), Ok(home)) => home.join(rest),
    _ => path.to_owned(),
  }
}

/// Merges `right` onto `left`.
///
/// Tables present on both sides are merged key by key, recursively, up to
/// `merge_depth` levels. Past that depth, and for every other kind of value,
/// `right` wins.
pub fn merge_toml_values(left: Value, right: Value, merge_depth: usize) -> Value {
  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) if merge_depth > 0 => {
      for (rname, rvalue) in right_map {
        let merged = match left_map.remove(&rname) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
          None => rvalue,
        };
        left_map.insert(rname, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}
