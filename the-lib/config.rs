use std::num::NonZeroUsize;

use serde::{
  Deserialize,
  Serialize,
};

use crate::persistence::{
  DEFAULT_CONTENT_KEY,
  DEFAULT_FRAGMENT_HEADING,
  DEFAULT_RECORD_KEY,
};

/// Engine settings, read from the `[editor]` table of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorConfig {
  /// Maximum number of history entries. Unbounded when unset.
  pub history_limit:    Option<NonZeroUsize>,
  /// Sink key for the editor content.
  pub content_key:      String,
  /// Sink key for the stored user record.
  pub record_key:       String,
  /// Bold heading placed above inserted records.
  pub fragment_heading: String,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      history_limit:    None,
      content_key:      DEFAULT_CONTENT_KEY.to_string(),
      record_key:       DEFAULT_RECORD_KEY.to_string(),
      fragment_heading: DEFAULT_FRAGMENT_HEADING.to_string(),
    }
  }
}
