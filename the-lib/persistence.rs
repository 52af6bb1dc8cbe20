//! Persistence abstraction for `the-lib`.
//!
//! The lib defines the sink interface, the in-memory sink and the snapshot
//! helpers. Durable sinks live in `the-runtime`.
//!
//! Two keys are in play: the editor content, stored as canonical markup, and
//! an externally supplied [`Record`], stored as a JSON object.

use std::{
  borrow::Cow,
  collections::HashMap,
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  document::{
    Block,
    Document,
    Marks,
    Span,
  },
  markup::{
    self,
    MarkupError,
  },
};

pub const DEFAULT_CONTENT_KEY: &str = "richTextContent";
pub const DEFAULT_RECORD_KEY: &str = "userData";
pub const DEFAULT_FRAGMENT_HEADING: &str = "User Details:";

#[derive(Debug, Error)]
pub enum PersistError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("persistence backend '{0}' is unavailable")]
  Unavailable(String),
  #[error("invalid record: {0}")]
  Json(#[from] serde_json::Error),
  #[error("stored content is not valid markup: {0}")]
  Markup(#[from] MarkupError),
}

pub type Result<T> = std::result::Result<T, PersistError>;

/// Key-value store of string snapshots.
pub trait PersistenceSink: Send + Sync {
  fn name(&self) -> Cow<'_, str>;
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn put(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySink {
  entries: Mutex<HashMap<String, String>>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_entry(self, key: &str, value: &str) -> Self {
    self.entries.lock().insert(key.to_string(), value.to_string());
    self
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}

impl PersistenceSink for MemorySink {
  fn name(&self) -> Cow<'_, str> {
    "memory".into()
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.lock().get(key).cloned())
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    self.entries.lock().insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Renders `document` and stores it under `key`. Returns the stored markup.
pub fn save(sink: &dyn PersistenceSink, key: &str, document: &Document) -> Result<String> {
  let markup = markup::render(document);
  sink.put(key, &markup).inspect_err(|err| {
    tracing::warn!(sink = %sink.name(), key, %err, "failed to save document");
  })?;
  tracing::debug!(sink = %sink.name(), key, bytes = markup.len(), "saved document");
  Ok(markup)
}

/// Reads the document stored under `key`. An absent or empty entry is `None`.
pub fn load(sink: &dyn PersistenceSink, key: &str) -> Result<Option<Document>> {
  let Some(markup) = sink.get(key)?.filter(|markup| !markup.is_empty()) else {
    tracing::debug!(sink = %sink.name(), key, "no stored document");
    return Ok(None);
  };
  let document = markup::parse(&markup).inspect_err(|err| {
    tracing::warn!(sink = %sink.name(), key, %err, "stored document is malformed");
  })?;
  tracing::debug!(sink = %sink.name(), key, "loaded document");
  Ok(Some(document))
}

pub fn load_record(sink: &dyn PersistenceSink, key: &str) -> Result<Option<Record>> {
  match sink.get(key)?.filter(|json| !json.trim().is_empty()) {
    Some(json) => Record::from_json(&json).map(Some),
    None => Ok(None),
  }
}

pub fn store_record(sink: &dyn PersistenceSink, key: &str, record: &Record) -> Result<()> {
  sink.put(key, &record.to_json()?)
}

/// Ordered mapping of field name to string value.
///
/// Deserializes from a JSON object. String values are taken as they are,
/// `null` becomes the empty string and any other value keeps its JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
  from = "IndexMap<String, serde_json::Value>",
  into = "IndexMap<String, String>"
)]
pub struct Record {
  fields: IndexMap<String, String>,
}

impl Record {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_json(json: &str) -> Result<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Sets `field`, keeping its position when it already exists.
  pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
    self.fields.insert(field.into(), value.into());
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .fields
      .iter()
      .map(|(field, value)| (field.as_str(), value.as_str()))
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

impl From<IndexMap<String, serde_json::Value>> for Record {
  fn from(map: IndexMap<String, serde_json::Value>) -> Self {
    let fields = map
      .into_iter()
      .map(|(field, value)| {
        let value = match value {
          serde_json::Value::String(value) => value,
          serde_json::Value::Null => String::new(),
          other => other.to_string(),
        };
        (field, value)
      })
      .collect();
    Self { fields }
  }
}

impl From<Record> for IndexMap<String, String> {
  fn from(record: Record) -> Self {
    record.fields
  }
}

impl<K, V> FromIterator<(K, V)> for Record
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut record = Self::new();
    for (field, value) in iter {
      record.insert(field, value);
    }
    record
  }
}

/// Builds the fragment for `record`: a bold heading paragraph followed by one
/// paragraph per field, `field:` in italics then the value, in mapping order.
///
/// Each further line of a multi-line value gets a paragraph of its own.
pub fn fragment_document(record: &Record, heading: &str) -> Document {
  let mut blocks = Vec::with_capacity(record.len() + 1);
  blocks.push(Block::paragraph().with_span(Span::new(heading, Marks::BOLD)));
  for (field, value) in record.iter() {
    let mut lines = value
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line));
    let mut block = Block::paragraph();
    block.push_span(Span::new(format!("{field}:"), Marks::ITALIC));
    block.push_span(Span::plain(format!(" {}", lines.next().unwrap_or_default())));
    blocks.push(block);
    blocks.extend(lines.map(|line| Block::paragraph().with_span(Span::plain(line))));
  }
  Document::from_blocks(blocks)
}

pub fn format_fragment(record: &Record) -> String {
  format_fragment_with_heading(record, DEFAULT_FRAGMENT_HEADING)
}

pub fn format_fragment_with_heading(record: &Record, heading: &str) -> String {
  markup::render(&fragment_document(record, heading))
}
