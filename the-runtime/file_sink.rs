//! Directory-backed persistence sink.
//!
//! Every key maps to one file under the sink's root. Bytes outside
//! `[A-Za-z0-9_-]` are percent-encoded in the file name, so distinct keys
//! never share a file and no key can escape the root. Writes go through a
//! temporary file in the same directory and are renamed into place.

use std::{
  borrow::Cow,
  fmt::Write as _,
  fs,
  io::{
    self,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use tempfile::NamedTempFile;
use the_lib::persistence::{
  PersistError,
  PersistenceSink,
  Result,
};

#[derive(Debug, Clone)]
pub struct FileSink {
  root: PathBuf,
}

impl FileSink {
  /// The root directory is created on the first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path_for(&self, key: &str) -> Result<PathBuf> {
    Ok(self.root.join(file_name(key)?))
  }
}

fn file_name(key: &str) -> Result<String> {
  if key.is_empty() {
    return Err(PersistError::Io(io::Error::new(
      io::ErrorKind::InvalidInput,
      "empty persistence key",
    )));
  }
  let mut name = String::with_capacity(key.len());
  for byte in key.bytes() {
    if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
      name.push(char::from(byte));
    } else {
      let _ = write!(name, "%{byte:02X}");
    }
  }
  Ok(name)
}

impl PersistenceSink for FileSink {
  fn name(&self) -> Cow<'_, str> {
    "file".into()
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key)?;
    match fs::read_to_string(&path) {
      Ok(value) => Ok(Some(value)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(err) => Err(err.into()),
    }
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    let path = self.path_for(key)?;
    fs::create_dir_all(&self.root)?;
    let mut file = NamedTempFile::new_in(&self.root)?;
    file.write_all(value.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|err| err.error)?;
    tracing::debug!(path = %path.display(), bytes = value.len(), "wrote snapshot");
    Ok(())
  }
}
