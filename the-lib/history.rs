use std::{
  num::NonZeroUsize,
  sync::Arc,
};

use crate::document::Document;

/// Linear undo log of document snapshots.
///
/// The log starts `Empty`. The first [`History::commit`] makes it active with
/// a single entry at cursor 0. That entry is the floor: undo never goes below
/// it. Committing while the cursor is not at the last entry discards every
/// entry after the cursor, so there are no branches.
///
/// ```text
/// commit A, AB, ABC   [A, AB, ABC]   cursor 2
/// undo, undo          [A, AB, ABC]   cursor 0
/// redo                [A, AB, ABC]   cursor 1
/// commit AX           [A, AB, AX]    cursor 2
/// ```
///
/// Undo at the floor and redo at the last entry are no-ops. With a
/// configured limit the oldest entries are dropped once the log grows past
/// it, which moves the floor forward.
#[derive(Debug, Default, Clone)]
pub struct History {
  revisions: Vec<Arc<Document>>,
  current:   usize,
  limit:     Option<NonZeroUsize>,
}

impl History {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_limit(limit: Option<NonZeroUsize>) -> Self {
    Self {
      limit,
      ..Self::default()
    }
  }

  /// Appends `document` after the cursor and moves the cursor onto it.
  pub fn commit(&mut self, document: impl Into<Arc<Document>>) {
    if !self.revisions.is_empty() {
      let discarded = self.revisions.len() - self.current - 1;
      if discarded > 0 {
        tracing::debug!(discarded, "discarding redo entries");
      }
      self.revisions.truncate(self.current + 1);
    }
    self.revisions.push(document.into());
    self.current = self.revisions.len() - 1;

    if let Some(limit) = self.limit
      && self.revisions.len() > limit.get()
    {
      let excess = self.revisions.len() - limit.get();
      self.revisions.drain(..excess);
      self.current -= excess;
      tracing::debug!(excess, "history limit reached, dropping oldest entries");
    }
    tracing::debug!(
      len = self.revisions.len(),
      cursor = self.current,
      "committed history entry"
    );
  }

  /// Steps back one entry. Returns the entry at the cursor afterwards, which
  /// is unchanged at the floor. `None` while the log is empty.
  pub fn undo(&mut self) -> Option<&Arc<Document>> {
    if self.can_undo() {
      self.current -= 1;
      tracing::debug!(cursor = self.current, "undo");
    }
    self.current()
  }

  /// Steps forward one entry. Returns the entry at the cursor afterwards,
  /// which is unchanged at the last entry. `None` while the log is empty.
  pub fn redo(&mut self) -> Option<&Arc<Document>> {
    if self.can_redo() {
      self.current += 1;
      tracing::debug!(cursor = self.current, "redo");
    }
    self.current()
  }

  /// Back to `Empty`. The limit is kept.
  pub fn reset(&mut self) {
    self.revisions.clear();
    self.current = 0;
  }

  pub fn current(&self) -> Option<&Arc<Document>> {
    self.revisions.get(self.current)
  }

  /// Cursor position, `None` while the log is empty.
  pub fn cursor(&self) -> Option<usize> {
    (!self.revisions.is_empty()).then_some(self.current)
  }

  pub fn entries(&self) -> &[Arc<Document>] {
    &self.revisions
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.revisions.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.revisions.is_empty()
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    self.current > 0
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    self.current + 1 < self.revisions.len()
  }

  pub fn limit(&self) -> Option<NonZeroUsize> {
    self.limit
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn doc(text: &str) -> Document {
    Document::from_text(text)
  }

  fn texts(history: &History) -> Vec<String> {
    history.entries().iter().map(|doc| doc.text()).collect()
  }

  fn current_text(history: &History) -> Option<String> {
    history.current().map(|doc| doc.text())
  }

  #[test]
  fn test_starts_empty() {
    let mut history = History::new();
    assert!(history.is_empty());
    assert_eq!(history.cursor(), None);
    assert!(history.undo().is_none());
    assert!(history.redo().is_none());
    assert!(!history.can_undo());
    assert!(!history.can_redo());
  }

  #[test]
  fn test_linear_scenario() {
    let mut history = History::new();
    history.commit(doc("A"));
    history.commit(doc("AB"));
    history.commit(doc("ABC"));

    history.undo();
    history.undo();
    assert_eq!(current_text(&history).as_deref(), Some("A"));

    history.redo();
    assert_eq!(current_text(&history).as_deref(), Some("AB"));

    history.commit(doc("AX"));
    assert_eq!(texts(&history), ["A", "AB", "AX"]);
    assert_eq!(history.cursor(), Some(2));
    assert!(!history.can_redo());
  }

  #[test]
  fn test_boundaries_are_noops() {
    let mut history = History::new();
    history.commit(doc("A"));
    history.commit(doc("B"));

    history.redo();
    assert_eq!(history.cursor(), Some(1));

    history.undo();
    history.undo();
    history.undo();
    assert_eq!(history.cursor(), Some(0));
    assert_eq!(current_text(&history).as_deref(), Some("A"));
  }

  #[test]
  fn test_commit_after_undo_discards_redo_entries() {
    let mut history = History::new();
    for text in ["1", "2", "3", "4"] {
      history.commit(doc(text));
    }
    history.undo();
    history.undo();
    history.undo();
    history.commit(doc("5"));
    assert_eq!(texts(&history), ["1", "5"]);

    let before = history.cursor();
    history.redo();
    assert_eq!(history.cursor(), before);
  }

  #[test]
  fn test_reset() {
    let mut history = History::with_limit(NonZeroUsize::new(3));
    history.commit(doc("A"));
    history.reset();
    assert!(history.is_empty());
    assert_eq!(history.limit(), NonZeroUsize::new(3));
  }

  #[test]
  fn test_limit_moves_the_floor() {
    let mut history = History::with_limit(NonZeroUsize::new(2));
    history.commit(doc("A"));
    history.commit(doc("B"));
    history.commit(doc("C"));
    assert_eq!(texts(&history), ["B", "C"]);
    assert_eq!(history.cursor(), Some(1));

    history.undo();
    history.undo();
    assert_eq!(current_text(&history).as_deref(), Some("B"));
  }

  #[test]
  fn test_snapshots_are_shared() {
    let mut history = History::new();
    let snapshot = Arc::new(doc("A"));
    history.commit(snapshot.clone());
    assert!(Arc::ptr_eq(history.current().unwrap(), &snapshot));
  }

  quickcheck::quickcheck! {
    fn undo_then_redo_restores(commits: Vec<String>, undos: u8) -> bool {
      if commits.is_empty() {
        return true;
      }
      let mut history = History::new();
      for text in &commits {
        history.commit(doc(text));
      }
      for _ in 0..undos % 4 {
        history.undo();
      }
      let cursor = history.cursor();
      let current = current_text(&history);
      if !history.can_undo() {
        return true;
      }
      history.undo();
      history.redo();
      history.cursor() == cursor && current_text(&history) == current
    }

    fn commit_truncates_after_cursor(commits: Vec<String>, undos: u8) -> bool {
      if commits.is_empty() {
        return true;
      }
      let mut history = History::new();
      for text in &commits {
        history.commit(doc(text));
      }
      let undos = usize::from(undos) % commits.len();
      for _ in 0..undos {
        history.undo();
      }
      history.commit(doc("tip"));
      history.len() == commits.len() - undos + 1
        && !history.can_redo()
        && current_text(&history).as_deref() == Some("tip")
    }
  }
}
