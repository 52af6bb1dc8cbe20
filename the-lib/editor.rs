//! The editing engine.
//!
//! An [`Editor`] owns the current document, the undo log, the selection
//! tracker, the host surface and the persistence sink. Every mutation goes
//! through the same pipeline:
//!
//! ```text
//! capture selection -> apply command -> commit snapshot -> render -> restore selection
//! ```
//!
//! Hosts drive it with named commands, content-changed and selection-changed
//! events. All calls are synchronous and run to completion; the cursor is
//! restored only after the host has received the new content.

use std::{
  fmt,
  sync::Arc,
};

use thiserror::Error;

use crate::{
  command::{
    Command,
    CommandError,
  },
  config::EditorConfig,
  document::Document,
  history::History,
  markup::{
    self,
    MarkupError,
  },
  persistence::{
    self,
    PersistError,
    PersistenceSink,
    Record,
  },
  selection::{
    Range,
    SelectionTracker,
  },
  surface::HostSurface,
};

#[derive(Debug, Error)]
pub enum EditorError {
  #[error(transparent)]
  Command(#[from] CommandError),
  #[error(transparent)]
  Markup(#[from] MarkupError),
  #[error(transparent)]
  Persist(#[from] PersistError),
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// A document together with the selection a command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
  pub document:  Arc<Document>,
  pub selection: Option<Range>,
}

impl EditorState {
  pub fn new(document: impl Into<Arc<Document>>, selection: Option<Range>) -> Self {
    Self {
      document: document.into(),
      selection,
    }
  }

  /// The executor step without side effects. The returned selection is the
  /// range to restore once the new document is shown; `None` means the end
  /// of the document.
  pub fn apply(&self, command: &Command) -> EditorState {
    let selection = self
      .selection
      .filter(|range| self.document.contains_range(*range));
    let document = self.document.apply(command, selection);
    let selection = match command {
      Command::Clear => None,
      Command::InsertFragment(fragment) => {
        selection.map(|range| Range::point(range.from() + fragment.len_chars()))
      },
      _ => selection,
    };
    EditorState::new(document, selection)
  }
}

pub struct Editor<S: HostSurface> {
  document: Arc<Document>,
  history:  History,
  tracker:  SelectionTracker,
  surface:  S,
  sink:     Arc<dyn PersistenceSink>,
  config:   EditorConfig,
}

impl<S: HostSurface + fmt::Debug> fmt::Debug for Editor<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Editor")
      .field("document", &self.document)
      .field("history", &self.history)
      .field("tracker", &self.tracker)
      .field("surface", &self.surface)
      .field("sink", &self.sink.name())
      .field("config", &self.config)
      .finish()
  }
}

impl<S: HostSurface> Editor<S> {
  /// Starts with the empty document and an empty history. Call
  /// [`Editor::load`] to restore a saved session.
  pub fn new(surface: S, sink: Arc<dyn PersistenceSink>, config: EditorConfig) -> Self {
    Self {
      document: Arc::new(Document::empty()),
      history: History::with_limit(config.history_limit),
      tracker: SelectionTracker::new(),
      surface,
      sink,
      config,
    }
  }

  pub fn document(&self) -> &Arc<Document> {
    &self.document
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }

  pub fn surface_mut(&mut self) -> &mut S {
    &mut self.surface
  }

  pub fn sink(&self) -> &Arc<dyn PersistenceSink> {
    &self.sink
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  /// Last selection known to the engine.
  pub fn selection(&self) -> Option<Range> {
    self.tracker.last()
  }

  pub fn state(&self) -> EditorState {
    EditorState::new(self.document.clone(), self.tracker.last())
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    self.history.can_undo()
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    self.history.can_redo()
  }

  /// Runs `command` at the host's current selection. Returns the range
  /// restored on the surface afterwards.
  pub fn execute(&mut self, command: Command) -> Range {
    let selection = self.tracker.capture(&self.surface);
    tracing::debug!(%command, ?selection, "executing command");
    let next = EditorState::new(self.document.clone(), selection).apply(&command);
    self.commit(next.document);
    self.render();
    self
      .tracker
      .restore(&mut self.surface, next.selection, &self.document)
  }

  /// Parses a command name and parameter coming from the host. Unknown names
  /// and bad parameters are rejected before anything changes.
  pub fn execute_named(&mut self, name: &str, parameter: Option<&str>) -> Result<Range> {
    let command = Command::parse(name, parameter).inspect_err(|err| {
      tracing::warn!(name, %err, "rejected command");
    })?;
    Ok(self.execute(command))
  }

  /// Steps back in history. Returns whether the document changed.
  pub fn undo(&mut self) -> bool {
    if !self.history.can_undo() {
      return false;
    }
    let Some(document) = self.history.undo().cloned() else {
      return false;
    };
    self.show(document);
    true
  }

  /// Steps forward in history. Returns whether the document changed.
  pub fn redo(&mut self) -> bool {
    if !self.history.can_redo() {
      return false;
    }
    let Some(document) = self.history.redo().cloned() else {
      return false;
    };
    self.show(document);
    true
  }

  /// Content-changed event: the user edited the surface directly.
  ///
  /// The surface already shows `markup`, so nothing is rendered back. The
  /// host's selection stays where it is when it still fits.
  pub fn handle_input(&mut self, markup: &str) -> Result<()> {
    let document = markup::parse(markup).inspect_err(|err| {
      tracing::warn!(%err, "rejected host content");
    })?;
    self.commit(Arc::new(document));

    let selection = self
      .tracker
      .capture(&self.surface)
      .filter(|range| self.document.contains_range(*range));
    match selection {
      Some(range) => self.tracker.observe(Some(range)),
      None => {
        self
          .tracker
          .restore_to_end(&mut self.surface, &self.document);
      },
    }
    Ok(())
  }

  /// Selection-changed event.
  pub fn handle_selection_change(&mut self, range: Option<Range>) {
    self.tracker.observe(range);
  }

  /// Focuses the surface. Without a live range the caret goes back to the
  /// last known selection, or to the end of the document.
  pub fn focus(&mut self) {
    self.surface.focus();
    if self.surface.selection().is_none() {
      let last = self.tracker.last();
      self.tracker.restore(&mut self.surface, last, &self.document);
    }
  }

  /// Inserts the fragment for `record` at the current selection.
  pub fn insert_record(&mut self, record: &Record) -> Range {
    let fragment = persistence::fragment_document(record, &self.config.fragment_heading);
    tracing::debug!(fields = record.len(), "inserting record");
    self.execute(Command::InsertFragment(fragment))
  }

  /// Inserts the record stored under the configured record key, if any.
  pub fn insert_stored_record(&mut self) -> Result<Option<Range>> {
    let record = persistence::load_record(&*self.sink, &self.config.record_key)?;
    Ok(record.map(|record| self.insert_record(&record)))
  }

  /// Writes the document under the configured content key. Returns the saved
  /// markup. History is not touched.
  pub fn save(&self) -> Result<String> {
    Ok(persistence::save(
      &*self.sink,
      &self.config.content_key,
      &self.document,
    )?)
  }

  /// Restores the saved document as the new history floor. Returns `None`
  /// and leaves everything as it was when nothing is stored.
  pub fn load(&mut self) -> Result<Option<Arc<Document>>> {
    let Some(document) = persistence::load(&*self.sink, &self.config.content_key)? else {
      return Ok(None);
    };
    let document = Arc::new(document);
    self.history.reset();
    self.tracker.clear();
    self.commit(document.clone());
    self.render();
    self
      .tracker
      .restore_to_end(&mut self.surface, &self.document);
    Ok(Some(document))
  }

  /// Back to the empty document with an empty history and no selection.
  pub fn reset(&mut self) {
    self.document = Arc::new(Document::empty());
    self.history.reset();
    self.tracker.clear();
    self.render();
  }

  fn commit(&mut self, document: Arc<Document>) {
    self.history.commit(document.clone());
    self.document = document;
  }

  fn render(&mut self) {
    let markup = markup::render(&self.document);
    self.surface.set_content(&markup);
  }

  /// Shows a history entry with the caret at the end.
  fn show(&mut self, document: Arc<Document>) {
    self.document = document;
    self.render();
    self
      .tracker
      .restore_to_end(&mut self.surface, &self.document);
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::{
    document::{
      CaretStyle,
      Marks,
    },
    persistence::MemorySink,
    surface::HeadlessSurface,
  };

  fn editor() -> Editor<HeadlessSurface> {
    Editor::new(
      HeadlessSurface::new(),
      Arc::new(MemorySink::new()),
      EditorConfig::default(),
    )
  }

  fn type_text(editor: &mut Editor<HeadlessSurface>, text: &str) {
    let markup = markup::render(&Document::from_text(text));
    editor.surface_mut().set_content(&markup);
    editor.handle_input(&markup).unwrap();
  }

  #[test]
  fn bold_without_selection_toggles_at_end() {
    let mut editor = editor();
    type_text(&mut editor, "hello");
    editor.surface_mut().blur();

    let caret = editor.execute(Command::Bold);
    assert_eq!(caret, Range::point(5));
    assert_eq!(editor.document().text(), "hello");
    assert_eq!(editor.document().caret_marks(), Some(Marks::BOLD));
    assert_eq!(
      editor.surface().content(),
      "<p>hello<strong></strong></p>"
    );
  }

  #[test]
  fn bold_at_a_caret_applies_at_the_caret() {
    let mut editor = editor();
    type_text(&mut editor, "hello world");
    editor.surface_mut().select(Range::point(2));

    let caret = editor.execute(Command::Bold);
    assert_eq!(caret, Range::point(2));
    assert_eq!(
      editor.document().caret(),
      Some(CaretStyle::new(2, Marks::BOLD))
    );
    assert_eq!(
      editor.surface().content(),
      "<p>he<strong></strong>llo world</p>"
    );

    // The host types into the empty element.
    editor
      .handle_input("<p>he<strong>y</strong>llo world</p>")
      .unwrap();
    assert_eq!(editor.document().blocks()[0].spans()[1].marks, Marks::BOLD);
    assert_eq!(editor.document().caret(), None);
  }

  #[test]
  fn selection_survives_formatting() {
    let mut editor = editor();
    type_text(&mut editor, "hello world");
    editor.surface_mut().select(Range::new(0, 5));

    let restored = editor.execute(Command::Italic);
    assert_eq!(restored, Range::new(0, 5));
    assert_eq!(editor.surface().selection(), Some(Range::new(0, 5)));
    assert_eq!(
      editor.surface().content(),
      "<p><em>hello</em> world</p>"
    );
  }

  #[test]
  fn toolbar_focus_loss_uses_last_observed_selection() {
    let mut editor = editor();
    type_text(&mut editor, "abc");
    editor.handle_selection_change(Some(Range::new(1, 2)));
    editor.surface_mut().blur();

    editor.execute(Command::Underline);
    assert_eq!(
      editor.surface().content(),
      "<p>a<u>b</u>c</p>"
    );
  }

  #[test]
  fn clear_puts_caret_at_end_of_empty_document() {
    let mut editor = editor();
    type_text(&mut editor, "abc");
    editor.surface_mut().select(Range::new(0, 3));

    let caret = editor.execute(Command::Clear);
    assert_eq!(caret, Range::point(0));
    assert_eq!(**editor.document(), Document::empty());
    assert_eq!(editor.surface().content(), "");
  }

  #[test]
  fn undo_and_redo_render_with_caret_at_end() {
    let mut editor = editor();
    type_text(&mut editor, "a");
    type_text(&mut editor, "ab");
    editor.surface_mut().select(Range::point(0));

    assert!(editor.undo());
    assert_eq!(editor.surface().content(), "<p>a</p>");
    assert_eq!(editor.surface().selection(), Some(Range::point(1)));
    assert!(!editor.undo());

    assert!(editor.redo());
    assert_eq!(editor.surface().content(), "<p>ab</p>");
    assert_eq!(editor.surface().selection(), Some(Range::point(2)));
    assert!(!editor.redo());
  }

  #[test]
  fn malformed_input_is_rejected() {
    let mut editor = editor();
    type_text(&mut editor, "keep");
    let len = editor.history().len();

    // Unclosed elements are fine, unterminated tags are not.
    editor.handle_input("<p>broken").unwrap();
    assert!(matches!(
      editor.handle_input("<p class=\"x>"),
      Err(EditorError::Markup(MarkupError::UnterminatedAttribute(0)))
    ));
    assert_eq!(editor.history().len(), len + 1);
    assert_eq!(editor.document().text(), "broken");
  }

  #[test]
  fn input_keeps_a_valid_host_selection() {
    let mut editor = editor();
    editor.surface_mut().select(Range::point(2));
    type_text(&mut editor, "abcd");
    assert_eq!(editor.surface().selection(), Some(Range::point(2)));
    assert_eq!(editor.selection(), Some(Range::point(2)));

    editor.surface_mut().select(Range::point(40));
    type_text(&mut editor, "ab");
    assert_eq!(editor.surface().selection(), Some(Range::point(2)));
  }

  #[test]
  fn unknown_command_is_rejected_before_mutation() {
    let mut editor = editor();
    type_text(&mut editor, "abc");
    let renders = editor.surface().renders();
    let len = editor.history().len();

    assert!(matches!(
      editor.execute_named("strikeThrough", None),
      Err(EditorError::Command(CommandError::Unknown(_)))
    ));
    assert_eq!(editor.surface().renders(), renders);
    assert_eq!(editor.history().len(), len);

    editor.execute_named("justifyCenter", None).unwrap();
    assert_eq!(
      editor.surface().content(),
      "<p style=\"text-align: center\">abc</p>"
    );
  }

  #[test]
  fn focus_places_caret_at_end_without_selection() {
    let mut editor = editor();
    type_text(&mut editor, "hey");
    editor.surface_mut().blur();
    editor.handle_selection_change(None);

    editor.focus();
    assert!(editor.surface().is_focused());
    assert_eq!(editor.surface().selection(), Some(Range::point(3)));
  }

  #[test]
  fn record_is_inserted_at_the_caret() {
    let mut editor = editor();
    type_text(&mut editor, "Notes");
    editor.surface_mut().select(Range::point(5));

    let record: Record = [("name", "<Ada>")].into_iter().collect();
    let caret = editor.insert_record(&record);
    assert_eq!(editor.document().text(), "NotesUser Details:\nname: <Ada>");
    assert_eq!(caret, Range::point(editor.document().len_chars()));
    assert!(editor.surface().content().contains("&lt;Ada&gt;"));
  }

  #[test]
  fn stored_record_is_read_from_the_sink() {
    let sink = MemorySink::new().with_entry("userData", r#"{"name":"Ada","id":"USER_7"}"#);
    let mut editor = Editor::new(
      HeadlessSurface::new(),
      Arc::new(sink),
      EditorConfig::default(),
    );
    assert!(editor.insert_stored_record().unwrap().is_some());
    assert_eq!(
      editor.document().text(),
      "User Details:\nname: Ada\nid: USER_7"
    );

    let mut empty = self::editor();
    assert_eq!(empty.insert_stored_record().unwrap(), None);
    assert!(empty.history().is_empty());
  }

  #[test]
  fn save_does_not_touch_history() {
    let mut editor = editor();
    type_text(&mut editor, "draft");
    let len = editor.history().len();

    let markup = editor.save().unwrap();
    assert_eq!(markup, "<p>draft</p>");
    assert_eq!(editor.history().len(), len);
    assert_eq!(
      editor.sink().get("richTextContent").unwrap().as_deref(),
      Some("<p>draft</p>")
    );
  }

  #[test]
  fn load_commits_a_new_floor() {
    let sink = Arc::new(MemorySink::new().with_entry("richTextContent", "<p>saved</p>"));
    let mut editor = Editor::new(HeadlessSurface::new(), sink, EditorConfig::default());
    type_text(&mut editor, "scratch");
    type_text(&mut editor, "scratch 2");

    let loaded = editor.load().unwrap();
    assert_eq!(loaded.map(|doc| doc.text()).as_deref(), Some("saved"));
    assert_eq!(editor.history().len(), 1);
    assert!(!editor.can_undo());
    assert_eq!(editor.surface().content(), "<p>saved</p>");
    assert_eq!(editor.surface().selection(), Some(Range::point(5)));
  }

  #[test]
  fn reset_empties_everything() {
    let mut editor = editor();
    type_text(&mut editor, "abc");
    editor.handle_selection_change(Some(Range::point(1)));
    editor.reset();
    assert!(editor.document().is_empty());
    assert!(editor.history().is_empty());
    assert_eq!(editor.selection(), None);
    assert_eq!(editor.surface().content(), "");
  }

  #[test]
  fn history_limit_comes_from_config() {
    let config = EditorConfig {
      history_limit: NonZeroUsize::new(2),
      ..EditorConfig::default()
    };
    let mut editor = Editor::new(HeadlessSurface::new(), Arc::new(MemorySink::new()), config);
    for text in ["a", "ab", "abc"] {
      type_text(&mut editor, text);
    }
    assert_eq!(editor.history().len(), 2);
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.document().text(), "ab");
  }

  #[test]
  fn state_apply_is_pure() {
    let state = EditorState::new(Document::from_text("abc"), Some(Range::new(0, 3)));
    let next = state.apply(&Command::Bold);
    assert_eq!(state.document.text(), "abc");
    assert_eq!(state.document.blocks()[0].spans()[0].marks, Marks::empty());
    assert_eq!(next.document.blocks()[0].spans()[0].marks, Marks::BOLD);
    assert_eq!(next.selection, Some(Range::new(0, 3)));

    let cleared = state.apply(&Command::Clear);
    assert_eq!(cleared.selection, None);
    assert!(cleared.document.is_empty());
  }
}
