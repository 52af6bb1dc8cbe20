//! Host surface abstraction for `the-lib`.
//!
//! The engine never reaches into a live editable widget. Hosts (a browser
//! bridge, a GUI text view, a test harness) implement [`HostSurface`] and the
//! editor drives them through it: render directives go out as markup, the
//! live selection is read and written as [`Range`]s.

use std::borrow::Cow;

use crate::selection::Range;

pub trait HostSurface {
  /// Markup currently shown by the host.
  fn content(&self) -> Cow<'_, str>;
  /// Render directive: replace the shown content with `markup`.
  fn set_content(&mut self, markup: &str);
  /// The host's live range, if it has one.
  fn selection(&self) -> Option<Range>;
  fn set_selection(&mut self, range: Range);
  fn focus(&mut self) {}
}

/// In-memory surface without a renderer. Used by tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct HeadlessSurface {
  content:   String,
  selection: Option<Range>,
  renders:   usize,
  focused:   bool,
}

impl HeadlessSurface {
  pub fn new() -> Self {
    Self::default()
  }

  /// Simulates the user selecting a range.
  pub fn select(&mut self, range: Range) {
    self.selection = Some(range);
  }

  /// Simulates focus leaving the surface, which drops the live range.
  pub fn blur(&mut self) {
    self.selection = None;
    self.focused = false;
  }

  /// Number of render directives received.
  pub fn renders(&self) -> usize {
    self.renders
  }

  pub fn is_focused(&self) -> bool {
    self.focused
  }
}

impl HostSurface for HeadlessSurface {
  fn content(&self) -> Cow<'_, str> {
    Cow::Borrowed(&self.content)
  }

  fn set_content(&mut self, markup: &str) {
    markup.clone_into(&mut self.content);
    self.renders += 1;
  }

  fn selection(&self) -> Option<Range> {
    self.selection
  }

  fn set_selection(&mut self, range: Range) {
    self.selection = Some(range);
  }

  fn focus(&mut self) {
    self.focused = true;
  }
}
