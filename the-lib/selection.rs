//! Selection ranges and their tracking across re-renders.
//!
//! A [`Range`] has an `anchor` and a `head` in flat document offsets (see
//! [`crate::document`]). When `anchor == head` the range is a caret.
//!
//! ```text
//! anchor=2, head=7: "he[llo w]orld"  (forward selection)
//! anchor=7, head=2: "he]llo w[orld"  (backward selection)
//! anchor=5, head=5: "hello|world"    (caret)
//! ```
//!
//! The [`SelectionTracker`] owns the editing point between commands. It
//! captures the host's live range before a mutation and puts it back once the
//! host shows the new content. A range that no longer fits the document is
//! never applied; the caret goes to the end of the document instead.

use crate::{
  document::Document,
  surface::HostSurface,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub const fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  pub const fn point(pos: usize) -> Self {
    Self::new(pos, pos)
  }

  /// Start of the range regardless of direction.
  #[inline]
  pub fn from(&self) -> usize {
    self.anchor.min(self.head)
  }

  /// End of the range regardless of direction.
  #[inline]
  pub fn to(&self) -> usize {
    self.anchor.max(self.head)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }
}

#[derive(Debug, Default, Clone)]
pub struct SelectionTracker {
  last: Option<Range>,
}

impl SelectionTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Last range seen through a selection-change event, capture or restore.
  pub fn last(&self) -> Option<Range> {
    self.last
  }

  /// Records a selection-change event from the host.
  pub fn observe(&mut self, range: Option<Range>) {
    self.last = range;
  }

  pub fn clear(&mut self) {
    self.last = None;
  }

  /// Reads the host's active range.
  ///
  /// Hosts drop their live range when focus moves to a toolbar, so the last
  /// observed range stands in when the surface reports none.
  pub fn capture<S>(&mut self, surface: &S) -> Option<Range>
  where
    S: HostSurface + ?Sized,
  {
    let range = surface.selection().or(self.last);
    tracing::trace!(?range, "captured selection");
    self.last = range;
    range
  }

  /// Puts `selection` back on the surface, or places the caret at the end of
  /// `document` when there is nothing valid to restore. Returns the range
  /// that was applied.
  pub fn restore<S>(
    &mut self,
    surface: &mut S,
    selection: Option<Range>,
    document: &Document,
  ) -> Range
  where
    S: HostSurface + ?Sized,
  {
    let range = match selection.filter(|range| document.contains_range(*range)) {
      Some(range) => {
        Range::new(
          document.snap_to_grapheme(range.anchor),
          document.snap_to_grapheme(range.head),
        )
      },
      None => {
        if selection.is_some() {
          tracing::trace!(?selection, "stale selection, placing caret at end");
        }
        Range::point(document.len_chars())
      },
    };
    surface.set_selection(range);
    self.last = Some(range);
    range
  }

  /// Places the caret at the end of `document`.
  pub fn restore_to_end<S>(&mut self, surface: &mut S, document: &Document) -> Range
  where
    S: HostSurface + ?Sized,
  {
    self.restore(surface, None, document)
  }
}
