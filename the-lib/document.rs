//! Rich-text document model.
//!
//! A [`Document`] is an immutable-by-convention tree of [`Block`]s, each made
//! of [`Span`]s of text that share one set of inline [`Marks`]. Editing never
//! mutates a document in place: [`Document::apply`] returns the next value and
//! the caller swaps its reference.
//!
//! # Positions
//!
//! Offsets are char offsets over the flat text of the document, where
//! consecutive blocks are separated by one boundary position:
//!
//! ```text
//! blocks: ["ab", "", "cde"]
//! flat:    a b | | c d e
//! offset:  0 1 2 3 4 5 6 7
//! ```
//!
//! The empty document has length 0. A block of length `n` starting at `s`
//! accepts positions `s..=s + n`.
//!
//! # Normalization
//!
//! Blocks never hold empty spans and never hold two adjacent spans with equal
//! marks, so structural equality is content equality. The optional caret style
//! (see [`Document::caret`]) is dropped whenever it matches the marks a char
//! typed at its offset would inherit anyway.

use bitflags::bitflags;
use smallvec::{
  SmallVec,
  smallvec,
};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
  Tendril,
  command::Command,
  selection::Range,
};

bitflags! {
  /// Inline formatting carried by a [`Span`].
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct Marks: u8 {
    const BOLD      = 1 << 0;
    const ITALIC    = 1 << 1;
    const UNDERLINE = 1 << 2;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
  #[default]
  Left,
  Center,
  Right,
}

impl Alignment {
  pub const fn as_css(self) -> &'static str {
    match self {
      Self::Left => "left",
      Self::Center => "center",
      Self::Right => "right",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
  #[default]
  Paragraph,
  BulletItem,
}

/// A run of text with uniform marks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
  pub text:  Tendril,
  pub marks: Marks,
}

impl Span {
  pub fn new(text: impl Into<Tendril>, marks: Marks) -> Self {
    Self {
      text: text.into(),
      marks,
    }
  }

  pub fn plain(text: impl Into<Tendril>) -> Self {
    Self::new(text, Marks::empty())
  }

  pub fn len_chars(&self) -> usize {
    self.text.chars().count()
  }

  fn split(self, at: usize) -> (Span, Span) {
    let byte = byte_offset(&self.text, at);
    let left = Span::new(&self.text[..byte], self.marks);
    let right = Span::new(&self.text[byte..], self.marks);
    (left, right)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Block {
  kind:  BlockKind,
  align: Alignment,
  spans: Vec<Span>,
}

impl Block {
  pub fn new(kind: BlockKind, align: Alignment) -> Self {
    Self {
      kind,
      align,
      spans: Vec::new(),
    }
  }

  pub fn paragraph() -> Self {
    Self::default()
  }

  pub fn bullet() -> Self {
    Self::new(BlockKind::BulletItem, Alignment::Left)
  }

  #[must_use]
  pub fn with_align(mut self, align: Alignment) -> Self {
    self.align = align;
    self
  }

  #[must_use]
  pub fn with_span(mut self, span: Span) -> Self {
    self.push_span(span);
    self
  }

  pub fn kind(&self) -> BlockKind {
    self.kind
  }

  pub fn align(&self) -> Alignment {
    self.align
  }

  pub fn spans(&self) -> &[Span] {
    &self.spans
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  pub fn len_chars(&self) -> usize {
    self.spans.iter().map(Span::len_chars).sum()
  }

  pub fn text(&self) -> String {
    self.spans.iter().map(|span| span.text.as_str()).collect()
  }

  /// Appends a span, merging it into the previous one when the marks match.
  pub fn push_span(&mut self, span: Span) {
    push_normalized(&mut self.spans, span);
  }

  pub fn extend_spans(&mut self, spans: impl IntoIterator<Item = Span>) {
    for span in spans {
      self.push_span(span);
    }
  }

  fn last_marks(&self) -> Marks {
    self
      .spans
      .last()
      .map_or(Marks::empty(), |span| span.marks)
  }

  /// Marks of the char before `at`, or of the first char when `at` is 0.
  fn marks_at(&self, at: usize) -> Marks {
    let mut end = 0;
    for span in &self.spans {
      end += span.len_chars();
      if at <= end {
        return span.marks;
      }
    }
    self.last_marks()
  }

  /// Splits the block at a char offset, keeping `..at` and returning `at..`
  /// as a block with the same attributes.
  fn split_off(&mut self, at: usize) -> Block {
    let mut right = Block::new(self.kind, self.align);
    let mut left = Vec::with_capacity(self.spans.len());
    let mut offset = 0;
    for span in std::mem::take(&mut self.spans) {
      let len = span.len_chars();
      if offset + len <= at {
        left.push(span);
      } else if offset >= at {
        right.push_span(span);
      } else {
        let (head, tail) = span.split(at - offset);
        left.push(head);
        right.push_span(tail);
      }
      offset += len;
    }
    self.spans = left;
    right
  }

  /// Whether every char in `from..to` carries `mark`. Vacuously true for an
  /// empty range.
  fn all_marked(&self, from: usize, to: usize, mark: Marks) -> bool {
    let mut offset = 0;
    for span in &self.spans {
      let (start, end) = (offset, offset + span.len_chars());
      offset = end;
      if end <= from || start >= to {
        continue;
      }
      if !span.marks.contains(mark) {
        return false;
      }
    }
    true
  }

  fn map_marks(&mut self, from: usize, to: usize, f: impl Fn(Marks) -> Marks) {
    let mut spans = Vec::with_capacity(self.spans.len() + 2);
    let mut offset = 0;
    for span in std::mem::take(&mut self.spans) {
      let len = span.len_chars();
      let (start, end) = (offset, offset + len);
      offset = end;
      if end <= from || start >= to {
        push_normalized(&mut spans, span);
        continue;
      }
      let lo = from.max(start) - start;
      let hi = to.min(end) - start;
      let (head, rest) = span.split(lo);
      let (mut middle, tail) = rest.split(hi - lo);
      middle.marks = f(middle.marks);
      push_normalized(&mut spans, head);
      push_normalized(&mut spans, middle);
      push_normalized(&mut spans, tail);
    }
    self.spans = spans;
  }
}

fn push_normalized(spans: &mut Vec<Span>, span: Span) {
  if span.text.is_empty() {
    return;
  }
  match spans.last_mut() {
    Some(last) if last.marks == span.marks => last.text.push_str(&span.text),
    _ => spans.push(span),
  }
}

fn byte_offset(text: &str, char_idx: usize) -> usize {
  text
    .char_indices()
    .nth(char_idx)
    .map_or(text.len(), |(idx, _)| idx)
}

/// Typing style pending at a collapsed caret: the marks the next char typed
/// at `offset` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaretStyle {
  pub offset: usize,
  pub marks:  Marks,
}

impl CaretStyle {
  pub fn new(offset: usize, marks: Marks) -> Self {
    Self { offset, marks }
  }
}

/// The full editable content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Document {
  blocks: Vec<Block>,
  caret:  Option<CaretStyle>,
}

impl Document {
  /// The canonical empty document.
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn from_blocks(blocks: Vec<Block>) -> Self {
    Self {
      blocks,
      caret: None,
    }
  }

  /// Plain paragraphs, one per `\n`-separated line. The empty string yields
  /// the empty document.
  pub fn from_text(text: &str) -> Self {
    if text.is_empty() {
      return Self::empty();
    }
    let blocks = text
      .split('\n')
      .map(|line| Block::paragraph().with_span(Span::plain(line)))
      .collect();
    Self::from_blocks(blocks)
  }

  /// Sets the caret style. Offsets past the end are clamped and offsets
  /// inside a grapheme cluster move to its start.
  #[must_use]
  pub fn with_caret(mut self, caret: Option<CaretStyle>) -> Self {
    self.caret = caret.map(|caret| {
      let offset = self.snap_to_grapheme(caret.offset.min(self.len_chars()));
      CaretStyle::new(offset, caret.marks)
    });
    self.normalize_caret();
    if self.caret.is_some() {
      self.ensure_block();
    }
    self
  }

  pub fn blocks(&self) -> &[Block] {
    &self.blocks
  }

  pub fn caret(&self) -> Option<CaretStyle> {
    self.caret
  }

  pub fn caret_marks(&self) -> Option<Marks> {
    self.caret.map(|caret| caret.marks)
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty() && self.caret.is_none()
  }

  pub fn len_chars(&self) -> usize {
    match self.blocks.len() {
      0 => 0,
      n => self.blocks.iter().map(Block::len_chars).sum::<usize>() + n - 1,
    }
  }

  /// Flat text with blocks joined by `\n`.
  pub fn text(&self) -> String {
    let mut text = String::new();
    for (idx, block) in self.blocks.iter().enumerate() {
      if idx > 0 {
        text.push('\n');
      }
      for span in &block.spans {
        text.push_str(&span.text);
      }
    }
    text
  }

  pub fn contains_range(&self, range: Range) -> bool {
    let len = self.len_chars();
    range.anchor <= len && range.head <= len
  }

  /// Moves `pos` back to the nearest grapheme cluster boundary.
  pub fn snap_to_grapheme(&self, pos: usize) -> usize {
    let Some((index, offset)) = self.locate(pos) else {
      return 0;
    };
    let begin = pos.min(self.len_chars()) - offset;
    let text = self.blocks[index].text();
    let mut boundary = 0;
    for grapheme in text.graphemes(true) {
      let next = boundary + grapheme.chars().count();
      if next > offset {
        break;
      }
      boundary = next;
    }
    begin + boundary
  }

  /// Applies `command` at `selection` and returns the resulting document.
  ///
  /// A selection that does not fit this document is ignored and the command
  /// falls back to the trailing edge. `Clear` ignores the selection.
  pub fn apply(&self, command: &Command, selection: Option<Range>) -> Document {
    let selection = selection.filter(|range| self.contains_range(*range));
    let mut doc = self.clone();
    match command {
      Command::Bold => doc.toggle_mark(Marks::BOLD, selection),
      Command::Italic => doc.toggle_mark(Marks::ITALIC, selection),
      Command::Underline => doc.toggle_mark(Marks::UNDERLINE, selection),
      Command::BulletList => doc.toggle_bullets(selection),
      Command::AlignLeft => doc.set_alignment(Alignment::Left, selection),
      Command::AlignCenter => doc.set_alignment(Alignment::Center, selection),
      Command::AlignRight => doc.set_alignment(Alignment::Right, selection),
      Command::InsertFragment(fragment) => doc.insert_fragment(fragment, selection),
      Command::Clear => return Document::empty(),
    }
    doc
  }

  /// `(start, end)` of every block in flat offsets.
  fn block_bounds(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    self.blocks.iter().scan(0usize, |start, block| {
      let begin = *start;
      let end = begin + block.len_chars();
      *start = end + 1;
      Some((begin, end))
    })
  }

  /// Block index and in-block offset for `pos`, clamped to the document end.
  fn locate(&self, pos: usize) -> Option<(usize, usize)> {
    let mut last = None;
    for (idx, (begin, end)) in self.block_bounds().enumerate() {
      if pos <= end {
        return Some((idx, pos.saturating_sub(begin)));
      }
      last = Some((idx, end - begin));
    }
    last
  }

  /// Marks a char typed at `pos` would inherit.
  fn marks_at(&self, pos: usize) -> Marks {
    self
      .locate(pos)
      .map_or(Marks::empty(), |(index, offset)| {
        self.blocks[index].marks_at(offset)
      })
  }

  fn normalize_caret(&mut self) {
    if let Some(caret) = self.caret
      && caret.marks == self.marks_at(caret.offset)
    {
      self.caret = None;
    }
  }

  fn is_placeholder(&self) -> bool {
    matches!(self.blocks.as_slice(), [block] if block.is_empty())
  }

  fn ensure_block(&mut self) {
    if self.blocks.is_empty() {
      self.blocks.push(Block::paragraph());
    }
  }

  fn touched_blocks(&self, selection: Option<Range>) -> SmallVec<[usize; 4]> {
    let last = self.blocks.len().saturating_sub(1);
    let Some(range) = selection else {
      return smallvec![last];
    };
    let (from, to) = (range.from(), range.to());
    let touched: SmallVec<[usize; 4]> = self
      .block_bounds()
      .enumerate()
      .filter(|(_, (begin, end))| *begin <= to && from <= *end)
      .map(|(idx, _)| idx)
      .collect();
    if touched.is_empty() {
      smallvec![last]
    } else {
      touched
    }
  }

  fn toggle_mark(&mut self, mark: Marks, selection: Option<Range>) {
    let Some(range) = selection.filter(|range| !range.is_empty()) else {
      let offset = match selection {
        Some(caret) => self.snap_to_grapheme(caret.head),
        None => self.len_chars(),
      };
      let base = match self.caret {
        Some(caret) if caret.offset == offset => caret.marks,
        _ => self.marks_at(offset),
      };
      self.ensure_block();
      self.caret = Some(CaretStyle::new(offset, base ^ mark));
      self.normalize_caret();
      return;
    };

    let (from, to) = (range.from(), range.to());
    let bounds: Vec<(usize, usize)> = self.block_bounds().collect();
    let remove = bounds
      .iter()
      .zip(&self.blocks)
      .all(|(&(begin, end), block)| {
        let (lo, hi) = (from.max(begin), to.min(end));
        lo >= hi || block.all_marked(lo - begin, hi - begin, mark)
      });

    for (&(begin, end), block) in bounds.iter().zip(self.blocks.iter_mut()) {
      let (lo, hi) = (from.max(begin), to.min(end));
      if lo >= hi {
        continue;
      }
      if remove {
        block.map_marks(lo - begin, hi - begin, |marks| marks - mark);
      } else {
        block.map_marks(lo - begin, hi - begin, |marks| marks | mark);
      }
    }
    self.normalize_caret();
  }

  fn toggle_bullets(&mut self, selection: Option<Range>) {
    self.ensure_block();
    let touched = self.touched_blocks(selection);
    let kind = if touched
      .iter()
      .all(|&idx| self.blocks[idx].kind == BlockKind::BulletItem)
    {
      BlockKind::Paragraph
    } else {
      BlockKind::BulletItem
    };
    for idx in touched {
      self.blocks[idx].kind = kind;
    }
  }

  fn set_alignment(&mut self, align: Alignment, selection: Option<Range>) {
    self.ensure_block();
    for idx in self.touched_blocks(selection) {
      self.blocks[idx].align = align;
    }
  }

  fn insert_fragment(&mut self, fragment: &Document, selection: Option<Range>) {
    self.caret = None;
    match selection {
      Some(range) => {
        self.delete(range.from(), range.to());
        self.splice(range.from(), fragment);
      },
      // A lone empty block is a placeholder, not a line.
      None if self.is_placeholder() && !fragment.blocks.is_empty() => {
        self.blocks = fragment.blocks.clone();
      },
      None => self.blocks.extend(fragment.blocks.iter().cloned()),
    }
  }

  fn delete(&mut self, from: usize, to: usize) {
    if from >= to {
      return;
    }
    let (Some((first, start)), Some((last, end))) = (self.locate(from), self.locate(to)) else {
      return;
    };
    let tail = self.blocks[last].split_off(end);
    self.blocks[first].split_off(start);
    self.blocks[first].extend_spans(tail.spans);
    if last > first {
      self.blocks.drain(first + 1..=last);
    }
  }

  /// Merges `fragment` into the block at `at`.
  fn splice(&mut self, at: usize, fragment: &Document) {
    let Some((first, incoming)) = fragment.blocks.split_first() else {
      return;
    };
    let Some((index, offset)) = self.locate(at) else {
      self.blocks = fragment.blocks.clone();
      return;
    };

    let tail = self.blocks[index].split_off(offset);
    self.blocks[index].extend_spans(first.spans.iter().cloned());

    let mut rest = incoming.to_vec();
    match rest.last_mut() {
      Some(last) => last.extend_spans(tail.spans),
      None => self.blocks[index].extend_spans(tail.spans),
    }
    self.blocks.splice(index + 1..index + 1, rest);
  }
}
