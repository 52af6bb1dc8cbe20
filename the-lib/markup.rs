//! Markup codec for [`Document`]s.
//!
//! [`render`] produces the canonical markup handed to host surfaces and
//! persistence sinks. [`parse`] reads markup back: both our own output and the
//! looser markup an editable host reports after the user types into it.
//!
//! # Canonical form
//!
//! | Model | Markup |
//! |-------|--------|
//! | paragraph | `<p>…</p>` |
//! | run of bullet items | `<ul><li>…</li><li>…</li></ul>` |
//! | centered / right block | `style="text-align: center"` on the block |
//! | bold, italic, underline | `<strong>`, `<em>`, `<u>`, nested in that order |
//! | caret style | empty marked element at the caret offset |
//!
//! Text and attribute values are always escaped, so no field value can open or
//! close an element.
//!
//! # Reading host markup
//!
//! The reader accepts the subset of HTML editable surfaces emit: `div`, `h1`
//! to `h6`, `blockquote` and `pre` are read as paragraphs, `b`/`i` as
//! `strong`/`em`, `span` styles (`font-weight`, `font-style`,
//! `text-decoration`) as marks, and `ol` like `ul`. Unknown elements are
//! transparent, `script` and `style` bodies are dropped, whitespace-only text
//! spanning a line break is indentation and a trailing `<br>` placeholder is
//! not a line.
//!
//! For every normalized document `d`, `parse(&render(&d)) == Ok(d)`.

use std::borrow::Cow;

use thiserror::Error;

use crate::{
  Tendril,
  document::{
    Alignment,
    Block,
    BlockKind,
    CaretStyle,
    Document,
    Marks,
    Span,
  },
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkupError {
  #[error("unterminated tag starting at byte {0}")]
  UnterminatedTag(usize),
  #[error("unterminated comment starting at byte {0}")]
  UnterminatedComment(usize),
  #[error("unterminated attribute value in tag starting at byte {0}")]
  UnterminatedAttribute(usize),
}

pub type Result<T> = std::result::Result<T, MarkupError>;

const MARK_TAGS: [(Marks, &str); 3] = [
  (Marks::BOLD, "strong"),
  (Marks::ITALIC, "em"),
  (Marks::UNDERLINE, "u"),
];

const BLOCK_TAGS: &[&str] = &[
  "p",
  "div",
  "li",
  "h1",
  "h2",
  "h3",
  "h4",
  "h5",
  "h6",
  "blockquote",
  "pre",
];

const LIST_TAGS: &[&str] = &["ul", "ol"];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

pub fn render(document: &Document) -> String {
  let mut out = String::new();
  let mut in_list = false;
  let mut start = 0;

  for block in document.blocks() {
    let item = block.kind() == BlockKind::BulletItem;
    if item != in_list {
      out.push_str(if item { "<ul>" } else { "</ul>" });
      in_list = item;
    }

    let tag = if item { "li" } else { "p" };
    out.push('<');
    out.push_str(tag);
    if block.align() != Alignment::Left {
      out.push_str(" style=\"text-align: ");
      out.push_str(block.align().as_css());
      out.push('"');
    }
    out.push('>');

    let len = block.len_chars();
    let caret = document.caret().and_then(|caret| {
      let at = caret.offset.checked_sub(start).filter(|&at| at <= len)?;
      Some((at, caret.marks))
    });
    push_spans(&mut out, block.spans(), caret);
    start += len + 1;

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
  }

  if in_list {
    out.push_str("</ul>");
  }
  out
}

/// Pushes `spans`, with the caret style at in-block offset `caret.0`.
fn push_spans(out: &mut String, spans: &[Span], mut caret: Option<(usize, Marks)>) {
  let mut offset = 0;
  for span in spans {
    let len = span.len_chars();
    match caret {
      Some((at, marks)) if at < offset + len => {
        let byte = span
          .text
          .char_indices()
          .nth(at - offset)
          .map_or(span.text.len(), |(idx, _)| idx);
        if byte > 0 {
          push_marked(out, &span.text[..byte], span.marks);
        }
        push_marked(out, "", marks);
        push_marked(out, &span.text[byte..], span.marks);
        caret = None;
      },
      _ => push_marked(out, &span.text, span.marks),
    }
    offset += len;
  }
  if let Some((_, marks)) = caret {
    push_marked(out, "", marks);
  }
}

fn push_marked(out: &mut String, text: &str, marks: Marks) {
  if marks.is_empty() && text.is_empty() {
    out.push_str("<span></span>");
    return;
  }
  for (mark, tag) in MARK_TAGS {
    if marks.contains(mark) {
      out.push('<');
      out.push_str(tag);
      out.push('>');
    }
  }
  out.push_str(&escape(text));
  for (mark, tag) in MARK_TAGS.iter().rev() {
    if marks.contains(*mark) {
      out.push_str("</");
      out.push_str(tag);
      out.push('>');
    }
  }
}

/// Escapes `&`, `<`, `>`, quotes and line breaks. Raw line breaks in markup
/// are formatting whitespace only.
pub fn escape(text: &str) -> Cow<'_, str> {
  if !text.contains(['&', '<', '>', '"', '\'', '\n', '\r']) {
    return Cow::Borrowed(text);
  }
  let mut out = String::with_capacity(text.len() + 16);
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      '\n' => out.push_str("&#10;"),
      '\r' => out.push_str("&#13;"),
      _ => out.push(ch),
    }
  }
  Cow::Owned(out)
}

/// Decodes character references. Unknown or malformed references are kept
/// literally.
pub fn unescape(text: &str) -> Cow<'_, str> {
  if !text.contains('&') {
    return Cow::Borrowed(text);
  }
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(idx) = rest.find('&') {
    out.push_str(&rest[..idx]);
    rest = &rest[idx..];
    match decode_entity(rest) {
      Some((ch, len)) => {
        out.push(ch);
        rest = &rest[len..];
      },
      None => {
        out.push('&');
        rest = &rest[1..];
      },
    }
  }
  out.push_str(rest);
  Cow::Owned(out)
}

fn decode_entity(text: &str) -> Option<(char, usize)> {
  let end = text.find(';').filter(|&end| end <= 10)?;
  let ch = match &text[1..end] {
    "amp" => '&',
    "lt" => '<',
    "gt" => '>',
    "quot" => '"',
    "apos" => '\'',
    "nbsp" => '\u{a0}',
    body => {
      let num = body.strip_prefix('#')?;
      let code = match num.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => num.parse().ok()?,
      };
      char::from_u32(code)?
    },
  };
  Some((ch, end + 1))
}

pub fn parse(markup: &str) -> Result<Document> {
  let mut builder = Builder::default();
  let mut tokenizer = Tokenizer::new(markup);
  while let Some(token) = tokenizer.next_token()? {
    match token {
      Token::Text(text) => builder.text(text),
      Token::Open {
        name,
        attrs,
        self_closing,
      } => builder.open(&name, &attrs, self_closing),
      Token::Close(name) => builder.close(&name),
    }
  }
  Ok(builder.finish())
}

#[derive(Debug)]
struct Attribute<'a> {
  name:  Tendril,
  value: Cow<'a, str>,
}

#[derive(Debug)]
enum Token<'a> {
  Text(&'a str),
  Open {
    name:         Tendril,
    attrs:        Vec<Attribute<'a>>,
    self_closing: bool,
  },
  Close(Tendril),
}

struct Tokenizer<'a> {
  input: &'a str,
  /// The current byte index of the input being considered.
  pos:   usize,
}

impl<'a> Tokenizer<'a> {
  fn new(input: &'a str) -> Self {
    Self { input, pos: 0 }
  }

  fn byte(&self) -> Option<u8> {
    self.input.as_bytes().get(self.pos).copied()
  }

  fn peek_byte(&self) -> Option<u8> {
    self.input.as_bytes().get(self.pos + 1).copied()
  }

  fn rest(&self) -> &'a str {
    &self.input[self.pos..]
  }

  fn take_while(&mut self, f: impl Fn(u8) -> bool) -> &'a str {
    let input = self.input;
    let start = self.pos;
    while let Some(byte) = self.byte() {
      if !f(byte) {
        break;
      }
      self.pos += 1;
    }
    &input[start..self.pos]
  }

  fn skip_whitespace(&mut self) {
    self.take_while(|byte| byte.is_ascii_whitespace());
  }

  fn next_token(&mut self) -> Result<Option<Token<'a>>> {
    loop {
      let Some(byte) = self.byte() else {
        return Ok(None);
      };
      if byte != b'<' {
        return Ok(Some(Token::Text(self.take_while(|byte| byte != b'<'))));
      }
      match self.peek_byte() {
        Some(b'!') => self.skip_declaration()?,
        Some(b'/') => return self.close_tag().map(Some),
        Some(next) if next.is_ascii_alphabetic() => return self.open_tag().map(Some),
        _ => {
          let start = self.pos;
          self.pos += 1;
          return Ok(Some(Token::Text(&self.input[start..self.pos])));
        },
      }
    }
  }

  /// Skips comments and `<!DOCTYPE …>`-style declarations.
  fn skip_declaration(&mut self) -> Result<()> {
    let start = self.pos;
    if let Some(body) = self.rest().strip_prefix("<!--") {
      let end = body
        .find("-->")
        .ok_or(MarkupError::UnterminatedComment(start))?;
      self.pos = start + 4 + end + 3;
    } else {
      let end = self
        .rest()
        .find('>')
        .ok_or(MarkupError::UnterminatedTag(start))?;
      self.pos = start + end + 1;
    }
    Ok(())
  }

  fn close_tag(&mut self) -> Result<Token<'a>> {
    let start = self.pos;
    let end = self
      .rest()
      .find('>')
      .ok_or(MarkupError::UnterminatedTag(start))?;
    let name = self.input[start + 2..start + end]
      .split_ascii_whitespace()
      .next()
      .unwrap_or_default();
    self.pos = start + end + 1;
    Ok(Token::Close(name.to_ascii_lowercase().into()))
  }

  fn open_tag(&mut self) -> Result<Token<'a>> {
    let start = self.pos;
    self.pos += 1;
    let name: Tendril = self
      .take_while(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b':'))
      .to_ascii_lowercase()
      .into();
    let mut attrs = Vec::new();

    loop {
      self.skip_whitespace();
      match self.byte() {
        None => return Err(MarkupError::UnterminatedTag(start)),
        Some(b'>') => {
          self.pos += 1;
          return Ok(Token::Open {
            name,
            attrs,
            self_closing: false,
          });
        },
        Some(b'/') => {
          self.pos += 1;
          if self.byte() == Some(b'>') {
            self.pos += 1;
            return Ok(Token::Open {
              name,
              attrs,
              self_closing: true,
            });
          }
        },
        Some(_) => {
          let attr_name = self.take_while(|byte| {
            !byte.is_ascii_whitespace() && !matches!(byte, b'=' | b'>' | b'/')
          });
          if attr_name.is_empty() {
            // A stray `=`.
            self.pos += 1;
            continue;
          }
          self.skip_whitespace();
          let value = if self.byte() == Some(b'=') {
            self.pos += 1;
            self.skip_whitespace();
            self.attribute_value(start)?
          } else {
            Cow::Borrowed("")
          };
          attrs.push(Attribute {
            name: attr_name.to_ascii_lowercase().into(),
            value,
          });
        },
      }
    }
  }

  fn attribute_value(&mut self, tag_start: usize) -> Result<Cow<'a, str>> {
    match self.byte() {
      Some(quote @ (b'"' | b'\'')) => {
        let begin = self.pos + 1;
        let len = self.input[begin..]
          .find(char::from(quote))
          .ok_or(MarkupError::UnterminatedAttribute(tag_start))?;
        self.pos = begin + len + 1;
        Ok(unescape(&self.input[begin..begin + len]))
      },
      _ => {
        let raw = self.take_while(|byte| !byte.is_ascii_whitespace() && byte != b'>');
        Ok(unescape(raw))
      },
    }
  }
}

/// An open block-level or list element.
#[derive(Debug)]
struct Context {
  tag:          Tendril,
  kind:         BlockKind,
  align:        Alignment,
  inline_depth: usize,
}

/// An open inline element and the marks in effect inside it.
#[derive(Debug)]
struct Inline {
  tag:       Tendril,
  marks:     Marks,
  emitted:   usize,
  has_child: bool,
}

#[derive(Debug, Default)]
struct Builder {
  blocks:        Vec<Block>,
  current:       Option<Block>,
  contexts:      Vec<Context>,
  inline:        Vec<Inline>,
  pending_break: bool,
  /// Block index, in-block offset and marks of the last empty inline element.
  caret:         Option<(usize, usize, Marks)>,
  /// Number of text runs emitted so far.
  emitted:       usize,
  raw_depth:     usize,
}

impl Builder {
  fn ambient(&self) -> (BlockKind, Alignment) {
    self
      .contexts
      .last()
      .map_or((BlockKind::Paragraph, Alignment::Left), |ctx| {
        (ctx.kind, ctx.align)
      })
  }

  fn marks(&self) -> Marks {
    self
      .inline
      .last()
      .map_or(Marks::empty(), |inline| inline.marks)
  }

  fn open(&mut self, name: &str, attrs: &[Attribute<'_>], self_closing: bool) {
    if self.raw_depth > 0 {
      return;
    }
    if name == "br" {
      self.line_break();
    } else if RAW_TEXT_TAGS.contains(&name) {
      if !self_closing {
        self.raw_depth += 1;
      }
    } else if BLOCK_TAGS.contains(&name) || LIST_TAGS.contains(&name) {
      self.open_block(name, attrs);
      if self_closing {
        self.close_block(name);
      }
    } else if let Some(marks) = inline_marks(name, attrs) {
      let marks = self.marks() | marks;
      if let Some(parent) = self.inline.last_mut() {
        parent.has_child = true;
      }
      self.inline.push(Inline {
        tag: name.into(),
        marks,
        emitted: self.emitted,
        has_child: false,
      });
      if self_closing {
        self.close_inline(name);
      }
    }
  }

  fn close(&mut self, name: &str) {
    if self.raw_depth > 0 {
      if RAW_TEXT_TAGS.contains(&name) {
        self.raw_depth -= 1;
      }
      return;
    }
    if BLOCK_TAGS.contains(&name) || LIST_TAGS.contains(&name) {
      self.close_block(name);
    } else {
      self.close_inline(name);
    }
  }

  fn open_block(&mut self, name: &str, attrs: &[Attribute<'_>]) {
    let (parent_kind, parent_align) = self.ambient();
    // An enclosing block interrupted by a nested one keeps only real content.
    if let Some(block) = self.current.take() {
      if !block.text().trim().is_empty() {
        self.blocks.push(block);
      } else if self
        .caret
        .is_some_and(|(index, ..)| index == self.blocks.len())
      {
        self.caret = None;
      }
    }

    let align = attrs_alignment(attrs).unwrap_or(parent_align);
    let kind = if name == "li" {
      BlockKind::BulletItem
    } else {
      parent_kind
    };
    self.contexts.push(Context {
      tag: name.into(),
      kind,
      align,
      inline_depth: self.inline.len(),
    });
    self.pending_break = false;
    if !LIST_TAGS.contains(&name) {
      self.current = Some(Block::new(kind, align));
    }
  }

  fn close_block(&mut self, name: &str) {
    let Some(idx) = self
      .contexts
      .iter()
      .rposition(|ctx| ctx.tag.as_str() == name)
    else {
      return;
    };
    if let Some(block) = self.current.take() {
      self.blocks.push(block);
    }
    self.inline.truncate(self.contexts[idx].inline_depth);
    self.contexts.truncate(idx);
    self.pending_break = false;
  }

  fn close_inline(&mut self, name: &str) {
    let Some(idx) = self
      .inline
      .iter()
      .rposition(|inline| inline.tag.as_str() == name)
    else {
      return;
    };
    let floor = self.contexts.last().map_or(0, |ctx| ctx.inline_depth);
    if idx < floor {
      return;
    }

    let inline = &self.inline[idx];
    if inline.emitted == self.emitted && !inline.has_child {
      let marks = inline.marks;
      if self.current.is_none() {
        self.start_implicit();
      }
      if self.pending_break {
        self.break_line();
      }
      let at = self.current.as_ref().map_or(0, Block::len_chars);
      self.caret = Some((self.blocks.len(), at, marks));
    }
    self.inline.truncate(idx);
  }

  fn text(&mut self, raw: &str) {
    if self.raw_depth > 0 || raw.is_empty() {
      return;
    }
    let blank = raw.trim().is_empty();
    // Indentation between elements.
    if blank && raw.contains(['\n', '\r']) {
      return;
    }
    if self.current.is_none() {
      if blank {
        return;
      }
      self.start_implicit();
    }
    if self.pending_break {
      self.break_line();
    }

    let text = unescape(raw);
    let marks = self.marks();
    if let Some(block) = self.current.as_mut() {
      block.push_span(Span::new(&*text, marks));
    }
    self.emitted += 1;
  }

  fn line_break(&mut self) {
    if self.pending_break {
      self.break_line();
    }
    if self.current.is_none() {
      self.start_implicit();
    }
    self.pending_break = true;
  }

  fn break_line(&mut self) {
    self.pending_break = false;
    if let Some(block) = self.current.take() {
      let next = Block::new(block.kind(), block.align());
      self.blocks.push(block);
      self.current = Some(next);
    }
  }

  fn start_implicit(&mut self) {
    let (kind, align) = self.ambient();
    self.current = Some(Block::new(kind, align));
  }

  fn finish(mut self) -> Document {
    if let Some(block) = self.current.take() {
      self.blocks.push(block);
    }
    let caret = self.caret.and_then(|(index, at, marks)| {
      let start: usize = self
        .blocks
        .get(..index)?
        .iter()
        .map(|block| block.len_chars() + 1)
        .sum();
      Some(CaretStyle::new(start + at, marks))
    });
    Document::from_blocks(self.blocks).with_caret(caret)
  }
}

fn inline_marks(name: &str, attrs: &[Attribute<'_>]) -> Option<Marks> {
  let marks = match name {
    "strong" | "b" => Marks::BOLD,
    "em" | "i" => Marks::ITALIC,
    "u" | "ins" => Marks::UNDERLINE,
    "span" | "font" => style_marks(attrs),
    _ => return None,
  };
  Some(marks)
}

fn style_declarations(style: &str) -> impl Iterator<Item = (String, String)> + '_ {
  style.split(';').filter_map(|decl| {
    let (prop, value) = decl.split_once(':')?;
    Some((
      prop.trim().to_ascii_lowercase(),
      value.trim().to_ascii_lowercase(),
    ))
  })
}

fn style_marks(attrs: &[Attribute<'_>]) -> Marks {
  let mut marks = Marks::empty();
  for attr in attrs.iter().filter(|attr| attr.name.as_str() == "style") {
    for (prop, value) in style_declarations(&attr.value) {
      match prop.as_str() {
        "font-weight"
          if matches!(value.as_str(), "bold" | "bolder")
            || value.parse::<u16>().is_ok_and(|weight| weight >= 600) =>
        {
          marks |= Marks::BOLD;
        },
        "font-style" if matches!(value.as_str(), "italic" | "oblique") => {
          marks |= Marks::ITALIC;
        },
        "text-decoration" | "text-decoration-line" if value.contains("underline") => {
          marks |= Marks::UNDERLINE;
        },
        _ => {},
      }
    }
  }
  marks
}

fn attrs_alignment(attrs: &[Attribute<'_>]) -> Option<Alignment> {
  attrs.iter().find_map(|attr| {
    match attr.name.as_str() {
      "align" => parse_alignment(&attr.value),
      "style" => {
        style_declarations(&attr.value)
          .find(|(prop, _)| prop == "text-align")
          .and_then(|(_, value)| parse_alignment(&value))
      },
      _ => None,
    }
  })
}

fn parse_alignment(value: &str) -> Option<Alignment> {
  match value.trim().to_ascii_lowercase().as_str() {
    "left" | "start" | "justify" => Some(Alignment::Left),
    "center" => Some(Alignment::Center),
    "right" | "end" => Some(Alignment::Right),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use quickcheck::{
    Arbitrary,
    Gen,
  };

  use super::*;

  fn para(spans: &[Span]) -> Block {
    let mut block = Block::paragraph();
    block.extend_spans(spans.iter().cloned());
    block
  }

  #[test]
  fn renders_canonical_markup() {
    let doc = Document::from_blocks(vec![
      para(&[
        Span::new("Hi", Marks::BOLD | Marks::UNDERLINE),
        Span::plain(" there"),
      ]),
      Block::bullet().with_span(Span::plain("one")),
      Block::bullet()
        .with_align(Alignment::Right)
        .with_span(Span::plain("two")),
      Block::paragraph().with_align(Alignment::Center),
    ]);
    assert_eq!(
      render(&doc),
      "<p><strong><u>Hi</u></strong> there</p><ul><li>one</li><li style=\"text-align: \
       right\">two</li></ul><p style=\"text-align: center\"></p>"
    );
    assert_eq!(parse(&render(&doc)), Ok(doc));
  }

  #[test]
  fn empty_document_renders_nothing() {
    assert_eq!(render(&Document::empty()), "");
    assert_eq!(parse(""), Ok(Document::empty()));
    assert_eq!(parse("  \n "), Ok(Document::empty()));
  }

  #[test]
  fn caret_style_survives_a_round_trip() {
    let bold = Document::from_text("abc").with_caret(Some(CaretStyle::new(3, Marks::BOLD)));
    assert_eq!(render(&bold), "<p>abc<strong></strong></p>");
    assert_eq!(parse(&render(&bold)), Ok(bold));

    let plain_after_bold = Document::from_blocks(vec![para(&[Span::new("x", Marks::BOLD)])])
      .with_caret(Some(CaretStyle::new(1, Marks::empty())));
    assert_eq!(
      render(&plain_after_bold),
      "<p><strong>x</strong><span></span></p>"
    );
    assert_eq!(parse(&render(&plain_after_bold)), Ok(plain_after_bold));

    let nested = Document::from_text("y")
      .with_caret(Some(CaretStyle::new(1, Marks::BOLD | Marks::ITALIC)));
    assert_eq!(parse(&render(&nested)), Ok(nested));
  }

  #[test]
  fn caret_style_renders_at_its_offset() {
    let doc = Document::from_blocks(vec![
      para(&[Span::plain("ab")]),
      para(&[Span::new("cdef", Marks::BOLD)]),
    ])
    .with_caret(Some(CaretStyle::new(5, Marks::BOLD | Marks::UNDERLINE)));
    assert_eq!(
      render(&doc),
      "<p>ab</p><p><strong>cd</strong><strong><u></u></strong><strong>ef</strong></p>"
    );
    assert_eq!(parse(&render(&doc)), Ok(doc));

    let at_block_start = Document::from_text("ab
cd")
      .with_caret(Some(CaretStyle::new(3, Marks::ITALIC)));
    assert_eq!(render(&at_block_start), "<p>ab</p><p><em></em>cd</p>");
    assert_eq!(parse(&render(&at_block_start)), Ok(at_block_start));
  }

  #[test]
  fn redundant_caret_style_is_dropped() {
    let doc = Document::from_blocks(vec![para(&[Span::new("abc", Marks::BOLD)])])
      .with_caret(Some(CaretStyle::new(2, Marks::BOLD)));
    assert_eq!(doc.caret(), None);
    assert_eq!(
      parse("<p><strong>a<strong></strong>bc</strong></p>"),
      Ok(doc)
    );
  }

  #[test]
  fn escapes_structural_characters() {
    let doc = Document::from_text("<b>\"a\" & 'b'</b>");
    let markup = render(&doc);
    assert_eq!(
      markup,
      "<p>&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;</p>"
    );
    assert_eq!(parse(&markup), Ok(doc));
  }

  #[test]
  fn decodes_entities() {
    assert_eq!(unescape("a &amp;&lt;&gt; &#65;&#x42; &nbsp;"), "a &<> AB \u{a0}");
    assert_eq!(unescape("AT&T &bogus; &#xZZ;"), "AT&T &bogus; &#xZZ;");
  }

  #[test]
  fn reads_execcommand_style_markup() {
    let markup = "<b>bold</b> text<div style=\"text-align: center;\">centered</div><ul><li>one</li><li>two<br></li></ul>";
    let doc = parse(markup).unwrap();
    assert_eq!(doc.text(), "bold text\ncentered\none\ntwo");
    assert_eq!(doc.blocks()[0].spans(), &[
      Span::new("bold", Marks::BOLD),
      Span::plain(" text")
    ]);
    assert_eq!(doc.blocks()[1].align(), Alignment::Center);
    assert_eq!(doc.blocks()[3].kind(), BlockKind::BulletItem);
  }

  #[test]
  fn reads_nested_indented_fragments() {
    let markup = r#"
        <div style="margin-bottom: 16px;">
          <strong>User Details:</strong>
          <div style="margin-left: 16px;">
            <div><em>name:</em> Ada</div><div><em>id:</em> USER_1</div>
          </div>
        </div>
      "#;
    let doc = parse(markup).unwrap();
    assert_eq!(doc.blocks().len(), 3);
    assert_eq!(doc.blocks()[0].spans()[0], Span::new("User Details:", Marks::BOLD));
    assert_eq!(doc.blocks()[1].spans(), &[
      Span::new("name:", Marks::ITALIC),
      Span::plain(" Ada")
    ]);
    assert_eq!(doc.blocks()[2].text(), "id: USER_1");
  }

  #[test]
  fn line_breaks_split_blocks() {
    assert_eq!(parse("a<br>b").unwrap().text(), "a\nb");
    assert_eq!(parse("<p><br></p>").unwrap(), Document::from_blocks(vec![Block::paragraph()]));
    assert_eq!(parse("<p>a<br><br>b</p>").unwrap().text(), "a\n\nb");
  }

  #[test]
  fn span_styles_become_marks() {
    let doc = parse(
      "<p><span style=\"font-weight: 700; font-style: italic\">x</span><span \
       style='text-decoration: underline'>y</span></p>",
    )
    .unwrap();
    assert_eq!(doc.blocks()[0].spans(), &[
      Span::new("x", Marks::BOLD | Marks::ITALIC),
      Span::new("y", Marks::UNDERLINE)
    ]);
  }

  #[test]
  fn unknown_elements_are_transparent() {
    let doc = parse(
      "<!DOCTYPE html><!-- note --><p><a href=\"x\">link</a><img src=x/></p><script>var x = \
       1;</script><style>p { }</style>",
    )
    .unwrap();
    assert_eq!(doc, Document::from_text("link"));
  }

  #[test]
  fn rejects_unterminated_constructs() {
    assert_eq!(parse("ab<p"), Err(MarkupError::UnterminatedTag(2)));
    assert_eq!(parse("<!-- open"), Err(MarkupError::UnterminatedComment(0)));
    assert_eq!(
      parse("<p class=\"x>y</p>"),
      Err(MarkupError::UnterminatedAttribute(0))
    );
    assert_eq!(parse("a </p"), Err(MarkupError::UnterminatedTag(2)));
  }

  #[test]
  fn stray_angle_brackets_are_text() {
    assert_eq!(parse("<p>1 < 2</p>").unwrap().text(), "1 < 2");
  }

  /// Normalized documents over text that exercises escaping, entities and
  /// grapheme clusters.
  #[derive(Debug, Clone)]
  struct AnyDocument(Document);

  impl Arbitrary for AnyDocument {
    fn arbitrary(g: &mut Gen) -> Self {
      const CHARS: &[char] = &[
        'a', 'Z', ' ', '<', '>', '&', ';', '#', '"', '\'', '\n', '\r', '\u{e9}', '\u{301}',
        '\u{a0}',
      ];
      const KINDS: &[BlockKind] = &[BlockKind::Paragraph, BlockKind::BulletItem];
      const ALIGNS: &[Alignment] = &[Alignment::Left, Alignment::Center, Alignment::Right];

      let mut blocks = Vec::new();
      for _ in 0..usize::arbitrary(g) % 5 {
        let mut block = Block::new(*g.choose(KINDS).unwrap(), *g.choose(ALIGNS).unwrap());
        for _ in 0..usize::arbitrary(g) % 4 {
          let text: String = (0..usize::arbitrary(g) % 6)
            .map(|_| *g.choose(CHARS).unwrap())
            .collect();
          let marks = Marks::from_bits_truncate(u8::arbitrary(g));
          block.push_span(Span::new(text.as_str(), marks));
        }
        blocks.push(block);
      }

      let doc = Document::from_blocks(blocks);
      let caret = bool::arbitrary(g).then(|| {
        CaretStyle::new(
          usize::arbitrary(g) % (doc.len_chars() + 1),
          Marks::from_bits_truncate(u8::arbitrary(g)),
        )
      });
      AnyDocument(doc.with_caret(caret))
    }
  }

  quickcheck::quickcheck! {
    fn arbitrary_text_round_trips(text: String) -> bool {
      let doc = Document::from_blocks(vec![Block::paragraph().with_span(Span::plain(text.as_str()))]);
      parse(&render(&doc)) == Ok(doc)
    }

    fn normalized_documents_round_trip(doc: AnyDocument) -> bool {
      parse(&render(&doc.0)) == Ok(doc.0)
    }
  }
}
