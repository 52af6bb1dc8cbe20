//! Editing commands.
//!
//! Commands arrive by name from toolbars and host bridges. Names are matched
//! case-sensitively and include the aliases browsers use for the same
//! operation:
//!
//! | Command | Names |
//! |---------|-------|
//! | [`Command::Bold`] | `bold` |
//! | [`Command::Italic`] | `italic` |
//! | [`Command::Underline`] | `underline` |
//! | [`Command::BulletList`] | `bulletList`, `insertUnorderedList` |
//! | [`Command::AlignLeft`] | `alignLeft`, `justifyLeft` |
//! | [`Command::AlignCenter`] | `alignCenter`, `justifyCenter` |
//! | [`Command::AlignRight`] | `alignRight`, `justifyRight` |
//! | [`Command::InsertFragment`] | `insertFragment`, `insertHTML` (takes markup) |
//! | [`Command::Clear`] | `clear` |

use std::{
  fmt,
  str::FromStr,
};

use thiserror::Error;

use crate::{
  document::Document,
  markup::{
    self,
    MarkupError,
  },
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
  #[error("unknown command '{0}'")]
  Unknown(String),
  #[error("command '{0}' requires a markup parameter")]
  MissingParameter(CommandKind),
  #[error("command '{0}' takes no parameter")]
  UnexpectedParameter(CommandKind),
  #[error("invalid fragment: {0}")]
  Fragment(#[from] MarkupError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
  Bold,
  Italic,
  Underline,
  BulletList,
  AlignLeft,
  AlignCenter,
  AlignRight,
  InsertFragment,
  Clear,
}

impl CommandKind {
  pub const ALL: [CommandKind; 9] = [
    Self::Bold,
    Self::Italic,
    Self::Underline,
    Self::BulletList,
    Self::AlignLeft,
    Self::AlignCenter,
    Self::AlignRight,
    Self::InsertFragment,
    Self::Clear,
  ];

  /// Canonical name.
  pub const fn name(self) -> &'static str {
    match self {
      Self::Bold => "bold",
      Self::Italic => "italic",
      Self::Underline => "underline",
      Self::BulletList => "bulletList",
      Self::AlignLeft => "alignLeft",
      Self::AlignCenter => "alignCenter",
      Self::AlignRight => "alignRight",
      Self::InsertFragment => "insertFragment",
      Self::Clear => "clear",
    }
  }

  pub const fn takes_parameter(self) -> bool {
    matches!(self, Self::InsertFragment)
  }
}

impl fmt::Display for CommandKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for CommandKind {
  type Err = CommandError;

  fn from_str(s: &str) -> Result<Self> {
    let kind = match s {
      "bold" => Self::Bold,
      "italic" => Self::Italic,
      "underline" => Self::Underline,
      "bulletList" | "insertUnorderedList" => Self::BulletList,
      "alignLeft" | "justifyLeft" => Self::AlignLeft,
      "alignCenter" | "justifyCenter" => Self::AlignCenter,
      "alignRight" | "justifyRight" => Self::AlignRight,
      "insertFragment" | "insertHTML" => Self::InsertFragment,
      "clear" => Self::Clear,
      _ => return Err(CommandError::Unknown(s.to_string())),
    };
    Ok(kind)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Bold,
  Italic,
  Underline,
  BulletList,
  AlignLeft,
  AlignCenter,
  AlignRight,
  /// Replace the selection with a parsed fragment.
  InsertFragment(Document),
  /// Replace the whole document with the empty document.
  Clear,
}

impl Command {
  pub fn kind(&self) -> CommandKind {
    match self {
      Self::Bold => CommandKind::Bold,
      Self::Italic => CommandKind::Italic,
      Self::Underline => CommandKind::Underline,
      Self::BulletList => CommandKind::BulletList,
      Self::AlignLeft => CommandKind::AlignLeft,
      Self::AlignCenter => CommandKind::AlignCenter,
      Self::AlignRight => CommandKind::AlignRight,
      Self::InsertFragment(_) => CommandKind::InsertFragment,
      Self::Clear => CommandKind::Clear,
    }
  }

  /// Builds a command from its name and optional parameter.
  pub fn parse(name: &str, parameter: Option<&str>) -> Result<Self> {
    let kind = name.parse::<CommandKind>()?;
    match (kind.takes_parameter(), parameter) {
      (true, None) => return Err(CommandError::MissingParameter(kind)),
      (false, Some(_)) => return Err(CommandError::UnexpectedParameter(kind)),
      _ => {},
    }

    let command = match kind {
      CommandKind::Bold => Self::Bold,
      CommandKind::Italic => Self::Italic,
      CommandKind::Underline => Self::Underline,
      CommandKind::BulletList => Self::BulletList,
      CommandKind::AlignLeft => Self::AlignLeft,
      CommandKind::AlignCenter => Self::AlignCenter,
      CommandKind::AlignRight => Self::AlignRight,
      CommandKind::InsertFragment => {
        Self::insert_fragment(parameter.unwrap_or_default())?
      },
      CommandKind::Clear => Self::Clear,
    };
    Ok(command)
  }

  pub fn insert_fragment(markup: &str) -> Result<Self> {
    Ok(Self::InsertFragment(markup::parse(markup)?))
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.kind().fmt(f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_names_round_trip() {
    for kind in CommandKind::ALL {
      assert_eq!(kind.name().parse::<CommandKind>(), Ok(kind));
    }
  }

  #[test]
  fn browser_aliases() {
    assert_eq!(
      "insertUnorderedList".parse::<CommandKind>(),
      Ok(CommandKind::BulletList)
    );
    assert_eq!(
      "justifyCenter".parse::<CommandKind>(),
      Ok(CommandKind::AlignCenter)
    );
    assert_eq!(
      "insertHTML".parse::<CommandKind>(),
      Ok(CommandKind::InsertFragment)
    );
  }

  #[test]
  fn unknown_names_are_rejected() {
    assert_eq!(
      Command::parse("strikeThrough", None),
      Err(CommandError::Unknown("strikeThrough".into()))
    );
    assert!(Command::parse("Bold", None).is_err());
  }

  #[test]
  fn parameters_are_checked() {
    assert_eq!(
      Command::parse("insertFragment", None),
      Err(CommandError::MissingParameter(CommandKind::InsertFragment))
    );
    assert_eq!(
      Command::parse("bold", Some("x")),
      Err(CommandError::UnexpectedParameter(CommandKind::Bold))
    );
    assert_eq!(
      Command::parse("insertHTML", Some("<p")),
      Err(CommandError::Fragment(MarkupError::UnterminatedTag(0)))
    );
  }

  #[test]
  fn fragment_parameter_is_parsed() {
    let command = Command::parse("insertFragment", Some("<p>hi</p>")).unwrap();
    assert_eq!(command, Command::InsertFragment(Document::from_text("hi")));
    assert_eq!(command.to_string(), "insertFragment");
  }
}
