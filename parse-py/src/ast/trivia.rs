use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

/// A single token and the whitespace, line continuations and (inside brackets) comments that precede it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Drive, DriveMut, Serialize)]
pub struct Leaf {
  #[drive(skip)]
  pub ws: String,
  #[drive(skip)]
  pub text: String,
}

impl Leaf {
  pub fn new(ws: impl Into<String>, text: impl Into<String>) -> Leaf {
    Leaf {
      ws: ws.into(),
      text: text.into(),
    }
  }

  pub fn bare(text: impl Into<String>) -> Leaf {
    Leaf::new("", text)
  }

  /// A token preceded by a single space.
  pub fn spaced(text: impl Into<String>) -> Leaf {
    Leaf::new(" ", text)
  }
}

/// The end of a logical line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Drive, DriveMut, Serialize)]
pub struct Newline {
  // Trailing whitespace and comment.
  #[drive(skip)]
  pub ws: String,
  // None is the module's default line terminator. An empty string is the end of a file that has no final line terminator.
  #[drive(skip)]
  pub value: Option<String>,
}

impl Newline {
  pub fn is_eof(&self) -> bool {
    self.value.as_deref() == Some("")
  }
}

/// A line that holds only whitespace and possibly a comment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Drive, DriveMut, Serialize)]
pub struct EmptyLine {
  // Whether the line starts with the indentation of the block it sits in. Such lines follow the block when it is moved.
  #[drive(skip)]
  pub indent: bool,
  #[drive(skip)]
  pub ws: String,
  #[drive(skip)]
  pub newline: Option<String>,
}

impl EmptyLine {
  pub fn blank() -> EmptyLine {
    EmptyLine::default()
  }

  pub fn has_comment(&self) -> bool {
    self.ws.contains('#')
  }
}
