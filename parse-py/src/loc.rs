use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::token::TT;
use serde::Serialize;
use std::cmp::max;
use std::cmp::min;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Add;
use std::ops::AddAssign;

/// A location within the current source file expressed as UTF-8 byte offsets.
///
/// Nodes generated by a rewrite carry the location of the construct they were derived from, or `Loc(0, 0)` when there is none.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct Loc(pub usize, pub usize);

/// One-based line and column of a byte offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LineCol {
  pub line: usize,
  pub col: usize,
}

impl Display for LineCol {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.col)
  }
}

impl Loc {
  pub fn error(self, typ: SyntaxErrorType, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError::new(typ, self, actual_token)
  }

  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1.saturating_sub(self.0)
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }

  pub fn add_option(self, rhs: Option<Loc>) -> Loc {
    let mut new = self;
    if let Some(rhs) = rhs {
      new.extend(rhs);
    };
    new
  }

  /// Line and column of the start of this location within `source`. Columns count characters, not bytes.
  pub fn line_col(&self, source: &str) -> LineCol {
    let start = min(self.0, source.len());
    let before = &source[..floor_char_boundary(source, start)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    LineCol { line, col }
  }
}

fn floor_char_boundary(source: &str, mut i: usize) -> usize {
  while i > 0 && !source.is_char_boundary(i) {
    i -= 1;
  }
  i
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extends_to_cover_both() {
    assert_eq!(Loc(4, 6) + Loc(1, 2), Loc(1, 6));
    assert_eq!(Loc(4, 6).add_option(None), Loc(4, 6));
  }

  #[test]
  fn computes_line_and_column() {
    let source = "a = 1\nbb = ñ + 2\n";
    assert_eq!(Loc(0, 1).line_col(source), LineCol { line: 1, col: 1 });
    assert_eq!(Loc(6, 8).line_col(source), LineCol { line: 2, col: 1 });
    // `+` sits after a two-byte character.
    let plus = source.find('+').unwrap();
    assert_eq!(Loc(plus, plus + 1).line_col(source), LineCol { line: 2, col: 8 });
  }
}
