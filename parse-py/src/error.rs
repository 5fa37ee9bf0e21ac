use crate::loc::Loc;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use std::error::Error;
use std::fmt::Display;

/// A stable classification of syntax errors produced by the lexer and parser.
///
/// Diagnostic codes (prefix `PY`) are assigned per variant and are stable:
/// - `PY0001`: [`SyntaxErrorType::ExpectedNotFound`]
/// - `PY0002`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `PY0003`: [`SyntaxErrorType::ExpectedIndentedBlock`]
/// - `PY0004`: [`SyntaxErrorType::InconsistentDedent`]
/// - `PY0005`: [`SyntaxErrorType::InvalidAssignmentTarget`]
/// - `PY0006`: [`SyntaxErrorType::InvalidCharacter`]
/// - `PY0007`: [`SyntaxErrorType::LineTerminatorInString`]
/// - `PY0008`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `PY0009`: [`SyntaxErrorType::SingleClosingBraceInFString`]
/// - `PY0010`: [`SyntaxErrorType::TryStatementHasNoExceptOrFinally`]
/// - `PY0011`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `PY0012`: [`SyntaxErrorType::UnexpectedIndent`]
/// - `PY0013`: [`SyntaxErrorType::UnterminatedString`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  ExpectedNotFound,
  ExpectedSyntax(&'static str),
  ExpectedIndentedBlock,
  InconsistentDedent,
  InvalidAssignmentTarget,
  InvalidCharacter,
  LineTerminatorInString,
  RequiredTokenNotFound(TT),
  SingleClosingBraceInFString,
  TryStatementHasNoExceptOrFinally,
  UnexpectedEnd,
  UnexpectedIndent,
  UnterminatedString,
}

#[derive(Clone)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub actual_token: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      actual_token,
    }
  }

  pub fn code(&self) -> &'static str {
    self.typ.code()
  }

  pub fn message(&self) -> String {
    self.typ.message(self.actual_token)
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self, self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code(), self.message())
  }
}

impl Error for SyntaxError {}

impl PartialEq for SyntaxError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ
  }
}

impl Eq for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  /// Stable diagnostic code for this syntax error variant.
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::ExpectedNotFound => "PY0001",
      SyntaxErrorType::ExpectedSyntax(_) => "PY0002",
      SyntaxErrorType::ExpectedIndentedBlock => "PY0003",
      SyntaxErrorType::InconsistentDedent => "PY0004",
      SyntaxErrorType::InvalidAssignmentTarget => "PY0005",
      SyntaxErrorType::InvalidCharacter => "PY0006",
      SyntaxErrorType::LineTerminatorInString => "PY0007",
      SyntaxErrorType::RequiredTokenNotFound(_) => "PY0008",
      SyntaxErrorType::SingleClosingBraceInFString => "PY0009",
      SyntaxErrorType::TryStatementHasNoExceptOrFinally => "PY0010",
      SyntaxErrorType::UnexpectedEnd => "PY0011",
      SyntaxErrorType::UnexpectedIndent => "PY0012",
      SyntaxErrorType::UnterminatedString => "PY0013",
    }
  }

  /// Human-readable message describing this syntax error.
  pub fn message(&self, actual_token: Option<TT>) -> String {
    match self {
      SyntaxErrorType::ExpectedNotFound => "expected token not found".into(),
      SyntaxErrorType::ExpectedSyntax(expected) => match actual_token {
        Some(tok) => format!("expected {}, found {:?}", expected, tok),
        None => format!("expected {}", expected),
      },
      SyntaxErrorType::ExpectedIndentedBlock => "expected an indented block".into(),
      SyntaxErrorType::InconsistentDedent => {
        "unindent does not match any outer indentation level".into()
      }
      SyntaxErrorType::InvalidAssignmentTarget => "invalid assignment target".into(),
      SyntaxErrorType::InvalidCharacter => "invalid character".into(),
      SyntaxErrorType::LineTerminatorInString => {
        "line terminator not allowed in single-quoted string".into()
      }
      SyntaxErrorType::RequiredTokenNotFound(token) => match actual_token {
        Some(actual) => format!("expected token {:?}, found {:?}", token, actual),
        None => format!("expected token {:?}", token),
      },
      SyntaxErrorType::SingleClosingBraceInFString => {
        "single '}' is not allowed in f-string".into()
      }
      SyntaxErrorType::TryStatementHasNoExceptOrFinally => {
        "try statement requires an except or finally block".into()
      }
      SyntaxErrorType::UnexpectedEnd => actual_token
        .map(|tok| format!("unexpected end before {:?}", tok))
        .unwrap_or_else(|| "unexpected end of input".into()),
      SyntaxErrorType::UnexpectedIndent => "unexpected indent".into(),
      SyntaxErrorType::UnterminatedString => "unterminated string literal".into(),
    }
  }
}
