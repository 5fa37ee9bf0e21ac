use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum TT {
  // Special token used to represent the end of the source code. Easier than using and handling Option everywhere.
  EOF,
  // Special token used to represent invalid source code. Easier than having to propagate SyntaxError from the lexer level, which means even peeking during parsing requires error handling.
  Invalid,
  // A blank or comment-only line between statements. The token covers the whole line including its line terminator.
  EmptyLine,
  // The end of a logical line. Its trivia holds any trailing whitespace and comment; its range is the line terminator itself.
  Newline,

  Ampersand,
  AmpersandEquals,
  Asterisk,
  AsteriskAsterisk,
  AsteriskAsteriskEquals,
  AsteriskEquals,
  At,
  AtEquals,
  Bar,
  BarEquals,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  Caret,
  CaretEquals,
  ChevronLeft,
  ChevronLeftChevronLeft,
  ChevronLeftChevronLeftEquals,
  ChevronLeftEquals,
  ChevronRight,
  ChevronRightChevronRight,
  ChevronRightChevronRightEquals,
  ChevronRightEquals,
  Colon,
  ColonEquals,
  Comma,
  Dot,
  DotDotDot,
  Equals,
  EqualsEquals,
  Exclamation,
  ExclamationEquals,
  FStringEnd,
  FStringMiddle,
  FStringStart,
  Hyphen,
  HyphenChevronRight,
  HyphenEquals,
  Identifier,
  KeywordAnd,
  KeywordAs,
  KeywordAssert,
  KeywordAsync,
  KeywordAwait,
  KeywordBreak,
  KeywordClass,
  KeywordContinue,
  KeywordDef,
  KeywordDel,
  KeywordElif,
  KeywordElse,
  KeywordExcept,
  KeywordFalse,
  KeywordFinally,
  KeywordFor,
  KeywordFrom,
  KeywordGlobal,
  KeywordIf,
  KeywordImport,
  KeywordIn,
  KeywordIs,
  KeywordLambda,
  KeywordNone,
  KeywordNonlocal,
  KeywordNot,
  KeywordOr,
  KeywordPass,
  KeywordRaise,
  KeywordReturn,
  KeywordTrue,
  KeywordTry,
  KeywordWhile,
  KeywordWith,
  KeywordYield,
  LiteralNumber,
  LiteralString,
  ParenthesisClose,
  ParenthesisOpen,
  Percent,
  PercentEquals,
  Plus,
  PlusEquals,
  Semicolon,
  Slash,
  SlashEquals,
  SlashSlash,
  SlashSlashEquals,
  Tilde,
}

impl TT {
  pub fn is_augmented_assignment(self) -> bool {
    matches!(
      self,
      TT::AmpersandEquals
        | TT::AsteriskAsteriskEquals
        | TT::AsteriskEquals
        | TT::AtEquals
        | TT::BarEquals
        | TT::CaretEquals
        | TT::ChevronLeftChevronLeftEquals
        | TT::ChevronRightChevronRightEquals
        | TT::HyphenEquals
        | TT::PercentEquals
        | TT::PlusEquals
        | TT::SlashEquals
        | TT::SlashSlashEquals
    )
  }
}

#[derive(Clone, Debug)]
pub struct Token {
  pub loc: Loc,
  // Trivia between the previous token and this one: spaces, tabs, line continuations, comments, and (inside brackets) line terminators. Never includes indentation.
  pub ws: Loc,
  // Set only on the first token of a logical line: the indentation preceding it.
  pub indent: Option<Loc>,
  pub typ: TT,
}

impl Token {
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, Some(self.typ))
  }
}
