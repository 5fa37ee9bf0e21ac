use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use core::ops::Index;
use memchr::memchr2;
use once_cell::sync::Lazy;

#[cfg(test)]
mod tests;

/// Delimiter of the f-string currently being lexed.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FStringQuote {
  pub quote: u8,
  pub triple: bool,
  pub raw: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LexMode {
  // Line terminators are significant, and tokens at the start of a line carry their indentation.
  Standard,
  // Inside brackets or a replacement field: line terminators and comments are trivia.
  Bracketed,
  // Literal text of an f-string, up to the next replacement field or the closing quote.
  FStringMiddle(FStringQuote),
  // Format spec of a replacement field, up to a nested field or the closing brace.
  FStringSpec(FStringQuote),
  // Directly after a replacement field's expression, where `:=` is a `:` followed by a format spec.
  FStringFieldEnd,
}

#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

// Contains the match length.
#[derive(Copy, Clone)]
struct Match(usize);

impl Match {
  pub fn len(&self) -> usize {
    self.0
  }

  pub fn prefix(&self, n: usize) -> Match {
    debug_assert!(n <= self.len());
    Match(n)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

struct PatternMatcher {
  patterns: Vec<TT>,
  matcher: AhoCorasick,
}

impl PatternMatcher {
  pub fn new(patterns: Vec<(TT, &'static str)>) -> Self {
    let (tts, syns): (Vec<_>, Vec<_>) = patterns.into_iter().unzip();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(StartKind::Anchored)
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(syns)
      .expect("operator patterns are valid");
    PatternMatcher {
      patterns: tts,
      matcher,
    }
  }

  pub fn find(&self, lexer: &Lexer) -> LexResult<(TT, Match)> {
    self
      .matcher
      .find(Input::new(&lexer.source[lexer.next..]).anchored(Anchored::Yes))
      .map(|m| (self.patterns[m.pattern().as_usize()], Match(m.end())))
      .ok_or(LexNotFound)
  }
}

#[derive(Debug)]
struct LexNotFound;

type LexResult<T> = Result<T, LexNotFound>;

pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str) -> Lexer<'a> {
    Lexer {
      source: code,
      next: 0,
    }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  fn remaining(&self) -> usize {
    self.end() - self.next
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.end())
  }

  fn eof_range(&self) -> Loc {
    Loc(self.end(), self.end())
  }

  fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn rest(&self) -> &'a [u8] {
    &self.source.as_bytes()[self.next..]
  }

  fn byte(&self, n: usize) -> Option<u8> {
    self.rest().get(n).copied()
  }

  fn peek_or_eof(&self, n: usize) -> Option<char> {
    self.source[self.next..].chars().nth(n)
  }

  /// WARNING: Prefer checkpoints instead. Only use this if you know what you're doing.
  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  pub fn apply_checkpoint(&mut self, checkpoint: LexerCheckpoint) {
    self.next = checkpoint.next;
  }

  fn at_line_start(&self) -> bool {
    self.next == 0 || matches!(self.source.as_bytes()[self.next - 1], b'\n' | b'\r')
  }

  fn while_indentation(&self) -> Match {
    Match(
      self
        .rest()
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\x0c'))
        .count(),
    )
  }

  fn while_chars(&self, pred: impl Fn(char) -> bool) -> Match {
    let mut len = 0;
    for ch in self.source[self.next..].chars() {
      if pred(ch) {
        len += ch.len_utf8();
      } else {
        break;
      }
    }
    Match(len)
  }

  // Length of the line terminator at the current position, if any.
  fn line_terminator(&self) -> Match {
    match (self.byte(0), self.byte(1)) {
      (Some(b'\r'), Some(b'\n')) => Match(2),
      (Some(b'\r'), _) | (Some(b'\n'), _) => Match(1),
      _ => Match(0),
    }
  }

  // Everything up to (but not including) the next line terminator.
  fn until_line_terminator(&self) -> Match {
    Match(memchr2(b'\n', b'\r', self.rest()).unwrap_or(self.remaining()))
  }

  fn consume(&mut self, m: Match) -> Match {
    self.next += m.len();
    m
  }

  fn consume_next(&mut self) -> LexResult<char> {
    let c = self.peek_or_eof(0).ok_or(LexNotFound)?;
    self.next += c.len_utf8();
    Ok(c)
  }

  fn skip_expect(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  fn skip_trivia(&mut self, newlines_are_trivia: bool) {
    loop {
      match self.byte(0) {
        Some(b' ' | b'\t' | b'\x0c') => self.skip_expect(1),
        Some(b'\\') => {
          self.skip_expect(1);
          let lt = self.line_terminator();
          if lt.is_empty() {
            // A stray backslash; leave it for the significant-token lexer to reject.
            self.next -= 1;
            break;
          };
          self.consume(lt);
        }
        Some(b'#') => {
          self.consume(self.until_line_terminator());
        }
        Some(b'\n' | b'\r') if newlines_are_trivia => {
          self.consume(self.line_terminator());
        }
        _ => break,
      };
    }
  }

  /// If the current line holds nothing but whitespace and an optional comment, the range of the whole line including its terminator.
  fn blank_line(&self) -> Option<Loc> {
    if self.at_end() {
      return None;
    };
    let mut len = self.while_indentation().len();
    match self.rest().get(len) {
      None | Some(b'#' | b'\n' | b'\r') => {}
      _ => return None,
    };
    len += memchr2(b'\n', b'\r', &self.rest()[len..]).unwrap_or(self.remaining() - len);
    len += match (self.rest().get(len), self.rest().get(len + 1)) {
      (Some(b'\r'), Some(b'\n')) => 2,
      (Some(_), _) => 1,
      (None, _) => 0,
    };
    Some(Loc(self.next, self.next + len))
  }

  fn drive_fallible(&mut self, ws: Loc, f: impl FnOnce(&mut Self) -> LexResult<TT>) -> Token {
    let cp = self.checkpoint();
    let typ = f(self).unwrap_or(TT::Invalid);
    if typ == TT::Invalid && self.next == cp.next {
      // Always make progress so that the offending character is reported at its own location.
      let _ = self.consume_next();
    };
    Token {
      loc: self.since_checkpoint(cp),
      ws,
      indent: None,
      typ,
    }
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

#[rustfmt::skip]
pub static OPERATORS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::Ampersand, "&");
  map.insert(TT::AmpersandEquals, "&=");
  map.insert(TT::Asterisk, "*");
  map.insert(TT::AsteriskAsterisk, "**");
  map.insert(TT::AsteriskAsteriskEquals, "**=");
  map.insert(TT::AsteriskEquals, "*=");
  map.insert(TT::At, "@");
  map.insert(TT::AtEquals, "@=");
  map.insert(TT::Bar, "|");
  map.insert(TT::BarEquals, "|=");
  map.insert(TT::BraceClose, "}");
  map.insert(TT::BraceOpen, "{");
  map.insert(TT::BracketClose, "]");
  map.insert(TT::BracketOpen, "[");
  map.insert(TT::Caret, "^");
  map.insert(TT::CaretEquals, "^=");
  map.insert(TT::ChevronLeft, "<");
  map.insert(TT::ChevronLeftChevronLeft, "<<");
  map.insert(TT::ChevronLeftChevronLeftEquals, "<<=");
  map.insert(TT::ChevronLeftEquals, "<=");
  map.insert(TT::ChevronRight, ">");
  map.insert(TT::ChevronRightChevronRight, ">>");
  map.insert(TT::ChevronRightChevronRightEquals, ">>=");
  map.insert(TT::ChevronRightEquals, ">=");
  map.insert(TT::Colon, ":");
  map.insert(TT::ColonEquals, ":=");
  map.insert(TT::Comma, ",");
  map.insert(TT::Dot, ".");
  map.insert(TT::DotDotDot, "...");
  map.insert(TT::Equals, "=");
  map.insert(TT::EqualsEquals, "==");
  map.insert(TT::Exclamation, "!");
  map.insert(TT::ExclamationEquals, "!=");
  map.insert(TT::Hyphen, "-");
  map.insert(TT::HyphenChevronRight, "->");
  map.insert(TT::HyphenEquals, "-=");
  map.insert(TT::ParenthesisClose, ")");
  map.insert(TT::ParenthesisOpen, "(");
  map.insert(TT::Percent, "%");
  map.insert(TT::PercentEquals, "%=");
  map.insert(TT::Plus, "+");
  map.insert(TT::PlusEquals, "+=");
  map.insert(TT::Semicolon, ";");
  map.insert(TT::Slash, "/");
  map.insert(TT::SlashEquals, "/=");
  map.insert(TT::SlashSlash, "//");
  map.insert(TT::SlashSlashEquals, "//=");
  map.insert(TT::Tilde, "~");
  map
});

pub static KEYWORDS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::KeywordAnd, "and");
  map.insert(TT::KeywordAs, "as");
  map.insert(TT::KeywordAssert, "assert");
  map.insert(TT::KeywordAsync, "async");
  map.insert(TT::KeywordAwait, "await");
  map.insert(TT::KeywordBreak, "break");
  map.insert(TT::KeywordClass, "class");
  map.insert(TT::KeywordContinue, "continue");
  map.insert(TT::KeywordDef, "def");
  map.insert(TT::KeywordDel, "del");
  map.insert(TT::KeywordElif, "elif");
  map.insert(TT::KeywordElse, "else");
  map.insert(TT::KeywordExcept, "except");
  map.insert(TT::KeywordFalse, "False");
  map.insert(TT::KeywordFinally, "finally");
  map.insert(TT::KeywordFor, "for");
  map.insert(TT::KeywordFrom, "from");
  map.insert(TT::KeywordGlobal, "global");
  map.insert(TT::KeywordIf, "if");
  map.insert(TT::KeywordImport, "import");
  map.insert(TT::KeywordIn, "in");
  map.insert(TT::KeywordIs, "is");
  map.insert(TT::KeywordLambda, "lambda");
  map.insert(TT::KeywordNone, "None");
  map.insert(TT::KeywordNonlocal, "nonlocal");
  map.insert(TT::KeywordNot, "not");
  map.insert(TT::KeywordOr, "or");
  map.insert(TT::KeywordPass, "pass");
  map.insert(TT::KeywordRaise, "raise");
  map.insert(TT::KeywordReturn, "return");
  map.insert(TT::KeywordTrue, "True");
  map.insert(TT::KeywordTry, "try");
  map.insert(TT::KeywordWhile, "while");
  map.insert(TT::KeywordWith, "with");
  map.insert(TT::KeywordYield, "yield");
  map
});

pub static KEYWORD_STRS: Lazy<HashMap<&'static str, TT>> = Lazy::new(|| {
  HashMap::<&'static str, TT>::from_iter(KEYWORDS_MAPPING.iter().map(|(&tt, &s)| (s, tt)))
});

static OPS: Lazy<PatternMatcher> = Lazy::new(|| {
  PatternMatcher::new(OPERATORS_MAPPING.iter().map(|(&tt, &s)| (tt, s)).collect())
});

pub fn is_id_start(c: char) -> bool {
  c == '_' || c.is_alphabetic()
}

pub fn is_id_continue(c: char) -> bool {
  c == '_' || c.is_alphanumeric()
}

pub fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  chars.next().is_some_and(is_id_start) && chars.all(is_id_continue) && !KEYWORD_STRS.contains_key(s)
}

fn is_string_prefix(word: &str) -> bool {
  word.len() <= 2
    && !word.is_empty()
    && matches!(
      word.to_ascii_lowercase().as_str(),
      "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

fn lex_identifier_or_string(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  let word_start = lexer.next;
  lexer.consume(lexer.while_chars(is_id_continue));
  let word = &lexer.source[word_start..lexer.next];
  if matches!(lexer.byte(0), Some(b'"' | b'\'')) && is_string_prefix(word) {
    let lower = word.to_ascii_lowercase();
    return lex_string(lexer, lower.contains('f'));
  };
  Ok(KEYWORD_STRS.get(word).copied().unwrap_or(TT::Identifier))
}

fn lex_digits(lexer: &mut Lexer<'_>, pred: impl Fn(char) -> bool) -> Match {
  lexer.consume(lexer.while_chars(|c| c == '_' || pred(c)))
}

fn lex_number(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  if lexer.byte(0) == Some(b'0') {
    let radix_digit: Option<fn(char) -> bool> = match lexer.byte(1) {
      Some(b'x' | b'X') => Some(|c: char| c.is_ascii_hexdigit()),
      Some(b'o' | b'O') => Some(|c: char| matches!(c, '0'..='7')),
      Some(b'b' | b'B') => Some(|c: char| matches!(c, '0' | '1')),
      _ => None,
    };
    if let Some(pred) = radix_digit {
      lexer.skip_expect(2);
      if lex_digits(lexer, pred).is_empty() {
        return Err(LexNotFound);
      };
      return Ok(TT::LiteralNumber);
    };
  };
  lex_digits(lexer, |c| c.is_ascii_digit());
  if lexer.byte(0) == Some(b'.') {
    lexer.skip_expect(1);
    lex_digits(lexer, |c| c.is_ascii_digit());
  };
  if matches!(lexer.byte(0), Some(b'e' | b'E')) {
    let sign = usize::from(matches!(lexer.byte(1), Some(b'+' | b'-')));
    if lexer.byte(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
      lexer.skip_expect(1 + sign);
      lex_digits(lexer, |c| c.is_ascii_digit());
    };
  };
  if matches!(lexer.byte(0), Some(b'j' | b'J')) {
    lexer.skip_expect(1);
  };
  Ok(TT::LiteralNumber)
}

// The lexer is positioned at the opening quote; any prefix has already been consumed.
fn lex_string(lexer: &mut Lexer<'_>, fstring: bool) -> LexResult<TT> {
  let quote = lexer.byte(0).ok_or(LexNotFound)?;
  let triple = lexer.byte(1) == Some(quote) && lexer.byte(2) == Some(quote);
  lexer.skip_expect(if triple { 3 } else { 1 });
  if fstring {
    // The parser lexes the rest with the f-string modes.
    return Ok(TT::FStringStart);
  };
  loop {
    let Some(pos) = lexer
      .rest()
      .iter()
      .position(|&b| b == quote || matches!(b, b'\\' | b'\n' | b'\r'))
    else {
      lexer.consume(Match(lexer.remaining()));
      return Err(LexNotFound);
    };
    lexer.skip_expect(pos);
    match lexer.byte(0) {
      Some(b'\\') => {
        lexer.skip_expect(1);
        // Raw strings cannot end in an odd backslash either, so the escaped character is skipped regardless of prefix.
        lexer.consume_next()?;
      }
      Some(b'\n' | b'\r') => {
        if !triple {
          return Err(LexNotFound);
        };
        lexer.skip_expect(1);
      }
      _ => {
        if !triple {
          lexer.skip_expect(1);
          return Ok(TT::LiteralString);
        };
        if lexer.byte(1) == Some(quote) && lexer.byte(2) == Some(quote) {
          lexer.skip_expect(3);
          return Ok(TT::LiteralString);
        };
        lexer.skip_expect(1);
      }
    };
  }
}

/// The f-string prefix and opening quote(s) that a `FStringStart` token covers.
pub fn fstring_quote(start_token_text: &str) -> FStringQuote {
  let lower = start_token_text.to_ascii_lowercase();
  let quote = if lower.ends_with('"') { b'"' } else { b'\'' };
  let triple = lower.ends_with("\"\"\"") || lower.ends_with("'''");
  FStringQuote {
    quote,
    triple,
    raw: lower.contains('r'),
  }
}

fn at_fstring_end(lexer: &Lexer<'_>, q: FStringQuote) -> bool {
  if q.triple {
    lexer.byte(0) == Some(q.quote) && lexer.byte(1) == Some(q.quote) && lexer.byte(2) == Some(q.quote)
  } else {
    lexer.byte(0) == Some(q.quote)
  }
}

fn lex_fstring_text(lexer: &mut Lexer<'_>, q: FStringQuote, in_spec: bool) -> LexResult<TT> {
  if !in_spec && at_fstring_end(lexer, q) {
    lexer.skip_expect(if q.triple { 3 } else { 1 });
    return Ok(TT::FStringEnd);
  };
  match (lexer.byte(0), lexer.byte(1)) {
    (Some(b'{'), Some(b'{')) if !in_spec => {}
    (Some(b'{'), _) => {
      lexer.skip_expect(1);
      return Ok(TT::BraceOpen);
    }
    (Some(b'}'), Some(b'}')) if !in_spec => {}
    (Some(b'}'), _) => {
      if !in_spec {
        return Err(LexNotFound);
      };
      lexer.skip_expect(1);
      return Ok(TT::BraceClose);
    }
    _ => {}
  };
  let start = lexer.next;
  loop {
    match lexer.byte(0) {
      None => break,
      Some(b'{' | b'}') => {
        if !in_spec && lexer.byte(1) == lexer.byte(0) {
          lexer.skip_expect(2);
          continue;
        };
        break;
      }
      Some(b'\\') => {
        lexer.skip_expect(1);
        match lexer.byte(0) {
          Some(b'N') if !q.raw && lexer.byte(1) == Some(b'{') => {
            let close = memchr::memchr(b'}', lexer.rest()).ok_or(LexNotFound)?;
            lexer.skip_expect(close + 1);
          }
          Some(b'{' | b'}') => {}
          Some(_) => {
            lexer.consume_next()?;
          }
          None => break,
        };
      }
      Some(b'\n' | b'\r') if !q.triple => break,
      Some(b) if b == q.quote => {
        if at_fstring_end(lexer, q) {
          break;
        };
        lexer.skip_expect(1);
      }
      Some(_) => {
        lexer.consume_next()?;
      }
    };
  }
  if lexer.next == start {
    return Err(LexNotFound);
  };
  Ok(TT::FStringMiddle)
}

fn lex_significant(lexer: &mut Lexer<'_>, mode: LexMode) -> LexResult<TT> {
  let c = lexer.peek_or_eof(0).ok_or(LexNotFound)?;
  if is_id_start(c) {
    return lex_identifier_or_string(lexer);
  };
  if c.is_ascii_digit() || (c == '.' && lexer.byte(1).is_some_and(|b| b.is_ascii_digit())) {
    return lex_number(lexer);
  };
  if c == '"' || c == '\'' {
    return lex_string(lexer, false);
  };
  let (mut tt, mut mat) = OPS.find(lexer)?;
  if mode == LexMode::FStringFieldEnd && tt == TT::ColonEquals {
    tt = TT::Colon;
    mat = mat.prefix(1);
  };
  lexer.consume(mat);
  Ok(tt)
}

pub fn lex_next(lexer: &mut Lexer<'_>, mode: LexMode) -> Token {
  match mode {
    LexMode::FStringMiddle(q) => {
      let ws = Loc(lexer.next, lexer.next);
      return lexer.drive_fallible(ws, |lexer| lex_fstring_text(lexer, q, false));
    }
    LexMode::FStringSpec(q) => {
      let ws = Loc(lexer.next, lexer.next);
      return lexer.drive_fallible(ws, |lexer| lex_fstring_text(lexer, q, true));
    }
    _ => {}
  };

  let mut indent = None;
  if mode == LexMode::Standard && lexer.at_line_start() {
    if let Some(line) = lexer.blank_line() {
      lexer.set_next(line.1);
      return Token {
        loc: line,
        ws: Loc(line.0, line.0),
        indent: None,
        typ: TT::EmptyLine,
      };
    };
    let start = lexer.next;
    lexer.consume(lexer.while_indentation());
    indent = Some(Loc(start, lexer.next));
  };

  let ws_start = lexer.next;
  lexer.skip_trivia(mode != LexMode::Standard);
  let ws = Loc(ws_start, lexer.next);

  // EOF is different from Invalid, so we should emit this specifically instead of letting drive_fallible return an Invalid.
  if lexer.at_end() {
    return Token {
      loc: lexer.eof_range(),
      ws,
      indent,
      typ: TT::EOF,
    };
  };

  if mode == LexMode::Standard {
    let lt = lexer.line_terminator();
    if !lt.is_empty() {
      let start = lexer.next;
      lexer.consume(lt);
      return Token {
        loc: Loc(start, lexer.next),
        ws,
        indent,
        typ: TT::Newline,
      };
    };
  };

  let mut token = lexer.drive_fallible(ws, |lexer| lex_significant(lexer, mode));
  token.indent = indent;
  token
}
