use crate::ast::trivia::EmptyLine;
use crate::ast::trivia::Leaf;
use crate::ast::trivia::Newline;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

pub mod expr;
pub mod fstring;
pub mod pat;
pub mod stmt;
#[cfg(test)]
mod tests;

// Almost every parse_* function takes this as a parameter. It should be received as a value, not a reference, and altered copies created for nested calls. Whether newlines are significant depends on bracket nesting, which changes between calls, so it can't live on the Parser without having to unwind it after each call returns.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParseCtx {
  pub bracketed: bool,
}

impl ParseCtx {
  pub fn standard() -> ParseCtx {
    ParseCtx { bracketed: false }
  }

  pub fn bracketed() -> ParseCtx {
    ParseCtx { bracketed: true }
  }

  pub fn mode(&self) -> LexMode {
    if self.bracketed {
      LexMode::Bracketed
    } else {
      LexMode::Standard
    }
  }
}

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }
}

pub struct ParserCheckpoint {
  next_tok_i: usize,
  pending_lines: Vec<Loc>,
}

/// To get the lexer's `next` after this token was lexed, use `token.loc.1`.
struct BufferedToken {
  token: Token,
  lex_mode: LexMode,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<BufferedToken>,
  next_tok_i: usize,
  // Blank and comment lines seen since the last statement, not yet attached to a node.
  pending_lines: Vec<Loc>,
  // Absolute indentation of each enclosing block.
  block_indents: Vec<String>,
  first_block_indent: Option<String>,
}

// We extend this struct with added methods in the various submodules, instead of simply using free functions and passing `&mut Parser` around, so that `self` carries the lexer state and the methods don't need to redeclare lifetimes.
impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      pending_lines: Vec::new(),
      block_indents: Vec::new(),
      first_block_indent: None,
    }
  }

  pub fn source_range(&self) -> Loc {
    self.lexer.source_range()
  }

  pub fn str(&self, loc: Loc) -> &str {
    &self.lexer[loc]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  /// Relative indentation of the first indented block seen so far.
  pub fn first_block_indent(&self) -> Option<&str> {
    self.first_block_indent.as_deref()
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
      pending_lines: self.pending_lines.clone(),
    }
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
    self.pending_lines = checkpoint.pending_lines;
  }

  fn reset_to(&mut self, n: usize) {
    self.next_tok_i = n;
    self.buf.truncate(n);
    match self.buf.last() {
      Some(t) => self.lexer.set_next(t.token.loc.1),
      None => self.lexer.set_next(0),
    };
  }

  fn forward<K: FnOnce(&Token) -> bool>(&mut self, mode: LexMode, keep: K) -> (bool, Token) {
    if self
      .buf
      .get(self.next_tok_i)
      .is_some_and(|t| t.lex_mode != mode)
    {
      self.reset_to(self.next_tok_i);
    }
    if self.buf.len() == self.next_tok_i {
      let token = lex_next(&mut self.lexer, mode);
      self.buf.push(BufferedToken {
        token,
        lex_mode: mode,
      });
    }
    let t = self.buf[self.next_tok_i].token.clone();
    let k = keep(&t);
    if k {
      self.next_tok_i += 1;
    };
    (k, t)
  }

  pub fn consume_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| true).1
  }

  pub fn consume(&mut self, ctx: ParseCtx) -> Token {
    self.consume_with_mode(ctx.mode())
  }

  pub fn peek_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| false).1
  }

  pub fn peek(&mut self, ctx: ParseCtx) -> Token {
    self.peek_with_mode(ctx.mode())
  }

  pub fn peek_2(&mut self, ctx: ParseCtx) -> (Token, Token) {
    let cp = self.checkpoint();
    let a = self.forward(ctx.mode(), |_| true);
    let b = self.forward(ctx.mode(), |_| true);
    self.restore_checkpoint(cp);
    (a.1, b.1)
  }

  pub fn peek_3(&mut self, ctx: ParseCtx) -> (Token, Token, Token) {
    let cp = self.checkpoint();
    let a = self.forward(ctx.mode(), |_| true);
    let b = self.forward(ctx.mode(), |_| true);
    let c = self.forward(ctx.mode(), |_| true);
    self.restore_checkpoint(cp);
    (a.1, b.1, c.1)
  }

  pub fn maybe_consume_with_mode(&mut self, typ: TT, mode: LexMode) -> MaybeToken {
    let (matched, t) = self.forward(mode, |t| t.typ == typ);
    MaybeToken {
      typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn consume_token_if_with_mode(&mut self, typ: TT, mode: LexMode) -> Option<Token> {
    let (matched, t) = self.forward(mode, |t| t.typ == typ);
    matched.then_some(t)
  }

  pub fn consume_if(&mut self, ctx: ParseCtx, typ: TT) -> MaybeToken {
    self.maybe_consume_with_mode(typ, ctx.mode())
  }

  pub fn require_with_mode(&mut self, typ: TT, mode: LexMode) -> SyntaxResult<Token> {
    let t = self.consume_with_mode(mode);
    if t.typ != typ {
      Err(self.unexpected(&t, SyntaxErrorType::RequiredTokenNotFound(typ)))
    } else {
      Ok(t)
    }
  }

  pub fn require(&mut self, ctx: ParseCtx, typ: TT) -> SyntaxResult<Token> {
    self.require_with_mode(typ, ctx.mode())
  }

  pub fn require_predicate<P: FnOnce(TT) -> bool>(
    &mut self,
    ctx: ParseCtx,
    pred: P,
    expected: &'static str,
  ) -> SyntaxResult<Token> {
    let t = self.consume(ctx);
    if !pred(t.typ) {
      Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax(expected)))
    } else {
      Ok(t)
    }
  }

  /// The error for an unexpected token, reported as a lexing error when the token could not be lexed at all.
  pub fn unexpected(&self, t: &Token, otherwise: SyntaxErrorType) -> SyntaxError {
    match t.typ {
      TT::EOF => t.error(SyntaxErrorType::UnexpectedEnd),
      TT::Invalid => {
        let text = self.str(t.loc);
        let unprefixed = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        let typ = if unprefixed.starts_with(['"', '\'']) {
          SyntaxErrorType::UnterminatedString
        } else if text.starts_with(['\n', '\r']) {
          SyntaxErrorType::LineTerminatorInString
        } else if text.starts_with('}') {
          SyntaxErrorType::SingleClosingBraceInFString
        } else if text.is_empty() {
          SyntaxErrorType::UnterminatedString
        } else {
          SyntaxErrorType::InvalidCharacter
        };
        t.error(typ)
      }
      _ => t.error(otherwise),
    }
  }

  pub fn leaf(&self, t: &Token) -> Leaf {
    Leaf::new(self.str(t.ws), self.str(t.loc))
  }

  pub fn require_leaf(&mut self, ctx: ParseCtx, typ: TT) -> SyntaxResult<Leaf> {
    let t = self.require(ctx, typ)?;
    Ok(self.leaf(&t))
  }

  pub fn consume_leaf_if(&mut self, ctx: ParseCtx, typ: TT) -> Option<Leaf> {
    let (matched, t) = self.forward(ctx.mode(), |t| t.typ == typ);
    matched.then(|| self.leaf(&t))
  }

  /// Whether the next token is an identifier with the given text, as used for soft keywords.
  pub fn peek_soft_keyword(&mut self, ctx: ParseCtx, kw: &str) -> bool {
    let t = self.peek(ctx);
    t.typ == TT::Identifier && self.str(t.loc) == kw
  }

  /// Indentation of a token at the start of a logical line.
  pub fn indent_of(&self, t: &Token) -> &str {
    t.indent.map(|l| self.str(l)).unwrap_or_default()
  }

  /// Consumes the end of a logical line. The end of input also ends a line, but isn't consumed.
  pub fn require_newline(&mut self) -> SyntaxResult<Newline> {
    let t = self.peek(ParseCtx::standard());
    match t.typ {
      TT::Newline => {
        self.consume(ParseCtx::standard());
        Ok(Newline {
          ws: self.string(t.ws),
          value: Some(self.string(t.loc)),
        })
      }
      TT::EOF => Ok(Newline {
        ws: self.string(t.ws),
        value: Some(String::new()),
      }),
      _ => Err(self.unexpected(&t, SyntaxErrorType::RequiredTokenNotFound(TT::Newline))),
    }
  }

  /// Moves any blank or comment lines at the current position into the pending lines.
  pub fn collect_empty_lines(&mut self) {
    loop {
      let t = self.peek(ParseCtx::standard());
      if t.typ != TT::EmptyLine {
        break;
      };
      self.consume(ParseCtx::standard());
      self.pending_lines.push(t.loc);
    }
  }

  fn empty_line(&self, loc: Loc, indent: &str) -> EmptyLine {
    let raw = self.str(loc);
    let text = raw.trim_end_matches(|c| c == '\r' || c == '\n');
    let newline = &raw[text.len()..];
    let blank = text.trim().is_empty();
    if !blank && text.starts_with(indent) {
      EmptyLine {
        indent: true,
        ws: text[indent.len()..].to_string(),
        newline: Some(newline.to_string()),
      }
    } else {
      EmptyLine {
        indent: false,
        ws: text.to_string(),
        newline: Some(newline.to_string()),
      }
    }
  }

  /// All pending lines, as the leading lines of a node whose first line has the given indentation.
  pub fn take_leading_lines(&mut self, indent: &str) -> Vec<EmptyLine> {
    self.collect_empty_lines();
    let lines = std::mem::take(&mut self.pending_lines);
    lines.into_iter().map(|l| self.empty_line(l, indent)).collect()
  }

  /// Pending lines that belong to the end of a block: everything up to the last comment that is still indented at the block's level.
  pub fn take_footer(&mut self, block_indent: &str) -> Vec<EmptyLine> {
    let split = self
      .pending_lines
      .iter()
      .rposition(|&l| {
        let text = self.str(l);
        text.starts_with(block_indent) && text.trim_start().starts_with('#')
      })
      .map(|i| i + 1)
      .unwrap_or(0);
    let lines: Vec<Loc> = self.pending_lines.drain(..split).collect();
    lines
      .into_iter()
      .map(|l| self.empty_line(l, block_indent))
      .collect()
  }
}
