use super::ParseCtx;
use super::Parser;
use crate::ast::expr::FStringConversion;
use crate::ast::expr::FStringExpr;
use crate::ast::expr::FStringField;
use crate::ast::expr::FStringPart;
use crate::ast::expr::FStringSpec;
use crate::ast::expr::FStringText;
use crate::ast::node::Node;
use crate::ast::trivia::Leaf;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::fstring_quote;
use crate::lex::FStringQuote;
use crate::lex::LexMode;
use crate::loc::Loc;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn fstring(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<FStringExpr>> {
    let start_t = self.require(ctx, TT::FStringStart)?;
    let q = fstring_quote(self.str(start_t.loc));
    let start = self.leaf(&start_t);
    let parts = self.fstring_parts(q, false)?;
    let end_t = self.require_with_mode(TT::FStringEnd, LexMode::FStringMiddle(q))?;
    Ok(Node::new(Loc(start_t.loc.0, end_t.loc.1), FStringExpr {
      start,
      parts,
      end: self.leaf(&end_t),
    }))
  }

  // Literal text and replacement fields, until the closing quote or (for a format spec) the closing brace of the enclosing field.
  fn fstring_parts(&mut self, q: FStringQuote, in_spec: bool) -> SyntaxResult<Vec<FStringPart>> {
    let mode = if in_spec {
      LexMode::FStringSpec(q)
    } else {
      LexMode::FStringMiddle(q)
    };
    let mut parts = Vec::new();
    loop {
      let t = self.peek_with_mode(mode);
      match t.typ {
        TT::FStringMiddle => {
          self.consume_with_mode(mode);
          parts.push(FStringPart::Text(Node::new(t.loc, FStringText {
            value: self.string(t.loc),
          })));
        }
        TT::BraceOpen => {
          self.consume_with_mode(mode);
          let lbrace = self.leaf(&t);
          let field = self.fstring_field(q, lbrace, t.loc)?;
          parts.push(FStringPart::Field(field));
        }
        TT::FStringEnd if !in_spec => break,
        TT::BraceClose if in_spec => break,
        _ => {
          return Err(self.unexpected(&t, SyntaxErrorType::UnterminatedString));
        }
      };
    }
    Ok(parts)
  }

  fn fstring_field(
    &mut self,
    q: FStringQuote,
    lbrace: Leaf,
    start: Loc,
  ) -> SyntaxResult<Node<FStringField>> {
    let ctx = ParseCtx::bracketed();
    let expr = self.yield_or_star_expressions(ctx)?;
    let debug = self
      .consume_token_if_with_mode(TT::Equals, LexMode::FStringFieldEnd)
      .map(|t| self.leaf(&t));
    let conversion = match self.consume_token_if_with_mode(TT::Exclamation, LexMode::FStringFieldEnd) {
      Some(bang_t) => {
        let name_t = self.require_with_mode(TT::Identifier, LexMode::FStringFieldEnd)?;
        if !matches!(self.str(name_t.loc), "r" | "s" | "a") || !name_t.ws.is_empty() {
          return Err(name_t.error(SyntaxErrorType::ExpectedSyntax("conversion character")));
        };
        Some(Node::new(Loc(bang_t.loc.0, name_t.loc.1), FStringConversion {
          bang: self.leaf(&bang_t),
          name: self.leaf(&name_t),
        }))
      }
      None => None,
    };
    let spec = match self.consume_token_if_with_mode(TT::Colon, LexMode::FStringFieldEnd) {
      Some(colon_t) => {
        let parts = self.fstring_parts(q, true)?;
        Some(Node::new(colon_t.loc, FStringSpec {
          colon: self.leaf(&colon_t),
          parts,
        }))
      }
      None => None,
    };
    let close_mode = if spec.is_some() {
      LexMode::FStringSpec(q)
    } else {
      LexMode::FStringFieldEnd
    };
    let rbrace_t = self.require_with_mode(TT::BraceClose, close_mode)?;
    Ok(Node::new(Loc(start.0, rbrace_t.loc.1), FStringField {
      lbrace,
      expr,
      debug,
      conversion,
      spec,
      rbrace: self.leaf(&rbrace_t),
    }))
  }
}
