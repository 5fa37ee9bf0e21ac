use super::expr::wrap_expr;
use super::ParseCtx;
use super::Parser;
use crate::ast::expr::AttributeExpr;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::ast::pat::*;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::operator::OperatorName;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// The pattern of a `case` clause. A top-level comma makes an open sequence pattern.
  pub fn patterns(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let first = self.as_pattern(ctx)?;
    if self.peek(ctx).typ != TT::Comma {
      return Ok(first);
    };
    let start = first.loc;
    let mut patterns = Vec::new();
    let mut pattern = first;
    loop {
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      patterns.push(Node::new(pattern.loc, PatternElement { pattern, comma }));
      if done || matches!(self.peek(ctx).typ, TT::Colon | TT::KeywordIf) {
        break;
      };
      pattern = self.as_pattern(ctx)?;
    }
    let end = patterns.last().map(|p| p.loc).unwrap_or(start);
    Ok(Node::new(
      Loc(start.0, end.1),
      Pattern::Sequence(Node::new(start, SequencePattern {
        lbracket: None,
        patterns,
        rbracket: None,
      })),
    ))
  }

  // Also accepts a star pattern, which is only valid inside a sequence.
  fn as_pattern(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let t = self.peek(ctx);
    if t.typ == TT::Asterisk {
      self.consume(ctx);
      let star = self.leaf(&t);
      let name = self.name(ctx)?;
      let loc = Loc(t.loc.0, name.loc.1);
      return Ok(Node::new(
        loc,
        Pattern::Star(Node::new(loc, StarPattern { star, name })),
      ));
    };
    let pattern = self.or_pattern(ctx)?;
    let Some(as_kw) = self.consume_leaf_if(ctx, TT::KeywordAs) else {
      return Ok(pattern);
    };
    let name = self.name(ctx)?;
    let loc = Loc(pattern.loc.0, name.loc.1);
    Ok(Node::new(
      loc,
      Pattern::As(Node::new(loc, AsPattern {
        pattern: Some(pattern),
        as_kw: Some(as_kw),
        name,
      })),
    ))
  }

  fn or_pattern(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let first = self.closed_pattern(ctx)?;
    if self.peek(ctx).typ != TT::Bar {
      return Ok(first);
    };
    let start = first.loc;
    let mut patterns = Vec::new();
    let mut pattern = first;
    loop {
      let bar = self.consume_leaf_if(ctx, TT::Bar);
      let done = bar.is_none();
      patterns.push(Node::new(pattern.loc, OrElement { pattern, bar }));
      if done {
        break;
      };
      pattern = self.closed_pattern(ctx)?;
    }
    let end = patterns.last().map(|p| p.loc).unwrap_or(start);
    let loc = Loc(start.0, end.1);
    Ok(Node::new(
      loc,
      Pattern::Or(Node::new(loc, OrPattern { patterns })),
    ))
  }

  fn closed_pattern(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let t = self.peek(ctx);
    match t.typ {
      TT::LiteralNumber | TT::Hyphen => {
        // Signed and complex literals like `-1` and `1+2j`.
        let value = self.expr_at(ctx, OperatorName::Addition.precedence())?;
        Ok(value_pattern(value))
      }
      TT::LiteralString | TT::FStringStart => {
        let value = self.atom(ctx)?;
        Ok(value_pattern(value))
      }
      TT::KeywordNone | TT::KeywordTrue | TT::KeywordFalse => {
        self.consume(ctx);
        Ok(Node::new(
          t.loc,
          Pattern::Singleton(Node::new(t.loc, SingletonPattern {
            value: self.leaf(&t),
          })),
        ))
      }
      TT::Identifier => {
        let name = self.name(ctx)?;
        if !matches!(self.peek(ctx).typ, TT::Dot | TT::ParenthesisOpen) {
          return Ok(Node::new(
            t.loc,
            Pattern::As(Node::new(t.loc, AsPattern {
              pattern: None,
              as_kw: None,
              name,
            })),
          ));
        };
        let mut value = Node::new(name.loc, Expr::Name(name));
        while let Some(dot) = self.consume_leaf_if(ctx, TT::Dot) {
          let attr = self.name(ctx)?;
          let loc = Loc(value.loc.0, attr.loc.1);
          value = wrap_expr(loc, AttributeExpr { value, dot, attr });
        }
        if self.peek(ctx).typ == TT::ParenthesisOpen {
          return self.class_pattern(value);
        };
        Ok(value_pattern(value))
      }
      TT::ParenthesisOpen => self.group_or_sequence_pattern(ctx),
      TT::BracketOpen => {
        self.consume(ctx);
        let lbracket = self.leaf(&t);
        let inner = ParseCtx::bracketed();
        let patterns = self.pattern_elements(inner, TT::BracketClose)?;
        let close_t = self.require(inner, TT::BracketClose)?;
        let loc = Loc(t.loc.0, close_t.loc.1);
        Ok(Node::new(
          loc,
          Pattern::Sequence(Node::new(loc, SequencePattern {
            lbracket: Some(lbracket),
            patterns,
            rbracket: Some(self.leaf(&close_t)),
          })),
        ))
      }
      TT::BraceOpen => self.mapping_pattern(ctx),
      _ => Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax("pattern"))),
    }
  }

  /// Comma-separated patterns up to (but not including) `close`.
  fn pattern_elements(&mut self, ctx: ParseCtx, close: TT) -> SyntaxResult<Vec<Node<PatternElement>>> {
    let mut patterns = Vec::new();
    while self.peek(ctx).typ != close {
      let pattern = self.as_pattern(ctx)?;
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      patterns.push(Node::new(pattern.loc, PatternElement { pattern, comma }));
      if done {
        break;
      };
    }
    Ok(patterns)
  }

  fn group_or_sequence_pattern(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let open_t = self.require(ctx, TT::ParenthesisOpen)?;
    let lpar = self.leaf(&open_t);
    let inner = ParseCtx::bracketed();
    let patterns = self.pattern_elements(inner, TT::ParenthesisClose)?;
    let close_t = self.require(inner, TT::ParenthesisClose)?;
    let rpar = self.leaf(&close_t);
    let loc = Loc(open_t.loc.0, close_t.loc.1);
    // `(p)` groups; `()` and `(p,)` are sequences.
    let is_group = patterns.len() == 1
      && patterns[0].stx.comma.is_none()
      && !matches!(&*patterns[0].stx.pattern.stx, Pattern::Star(_));
    if is_group {
      let Some(element) = patterns.into_iter().next() else {
        return Err(open_t.error(SyntaxErrorType::ExpectedSyntax("pattern")));
      };
      let pattern = element.stx.pattern;
      return Ok(Node::new(
        loc,
        Pattern::Group(Node::new(loc, GroupPattern { lpar, pattern, rpar })),
      ));
    };
    Ok(Node::new(
      loc,
      Pattern::Sequence(Node::new(loc, SequencePattern {
        lbracket: Some(lpar),
        patterns,
        rbracket: Some(rpar),
      })),
    ))
  }

  fn class_pattern(&mut self, cls: Node<Expr>) -> SyntaxResult<Node<Pattern>> {
    let inner = ParseCtx::bracketed();
    let lpar = self.require_leaf(inner, TT::ParenthesisOpen)?;
    let mut patterns = Vec::new();
    let mut kwds = Vec::new();
    loop {
      let (a, b) = self.peek_2(inner);
      if a.typ == TT::ParenthesisClose {
        break;
      };
      let comma = if a.typ == TT::Identifier && b.typ == TT::Equals {
        let key = self.name(inner)?;
        let equal = self.require_leaf(inner, TT::Equals)?;
        let pattern = self.as_pattern(inner)?;
        let comma = self.consume_leaf_if(inner, TT::Comma);
        kwds.push(Node::new(a.loc, MatchKeywordElement {
          key,
          equal,
          pattern,
          comma: comma.clone(),
        }));
        comma
      } else {
        if !kwds.is_empty() {
          return Err(a.error(SyntaxErrorType::ExpectedSyntax("keyword pattern")));
        };
        let pattern = self.as_pattern(inner)?;
        let comma = self.consume_leaf_if(inner, TT::Comma);
        patterns.push(Node::new(pattern.loc, PatternElement {
          pattern,
          comma: comma.clone(),
        }));
        comma
      };
      if comma.is_none() {
        break;
      };
    }
    let close_t = self.require(inner, TT::ParenthesisClose)?;
    let loc = Loc(cls.loc.0, close_t.loc.1);
    Ok(Node::new(
      loc,
      Pattern::Class(Node::new(loc, ClassPattern {
        cls,
        lpar,
        patterns,
        kwds,
        rpar: self.leaf(&close_t),
      })),
    ))
  }

  fn mapping_pattern(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pattern>> {
    let open_t = self.require(ctx, TT::BraceOpen)?;
    let lbrace = self.leaf(&open_t);
    let inner = ParseCtx::bracketed();
    let mut elements = Vec::new();
    let mut rest = None;
    loop {
      let t = self.peek(inner);
      if t.typ == TT::BraceClose {
        break;
      };
      if let Some(star2) = self.consume_leaf_if(inner, TT::AsteriskAsterisk) {
        let name = self.name(inner)?;
        let comma = self.consume_leaf_if(inner, TT::Comma);
        rest = Some(Node::new(t.loc, MappingRest { star2, name, comma }));
        break;
      };
      let key = match t.typ {
        TT::KeywordNone | TT::KeywordTrue | TT::KeywordFalse => self.atom(inner)?,
        TT::LiteralString | TT::FStringStart => self.atom(inner)?,
        TT::LiteralNumber | TT::Hyphen => {
          self.expr_at(inner, OperatorName::Addition.precedence())?
        }
        _ => {
          let name = self.name(inner)?;
          let mut value = Node::new(name.loc, Expr::Name(name));
          while let Some(dot) = self.consume_leaf_if(inner, TT::Dot) {
            let attr = self.name(inner)?;
            let loc = Loc(value.loc.0, attr.loc.1);
            value = wrap_expr(loc, AttributeExpr { value, dot, attr });
          }
          value
        }
      };
      let colon = self.require_leaf(inner, TT::Colon)?;
      let pattern = self.as_pattern(inner)?;
      let comma = self.consume_leaf_if(inner, TT::Comma);
      let done = comma.is_none();
      elements.push(Node::new(t.loc, MappingElement {
        key,
        colon,
        pattern,
        comma,
      }));
      if done {
        break;
      };
    }
    let close_t = self.require(inner, TT::BraceClose)?;
    let loc = Loc(open_t.loc.0, close_t.loc.1);
    Ok(Node::new(
      loc,
      Pattern::Mapping(Node::new(loc, MappingPattern {
        lbrace,
        elements,
        rest,
        rbrace: self.leaf(&close_t),
      })),
    ))
  }
}

fn value_pattern(value: Node<Expr>) -> Node<Pattern> {
  let loc = value.loc;
  Node::new(loc, Pattern::Value(Node::new(loc, ValuePattern { value })))
}
