use super::ParseCtx;
use super::Parser;
use crate::ast::expr::*;
use crate::ast::node::Node;
use crate::ast::trivia::Leaf;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::operator::Associativity;
use crate::operator::OperatorName;
use crate::operator::BINARY_OPERATOR_MAPPING;
use crate::operator::COMPARISON_OPERATOR_MAPPING;
use crate::operator::PRECEDENCE_COMPARISON;
use crate::operator::PRECEDENCE_OR;
use crate::operator::UNARY_OPERATOR_MAPPING;
use crate::token::TT;

/// Whether a token can begin an expression.
pub fn starts_expr(typ: TT) -> bool {
  matches!(
    typ,
    TT::Identifier
      | TT::LiteralNumber
      | TT::LiteralString
      | TT::FStringStart
      | TT::ParenthesisOpen
      | TT::BracketOpen
      | TT::BraceOpen
      | TT::Hyphen
      | TT::Plus
      | TT::Tilde
      | TT::Asterisk
      | TT::DotDotDot
      | TT::KeywordNot
      | TT::KeywordLambda
      | TT::KeywordAwait
      | TT::KeywordNone
      | TT::KeywordTrue
      | TT::KeywordFalse
  )
}

/// Operands of comparisons, and targets of `for` and `del`, bind tighter than any comparison.
const PRECEDENCE_BITWISE_OR: u8 = PRECEDENCE_COMPARISON + 1;

impl<'a> Parser<'a> {
  fn loc_from(&self, start: Loc, end: Loc) -> Loc {
    Loc(start.0, end.1)
  }

  pub fn name(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Name>> {
    let t = self.require(ctx, TT::Identifier)?;
    Ok(Node::new(t.loc, Name {
      value: self.leaf(&t),
    }))
  }

  /// A comma-separated list that becomes a tuple without parentheses when it has a comma. Elements may be starred; with `named`, they may also be assignment expressions.
  pub fn star_exprs(&mut self, ctx: ParseCtx, named: bool) -> SyntaxResult<Node<Expr>> {
    let first = self.star_expr(ctx, named)?;
    if self.peek(ctx).typ != TT::Comma {
      return Ok(first);
    };
    let start = first.loc;
    let mut elements = Vec::new();
    let mut value = first;
    loop {
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      elements.push(Node::new(value.loc, Element { value, comma }));
      if done || !starts_expr(self.peek(ctx).typ) {
        break;
      };
      value = self.star_expr(ctx, named)?;
    }
    let loc = self.loc_from(start, elements.last().map(|e| e.loc).unwrap_or(start));
    Ok(wrap_expr(loc, TupleExpr {
      lpar: None,
      elements,
      rpar: None,
    }))
  }

  pub fn star_expressions(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.star_exprs(ctx, false)
  }

  fn star_expr(&mut self, ctx: ParseCtx, named: bool) -> SyntaxResult<Node<Expr>> {
    if self.peek(ctx).typ == TT::Asterisk {
      let t = self.consume(ctx);
      let star = self.leaf(&t);
      let value = self.expr_at(ctx, PRECEDENCE_BITWISE_OR)?;
      let loc = self.loc_from(t.loc, value.loc);
      return Ok(wrap_expr(loc, StarredExpr { star, value }));
    };
    if named {
      self.named_expr(ctx)
    } else {
      self.expr(ctx)
    }
  }

  /// An element of a display or argument list: a starred expression or an assignment expression.
  pub fn star_named_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.star_expr(ctx, true)
  }

  pub fn yield_or_star_expressions(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    if self.peek(ctx).typ == TT::KeywordYield {
      self.yield_expr(ctx)
    } else {
      self.star_expressions(ctx)
    }
  }

  pub fn yield_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.require(ctx, TT::KeywordYield)?;
    let yield_kw = self.leaf(&t);
    let from_kw = self.consume_leaf_if(ctx, TT::KeywordFrom);
    let value = if from_kw.is_some() {
      Some(self.expr(ctx)?)
    } else if starts_expr(self.peek(ctx).typ) {
      Some(self.star_expressions(ctx)?)
    } else {
      None
    };
    let loc = t.loc.add_option(value.as_ref().map(|v| v.loc));
    Ok(wrap_expr(loc, YieldExpr {
      yield_kw,
      from_kw,
      value,
    }))
  }

  pub fn named_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let (a, b) = self.peek_2(ctx);
    if a.typ == TT::Identifier && b.typ == TT::ColonEquals {
      let target = self.name(ctx)?;
      let walrus = self.require_leaf(ctx, TT::ColonEquals)?;
      let value = self.expr(ctx)?;
      let loc = self.loc_from(target.loc, value.loc);
      return Ok(wrap_expr(loc, NamedExpr {
        target,
        walrus,
        value,
      }));
    };
    self.expr(ctx)
  }

  /// A conditional expression or lambda; the `expression` rule of the grammar.
  pub fn expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    if self.peek(ctx).typ == TT::KeywordLambda {
      return self.lambda(ctx);
    };
    let body = self.expr_at(ctx, PRECEDENCE_OR)?;
    if self.peek(ctx).typ != TT::KeywordIf {
      return Ok(body);
    };
    let if_kw = self.require_leaf(ctx, TT::KeywordIf)?;
    let test = self.expr_at(ctx, PRECEDENCE_OR)?;
    let else_kw = self.require_leaf(ctx, TT::KeywordElse)?;
    let orelse = self.expr(ctx)?;
    let loc = self.loc_from(body.loc, orelse.loc);
    Ok(wrap_expr(loc, IfElseExpr {
      body,
      if_kw,
      test,
      else_kw,
      orelse,
    }))
  }

  fn lambda(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.require(ctx, TT::KeywordLambda)?;
    let lambda_kw = self.leaf(&t);
    let params = self.parameters(ctx, TT::Colon, false)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.expr(ctx)?;
    let loc = self.loc_from(t.loc, body.loc);
    Ok(wrap_expr(loc, LambdaExpr {
      lambda_kw,
      params,
      colon,
      body,
    }))
  }

  /// Parameters up to (but not including) `close`. Lambda parameters cannot be annotated.
  pub fn parameters(
    &mut self,
    ctx: ParseCtx,
    close: TT,
    annotations: bool,
  ) -> SyntaxResult<Node<Parameters>> {
    let start = self.peek(ctx).loc;
    let mut params = Vec::new();
    loop {
      let t = self.peek(ctx);
      if t.typ == close {
        break;
      };
      let star = match t.typ {
        TT::Asterisk | TT::AsteriskAsterisk | TT::Slash => {
          self.consume(ctx);
          Some(self.leaf(&t))
        }
        _ => None,
      };
      let bare_marker = match star.as_ref().map(|s| s.text.as_str()) {
        Some("/") => true,
        Some("*") => matches!(self.peek(ctx).typ, TT::Comma) || self.peek(ctx).typ == close,
        _ => false,
      };
      let name = if bare_marker {
        None
      } else {
        Some(self.name(ctx)?)
      };
      let annotation = if annotations && name.is_some() && self.peek(ctx).typ == TT::Colon {
        let indicator = self.require_leaf(ctx, TT::Colon)?;
        let variadic = star.as_ref().is_some_and(|s| s.text == "*");
        let annotation = if variadic {
          self.star_expr(ctx, false)?
        } else {
          self.expr(ctx)?
        };
        Some(Node::new(annotation.loc, Annotation {
          indicator,
          annotation,
        }))
      } else {
        None
      };
      let default = match self.consume_leaf_if(ctx, TT::Equals) {
        Some(equal) => {
          let value = self.expr(ctx)?;
          Some(Node::new(value.loc, ParamDefault { equal, value }))
        }
        None => None,
      };
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      params.push(Node::new(t.loc, Param {
        star,
        name,
        annotation,
        default,
        comma,
      }));
      if done {
        break;
      };
    }
    Ok(Node::new(start, Parameters { params }))
  }

  /// Binary and unary operators binding at least as tightly as `min_prec`.
  pub fn expr_at(&mut self, ctx: ParseCtx, min_prec: u8) -> SyntaxResult<Node<Expr>> {
    let mut left = self.operand(ctx)?;
    loop {
      let t = self.peek(ctx);
      if let Some(op) = BINARY_OPERATOR_MAPPING.get(&t.typ) {
        if op.precedence < min_prec {
          break;
        };
        self.consume(ctx);
        let op_leaf = self.leaf(&t);
        let next_min = match op.associativity {
          Associativity::Left => op.precedence + 1,
          // The right operand of `**` is a unary expression.
          Associativity::Right => op.precedence - 1,
        };
        let right = self.expr_at(ctx, next_min)?;
        let loc = self.loc_from(left.loc, right.loc);
        left = wrap_expr(loc, BinaryExpr {
          left,
          operator: op.name,
          op: op_leaf,
          right,
        });
        continue;
      };
      if PRECEDENCE_COMPARISON >= min_prec && self.peek_comparison(ctx).is_some() {
        left = self.comparison(ctx, left)?;
        continue;
      };
      break;
    }
    Ok(left)
  }

  fn peek_comparison(&mut self, ctx: ParseCtx) -> Option<OperatorName> {
    let (a, b) = self.peek_2(ctx);
    match (a.typ, b.typ) {
      (TT::KeywordNot, TT::KeywordIn) => Some(OperatorName::NotIn),
      (TT::KeywordIs, TT::KeywordNot) => Some(OperatorName::IsNot),
      (typ, _) => COMPARISON_OPERATOR_MAPPING.get(&typ).map(|op| op.name),
    }
  }

  fn comparison(&mut self, ctx: ParseCtx, left: Node<Expr>) -> SyntaxResult<Node<Expr>> {
    let mut comparisons = Vec::new();
    while let Some(operator) = self.peek_comparison(ctx) {
      let first = self.consume(ctx);
      let mut op = vec![self.leaf(&first)];
      if matches!(operator, OperatorName::NotIn | OperatorName::IsNot) {
        let second = self.consume(ctx);
        op.push(self.leaf(&second));
      };
      let comparator = self.expr_at(ctx, PRECEDENCE_BITWISE_OR)?;
      let loc = self.loc_from(first.loc, comparator.loc);
      comparisons.push(Node::new(loc, ComparisonTarget {
        operator,
        op,
        comparator,
      }));
    }
    let loc = self.loc_from(left.loc, comparisons.last().map(|c| c.loc).unwrap_or(left.loc));
    Ok(wrap_expr(loc, ComparisonExpr { left, comparisons }))
  }

  fn operand(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.peek(ctx);
    if let Some(op) = UNARY_OPERATOR_MAPPING.get(&t.typ) {
      self.consume(ctx);
      let op_leaf = self.leaf(&t);
      let operand = self.expr_at(ctx, op.precedence)?;
      let loc = self.loc_from(t.loc, operand.loc);
      return Ok(wrap_expr(loc, UnaryExpr {
        operator: op.name,
        op: op_leaf,
        operand,
      }));
    };
    if t.typ == TT::KeywordAwait {
      self.consume(ctx);
      let await_kw = self.leaf(&t);
      let value = self.primary(ctx)?;
      let loc = self.loc_from(t.loc, value.loc);
      return Ok(wrap_expr(loc, AwaitExpr { await_kw, value }));
    };
    self.primary(ctx)
  }

  /// An atom followed by any attribute accesses, calls and subscripts.
  pub fn primary(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let mut value = self.atom(ctx)?;
    loop {
      let t = self.peek(ctx);
      match t.typ {
        TT::Dot => {
          self.consume(ctx);
          let dot = self.leaf(&t);
          let attr = self.name(ctx)?;
          let loc = self.loc_from(value.loc, attr.loc);
          value = wrap_expr(loc, AttributeExpr { value, dot, attr });
        }
        TT::ParenthesisOpen => {
          self.consume(ctx);
          let lpar = self.leaf(&t);
          let args = self.call_args()?;
          let rpar_t = self.require(ParseCtx::bracketed(), TT::ParenthesisClose)?;
          let rpar = self.leaf(&rpar_t);
          let loc = self.loc_from(value.loc, rpar_t.loc);
          value = wrap_expr(loc, CallExpr {
            func: value,
            lpar,
            args,
            rpar,
          });
        }
        TT::BracketOpen => {
          self.consume(ctx);
          let lbracket = self.leaf(&t);
          let slices = self.slices()?;
          let rbracket_t = self.require(ParseCtx::bracketed(), TT::BracketClose)?;
          let rbracket = self.leaf(&rbracket_t);
          let loc = self.loc_from(value.loc, rbracket_t.loc);
          value = wrap_expr(loc, SubscriptExpr {
            value,
            lbracket,
            slices,
            rbracket,
          });
        }
        _ => break,
      };
    }
    Ok(value)
  }

  /// Arguments of a call, up to (but not including) the closing parenthesis.
  pub fn call_args(&mut self) -> SyntaxResult<Vec<Node<Arg>>> {
    let ctx = ParseCtx::bracketed();
    let mut args = Vec::new();
    loop {
      let t = self.peek(ctx);
      if t.typ == TT::ParenthesisClose {
        break;
      };
      let star = match t.typ {
        TT::Asterisk | TT::AsteriskAsterisk => {
          self.consume(ctx);
          Some(self.leaf(&t))
        }
        _ => None,
      };
      let (a, b) = self.peek_2(ctx);
      let keyword = if star.is_none() && a.typ == TT::Identifier && b.typ == TT::Equals {
        let name = self.name(ctx)?;
        let equal = self.require_leaf(ctx, TT::Equals)?;
        Some(Node::new(name.loc, ArgKeyword { name, equal }))
      } else {
        None
      };
      let mut value = if star.is_some() || keyword.is_some() {
        self.expr(ctx)?
      } else {
        self.named_expr(ctx)?
      };
      if star.is_none() && keyword.is_none() && self.peek_comp_for(ctx) {
        let clauses = self.comp_clauses(ctx)?;
        let loc = self.loc_from(value.loc, clauses.last().map(|c| c.loc).unwrap_or(value.loc));
        value = wrap_expr(loc, ComprehensionExpr {
          kind: ComprehensionKind::Generator,
          open: None,
          elt: value,
          colon: None,
          dict_value: None,
          clauses,
          close: None,
        });
      };
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      args.push(Node::new(t.loc, Arg {
        star,
        keyword,
        value,
        comma,
      }));
      if done {
        break;
      };
    }
    Ok(args)
  }

  fn slices(&mut self) -> SyntaxResult<Vec<Node<SubscriptElement>>> {
    let ctx = ParseCtx::bracketed();
    let mut slices = Vec::new();
    loop {
      let t = self.peek(ctx);
      if t.typ == TT::BracketClose {
        break;
      };
      let lower = if t.typ == TT::Colon {
        None
      } else {
        Some(self.star_named_expr(ctx)?)
      };
      let slice = match self.consume_leaf_if(ctx, TT::Colon) {
        None => {
          let value = lower.ok_or_else(|| t.error(SyntaxErrorType::ExpectedSyntax("slice")))?;
          Slice::Index(Node::new(value.loc, SliceIndex { value }))
        }
        Some(colon) => {
          let upper = if matches!(
            self.peek(ctx).typ,
            TT::Colon | TT::Comma | TT::BracketClose
          ) {
            None
          } else {
            Some(self.expr(ctx)?)
          };
          let step_colon = self.consume_leaf_if(ctx, TT::Colon);
          let step = if step_colon.is_some()
            && !matches!(self.peek(ctx).typ, TT::Comma | TT::BracketClose)
          {
            Some(self.expr(ctx)?)
          } else {
            None
          };
          Slice::Range(Node::new(t.loc, SliceRange {
            lower,
            colon,
            upper,
            step_colon,
            step,
          }))
        }
      };
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      slices.push(Node::new(t.loc, SubscriptElement { slice, comma }));
      if done {
        break;
      };
    }
    Ok(slices)
  }

  fn peek_comp_for(&mut self, ctx: ParseCtx) -> bool {
    let (a, b) = self.peek_2(ctx);
    a.typ == TT::KeywordFor || (a.typ == TT::KeywordAsync && b.typ == TT::KeywordFor)
  }

  /// Targets of `for` clauses and statements. They bind tighter than comparisons so that `in` ends them.
  pub fn target_list(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let first = self.star_target(ctx)?;
    if self.peek(ctx).typ != TT::Comma {
      return Ok(first);
    };
    let start = first.loc;
    let mut elements = Vec::new();
    let mut value = first;
    loop {
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      elements.push(Node::new(value.loc, Element { value, comma }));
      if done || !starts_expr(self.peek(ctx).typ) {
        break;
      };
      value = self.star_target(ctx)?;
    }
    let loc = self.loc_from(start, elements.last().map(|e| e.loc).unwrap_or(start));
    Ok(wrap_expr(loc, TupleExpr {
      lpar: None,
      elements,
      rpar: None,
    }))
  }

  fn star_target(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    match self.consume_leaf_if(ctx, TT::Asterisk) {
      Some(star) => {
        let value = self.expr_at(ctx, PRECEDENCE_BITWISE_OR)?;
        Ok(wrap_expr(value.loc, StarredExpr { star, value }))
      }
      None => self.expr_at(ctx, PRECEDENCE_BITWISE_OR),
    }
  }

  pub fn comp_clauses(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<CompFor>>> {
    let mut clauses = Vec::new();
    while self.peek_comp_for(ctx) {
      let start = self.peek(ctx).loc;
      let async_kw = self.consume_leaf_if(ctx, TT::KeywordAsync);
      let for_kw = self.require_leaf(ctx, TT::KeywordFor)?;
      let target = self.target_list(ctx)?;
      let in_kw = self.require_leaf(ctx, TT::KeywordIn)?;
      let iter = self.expr_at(ctx, PRECEDENCE_OR)?;
      let mut ifs = Vec::new();
      let mut end = iter.loc;
      while let Some(if_kw) = self.consume_leaf_if(ctx, TT::KeywordIf) {
        let test = self.expr_at(ctx, PRECEDENCE_OR)?;
        end = test.loc;
        ifs.push(Node::new(test.loc, CompIf { if_kw, test }));
      }
      clauses.push(Node::new(self.loc_from(start, end), CompFor {
        async_kw,
        for_kw,
        target,
        in_kw,
        iter,
        ifs,
      }));
    }
    Ok(clauses)
  }

  fn comprehension(
    &mut self,
    kind: ComprehensionKind,
    open: Leaf,
    elt: Node<Expr>,
    dict_value: Option<(Leaf, Node<Expr>)>,
    close_typ: TT,
    start: Loc,
  ) -> SyntaxResult<Node<Expr>> {
    let ctx = ParseCtx::bracketed();
    let clauses = self.comp_clauses(ctx)?;
    let close_t = self.require(ctx, close_typ)?;
    let (colon, dict_value) = match dict_value {
      Some((colon, value)) => (Some(colon), Some(value)),
      None => (None, None),
    };
    Ok(wrap_expr(self.loc_from(start, close_t.loc), ComprehensionExpr {
      kind,
      open: Some(open),
      elt,
      colon,
      dict_value,
      clauses,
      close: Some(self.leaf(&close_t)),
    }))
  }

  /// Elements of a display after the first one, up to (but not including) `close`.
  fn elements(&mut self, first: Node<Expr>, close: TT) -> SyntaxResult<Vec<Node<Element>>> {
    let ctx = ParseCtx::bracketed();
    let mut elements = Vec::new();
    let mut value = first;
    loop {
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      elements.push(Node::new(value.loc, Element { value, comma }));
      if done || self.peek(ctx).typ == close {
        break;
      };
      value = self.star_named_expr(ctx)?;
    }
    Ok(elements)
  }

  pub fn atom(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.peek(ctx);
    match t.typ {
      TT::Identifier => {
        let name = self.name(ctx)?;
        Ok(Node::new(name.loc, Expr::Name(name)))
      }
      TT::LiteralNumber => {
        self.consume(ctx);
        Ok(wrap_expr(t.loc, NumberExpr {
          value: self.leaf(&t),
        }))
      }
      TT::KeywordNone | TT::KeywordTrue | TT::KeywordFalse => {
        self.consume(ctx);
        Ok(wrap_expr(t.loc, ConstantExpr {
          value: self.leaf(&t),
        }))
      }
      TT::DotDotDot => {
        self.consume(ctx);
        Ok(wrap_expr(t.loc, EllipsisExpr {
          value: self.leaf(&t),
        }))
      }
      TT::LiteralString | TT::FStringStart => self.strings(ctx),
      TT::ParenthesisOpen => self.paren_or_tuple(ctx),
      TT::BracketOpen => self.list_display(ctx),
      TT::BraceOpen => self.dict_or_set_display(ctx),
      _ => Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax("expression"))),
    }
  }

  fn string_part(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.peek(ctx);
    if t.typ == TT::FStringStart {
      let f = self.fstring(ctx)?;
      return Ok(Node::new(f.loc, Expr::FString(f)));
    };
    self.consume(ctx);
    Ok(wrap_expr(t.loc, StrExpr {
      value: self.leaf(&t),
    }))
  }

  fn strings(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let first = self.string_part(ctx)?;
    if !matches!(self.peek(ctx).typ, TT::LiteralString | TT::FStringStart) {
      return Ok(first);
    };
    let mut parts = vec![first];
    while matches!(self.peek(ctx).typ, TT::LiteralString | TT::FStringStart) {
      parts.push(self.string_part(ctx)?);
    }
    let loc = self.loc_from(parts[0].loc, parts[parts.len() - 1].loc);
    Ok(wrap_expr(loc, ConcatExpr { parts }))
  }

  fn paren_or_tuple(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let open_t = self.require(ctx, TT::ParenthesisOpen)?;
    let lpar = self.leaf(&open_t);
    let inner_ctx = ParseCtx::bracketed();
    if let Some(rpar) = self.consume_leaf_if(inner_ctx, TT::ParenthesisClose) {
      return Ok(wrap_expr(open_t.loc, TupleExpr {
        lpar: Some(lpar),
        elements: Vec::new(),
        rpar: Some(rpar),
      }));
    };
    if self.peek(inner_ctx).typ == TT::KeywordYield {
      let inner = self.yield_expr(inner_ctx)?;
      let close_t = self.require(inner_ctx, TT::ParenthesisClose)?;
      let rpar = self.leaf(&close_t);
      return Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), ParenExpr {
        lpar,
        inner,
        rpar,
      }));
    };
    let first = self.star_named_expr(inner_ctx)?;
    if self.peek_comp_for(inner_ctx) {
      return self.comprehension(
        ComprehensionKind::Generator,
        lpar,
        first,
        None,
        TT::ParenthesisClose,
        open_t.loc,
      );
    };
    if self.peek(inner_ctx).typ == TT::Comma {
      let elements = self.elements(first, TT::ParenthesisClose)?;
      let close_t = self.require(inner_ctx, TT::ParenthesisClose)?;
      return Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), TupleExpr {
        lpar: Some(lpar),
        elements,
        rpar: Some(self.leaf(&close_t)),
      }));
    };
    let close_t = self.require(inner_ctx, TT::ParenthesisClose)?;
    Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), ParenExpr {
      lpar,
      inner: first,
      rpar: self.leaf(&close_t),
    }))
  }

  fn list_display(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let open_t = self.require(ctx, TT::BracketOpen)?;
    let lbracket = self.leaf(&open_t);
    let inner_ctx = ParseCtx::bracketed();
    if let Some(rbracket) = self.consume_leaf_if(inner_ctx, TT::BracketClose) {
      return Ok(wrap_expr(open_t.loc, ListExpr {
        lbracket,
        elements: Vec::new(),
        rbracket,
      }));
    };
    let first = self.star_named_expr(inner_ctx)?;
    if self.peek_comp_for(inner_ctx) {
      return self.comprehension(
        ComprehensionKind::List,
        lbracket,
        first,
        None,
        TT::BracketClose,
        open_t.loc,
      );
    };
    let elements = self.elements(first, TT::BracketClose)?;
    let close_t = self.require(inner_ctx, TT::BracketClose)?;
    Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), ListExpr {
      lbracket,
      elements,
      rbracket: self.leaf(&close_t),
    }))
  }

  fn dict_item(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<DictItem>> {
    let t = self.peek(ctx);
    if let Some(star2) = self.consume_leaf_if(ctx, TT::AsteriskAsterisk) {
      let value = self.expr_at(ctx, PRECEDENCE_BITWISE_OR)?;
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      return Ok(Node::new(t.loc, DictItem {
        star2: Some(star2),
        key: None,
        colon: None,
        value,
        comma,
      }));
    };
    let key = self.expr(ctx)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let value = self.expr(ctx)?;
    let comma = self.consume_leaf_if(ctx, TT::Comma);
    Ok(Node::new(t.loc, DictItem {
      star2: None,
      key: Some(key),
      colon: Some(colon),
      value,
      comma,
    }))
  }

  fn dict_or_set_display(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let open_t = self.require(ctx, TT::BraceOpen)?;
    let lbrace = self.leaf(&open_t);
    let inner_ctx = ParseCtx::bracketed();
    if let Some(rbrace) = self.consume_leaf_if(inner_ctx, TT::BraceClose) {
      return Ok(wrap_expr(open_t.loc, DictExpr {
        lbrace,
        items: Vec::new(),
        rbrace,
      }));
    };
    let is_dict = if self.peek(inner_ctx).typ == TT::AsteriskAsterisk {
      true
    } else {
      let cp = self.checkpoint();
      let key = self.star_named_expr(inner_ctx);
      let colon_follows = key.is_ok() && self.peek(inner_ctx).typ == TT::Colon;
      self.restore_checkpoint(cp);
      colon_follows
    };
    if is_dict {
      let first_t = self.peek(inner_ctx);
      let first = self.dict_item(inner_ctx)?;
      if first.stx.star2.is_none() && first.stx.comma.is_none() && self.peek_comp_for(inner_ctx) {
        let item = *first.stx;
        let (Some(key), Some(colon)) = (item.key, item.colon) else {
          return Err(first_t.error(SyntaxErrorType::ExpectedSyntax("dict key")));
        };
        return self.comprehension(
          ComprehensionKind::Dict,
          lbrace,
          key,
          Some((colon, item.value)),
          TT::BraceClose,
          open_t.loc,
        );
      };
      let mut items = vec![first];
      while items.last().is_some_and(|i| i.stx.comma.is_some())
        && self.peek(inner_ctx).typ != TT::BraceClose
      {
        items.push(self.dict_item(inner_ctx)?);
      }
      let close_t = self.require(inner_ctx, TT::BraceClose)?;
      return Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), DictExpr {
        lbrace,
        items,
        rbrace: self.leaf(&close_t),
      }));
    };
    let first = self.star_named_expr(inner_ctx)?;
    if self.peek_comp_for(inner_ctx) {
      return self.comprehension(
        ComprehensionKind::Set,
        lbrace,
        first,
        None,
        TT::BraceClose,
        open_t.loc,
      );
    };
    let elements = self.elements(first, TT::BraceClose)?;
    let close_t = self.require(inner_ctx, TT::BraceClose)?;
    Ok(wrap_expr(self.loc_from(open_t.loc, close_t.loc), SetExpr {
      lbrace,
      elements,
      rbrace: self.leaf(&close_t),
    }))
  }
}

/// Wraps a specific expression into the generic expression node, both sharing the location.
pub fn wrap_expr<T>(loc: Loc, stx: T) -> Node<Expr>
where
  T: derive_visitor::Drive + derive_visitor::DriveMut,
  Node<T>: Into<Expr>,
{
  Node::new(loc, Node::new(loc, stx).into())
}
