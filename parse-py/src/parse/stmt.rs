use super::ParseCtx;
use super::Parser;
use crate::ast::expr::Annotation;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::ast::stmt::*;
use crate::ast::trivia::EmptyLine;
use crate::ast::trivia::Leaf;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::ast::trivia::Newline;
use crate::token::Token;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn parse_module(&mut self) -> SyntaxResult<Node<Module>> {
    let body = self.parse_statements("")?;
    let footer = self.take_leading_lines("");
    Ok(Node::new(self.source_range(), Module {
      bom: false,
      body,
      footer,
      default_indent: self.first_block_indent().unwrap_or("    ").to_string(),
      default_newline: "\n".to_string(),
    }))
  }

  /// Statements at exactly `indent`, until a dedent or the end of input.
  fn parse_statements(&mut self, indent: &str) -> SyntaxResult<Vec<Node<Stmt>>> {
    let mut body = Vec::new();
    loop {
      self.collect_empty_lines();
      let t = self.peek(ParseCtx::standard());
      if t.typ == TT::EOF {
        break;
      };
      let actual = self.indent_of(&t);
      if actual == indent {
        body.push(self.stmt(indent)?);
        continue;
      };
      if indent.starts_with(actual) {
        if !self.is_enclosing_indent(actual) {
          return Err(t.error(SyntaxErrorType::InconsistentDedent));
        };
        break;
      };
      let typ = if actual.starts_with(indent) {
        SyntaxErrorType::UnexpectedIndent
      } else {
        SyntaxErrorType::InconsistentDedent
      };
      return Err(t.error(typ));
    }
    Ok(body)
  }

  // A dedent must return to the indentation of some enclosing block.
  fn is_enclosing_indent(&self, indent: &str) -> bool {
    indent.is_empty() || self.block_indents.iter().any(|i| i == indent)
  }

  /// The body after a compound statement's colon. `indent` is the indentation of the statement's own line.
  pub fn suite(&mut self, indent: &str) -> SyntaxResult<Suite> {
    let t = self.peek(ParseCtx::standard());
    if !matches!(t.typ, TT::Newline | TT::EOF) {
      let (body, newline) = self.small_stmts()?;
      return Ok(Suite::Inline(Node::new(t.loc, SimpleSuite { body, newline })));
    };
    let header = self.require_newline()?;
    self.collect_empty_lines();
    let first = self.peek(ParseCtx::standard());
    let block_indent = self.indent_of(&first).to_string();
    if first.typ == TT::EOF || block_indent.len() <= indent.len() || !block_indent.starts_with(indent) {
      return Err(first.error(SyntaxErrorType::ExpectedIndentedBlock));
    };
    let relative = block_indent[indent.len()..].to_string();
    if self.first_block_indent.is_none() {
      self.first_block_indent = Some(relative.clone());
    };
    self.block_indents.push(block_indent.clone());
    let body = self.parse_statements(&block_indent);
    self.block_indents.pop();
    let body = body?;
    let footer = self.take_footer(&block_indent);
    Ok(Suite::Block(Node::new(first.loc, IndentedBlock {
      header,
      indent: Some(relative),
      body,
      footer,
    })))
  }

  /// Whether the next line starts with the keyword `kw` at `indent`, as for `else` and `except` clauses.
  fn peek_clause(&mut self, indent: &str, kw: TT) -> bool {
    self.collect_empty_lines();
    let t = self.peek(ParseCtx::standard());
    t.typ == kw && t.indent.is_some() && self.indent_of(&t) == indent
  }

  fn stmt(&mut self, indent: &str) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let leading_lines = self.take_leading_lines(indent);
    let (a, b) = self.peek_2(ctx);
    match a.typ {
      TT::At => self.decorated(indent, leading_lines),
      TT::KeywordDef => self.function_def(indent, leading_lines, Vec::new(), Vec::new()),
      TT::KeywordAsync if b.typ == TT::KeywordDef => {
        self.function_def(indent, leading_lines, Vec::new(), Vec::new())
      }
      TT::KeywordClass => self.class_def(indent, leading_lines, Vec::new(), Vec::new()),
      TT::KeywordIf => {
        let stmt = self.if_stmt(indent, leading_lines)?;
        Ok(Node::new(stmt.loc, Stmt::If(stmt)))
      }
      TT::KeywordWhile => self.while_stmt(indent, leading_lines),
      TT::KeywordFor => self.for_stmt(indent, leading_lines),
      TT::KeywordAsync if b.typ == TT::KeywordFor => self.for_stmt(indent, leading_lines),
      TT::KeywordTry => self.try_stmt(indent, leading_lines),
      TT::KeywordWith => self.with_stmt(indent, leading_lines),
      TT::KeywordAsync if b.typ == TT::KeywordWith => self.with_stmt(indent, leading_lines),
      TT::Identifier if self.str(a.loc) == "match" => {
        match self.match_stmt(indent, leading_lines.clone())? {
          Some(stmt) => Ok(stmt),
          None => self.simple_stmt_line(leading_lines),
        }
      }
      _ => self.simple_stmt_line(leading_lines),
    }
  }

  fn simple_stmt_line(&mut self, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let start = self.peek(ParseCtx::standard()).loc;
    let (body, newline) = self.small_stmts()?;
    let loc = start.add_option(body.last().map(|s| s.loc));
    Ok(Node::new(loc, Stmt::Simple(Node::new(loc, SimpleStmtLine {
      leading_lines,
      body,
      newline,
    }))))
  }

  /// Semicolon-separated simple statements and the end of their line.
  pub fn small_stmts(&mut self) -> SyntaxResult<(Vec<Node<SmallStmtItem>>, Newline)> {
    let ctx = ParseCtx::standard();
    let mut items = Vec::new();
    loop {
      let start = self.peek(ctx).loc;
      let stmt = self.small_stmt()?;
      let semicolon = self.consume_leaf_if(ctx, TT::Semicolon);
      let more = semicolon.is_some();
      items.push(Node::new(start, SmallStmtItem { stmt, semicolon }));
      if !more || matches!(self.peek(ctx).typ, TT::Newline | TT::EOF) {
        break;
      };
    }
    let newline = self.require_newline()?;
    Ok((items, newline))
  }

  fn keyword_leaf(&mut self, typ: TT) -> SyntaxResult<(Token, Leaf)> {
    let t = self.require(ParseCtx::standard(), typ)?;
    let leaf = self.leaf(&t);
    Ok((t, leaf))
  }

  fn at_line_end(&mut self) -> bool {
    matches!(
      self.peek(ParseCtx::standard()).typ,
      TT::Newline | TT::EOF | TT::Semicolon
    )
  }

  fn small_stmt(&mut self) -> SyntaxResult<SmallStmt> {
    let ctx = ParseCtx::standard();
    let (a, b, c) = self.peek_3(ctx);
    Ok(match a.typ {
      TT::KeywordPass => {
        let (t, keyword) = self.keyword_leaf(TT::KeywordPass)?;
        SmallStmt::Pass(Node::new(t.loc, PassStmt { keyword }))
      }
      TT::KeywordBreak => {
        let (t, keyword) = self.keyword_leaf(TT::KeywordBreak)?;
        SmallStmt::Break(Node::new(t.loc, BreakStmt { keyword }))
      }
      TT::KeywordContinue => {
        let (t, keyword) = self.keyword_leaf(TT::KeywordContinue)?;
        SmallStmt::Continue(Node::new(t.loc, ContinueStmt { keyword }))
      }
      TT::KeywordReturn => {
        let (t, return_kw) = self.keyword_leaf(TT::KeywordReturn)?;
        let value = if self.at_line_end() {
          None
        } else {
          Some(self.star_expressions(ctx)?)
        };
        SmallStmt::Return(Node::new(t.loc, ReturnStmt { return_kw, value }))
      }
      TT::KeywordDel => {
        let (t, del_kw) = self.keyword_leaf(TT::KeywordDel)?;
        let target = self.target_list(ctx)?;
        SmallStmt::Del(Node::new(t.loc, DelStmt { del_kw, target }))
      }
      TT::KeywordRaise => {
        let (t, raise_kw) = self.keyword_leaf(TT::KeywordRaise)?;
        let exc = if self.at_line_end() {
          None
        } else {
          Some(self.expr(ctx)?)
        };
        let cause = match self.consume_leaf_if(ctx, TT::KeywordFrom) {
          Some(from_kw) => {
            let cause = self.expr(ctx)?;
            Some(Node::new(cause.loc, RaiseFrom { from_kw, cause }))
          }
          None => None,
        };
        SmallStmt::Raise(Node::new(t.loc, RaiseStmt {
          raise_kw,
          exc,
          cause,
        }))
      }
      TT::KeywordAssert => {
        let (t, assert_kw) = self.keyword_leaf(TT::KeywordAssert)?;
        let test = self.expr(ctx)?;
        let comma = self.consume_leaf_if(ctx, TT::Comma);
        let msg = match comma {
          Some(_) => Some(self.expr(ctx)?),
          None => None,
        };
        SmallStmt::Assert(Node::new(t.loc, AssertStmt {
          assert_kw,
          test,
          comma,
          msg,
        }))
      }
      TT::KeywordGlobal => {
        let (t, keyword) = self.keyword_leaf(TT::KeywordGlobal)?;
        let names = self.name_items()?;
        SmallStmt::Global(Node::new(t.loc, GlobalStmt { keyword, names }))
      }
      TT::KeywordNonlocal => {
        let (t, keyword) = self.keyword_leaf(TT::KeywordNonlocal)?;
        let names = self.name_items()?;
        SmallStmt::Nonlocal(Node::new(t.loc, NonlocalStmt { keyword, names }))
      }
      TT::KeywordImport => self.import_stmt()?,
      TT::KeywordFrom => self.import_from_stmt()?,
      TT::Identifier
        if self.str(a.loc) == "type"
          && b.typ == TT::Identifier
          && matches!(c.typ, TT::Equals | TT::BracketOpen) =>
      {
        self.type_alias()?
      }
      _ => self.expr_or_assign()?,
    })
  }

  fn name_items(&mut self) -> SyntaxResult<Vec<Node<NameItem>>> {
    let ctx = ParseCtx::standard();
    let mut names = Vec::new();
    loop {
      let name = self.name(ctx)?;
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none();
      names.push(Node::new(name.loc, NameItem { name, comma }));
      if done {
        break;
      };
    }
    Ok(names)
  }

  // A dotted module path or name, kept verbatim including any interior whitespace. With `dots`, leading dots of a relative import are included.
  fn dotted_leaf(&mut self, ctx: ParseCtx, dots: bool) -> SyntaxResult<Leaf> {
    let first = self.peek(ctx);
    let mut ws = None;
    let mut end = first.loc.1;
    let mut expect_name = true;
    loop {
      let t = self.peek(ctx);
      let take = match t.typ {
        TT::Dot | TT::DotDotDot => (dots && expect_name) || !expect_name,
        TT::Identifier => expect_name,
        _ => false,
      };
      if !take {
        break;
      };
      self.consume(ctx);
      if ws.is_none() {
        ws = Some(self.string(t.ws));
      };
      end = t.loc.1;
      match t.typ {
        TT::Identifier => {
          expect_name = false;
        }
        _ => {
          expect_name = true;
        }
      };
    }
    let Some(ws) = ws else {
      return Err(self.unexpected(&first, SyntaxErrorType::ExpectedSyntax("module name")));
    };
    Ok(Leaf::new(ws, self.str(Loc(first.loc.0, end))))
  }

  fn import_alias(&mut self, ctx: ParseCtx, dotted: bool) -> SyntaxResult<Node<ImportAlias>> {
    let start = self.peek(ctx).loc;
    let name = if dotted {
      self.dotted_leaf(ctx, false)?
    } else {
      let t = self.require(ctx, TT::Identifier)?;
      self.leaf(&t)
    };
    let asname = match self.consume_leaf_if(ctx, TT::KeywordAs) {
      Some(as_kw) => {
        let name = self.name(ctx)?;
        Some(Node::new(name.loc, AsName { as_kw, name }))
      }
      None => None,
    };
    let comma = self.consume_leaf_if(ctx, TT::Comma);
    Ok(Node::new(start, ImportAlias {
      name,
      asname,
      comma,
    }))
  }

  fn import_stmt(&mut self) -> SyntaxResult<SmallStmt> {
    let ctx = ParseCtx::standard();
    let (t, import_kw) = self.keyword_leaf(TT::KeywordImport)?;
    let mut names = Vec::new();
    loop {
      let alias = self.import_alias(ctx, true)?;
      let done = alias.stx.comma.is_none();
      names.push(alias);
      if done {
        break;
      };
    }
    Ok(SmallStmt::Import(Node::new(t.loc, ImportStmt {
      import_kw,
      names,
    })))
  }

  fn import_from_stmt(&mut self) -> SyntaxResult<SmallStmt> {
    let ctx = ParseCtx::standard();
    let (t, from_kw) = self.keyword_leaf(TT::KeywordFrom)?;
    let module = self.dotted_leaf(ctx, true)?;
    let import_kw = self.require_leaf(ctx, TT::KeywordImport)?;
    let lpar = self.consume_leaf_if(ctx, TT::ParenthesisOpen);
    let inner = if lpar.is_some() {
      ParseCtx::bracketed()
    } else {
      ctx
    };
    let star = if lpar.is_none() {
      self.consume_leaf_if(ctx, TT::Asterisk)
    } else {
      None
    };
    let mut names = Vec::new();
    if star.is_none() {
      loop {
        let alias = self.import_alias(inner, false)?;
        let done = alias.stx.comma.is_none()
          || (lpar.is_some() && self.peek(inner).typ == TT::ParenthesisClose)
          || (lpar.is_none() && self.at_line_end());
        names.push(alias);
        if done {
          break;
        };
      }
    };
    let rpar = match lpar {
      Some(_) => Some(self.require_leaf(inner, TT::ParenthesisClose)?),
      None => None,
    };
    Ok(SmallStmt::ImportFrom(Node::new(t.loc, ImportFromStmt {
      from_kw,
      module,
      import_kw,
      lpar,
      star,
      names,
      rpar,
    })))
  }

  fn type_alias(&mut self) -> SyntaxResult<SmallStmt> {
    let ctx = ParseCtx::standard();
    let (t, type_kw) = self.keyword_leaf(TT::Identifier)?;
    let name = self.name(ctx)?;
    let type_params = self.maybe_type_params(ctx)?;
    let equal = self.require_leaf(ctx, TT::Equals)?;
    let value = self.expr(ctx)?;
    Ok(SmallStmt::TypeAlias(Node::new(t.loc, TypeAliasStmt {
      type_kw,
      name,
      type_params,
      equal,
      value,
    })))
  }

  pub fn maybe_type_params(&mut self, ctx: ParseCtx) -> SyntaxResult<Option<Node<TypeParams>>> {
    let Some(open_t) = self.consume_token_if_with_mode(TT::BracketOpen, ctx.mode()) else {
      return Ok(None);
    };
    let lbracket = self.leaf(&open_t);
    let inner = ParseCtx::bracketed();
    let mut params = Vec::new();
    loop {
      let t = self.peek(inner);
      if t.typ == TT::BracketClose {
        break;
      };
      let param = match t.typ {
        TT::Asterisk => {
          self.consume(inner);
          let star = self.leaf(&t);
          let name = self.name(inner)?;
          let default = self.type_param_default(inner, true)?;
          TypeParamKind::TypeVarTuple(Node::new(t.loc, TypeVarTupleParam {
            star,
            name,
            default,
          }))
        }
        TT::AsteriskAsterisk => {
          self.consume(inner);
          let star2 = self.leaf(&t);
          let name = self.name(inner)?;
          let default = self.type_param_default(inner, false)?;
          TypeParamKind::ParamSpec(Node::new(t.loc, ParamSpecParam {
            star2,
            name,
            default,
          }))
        }
        _ => {
          let name = self.name(inner)?;
          let bound = match self.consume_leaf_if(inner, TT::Colon) {
            Some(colon) => {
              let bound = self.expr(inner)?;
              Some(Node::new(bound.loc, TypeVarBound { colon, bound }))
            }
            None => None,
          };
          let default = self.type_param_default(inner, false)?;
          TypeParamKind::TypeVar(Node::new(t.loc, TypeVarParam {
            name,
            bound,
            default,
          }))
        }
      };
      let comma = self.consume_leaf_if(inner, TT::Comma);
      let done = comma.is_none();
      params.push(Node::new(t.loc, TypeParam { param, comma }));
      if done {
        break;
      };
    }
    let close_t = self.require(inner, TT::BracketClose)?;
    Ok(Some(Node::new(Loc(open_t.loc.0, close_t.loc.1), TypeParams {
      lbracket,
      params,
      rbracket: self.leaf(&close_t),
    })))
  }

  fn type_param_default(
    &mut self,
    ctx: ParseCtx,
    starred: bool,
  ) -> SyntaxResult<Option<Node<TypeParamDefault>>> {
    let Some(equal) = self.consume_leaf_if(ctx, TT::Equals) else {
      return Ok(None);
    };
    let value = if starred {
      self.star_named_expr(ctx)?
    } else {
      self.expr(ctx)?
    };
    Ok(Some(Node::new(value.loc, TypeParamDefault { equal, value })))
  }

  fn expr_or_assign(&mut self) -> SyntaxResult<SmallStmt> {
    let ctx = ParseCtx::standard();
    let first = self.yield_or_star_expressions(ctx)?;
    let t = self.peek(ctx);
    if t.typ == TT::Colon {
      let indicator = self.require_leaf(ctx, TT::Colon)?;
      let annotation = self.expr(ctx)?;
      let annotation = Node::new(annotation.loc, Annotation {
        indicator,
        annotation,
      });
      let equal = self.consume_leaf_if(ctx, TT::Equals);
      let value = match equal {
        Some(_) => Some(self.yield_or_star_expressions(ctx)?),
        None => None,
      };
      return Ok(SmallStmt::AnnAssign(Node::new(first.loc, AnnAssignStmt {
        target: first,
        annotation,
        equal,
        value,
      })));
    };
    if t.typ.is_augmented_assignment() {
      self.consume(ctx);
      let op = self.leaf(&t);
      let value = self.yield_or_star_expressions(ctx)?;
      return Ok(SmallStmt::AugAssign(Node::new(first.loc, AugAssignStmt {
        target: first,
        op,
        value,
      })));
    };
    if t.typ == TT::Equals {
      let loc = first.loc;
      let mut targets = Vec::new();
      let mut current = first;
      while let Some(equal) = self.consume_leaf_if(ctx, TT::Equals) {
        if !is_assignable(&current.stx) {
          return Err(current.error(SyntaxErrorType::InvalidAssignmentTarget));
        };
        targets.push(Node::new(current.loc, AssignTarget {
          target: current,
          equal,
        }));
        current = self.yield_or_star_expressions(ctx)?;
      }
      return Ok(SmallStmt::Assign(Node::new(loc, AssignStmt {
        targets,
        value: current,
      })));
    };
    Ok(SmallStmt::Expr(Node::new(first.loc, ExprStmt { value: first })))
  }

  fn decorated(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let mut decorators = Vec::new();
    let mut decorator_lines = Vec::new();
    loop {
      let (t, at) = self.keyword_leaf(TT::At)?;
      let expr = self.named_expr(ctx)?;
      let newline = self.require_newline()?;
      decorators.push(Node::new(t.loc, Decorator {
        leading_lines: decorator_lines,
        at,
        expr,
        newline,
      }));
      self.collect_empty_lines();
      let next = self.peek(ctx);
      if self.indent_of(&next) != indent {
        return Err(next.error(SyntaxErrorType::UnexpectedIndent));
      };
      decorator_lines = self.take_leading_lines(indent);
      if next.typ != TT::At {
        break;
      };
    }
    let (a, b) = self.peek_2(ctx);
    match (a.typ, b.typ) {
      (TT::KeywordDef, _) | (TT::KeywordAsync, TT::KeywordDef) => {
        self.function_def(indent, leading_lines, decorators, decorator_lines)
      }
      (TT::KeywordClass, _) => self.class_def(indent, leading_lines, decorators, decorator_lines),
      _ => Err(self.unexpected(&a, SyntaxErrorType::ExpectedSyntax("function or class definition"))),
    }
  }

  fn function_def(
    &mut self,
    indent: &str,
    leading_lines: Vec<EmptyLine>,
    decorators: Vec<Node<Decorator>>,
    lines_after_decorators: Vec<EmptyLine>,
  ) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let start = self.peek(ctx).loc;
    let async_kw = self.consume_leaf_if(ctx, TT::KeywordAsync);
    let def_kw = self.require_leaf(ctx, TT::KeywordDef)?;
    let name = self.name(ctx)?;
    let type_params = self.maybe_type_params(ctx)?;
    let lpar = self.require_leaf(ctx, TT::ParenthesisOpen)?;
    let params = self.parameters(ParseCtx::bracketed(), TT::ParenthesisClose, true)?;
    let rpar = self.require_leaf(ParseCtx::bracketed(), TT::ParenthesisClose)?;
    let returns = match self.consume_leaf_if(ctx, TT::HyphenChevronRight) {
      Some(indicator) => {
        let annotation = self.expr(ctx)?;
        Some(Node::new(annotation.loc, Annotation {
          indicator,
          annotation,
        }))
      }
      None => None,
    };
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let def = Node::new(start, FunctionDef {
      leading_lines,
      decorators,
      lines_after_decorators,
      async_kw,
      def_kw,
      name,
      type_params,
      lpar,
      params,
      rpar,
      returns,
      colon,
      body,
    });
    Ok(Node::new(start, Stmt::FunctionDef(def)))
  }

  fn class_def(
    &mut self,
    indent: &str,
    leading_lines: Vec<EmptyLine>,
    decorators: Vec<Node<Decorator>>,
    lines_after_decorators: Vec<EmptyLine>,
  ) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let (t, class_kw) = self.keyword_leaf(TT::KeywordClass)?;
    let name = self.name(ctx)?;
    let type_params = self.maybe_type_params(ctx)?;
    let lpar = self.consume_leaf_if(ctx, TT::ParenthesisOpen);
    let (args, rpar) = match lpar {
      Some(_) => {
        let args = self.call_args()?;
        let rpar = self.require_leaf(ParseCtx::bracketed(), TT::ParenthesisClose)?;
        (args, Some(rpar))
      }
      None => (Vec::new(), None),
    };
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let class = Node::new(t.loc, ClassDef {
      leading_lines,
      decorators,
      lines_after_decorators,
      class_kw,
      name,
      type_params,
      lpar,
      args,
      rpar,
      colon,
      body,
    });
    Ok(Node::new(t.loc, Stmt::ClassDef(class)))
  }

  fn else_clause(&mut self, indent: &str) -> SyntaxResult<Option<Node<ElseClause>>> {
    if !self.peek_clause(indent, TT::KeywordElse) {
      return Ok(None);
    };
    let leading_lines = self.take_leading_lines(indent);
    let (t, else_kw) = self.keyword_leaf(TT::KeywordElse)?;
    let colon = self.require_leaf(ParseCtx::standard(), TT::Colon)?;
    let body = self.suite(indent)?;
    Ok(Some(Node::new(t.loc, ElseClause {
      leading_lines,
      else_kw,
      colon,
      body,
    })))
  }

  // Parses `if` or `elif` and everything after it.
  fn if_stmt(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<IfStmt>> {
    let ctx = ParseCtx::standard();
    let t = self.require_predicate(
      ctx,
      |typ| matches!(typ, TT::KeywordIf | TT::KeywordElif),
      "if",
    )?;
    let if_kw = self.leaf(&t);
    let test = self.named_expr(ctx)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let orelse = if self.peek_clause(indent, TT::KeywordElif) {
      let leading_lines = self.take_leading_lines(indent);
      Some(OrElse::Elif(self.if_stmt(indent, leading_lines)?))
    } else {
      self.else_clause(indent)?.map(OrElse::Else)
    };
    Ok(Node::new(t.loc, IfStmt {
      leading_lines,
      if_kw,
      test,
      colon,
      body,
      orelse,
    }))
  }

  fn while_stmt(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let (t, while_kw) = self.keyword_leaf(TT::KeywordWhile)?;
    let test = self.named_expr(ctx)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let orelse = self.else_clause(indent)?;
    let stmt = Node::new(t.loc, WhileStmt {
      leading_lines,
      while_kw,
      test,
      colon,
      body,
      orelse,
    });
    Ok(Node::new(t.loc, Stmt::While(stmt)))
  }

  fn for_stmt(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let start = self.peek(ctx).loc;
    let async_kw = self.consume_leaf_if(ctx, TT::KeywordAsync);
    let for_kw = self.require_leaf(ctx, TT::KeywordFor)?;
    let target = self.target_list(ctx)?;
    let in_kw = self.require_leaf(ctx, TT::KeywordIn)?;
    let iter = self.star_expressions(ctx)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let orelse = self.else_clause(indent)?;
    let stmt = Node::new(start, ForStmt {
      leading_lines,
      async_kw,
      for_kw,
      target,
      in_kw,
      iter,
      colon,
      body,
      orelse,
    });
    Ok(Node::new(start, Stmt::For(stmt)))
  }

  fn try_stmt(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let (t, try_kw) = self.keyword_leaf(TT::KeywordTry)?;
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let mut handlers = Vec::new();
    while self.peek_clause(indent, TT::KeywordExcept) {
      let leading_lines = self.take_leading_lines(indent);
      let (except_t, except_kw) = self.keyword_leaf(TT::KeywordExcept)?;
      let star = self.consume_leaf_if(ctx, TT::Asterisk);
      let typ = if self.peek(ctx).typ == TT::Colon {
        None
      } else {
        Some(self.expr(ctx)?)
      };
      let name = match self.consume_leaf_if(ctx, TT::KeywordAs) {
        Some(as_kw) => {
          let name = self.name(ctx)?;
          Some(Node::new(name.loc, AsName { as_kw, name }))
        }
        None => None,
      };
      let colon = self.require_leaf(ctx, TT::Colon)?;
      let body = self.suite(indent)?;
      handlers.push(Node::new(except_t.loc, ExceptHandler {
        leading_lines,
        except_kw,
        star,
        typ,
        name,
        colon,
        body,
      }));
    }
    let orelse = if handlers.is_empty() {
      None
    } else {
      self.else_clause(indent)?
    };
    let finalbody = if self.peek_clause(indent, TT::KeywordFinally) {
      let leading_lines = self.take_leading_lines(indent);
      let (finally_t, finally_kw) = self.keyword_leaf(TT::KeywordFinally)?;
      let colon = self.require_leaf(ctx, TT::Colon)?;
      let body = self.suite(indent)?;
      Some(Node::new(finally_t.loc, FinallyClause {
        leading_lines,
        finally_kw,
        colon,
        body,
      }))
    } else {
      None
    };
    if handlers.is_empty() && finalbody.is_none() {
      return Err(t.error(SyntaxErrorType::TryStatementHasNoExceptOrFinally));
    };
    let stmt = Node::new(t.loc, TryStmt {
      leading_lines,
      try_kw,
      colon,
      body,
      handlers,
      orelse,
      finalbody,
    });
    Ok(Node::new(t.loc, Stmt::Try(stmt)))
  }

  fn with_items(&mut self, ctx: ParseCtx, close: Option<TT>) -> SyntaxResult<Vec<Node<WithItem>>> {
    let mut items = Vec::new();
    loop {
      let item = self.expr(ctx)?;
      let target = match self.consume_leaf_if(ctx, TT::KeywordAs) {
        Some(as_kw) => {
          let target = self.target_list_item(ctx)?;
          Some(Node::new(target.loc, WithTarget { as_kw, target }))
        }
        None => None,
      };
      let comma = self.consume_leaf_if(ctx, TT::Comma);
      let done = comma.is_none() || close.is_some_and(|c| self.peek(ctx).typ == c);
      items.push(Node::new(item.loc, WithItem {
        item,
        target,
        comma,
      }));
      if done {
        break;
      };
    }
    Ok(items)
  }

  fn target_list_item(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    // A single target; a tuple of targets must be parenthesized here.
    self.primary(ctx)
  }

  // Parenthesized items: `with (a as b, c as d):`.
  fn try_paren_with_items(&mut self) -> Option<(Leaf, Vec<Node<WithItem>>, Leaf)> {
    let cp = self.checkpoint();
    let result = (|| -> SyntaxResult<_> {
      let lpar = self.require_leaf(ParseCtx::standard(), TT::ParenthesisOpen)?;
      let items = self.with_items(ParseCtx::bracketed(), Some(TT::ParenthesisClose))?;
      let rpar = self.require_leaf(ParseCtx::bracketed(), TT::ParenthesisClose)?;
      self.require(ParseCtx::standard(), TT::Colon)?;
      Ok((lpar, items, rpar))
    })();
    match result {
      Ok((lpar, items, rpar)) => {
        // Leave the colon for the caller.
        self.next_tok_i -= 1;
        Some((lpar, items, rpar))
      }
      Err(_) => {
        self.restore_checkpoint(cp);
        None
      }
    }
  }

  fn with_stmt(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<Stmt>> {
    let ctx = ParseCtx::standard();
    let start = self.peek(ctx).loc;
    let async_kw = self.consume_leaf_if(ctx, TT::KeywordAsync);
    let with_kw = self.require_leaf(ctx, TT::KeywordWith)?;
    let (lpar, items, rpar) = if self.peek(ctx).typ == TT::ParenthesisOpen {
      match self.try_paren_with_items() {
        Some((lpar, items, rpar)) => (Some(lpar), items, Some(rpar)),
        None => (None, self.with_items(ctx, None)?, None),
      }
    } else {
      (None, self.with_items(ctx, None)?, None)
    };
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    let stmt = Node::new(start, WithStmt {
      leading_lines,
      async_kw,
      with_kw,
      lpar,
      items,
      rpar,
      colon,
      body,
    });
    Ok(Node::new(start, Stmt::With(stmt)))
  }

  // `match` is a soft keyword: this is only a match statement if a subject, a colon and an indented block follow.
  fn match_stmt(
    &mut self,
    indent: &str,
    leading_lines: Vec<EmptyLine>,
  ) -> SyntaxResult<Option<Node<Stmt>>> {
    let ctx = ParseCtx::standard();
    let cp = self.checkpoint();
    let header = (|| -> SyntaxResult<_> {
      let (t, match_kw) = self.keyword_leaf(TT::Identifier)?;
      let subject = self.star_exprs(ctx, true)?;
      let colon = self.require_leaf(ctx, TT::Colon)?;
      if !matches!(self.peek(ctx).typ, TT::Newline | TT::EOF) {
        return Err(t.error(SyntaxErrorType::ExpectedIndentedBlock));
      };
      Ok((t, match_kw, subject, colon))
    })();
    let (t, match_kw, subject, colon) = match header {
      Ok(header) => header,
      Err(_) => {
        self.restore_checkpoint(cp);
        return Ok(None);
      }
    };
    let header = self.require_newline()?;
    self.collect_empty_lines();
    let first = self.peek(ctx);
    let case_indent = self.indent_of(&first).to_string();
    if first.typ == TT::EOF
      || case_indent.len() <= indent.len()
      || !case_indent.starts_with(indent)
      || !self.peek_soft_keyword(ctx, "case")
    {
      return Err(first.error(SyntaxErrorType::ExpectedIndentedBlock));
    };
    self.block_indents.push(case_indent.clone());
    let cases = self.match_cases(&case_indent);
    self.block_indents.pop();
    let cases = cases?;
    let footer = self.take_footer(&case_indent);
    let stmt = Node::new(t.loc, MatchStmt {
      leading_lines,
      match_kw,
      subject,
      colon,
      header,
      indent: Some(case_indent[indent.len()..].to_string()),
      cases,
      footer,
    });
    Ok(Some(Node::new(t.loc, Stmt::Match(stmt))))
  }

  fn match_cases(&mut self, case_indent: &str) -> SyntaxResult<Vec<Node<MatchCase>>> {
    let ctx = ParseCtx::standard();
    let mut cases = Vec::new();
    loop {
      self.collect_empty_lines();
      let next = self.peek(ctx);
      if next.typ == TT::EOF {
        break;
      };
      let actual = self.indent_of(&next);
      if actual != case_indent {
        if case_indent.starts_with(actual) && self.is_enclosing_indent(actual) {
          break;
        };
        return Err(next.error(SyntaxErrorType::InconsistentDedent));
      };
      if !self.peek_soft_keyword(ctx, "case") {
        return Err(next.error(SyntaxErrorType::ExpectedSyntax("case")));
      };
      let leading_lines = self.take_leading_lines(case_indent);
      cases.push(self.match_case(case_indent, leading_lines)?);
    }
    Ok(cases)
  }

  fn match_case(&mut self, indent: &str, leading_lines: Vec<EmptyLine>) -> SyntaxResult<Node<MatchCase>> {
    let ctx = ParseCtx::standard();
    let (t, case_kw) = self.keyword_leaf(TT::Identifier)?;
    let pattern = self.patterns(ctx)?;
    let guard = match self.consume_leaf_if(ctx, TT::KeywordIf) {
      Some(if_kw) => {
        let test = self.named_expr(ctx)?;
        Some(Node::new(test.loc, MatchGuard { if_kw, test }))
      }
      None => None,
    };
    let colon = self.require_leaf(ctx, TT::Colon)?;
    let body = self.suite(indent)?;
    Ok(Node::new(t.loc, MatchCase {
      leading_lines,
      case_kw,
      pattern,
      guard,
      colon,
      body,
    }))
  }
}

fn is_assignable(expr: &Expr) -> bool {
  match expr {
    Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript(_) => true,
    Expr::Starred(s) => is_assignable(&s.stx.value.stx),
    Expr::Paren(p) => is_assignable(&p.stx.inner.stx),
    Expr::Tuple(t) => t.stx.elements.iter().all(|e| is_assignable(&e.stx.value.stx)),
    Expr::List(l) => l.stx.elements.iter().all(|e| is_assignable(&e.stx.value.stx)),
    _ => false,
  }
}

