use super::ParseCtx;
use super::Parser;
use crate::ast::expr::Expr;
use crate::ast::expr::FStringPart;
use crate::ast::pat::Pattern;
use crate::ast::stmt::OrElse;
use crate::ast::stmt::SmallStmt;
use crate::ast::stmt::Stmt;
use crate::ast::stmt::Suite;
use crate::ast::stmt::TypeParamKind;
use crate::error::SyntaxErrorType;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::parse;
use crate::token::TT;

fn only_small_stmt(src: &str) -> SmallStmt {
  let module = parse(src).unwrap();
  let Stmt::Simple(line) = *module.stx.body[0].stx.clone() else {
    panic!("expected simple statement");
  };
  line.stx.body[0].stx.stmt.clone()
}

fn error_type(src: &str) -> SyntaxErrorType {
  parse(src).unwrap_err().typ
}

#[test]
fn test_parser() {
  let lexer = Lexer::new("x = (1,\n  2)\n");
  let mut p = Parser::new(lexer);
  // Initial state.
  let cp = p.checkpoint();
  assert_eq!(p.next_tok_i, 0);

  // Peek the first token.
  let t = p.peek(ParseCtx::standard());
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::Identifier);

  // Consume the first token.
  let t = p.consume(ParseCtx::standard());
  assert_eq!(p.next_tok_i, 1);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::Identifier);

  // Consume the second token.
  let t = p.consume(ParseCtx::standard());
  assert_eq!(p.next_tok_i, 2);
  assert_eq!(p.buf.len(), 2);
  assert_eq!(t.typ, TT::Equals);

  // Reset to a past point.
  p.restore_checkpoint(cp);
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 2);

  // Peek using a different mode, which should truncate the buffer.
  let t = p.peek_with_mode(LexMode::Bracketed);
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::Identifier);
}

#[test]
fn test_elif_chain() {
  let module = parse("if a:\n    x\nelif b:\n    y\nelse:\n    z\n").unwrap();
  let Stmt::If(stmt) = module.stx.body[0].stx.as_ref() else {
    panic!("expected if");
  };
  let Some(OrElse::Elif(elif)) = &stmt.stx.orelse else {
    panic!("expected elif");
  };
  assert_eq!(elif.stx.if_kw.text, "elif");
  assert!(matches!(elif.stx.orelse, Some(OrElse::Else(_))));
}

#[test]
fn test_match_statement() {
  let src = "\
match p:
    case Point(x=0, y=yy) if yy > 0:
        pass
    case [1, *rest]:
        pass
    case {\"k\": v, **kw}:
        pass
    case (a | b) as c:
        pass
    case _:
        pass
";
  let module = parse(src).unwrap();
  let Stmt::Match(stmt) = module.stx.body[0].stx.as_ref() else {
    panic!("expected match");
  };
  let cases = &stmt.stx.cases;
  assert_eq!(cases.len(), 5);
  let Pattern::Class(cls) = cases[0].stx.pattern.stx.as_ref() else {
    panic!("expected class pattern");
  };
  assert_eq!(cls.stx.kwds.len(), 2);
  assert!(cases[0].stx.guard.is_some());
  let Pattern::Sequence(seq) = cases[1].stx.pattern.stx.as_ref() else {
    panic!("expected sequence pattern");
  };
  assert!(matches!(
    seq.stx.patterns[1].stx.pattern.stx.as_ref(),
    Pattern::Star(_)
  ));
  let Pattern::Mapping(mapping) = cases[2].stx.pattern.stx.as_ref() else {
    panic!("expected mapping pattern");
  };
  assert_eq!(mapping.stx.elements.len(), 1);
  assert!(mapping.stx.rest.is_some());
  let Pattern::As(as_pat) = cases[3].stx.pattern.stx.as_ref() else {
    panic!("expected as pattern");
  };
  assert!(matches!(
    as_pat.stx.pattern.as_ref().map(|p| p.stx.as_ref()),
    Some(Pattern::Group(_))
  ));
  assert!(cases[4].stx.pattern.stx.is_wildcard());
}

#[test]
fn test_open_sequence_pattern() {
  let module = parse("match p:\n    case a, b:\n        pass\n").unwrap();
  let Stmt::Match(stmt) = module.stx.body[0].stx.as_ref() else {
    panic!("expected match");
  };
  let Pattern::Sequence(seq) = stmt.stx.cases[0].stx.pattern.stx.as_ref() else {
    panic!("expected sequence pattern");
  };
  assert!(seq.stx.lbracket.is_none());
  assert_eq!(seq.stx.patterns.len(), 2);
}

#[test]
fn test_match_soft_keyword() {
  assert!(matches!(only_small_stmt("match = 1\n"), SmallStmt::Assign(_)));
  assert!(matches!(only_small_stmt("match(x)\n"), SmallStmt::Expr(_)));
  assert!(matches!(only_small_stmt("type = 3\n"), SmallStmt::Assign(_)));
}

#[test]
fn test_type_params() {
  let module = parse("def f[T: int, *Ts, **P = [int]](x: T) -> T: ...\n").unwrap();
  let Stmt::FunctionDef(def) = module.stx.body[0].stx.as_ref() else {
    panic!("expected def");
  };
  let params = &def.stx.type_params.as_ref().unwrap().stx.params;
  assert_eq!(params.len(), 3);
  let TypeParamKind::TypeVar(t) = &params[0].stx.param else {
    panic!("expected TypeVar");
  };
  assert!(t.stx.bound.is_some());
  assert!(matches!(params[1].stx.param, TypeParamKind::TypeVarTuple(_)));
  assert!(matches!(params[2].stx.param, TypeParamKind::ParamSpec(_)));
  assert!(params[2].stx.param.default().is_some());
  assert!(matches!(def.stx.body, Suite::Inline(_)));
}

#[test]
fn test_type_alias() {
  let SmallStmt::TypeAlias(alias) = only_small_stmt("type Pair[T] = tuple[T, T]\n") else {
    panic!("expected type alias");
  };
  assert_eq!(alias.stx.name.stx.value.text, "Pair");
  assert_eq!(alias.stx.type_params.as_ref().unwrap().stx.params.len(), 1);
}

#[test]
fn test_fstring_fields() {
  let SmallStmt::Expr(stmt) = only_small_stmt("f\"a{x!r:>{width}} {y=}\"\n") else {
    panic!("expected expression statement");
  };
  let Expr::FString(f) = stmt.stx.value.stx.as_ref() else {
    panic!("expected f-string");
  };
  let parts = &f.stx.parts;
  assert_eq!(parts.len(), 4);
  let FStringPart::Field(field) = &parts[1] else {
    panic!("expected field");
  };
  assert_eq!(field.stx.conversion.as_ref().unwrap().stx.name.text, "r");
  let spec = field.stx.spec.as_ref().unwrap();
  assert!(matches!(spec.stx.parts[1], FStringPart::Field(_)));
  let FStringPart::Field(debug) = &parts[3] else {
    panic!("expected field");
  };
  assert!(debug.stx.debug.is_some());
}

#[test]
fn test_comment_ownership() {
  let src = "def f():\n    x\n    # trailing\n\n# top\ny\n";
  let module = parse(src).unwrap();
  let Stmt::FunctionDef(def) = module.stx.body[0].stx.as_ref() else {
    panic!("expected def");
  };
  let Suite::Block(block) = &def.stx.body else {
    panic!("expected block");
  };
  assert_eq!(block.stx.footer.len(), 1);
  assert!(block.stx.footer[0].indent);
  assert_eq!(block.stx.footer[0].ws, "# trailing");
  let leading = module.stx.body[1].stx.leading_lines();
  assert_eq!(leading.len(), 2);
  assert!(leading[1].has_comment());
}

#[test]
fn test_default_indent() {
  assert_eq!(parse("if a:\n  b\n").unwrap().stx.default_indent, "  ");
  assert_eq!(parse("if a:\n\tb\n").unwrap().stx.default_indent, "\t");
  assert_eq!(parse("x\n").unwrap().stx.default_indent, "    ");
}

#[test]
fn test_default_newline() {
  assert_eq!(parse("x\r\ny\r\n").unwrap().stx.default_newline, "\r\n");
  assert_eq!(parse("x").unwrap().stx.default_newline, "\n");
}

#[test]
fn test_syntax_errors() {
  assert_eq!(error_type("if x:\npass\n"), SyntaxErrorType::ExpectedIndentedBlock);
  assert_eq!(error_type("  x = 1\n"), SyntaxErrorType::UnexpectedIndent);
  assert_eq!(error_type("if a:\n    b\n  c\n"), SyntaxErrorType::InconsistentDedent);
  assert_eq!(
    error_type("try:\n    pass\n"),
    SyntaxErrorType::TryStatementHasNoExceptOrFinally
  );
  assert_eq!(error_type("x = 'abc\n"), SyntaxErrorType::UnterminatedString);
  assert_eq!(error_type("1 = x\n"), SyntaxErrorType::InvalidAssignmentTarget);
  assert_eq!(error_type("x = (1,\n"), SyntaxErrorType::UnexpectedEnd);
}
