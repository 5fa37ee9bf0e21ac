//! `match` statements become `if`/`elif`/`else` chains.
//!
//! Each case becomes one branch whose test checks the subject against the case's pattern. The subject expression is repeated in every test rather than bound to a temporary, so it is evaluated once per test. Supported patterns:
//!
//! | pattern                  | test                                        |
//! |--------------------------|---------------------------------------------|
//! | literal or dotted value  | `subject == value`                          |
//! | `None`, `True`, `False`  | `subject is value`                          |
//! | capture `x`, `P as x`    | `subject == x`                              |
//! | `C()`, `C(a=P, …)`       | `isinstance(subject, C) and <P on subject.a> …` |
//! | `(P)`                    | the test of `P`                             |
//! | `_`                      | the final `else`                            |
//!
//! Keyword sub-patterns must not bind. Guards and every other pattern kind are rejected. A statement whose only case is `_` is replaced by the case's body.
use super::until_fixpoint;
use super::walk_stmts;
use super::Walk;
use crate::err::LowerError;
use crate::err::LowerResult;
use crate::imports::ImportRequests;
use crate::replace::insert;
use crate::replace::new_map;
use crate::replace::Replacement;
use crate::replace::Replacer;
use parse_py::ast::expr::ConstantExpr;
use parse_py::ast::expr::Expr;
use parse_py::ast::node::Node;
use parse_py::ast::pat::ClassPattern;
use parse_py::ast::pat::Pattern;
use parse_py::ast::stmt::*;
use parse_py::ast::trivia::EmptyLine;
use parse_py::ast::trivia::Leaf;
use parse_py::build;
use parse_py::loc::Loc;
use parse_py::operator::OperatorName;
use parse_py::operator::PRECEDENCE_NAMED_EXPR;
use tracing::debug;

pub fn lower_matches(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<Node<Module>> {
  until_fixpoint("match", module, round, requests)
}

fn round(module: Node<Module>, _requests: &mut ImportRequests) -> LowerResult<(Node<Module>, usize)> {
  let mut map = new_map();
  walk_stmts(&module.stx.body, &mut |stmt| {
    let Stmt::Match(m) = stmt.stx.as_ref() else {
      return Ok(Walk::Descend);
    };
    debug!(loc = ?m.loc, cases = m.stx.cases.len(), "lowering match statement");
    insert(&mut map, stmt.id, lower_match(m)?)?;
    Ok(Walk::Skip)
  })?;
  let lowered = map.len();
  let module = Replacer::new(map).apply(module)?;
  Ok((module, lowered))
}

fn lower_match(m: &Node<MatchStmt>) -> LowerResult<Replacement> {
  let s = m.stx.as_ref();
  if let [only] = s.cases.as_slice() {
    if only.stx.guard.is_none() && is_wildcard(&only.stx.pattern) {
      return Ok(splice_case(only, &s.footer));
    };
  };

  let mut head: Option<Node<IfStmt>> = None;
  for (i, case) in s.cases.iter().enumerate() {
    let c = case.stx.as_ref();
    if let Some(guard) = &c.guard {
      return Err(LowerError::unsupported("guarded case", guard.loc));
    };
    if is_wildcard(&c.pattern) {
      if i + 1 != s.cases.len() {
        return Err(LowerError::unsupported(
          "wildcard case before the last case",
          c.pattern.loc,
        ));
      };
      let Some(head) = head.as_mut() else {
        return Err(LowerError::invariant("else arm without a preceding branch", Some(case.loc)));
      };
      let mut orelse = build::else_clause(case.loc, c.body.clone());
      orelse.stx.leading_lines = c.leading_lines.clone();
      attach(head, OrElse::Else(orelse))?;
      continue;
    };

    let test = pattern_test(&s.subject, &c.pattern)?;
    let keyword = if head.is_none() { "if" } else { "elif" };
    let mut branch = build::if_branch(case.loc, keyword, test, c.body.clone());
    branch.stx.leading_lines = c.leading_lines.clone();
    if let Some(head) = head.as_mut() {
      attach(head, OrElse::Elif(branch))?;
    } else {
      head = Some(branch);
    };
  }

  let Some(head) = head else {
    return Err(LowerError::invariant("match statement has no cases", Some(m.loc)));
  };
  Ok(Replacement::Stmts {
    stmts: vec![Node::new(m.loc, Stmt::If(head))],
    trailing: s.footer.clone(),
  })
}

/// Hangs `tail` off the first open `orelse` slot of the chain starting at `branch`.
fn attach(branch: &mut Node<IfStmt>, tail: OrElse) -> LowerResult<()> {
  match &mut branch.stx.orelse {
    None => {
      branch.stx.orelse = Some(tail);
      Ok(())
    }
    Some(OrElse::Elif(next)) => attach(next, tail),
    Some(OrElse::Else(e)) => Err(LowerError::invariant(
      "cannot add a branch after an else arm",
      Some(e.loc),
    )),
  }
}

fn splice_case(case: &Node<MatchCase>, match_footer: &[EmptyLine]) -> Replacement {
  let (mut stmts, mut trailing) = match &case.stx.body {
    Suite::Block(b) => (b.stx.body.clone(), b.stx.footer.clone()),
    Suite::Inline(s) => {
      let mut body = s.stx.body.clone();
      build::set_leading_ws(&mut body, "");
      let line = Node::new(s.loc, SimpleStmtLine {
        leading_lines: Vec::new(),
        body,
        newline: s.stx.newline.clone(),
      });
      (vec![Node::new(s.loc, Stmt::Simple(line))], Vec::new())
    }
  };
  if let Some(first) = stmts.first_mut() {
    first
      .stx
      .leading_lines_mut()
      .splice(0..0, case.stx.leading_lines.iter().cloned());
  };
  trailing.extend(match_footer.iter().cloned());
  Replacement::Stmts { stmts, trailing }
}

fn is_wildcard(pattern: &Node<Pattern>) -> bool {
  match pattern.stx.as_ref() {
    Pattern::Group(g) => is_wildcard(&g.stx.pattern),
    p => p.is_wildcard(),
  }
}

fn constant(loc: Loc, text: &str) -> Node<Expr> {
  Node::new(
    loc,
    Expr::Constant(Node::new(loc, ConstantExpr {
      value: Leaf::bare(text),
    })),
  )
}

fn pattern_test(subject: &Node<Expr>, pattern: &Node<Pattern>) -> LowerResult<Node<Expr>> {
  let loc = pattern.loc;
  match pattern.stx.as_ref() {
    Pattern::Value(v) => Ok(build::compare(
      loc,
      subject.clone(),
      OperatorName::Equality,
      v.stx.value.clone(),
    )),
    Pattern::Singleton(v) => Ok(build::compare(
      loc,
      subject.clone(),
      OperatorName::Is,
      constant(loc, &v.stx.value.text),
    )),
    Pattern::As(a) if a.stx.name.stx.value.text == "_" => {
      Err(LowerError::unsupported("wildcard sub-pattern", loc))
    }
    Pattern::As(a) => {
      let name = Node::new(a.loc, Expr::Name(a.stx.name.clone()));
      Ok(build::compare(loc, subject.clone(), OperatorName::Equality, name))
    }
    Pattern::Class(c) => class_test(subject, c),
    Pattern::Group(g) => pattern_test(subject, &g.stx.pattern),
    Pattern::Mapping(_) => Err(LowerError::unsupported("mapping pattern", loc)),
    Pattern::Or(_) => Err(LowerError::unsupported("or pattern", loc)),
    Pattern::Sequence(_) => Err(LowerError::unsupported("sequence pattern", loc)),
    Pattern::Star(_) => Err(LowerError::unsupported("star pattern", loc)),
  }
}

fn class_test(subject: &Node<Expr>, class: &Node<ClassPattern>) -> LowerResult<Node<Expr>> {
  let loc = class.loc;
  let c = class.stx.as_ref();
  if let Some(first) = c.patterns.first() {
    return Err(LowerError::unsupported("positional class sub-pattern", first.loc));
  };
  let mut test = build::call(loc, build::name_expr(loc, "isinstance"), vec![
    build::arg(build::paren_below(subject.clone(), PRECEDENCE_NAMED_EXPR)),
    build::arg(c.cls.clone()),
  ]);
  for kw in c.kwds.iter() {
    let attr = build::attribute(kw.loc, subject.clone(), &kw.stx.key.stx.value.text);
    if let Some(kw_test) = keyword_test(&attr, &kw.stx.pattern)? {
      test = build::and(loc, test, kw_test);
    };
  }
  Ok(test)
}

// The attribute a keyword sub-pattern applies to can't be bound, so only tests that bind nothing are allowed.
fn keyword_test(subject: &Node<Expr>, pattern: &Node<Pattern>) -> LowerResult<Option<Node<Expr>>> {
  match pattern.stx.as_ref() {
    _ if is_wildcard(pattern) => Ok(None),
    Pattern::As(_) => Err(LowerError::unsupported("binding sub-pattern", pattern.loc)),
    Pattern::Group(g) => keyword_test(subject, &g.stx.pattern),
    _ => pattern_test(subject, pattern).map(Some),
  }
}
