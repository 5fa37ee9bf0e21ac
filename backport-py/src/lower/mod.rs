//! The lowering passes. Each pass works in rounds: a round finds the outermost constructs it can lower, builds a [`ReplacementMap`](crate::replace::ReplacementMap) from a read-only look at the tree, and applies it with one [`Replacer`](crate::replace::Replacer) traversal. Constructs nested inside a lowered construct surface in the next round, and a pass finishes when a round lowers nothing.
use crate::err::LowerError;
use crate::err::LowerResult;
use crate::imports::ImportRequests;
use parse_py::ast::node::Node;
use parse_py::ast::stmt::*;
use tracing::debug;

pub mod fstring;
pub mod match_stmt;
pub mod type_params;
pub mod union;

#[cfg(test)]
mod tests;

const MAX_ROUNDS: usize = 256;

/// One round of a pass, returning the rewritten module and how many constructs it lowered.
pub(crate) type Round = fn(Node<Module>, &mut ImportRequests) -> LowerResult<(Node<Module>, usize)>;

pub(crate) fn until_fixpoint(
  pass: &'static str,
  mut module: Node<Module>,
  round: Round,
  requests: &mut ImportRequests,
) -> LowerResult<Node<Module>> {
  for i in 0..MAX_ROUNDS {
    let (next, lowered) = round(module, requests)?;
    module = next;
    if lowered == 0 {
      return Ok(module);
    };
    debug!(pass, round = i, lowered, "lowered constructs");
  }
  Err(LowerError::invariant(
    format!("{pass} pass did not converge after {MAX_ROUNDS} rounds"),
    None,
  ))
}

pub(crate) enum Walk {
  Descend,
  Skip,
}

/// Calls `f` on every statement in source order, descending into the indented blocks of compound statements unless `f` returns [`Walk::Skip`].
pub(crate) fn walk_stmts<'a, F>(stmts: &'a [Node<Stmt>], f: &mut F) -> LowerResult<()>
where
  F: FnMut(&'a Node<Stmt>) -> LowerResult<Walk>,
{
  for stmt in stmts {
    if let Walk::Skip = f(stmt)? {
      continue;
    };
    for suite in child_suites(stmt) {
      if let Suite::Block(block) = suite {
        walk_stmts(&block.stx.body, f)?;
      };
    }
  }
  Ok(())
}

fn child_suites(stmt: &Node<Stmt>) -> Vec<&Suite> {
  fn else_body(orelse: &Option<Node<ElseClause>>) -> Option<&Suite> {
    orelse.as_ref().map(|e| &e.stx.body)
  }

  let mut out = Vec::new();
  match stmt.stx.as_ref() {
    Stmt::ClassDef(n) => out.push(&n.stx.body),
    Stmt::FunctionDef(n) => out.push(&n.stx.body),
    Stmt::For(n) => out.extend([Some(&n.stx.body), else_body(&n.stx.orelse)].into_iter().flatten()),
    Stmt::While(n) => out.extend([Some(&n.stx.body), else_body(&n.stx.orelse)].into_iter().flatten()),
    Stmt::With(n) => out.push(&n.stx.body),
    Stmt::If(n) => {
      let mut branch = n;
      loop {
        out.push(&branch.stx.body);
        match &branch.stx.orelse {
          Some(OrElse::Elif(elif)) => branch = elif,
          Some(OrElse::Else(e)) => {
            out.push(&e.stx.body);
            break;
          }
          None => break,
        };
      }
    }
    Stmt::Match(n) => out.extend(n.stx.cases.iter().map(|c| &c.stx.body)),
    Stmt::Try(n) => {
      out.push(&n.stx.body);
      out.extend(n.stx.handlers.iter().map(|h| &h.stx.body));
      out.extend(else_body(&n.stx.orelse));
      out.extend(n.stx.finalbody.as_ref().map(|f| &f.stx.body));
    }
    Stmt::Simple(_) => {}
  };
  out
}
