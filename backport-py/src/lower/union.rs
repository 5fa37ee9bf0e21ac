//! `X | Y` unions become `Union[X, Y]`, or `(X, Y)` as the second argument of `isinstance` and `issubclass`.
//!
//! Only a chain that is the whole annotation, the whole value of an explicit `TypeAlias`, or the whole class argument is lowered. Operands are kept as written, including any unions nested inside them.
use super::until_fixpoint;
use crate::err::LowerResult;
use crate::imports::ImportRequests;
use crate::replace::insert;
use crate::replace::new_map;
use crate::replace::Replacement;
use crate::replace::Replacer;
use ahash::HashMap;
use ahash::HashMapExt;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_py::ast::expr::*;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::AnnAssignStmt;
use parse_py::ast::stmt::Module;
use parse_py::build;
use parse_py::operator::OperatorName;
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnionMode {
  /// `Union[a, b]`.
  Subscript,
  /// `(a, b)`, for the class argument of `isinstance` and `issubclass`.
  Tuple,
}

fn strip_parens(expr: &Node<Expr>) -> &Node<Expr> {
  match expr.stx.as_ref() {
    Expr::Paren(p) => strip_parens(&p.stx.inner),
    _ => expr,
  }
}

fn is_union(expr: &Node<Expr>) -> bool {
  matches!(
    strip_parens(expr).stx.as_ref(),
    Expr::Binary(b) if b.stx.operator == OperatorName::BitwiseOr
  )
}

fn push_operands(expr: &Node<Expr>, out: &mut Vec<Node<Expr>>) {
  match strip_parens(expr).stx.as_ref() {
    Expr::Binary(b) if b.stx.operator == OperatorName::BitwiseOr => {
      push_operands(&b.stx.left, out);
      push_operands(&b.stx.right, out);
    }
    _ => out.push(expr.clone()),
  };
}

/// The operands of a `|` chain in written order, looking through parenthesized sub-chains. None if `expr` is not a chain.
pub fn flatten_union(expr: &Node<Expr>) -> Option<Vec<Node<Expr>>> {
  if !is_union(expr) {
    return None;
  };
  let mut out = Vec::new();
  push_operands(expr, &mut out);
  Some(out)
}

/// The lowered form of a `|` chain, or None if `expr` is not one. The result takes over the whitespace before `expr`.
pub fn lower_union(expr: &Node<Expr>, mode: UnionMode) -> Option<Node<Expr>> {
  let operands = flatten_union(expr)?;
  let loc = expr.loc;
  let mut lowered = match mode {
    UnionMode::Subscript => build::subscript(loc, build::name_expr(loc, "Union"), operands),
    UnionMode::Tuple => build::tuple(loc, operands),
  };
  let mut original = expr.clone();
  build::set_leading_ws(&mut lowered, &build::take_leading_ws(&mut original));
  Some(lowered)
}

pub fn lower_unions(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<Node<Module>> {
  until_fixpoint("union", module, round, requests)
}

type ExprNode = Node<Expr>;

fn is_type_alias_annotation(expr: &Node<Expr>) -> bool {
  match expr.stx.as_ref() {
    Expr::Name(n) => n.stx.value.text == "TypeAlias",
    Expr::Attribute(a) => {
      a.stx.value.stx.as_name() == Some("typing") && a.stx.attr.stx.value.text == "TypeAlias"
    }
    _ => false,
  }
}

// Positions are registered when their owner is entered, before the expression itself is.
#[derive(Visitor)]
#[visitor(Annotation(enter), AnnAssignStmt(enter), CallExpr(enter), ExprNode(enter, exit))]
struct UnionFinder {
  positions: HashMap<NodeId, UnionMode>,
  // The target being walked, if any. Targets inside it wait for a later round.
  inside: Option<NodeId>,
  targets: Vec<(NodeId, Node<Expr>, UnionMode)>,
}

impl UnionFinder {
  fn position(&mut self, expr: &Node<Expr>, mode: UnionMode) {
    if is_union(expr) {
      self.positions.insert(expr.id, mode);
    };
  }

  fn enter_annotation(&mut self, annotation: &Annotation) {
    self.position(&annotation.annotation, UnionMode::Subscript);
  }

  fn enter_ann_assign_stmt(&mut self, stmt: &AnnAssignStmt) {
    if let Some(value) = &stmt.value {
      if is_type_alias_annotation(&stmt.annotation.stx.annotation) {
        self.position(value, UnionMode::Subscript);
      };
    };
  }

  fn enter_call_expr(&mut self, call: &CallExpr) {
    if !matches!(call.func.stx.as_name(), Some("isinstance" | "issubclass")) {
      return;
    };
    if let Some(arg) = call.args.get(1) {
      if arg.stx.star.is_none() && arg.stx.keyword.is_none() {
        self.position(&arg.stx.value, UnionMode::Tuple);
      };
    };
  }

  fn enter_expr_node(&mut self, node: &ExprNode) {
    if self.inside.is_some() {
      return;
    };
    let Some(&mode) = self.positions.get(&node.id) else {
      return;
    };
    self.inside = Some(node.id);
    self.targets.push((node.id, node.clone(), mode));
  }

  fn exit_expr_node(&mut self, node: &ExprNode) {
    if self.inside == Some(node.id) {
      self.inside = None;
    };
  }
}

fn round(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<(Node<Module>, usize)> {
  let mut finder = UnionFinder {
    positions: HashMap::new(),
    inside: None,
    targets: Vec::new(),
  };
  module.drive(&mut finder);

  let mut map = new_map();
  for (id, target, mode) in finder.targets {
    let Some(lowered) = lower_union(&target, mode) else {
      continue;
    };
    debug!(loc = ?target.loc, ?mode, "lowering union");
    if mode == UnionMode::Subscript {
      requests.typing("Union");
    };
    insert(&mut map, id, Replacement::Expr(lowered))?;
  }
  let lowered = map.len();
  let module = Replacer::new(map).apply(module)?;
  Ok((module, lowered))
}
