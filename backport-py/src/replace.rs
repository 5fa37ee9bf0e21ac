//! Identity-keyed substitution over a module.
//!
//! Passes analyse a tree read-only and describe their rewrite as a [`ReplacementMap`] from [`NodeId`] to a [`Replacement`]. The [`Replacer`] then performs a single mutable traversal:
//! - `Node<Name>` and `Node<Expr>` entries are replaced when the traversal exits the node, so replacements of descendants have already happened.
//! - Statement entries are spliced into the statement list that holds them when the traversal exits the list's owner (the module or an indented block).
//!
//! Keys are node identities, never structural equality, so two identical subtrees at different positions are rewritten independently. Replacement content is not traversed.
use crate::err::LowerError;
use crate::err::LowerResult;
use ahash::HashMap;
use ahash::HashMapExt;
use derive_visitor::DriveMut;
use derive_visitor::VisitorMut;
use parse_py::ast::expr::Expr;
use parse_py::ast::expr::Name;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::IndentedBlock;
use parse_py::ast::stmt::Module;
use parse_py::ast::stmt::Stmt;
use parse_py::ast::trivia::EmptyLine;
use parse_py::loc::Loc;
use std::mem::take;

#[derive(Debug, Clone)]
pub enum Replacement {
  /// Changes the text of a `Name`, keeping its identity and surrounding whitespace.
  Rename(String),
  Name(Node<Name>),
  Expr(Node<Expr>),
  /// Flattens one statement into several. The statement's leading lines go in front of the first new statement; `trailing` lines are placed after the last one, in front of the next statement or at the start of the enclosing footer.
  Stmts {
    stmts: Vec<Node<Stmt>>,
    trailing: Vec<EmptyLine>,
  },
  /// Drops a statement. Its leading lines move to whatever follows it.
  Remove,
}

impl Replacement {
  fn kind(&self) -> &'static str {
    match self {
      Replacement::Rename(_) => "rename",
      Replacement::Name(_) => "name",
      Replacement::Expr(_) => "expression",
      Replacement::Stmts { .. } => "statements",
      Replacement::Remove => "removal",
    }
  }
}

pub type ReplacementMap = HashMap<NodeId, Replacement>;

type NameNode = Node<Name>;
type ExprNode = Node<Expr>;

#[derive(VisitorMut)]
#[visitor(NameNode(exit), ExprNode(exit), Module(exit), IndentedBlock(exit))]
pub struct Replacer {
  map: ReplacementMap,
  error: Option<LowerError>,
}

impl Replacer {
  pub fn new(map: ReplacementMap) -> Replacer {
    Replacer { map, error: None }
  }

  /// Applies every replacement. Fails if an entry is attached to a node of the wrong kind or its node is not in `module`.
  pub fn apply(mut self, mut module: Node<Module>) -> LowerResult<Node<Module>> {
    if self.map.is_empty() {
      return Ok(module);
    };
    module.drive_mut(&mut self);
    if let Some(err) = self.error {
      return Err(err);
    };
    if !self.map.is_empty() {
      return Err(LowerError::invariant(
        format!("{} replacement targets were not found in the tree", self.map.len()),
        None,
      ));
    };
    Ok(module)
  }

  fn mismatch(&mut self, replacement: &Replacement, target: &str, loc: Loc) {
    if self.error.is_none() {
      self.error = Some(LowerError::invariant(
        format!("cannot replace {} with {}", target, replacement.kind()),
        Some(loc),
      ));
    };
  }

  fn exit_name_node(&mut self, node: &mut NameNode) {
    match self.map.remove(&node.id) {
      None => {}
      Some(Replacement::Rename(text)) => node.stx.value.text = text,
      Some(Replacement::Name(name)) => *node = name,
      Some(other) => self.mismatch(&other, "a name", node.loc),
    };
  }

  fn exit_expr_node(&mut self, node: &mut ExprNode) {
    match self.map.remove(&node.id) {
      None => {}
      Some(Replacement::Expr(expr)) => *node = expr,
      Some(other) => self.mismatch(&other, "an expression", node.loc),
    };
  }

  fn exit_module(&mut self, module: &mut Module) {
    self.splice(&mut module.body, &mut module.footer);
  }

  fn exit_indented_block(&mut self, block: &mut IndentedBlock) {
    self.splice(&mut block.body, &mut block.footer);
  }

  fn splice(&mut self, body: &mut Vec<Node<Stmt>>, footer: &mut Vec<EmptyLine>) {
    if !body.iter().any(|s| self.map.contains_key(&s.id)) {
      return;
    };
    let mut out = Vec::with_capacity(body.len());
    // Lines waiting for the next statement to hold them.
    let mut carry = Vec::<EmptyLine>::new();
    for mut stmt in take(body) {
      match self.map.remove(&stmt.id) {
        None => push_stmt(&mut out, stmt, &mut carry),
        Some(Replacement::Stmts { stmts, trailing }) => {
          carry.extend(take(stmt.stx.leading_lines_mut()));
          for s in stmts {
            push_stmt(&mut out, s, &mut carry);
          }
          carry.extend(trailing);
        }
        Some(Replacement::Remove) => carry.extend(take(stmt.stx.leading_lines_mut())),
        Some(other) => {
          self.mismatch(&other, "a statement", stmt.loc);
          out.push(stmt);
        }
      };
    }
    if !carry.is_empty() {
      footer.splice(0..0, carry);
    };
    *body = out;
  }
}

fn push_stmt(out: &mut Vec<Node<Stmt>>, mut stmt: Node<Stmt>, carry: &mut Vec<EmptyLine>) {
  if !carry.is_empty() {
    stmt.stx.leading_lines_mut().splice(0..0, carry.drain(..));
  };
  out.push(stmt);
}

/// Records `replacement` for `id`, failing if the node already has one.
pub fn insert(map: &mut ReplacementMap, id: NodeId, replacement: Replacement) -> LowerResult<()> {
  if map.insert(id, replacement).is_some() {
    return Err(LowerError::invariant(
      "node was given two replacements",
      None,
    ));
  };
  Ok(())
}

pub fn new_map() -> ReplacementMap {
  ReplacementMap::new()
}

#[cfg(test)]
mod tests {
  use super::*;
  use derive_visitor::Drive;
  use derive_visitor::Visitor;
  use parse_py::ast::stmt::SmallStmt;
  use parse_py::build;
  use parse_py::parse;
  use parse_py::print;

  #[derive(Default, Visitor)]
  #[visitor(NameNode(enter))]
  struct Names {
    found: Vec<(NodeId, String)>,
  }

  impl Names {
    fn enter_name_node(&mut self, node: &NameNode) {
      self.found.push((node.id, node.stx.value.text.clone()));
    }
  }

  fn names(module: &Node<Module>) -> Vec<(NodeId, String)> {
    let mut v = Names::default();
    module.drive(&mut v);
    v.found
  }

  fn find(module: &Node<Module>, text: &str) -> NodeId {
    names(module)
      .into_iter()
      .find(|(_, t)| t == text)
      .map(|(id, _)| id)
      .unwrap()
  }

  #[test]
  fn test_swaps_names_by_identity() {
    let module = parse("a = 1\nb = 2\nc = 3\n").unwrap();
    let (a, b, c) = (find(&module, "a"), find(&module, "b"), find(&module, "c"));
    let mut map = new_map();
    map.insert(a, Replacement::Name(build::name(Loc(0, 0), "b")));
    map.insert(b, Replacement::Name(build::name(Loc(0, 0), "c")));
    map.insert(c, Replacement::Name(build::name(Loc(0, 0), "a")));
    let module = Replacer::new(map).apply(module).unwrap();
    assert_eq!(print(&module), "b = 1\nc = 2\na = 3\n");
  }

  #[test]
  fn test_identical_subtrees_are_distinct() {
    let module = parse("x = y\nx = y\n").unwrap();
    let second_x = names(&module)[2].0;
    let mut map = new_map();
    map.insert(second_x, Replacement::Rename("z".into()));
    let module = Replacer::new(map).apply(module).unwrap();
    assert_eq!(print(&module), "x = y\nz = y\n");
    // Renames keep the node's identity.
    assert_eq!(names(&module)[2].0, second_x);
  }

  #[test]
  fn test_replaces_expressions_on_exit() {
    let module = parse("print(a + b)\n").unwrap();
    let Stmt::Simple(line) = module.stx.body[0].stx.as_ref() else {
      panic!("expected simple statement");
    };
    let SmallStmt::Expr(stmt) = &line.stx.body[0].stx.stmt else {
      panic!("expected expression statement");
    };
    let Expr::Call(call) = stmt.stx.value.stx.as_ref() else {
      panic!("expected call");
    };
    let sum = call.stx.args[0].stx.value.id;
    let mut map = new_map();
    map.insert(sum, Replacement::Expr(build::name_expr(Loc(0, 0), "total")));
    map.insert(find(&module, "a"), Replacement::Rename("ignored".into()));
    let module = Replacer::new(map).apply(module).unwrap();
    assert_eq!(print(&module), "print(total)\n");
  }

  #[test]
  fn test_splices_statements() {
    let module = parse("# head\nx = 1\n\ny = 2\nz = 3\n").unwrap();
    let ids: Vec<_> = module.stx.body.iter().map(|s| s.id).collect();
    let mut map = new_map();
    map.insert(ids[0], Replacement::Stmts {
      stmts: vec![
        build::assign(Loc(0, 0), build::name_expr(Loc(0, 0), "a"), build::name_expr(Loc(0, 0), "b")),
        build::pass_stmt(Loc(0, 0)),
      ],
      trailing: vec![EmptyLine {
        indent: true,
        ws: "# moved".into(),
        newline: None,
      }],
    });
    map.insert(ids[1], Replacement::Remove);
    let module = Replacer::new(map).apply(module).unwrap();
    assert_eq!(print(&module), "# head\na = b\npass\n# moved\n\nz = 3\n");
  }

  #[test]
  fn test_splices_inside_blocks() {
    let module = parse("def f():\n    x = 1\n    return x\n").unwrap();
    let Stmt::FunctionDef(def) = module.stx.body[0].stx.as_ref() else {
      panic!("expected def");
    };
    let parse_py::ast::stmt::Suite::Block(block) = &def.stx.body else {
      panic!("expected block");
    };
    let last = block.stx.body[1].id;
    let mut map = new_map();
    map.insert(last, Replacement::Remove);
    let module = Replacer::new(map).apply(module).unwrap();
    assert_eq!(print(&module), "def f():\n    x = 1\n");
  }

  #[test]
  fn test_unvisited_key_is_an_invariant_violation() {
    let module = parse("x = 1\n").unwrap();
    let other = parse("y = 2\n").unwrap();
    let mut map = new_map();
    map.insert(find(&other, "y"), Replacement::Rename("z".into()));
    let err = Replacer::new(map).apply(module).unwrap_err();
    assert!(!err.is_unsupported());
  }

  #[test]
  fn test_kind_mismatch_is_an_invariant_violation() {
    let module = parse("x = 1\n").unwrap();
    let stmt = module.stx.body[0].id;
    let mut map = new_map();
    map.insert(stmt, Replacement::Rename("z".into()));
    let err = Replacer::new(map).apply(module).unwrap_err();
    assert!(matches!(err, LowerError::Invariant { .. }));
  }
}
