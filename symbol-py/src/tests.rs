use crate::compute_scopes;
use crate::ScopeId;
use crate::ScopeKind;
use crate::Scopes;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_py::ast::expr::Name;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::Module;
use parse_py::ast::stmt::Stmt;
use parse_py::parse;

type NameNode = Node<Name>;

#[derive(Default, Visitor)]
#[visitor(NameNode(enter))]
struct Collect {
  names: Vec<(String, NodeId)>,
}

impl Collect {
  fn enter_name_node(&mut self, node: &NameNode) {
    self.names.push((node.stx.value.text.clone(), node.id));
  }
}

/// Ids of every `Name` spelled `name`, in source order.
fn ids_of(module: &Node<Module>, name: &str) -> Vec<NodeId> {
  let mut collect = Collect::default();
  module.drive(&mut collect);
  collect
    .names
    .into_iter()
    .filter(|(n, _)| n == name)
    .map(|(_, id)| id)
    .collect()
}

fn pick(ids: &[NodeId], indices: &[usize]) -> Vec<NodeId> {
  indices.iter().map(|&i| ids[i]).collect()
}

fn body_scope_of(scopes: &Scopes, stmt: &Node<Stmt>) -> ScopeId {
  let id = match stmt.stx.as_ref() {
    Stmt::FunctionDef(def) => def.id,
    Stmt::ClassDef(def) => def.id,
    _ => panic!("expected a definition"),
  };
  scopes.body_scope(id).unwrap()
}

#[test]
fn shadowing_prefers_inner_bindings() {
  let module = parse("x = 1\ndef f(x):\n    return x\nprint(x)\n").unwrap();
  let scopes = compute_scopes(&module);
  let x = ids_of(&module, "x");
  let f = body_scope_of(&scopes, &module.stx.body[1]);
  assert_eq!(scopes.scope(f).kind, ScopeKind::Function);
  assert_eq!(scopes.references(ScopeId::MODULE, "x"), pick(&x, &[0, 3]));
  assert_eq!(scopes.references(f, "x"), pick(&x, &[1, 2]));
}

#[test]
fn class_scope_is_skipped_by_methods() {
  let module = parse(
    "x = 1\nclass C:\n    x = 2\n    y = x\n    def m(self):\n        return x\n",
  )
  .unwrap();
  let scopes = compute_scopes(&module);
  let x = ids_of(&module, "x");
  let c = body_scope_of(&scopes, &module.stx.body[1]);
  assert_eq!(scopes.references(c, "x"), pick(&x, &[1, 2]));
  assert_eq!(scopes.references(ScopeId::MODULE, "x"), pick(&x, &[0, 3]));
}

#[test]
fn comprehension_evaluates_first_iterable_outside() {
  let module = parse("def f(y):\n    return [y for y in y]\n").unwrap();
  let scopes = compute_scopes(&module);
  let y = ids_of(&module, "y");
  let f = body_scope_of(&scopes, &module.stx.body[0]);
  let comp = scopes
    .scopes()
    .iter()
    .find(|s| s.kind == ScopeKind::Comprehension)
    .unwrap()
    .id;
  assert_eq!(scopes.references(f, "y"), pick(&y, &[0, 3]));
  assert_eq!(scopes.references(comp, "y"), pick(&y, &[1, 2]));
}

#[test]
fn walrus_binds_outside_comprehension() {
  let module = parse("def f():\n    [(z := i) for i in range(3)]\n    return z\n").unwrap();
  let scopes = compute_scopes(&module);
  let f = body_scope_of(&scopes, &module.stx.body[0]);
  assert_eq!(scopes.references(f, "z"), ids_of(&module, "z"));
}

#[test]
fn global_and_nonlocal_redirect_lookups() {
  let src = "\
count = 0
def outer():
    total = 0
    def inner():
        global count
        nonlocal total
        count += 1
        total += 1
    return total
";
  let module = parse(src).unwrap();
  let scopes = compute_scopes(&module);
  let outer = body_scope_of(&scopes, &module.stx.body[1]);
  assert_eq!(scopes.references(ScopeId::MODULE, "count"), ids_of(&module, "count"));
  assert_eq!(scopes.references(outer, "total"), ids_of(&module, "total"));
}

#[test]
fn defaults_and_decorators_use_enclosing_scope() {
  let module = parse("a = 1\n@a\ndef a(a=a):\n    return a\n").unwrap();
  let scopes = compute_scopes(&module);
  let a = ids_of(&module, "a");
  let f = body_scope_of(&scopes, &module.stx.body[1]);
  assert_eq!(scopes.references(ScopeId::MODULE, "a"), pick(&a, &[0, 1, 2, 4]));
  assert_eq!(scopes.references(f, "a"), pick(&a, &[3, 5]));
}

#[test]
fn match_captures_bind_locally() {
  let module = parse(
    "def f(p):\n    match p:\n        case [x, *rest]:\n            return x, rest\n",
  )
  .unwrap();
  let scopes = compute_scopes(&module);
  let f = body_scope_of(&scopes, &module.stx.body[0]);
  assert_eq!(scopes.references(f, "x"), ids_of(&module, "x"));
  assert_eq!(scopes.references(f, "rest"), ids_of(&module, "rest"));
  assert_eq!(scopes.references(f, "p"), ids_of(&module, "p"));
}

#[test]
fn unbound_names_resolve_to_module() {
  let module = parse("def f():\n    return len(x)\n").unwrap();
  let scopes = compute_scopes(&module);
  assert_eq!(scopes.references(ScopeId::MODULE, "len"), ids_of(&module, "len"));
  assert_eq!(scopes.resolve_name(ScopeId::MODULE, "missing"), ScopeId::MODULE);
}
