//! Generic functions, classes and `type` aliases become explicit `TypeVar`, `TypeVarTuple` and `ParamSpec` declarations.
//!
//! A round has two steps. First every reference to a type parameter of a target is renamed to `__<owner>_<param>`, using the references the scope resolver attributes to the parameter's annotation scope, so shadowing and unrelated names with the same spelling are left alone. Then each target is rebuilt from the renamed tree:
//!
//! - A generic function is wrapped in a function that declares the type variables, defines the function and returns it; the wrapper is called once to bind the original name.
//! - A generic class gets its declarations right before it and `Generic[...]` among its bases. Inside the class body a parameter is spelled with its private mangled name, so that name is bound to the declaration too.
//! - Generic methods directly in a class body get their declarations right before them, inside the class, for the signature. A method body that uses the parameters repeats the declarations at its top, since a function body can't see names bound in the class body.
//! - `type X[T] = V` becomes the declarations followed by `X = V`.
use super::until_fixpoint;
use super::union::lower_union;
use super::union::UnionMode;
use super::walk_stmts;
use super::Walk;
use crate::err::LowerError;
use crate::err::LowerResult;
use crate::fresh::mangle_private;
use crate::fresh::scoped_name;
use crate::fresh::wrapper_name;
use crate::fresh::FreshNames;
use crate::imports::is_docstring;
use crate::imports::ImportRequests;
use crate::replace::insert;
use crate::replace::new_map;
use crate::replace::Replacement;
use crate::replace::Replacer;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_py::ast::expr::Arg;
use parse_py::ast::expr::Expr;
use parse_py::ast::expr::Name;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::*;
use parse_py::ast::trivia::Leaf;
use parse_py::build;
use parse_py::loc::Loc;
use std::mem::take;
use symbol_py::compute_scopes;
use tracing::debug;

pub fn lower_type_params(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<Node<Module>> {
  until_fixpoint("type_params", module, round, requests)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum TargetKind {
  Function,
  Class,
  Alias,
}

/// A type-parameter list to rename, and the definitions it belongs to, outermost first.
struct ParamList {
  type_params: NodeId,
  owners: Vec<String>,
  names: Vec<String>,
}

struct Target {
  kind: TargetKind,
  params: Vec<ParamList>,
}

fn param_list(type_params: &Node<TypeParams>, owners: Vec<String>) -> ParamList {
  ParamList {
    type_params: type_params.id,
    owners,
    names: param_names(type_params),
  }
}

fn def_name(name: &Node<Name>) -> String {
  name.stx.value.text.clone()
}

/// Generic methods directly in a class body.
fn generic_methods(class: &ClassDef) -> impl Iterator<Item = &Node<FunctionDef>> {
  let body: &[Node<Stmt>] = match &class.body {
    Suite::Block(b) => &b.stx.body,
    Suite::Inline(_) => &[],
  };
  body.iter().filter_map(|s| match s.stx.as_ref() {
    Stmt::FunctionDef(f) if f.stx.type_params.is_some() => Some(f),
    _ => None,
  })
}

fn target_of(stmt: &Node<Stmt>) -> Option<Target> {
  match stmt.stx.as_ref() {
    Stmt::FunctionDef(f) => {
      let tp = f.stx.type_params.as_ref()?;
      Some(Target {
        kind: TargetKind::Function,
        params: vec![param_list(tp, vec![def_name(&f.stx.name)])],
      })
    }
    Stmt::ClassDef(c) => {
      let class = def_name(&c.stx.name);
      let mut params = Vec::new();
      if let Some(tp) = &c.stx.type_params {
        params.push(param_list(tp, vec![class.clone()]));
      };
      for method in generic_methods(&c.stx) {
        if let Some(tp) = &method.stx.type_params {
          params.push(param_list(tp, vec![class.clone(), def_name(&method.stx.name)]));
        };
      }
      (!params.is_empty()).then_some(Target {
        kind: TargetKind::Class,
        params,
      })
    }
    Stmt::Simple(line) => {
      let mut params = Vec::new();
      let mut any = false;
      for item in line.stx.body.iter() {
        if let SmallStmt::TypeAlias(a) = &item.stx.stmt {
          any = true;
          if let Some(tp) = &a.stx.type_params {
            params.push(param_list(tp, vec![def_name(&a.stx.name)]));
          };
        };
      }
      any.then_some(Target {
        kind: TargetKind::Alias,
        params,
      })
    }
    _ => None,
  }
}

/// Targets in source order, keyed by statement.
fn find_targets(module: &Node<Module>) -> LowerResult<Vec<(NodeId, Target)>> {
  let mut targets = Vec::new();
  walk_stmts(&module.stx.body, &mut |stmt| {
    let Some(target) = target_of(stmt) else {
      return Ok(Walk::Descend);
    };
    targets.push((stmt.id, target));
    Ok(Walk::Skip)
  })?;
  Ok(targets)
}

type SimpleSuiteNode = Node<SimpleSuite>;

// A `type` statement after a colon has no statement list to expand into.
#[derive(Visitor)]
#[visitor(SimpleSuiteNode(enter))]
struct InlineAliasFinder {
  found: Option<Loc>,
}

impl InlineAliasFinder {
  fn enter_simple_suite_node(&mut self, suite: &SimpleSuiteNode) {
    if self.found.is_some() {
      return;
    };
    self.found = suite
      .stx
      .body
      .iter()
      .find(|item| matches!(item.stx.stmt, SmallStmt::TypeAlias(_)))
      .map(|item| item.loc);
  }
}

fn round(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<(Node<Module>, usize)> {
  let mut inline = InlineAliasFinder { found: None };
  module.drive(&mut inline);
  if let Some(loc) = inline.found {
    return Err(LowerError::unsupported("type alias in a single-line block", loc));
  };

  let targets = find_targets(&module)?;
  if targets.is_empty() {
    return Ok((module, 0));
  };

  // Rename every reference first. Renames keep node identities, so the targets can be found again afterwards.
  let scopes = compute_scopes(&module);
  let mut fresh = FreshNames::new(scopes.names_in_use());
  let mut renames = new_map();
  for (_, target) in targets.iter() {
    for list in target.params.iter() {
      let scope = scopes.type_param_scope(list.type_params).ok_or_else(|| {
        LowerError::invariant("type parameter list has no annotation scope", None)
      })?;
      let owners: Vec<&str> = list.owners.iter().map(|o| o.as_str()).collect();
      for name in list.names.iter() {
        let renamed = fresh.fresh(scoped_name(&owners, name));
        for &site in scopes.references(scope, name) {
          insert(&mut renames, site, Replacement::Rename(renamed.clone()))?;
        }
      }
    }
  }
  let module = Replacer::new(renames).apply(module)?;

  let mut map = new_map();
  walk_stmts(&module.stx.body, &mut |stmt| {
    let Some((_, target)) = targets.iter().find(|(id, _)| *id == stmt.id) else {
      return Ok(Walk::Descend);
    };
    debug!(loc = ?stmt.loc, kind = ?target.kind, "lowering type parameters");
    let replacement = match (target.kind, stmt.stx.as_ref()) {
      (TargetKind::Function, Stmt::FunctionDef(f)) => lower_function(f, &mut fresh, requests)?,
      (TargetKind::Class, Stmt::ClassDef(c)) => lower_class(c, requests),
      (TargetKind::Alias, Stmt::Simple(line)) => lower_alias_line(line, requests)?,
      _ => {
        return Err(LowerError::invariant(
          "type parameter target changed kind",
          Some(stmt.loc),
        ))
      }
    };
    insert(&mut map, stmt.id, replacement)?;
    Ok(Walk::Skip)
  })?;

  let lowered = map.len();
  let module = Replacer::new(map).apply(module)?;
  Ok((module, lowered))
}

/// One `__T = TypeVar("__T", …)` line per parameter, in source order. Parameters must already be renamed.
fn declarations(type_params: &Node<TypeParams>, requests: &mut ImportRequests) -> Vec<Node<Stmt>> {
  type_params
    .stx
    .params
    .iter()
    .map(|p| declaration(&p.stx.param, p.loc, requests))
    .collect()
}

fn union_or_clone(expr: &Node<Expr>, requests: &mut ImportRequests) -> Node<Expr> {
  match lower_union(expr, UnionMode::Subscript) {
    Some(lowered) => {
      requests.typing("Union");
      lowered
    }
    None => expr.clone(),
  }
}

fn declaration(param: &TypeParamKind, loc: Loc, requests: &mut ImportRequests) -> Node<Stmt> {
  let name = &param.name().stx.value.text;
  let constructor = match param {
    TypeParamKind::ParamSpec(_) => "ParamSpec",
    TypeParamKind::TypeVar(_) => "TypeVar",
    TypeParamKind::TypeVarTuple(_) => "TypeVarTuple",
  };
  requests.typing(constructor);

  let mut args = vec![build::arg(build::string(loc, name))];
  if let TypeParamKind::TypeVar(v) = param {
    if let Some(bound) = &v.stx.bound {
      match bound.stx.bound.stx.as_ref() {
        Expr::Tuple(t) if t.stx.lpar.is_some() => {
          args.extend(t.stx.elements.iter().map(|e| build::arg(e.stx.value.clone())));
        }
        _ => args.push(build::keyword_arg(
          loc,
          "bound",
          union_or_clone(&bound.stx.bound, requests),
        )),
      };
    };
  };
  if let Some(default) = param.default() {
    args.push(build::keyword_arg(
      loc,
      "default",
      union_or_clone(&default.stx.value, requests),
    ));
  };
  let value = build::call(loc, build::name_expr(loc, constructor), args);
  build::assign(loc, build::name_expr(loc, name.as_str()), value)
}

/// `Generic[...]` over the parameters; a variadic one is spelled `Unpack[Ts]`.
fn generic_base(type_params: &Node<TypeParams>, requests: &mut ImportRequests) -> Node<Expr> {
  let loc = type_params.loc;
  let vars = type_params
    .stx
    .params
    .iter()
    .map(|p| {
      let name = build::name_expr(p.loc, p.stx.param.name().stx.value.text.as_str());
      match p.stx.param {
        TypeParamKind::TypeVarTuple(_) => {
          requests.typing("Unpack");
          build::subscript(p.loc, build::name_expr(p.loc, "Unpack"), vec![name])
        }
        _ => name,
      }
    })
    .collect();
  requests.typing("Generic");
  build::subscript(loc, build::name_expr(loc, "Generic"), vars)
}

fn lower_function(
  f: &Node<FunctionDef>,
  fresh: &mut FreshNames,
  requests: &mut ImportRequests,
) -> LowerResult<Replacement> {
  let loc = f.loc;
  let name = def_name(&f.stx.name);
  let mut inner = f.clone();
  // The replaced statement's leading lines are moved to the wrapper.
  inner.stx.leading_lines.clear();
  let Some(type_params) = inner.stx.type_params.take() else {
    return Err(LowerError::invariant("generic function lost its type parameters", Some(loc)));
  };

  let wrapper = fresh.fresh(wrapper_name(&name));
  let mut body = declarations(&type_params, requests);
  body.push(Node::new(loc, Stmt::FunctionDef(inner)));
  body.push(build::return_stmt(loc, Some(build::name_expr(loc, name.as_str()))));

  let call = build::call(loc, build::name_expr(loc, wrapper.as_str()), Vec::new());
  Ok(Replacement::Stmts {
    stmts: vec![
      build::function_def(loc, &wrapper, body),
      build::assign(loc, build::name_expr(loc, name.as_str()), call),
    ],
    trailing: Vec::new(),
  })
}

type NameNode = Node<Name>;

#[derive(Visitor)]
#[visitor(NameNode(enter))]
struct NameUses {
  wanted: Vec<String>,
  found: bool,
}

impl NameUses {
  fn enter_name_node(&mut self, node: &NameNode) {
    if !self.found {
      self.found = self.wanted.iter().any(|w| *w == node.stx.value.text);
    };
  }
}

fn uses_any(suite: &Suite, wanted: Vec<String>) -> bool {
  let mut uses = NameUses { wanted, found: false };
  suite.drive(&mut uses);
  uses.found
}

fn param_names(type_params: &Node<TypeParams>) -> Vec<String> {
  type_params
    .stx
    .params
    .iter()
    .map(|p| p.stx.param.name().stx.value.text.clone())
    .collect()
}

/// Puts `stmts` at the top of a function body, after its docstring. A body on the `def` line becomes an indented block first.
fn prepend_to_body(body: &mut Suite, stmts: Vec<Node<Stmt>>, loc: Loc) {
  if let Suite::Inline(inline) = body {
    let mut items = take(&mut inline.stx.body);
    build::set_leading_ws(&mut items, "");
    let line = Node::new(inline.loc, Stmt::Simple(Node::new(inline.loc, SimpleStmtLine {
      leading_lines: Vec::new(),
      body: items,
      newline: inline.stx.newline.clone(),
    })));
    *body = build::block(loc, vec![line]);
  };
  let Suite::Block(block) = body else {
    return;
  };
  let at = usize::from(block.stx.body.first().is_some_and(is_docstring));
  block.stx.body.splice(at..at, stmts);
}

/// Inserts `base` after the positional bases, before the first keyword or `**` argument.
fn add_base(class: &mut ClassDef, base: Node<Expr>) {
  let at = class
    .args
    .iter()
    .position(|a| a.stx.is_keyword_like())
    .unwrap_or(class.args.len());
  let mut arg: Node<Arg> = build::arg(base);
  if at > 0 {
    let prev = &mut class.args[at - 1];
    if prev.stx.comma.is_none() {
      prev.stx.comma = Some(Leaf::bare(","));
    };
    build::set_leading_ws(&mut arg, " ");
  };
  if let Some(next) = class.args.get_mut(at) {
    arg.stx.comma = Some(Leaf::bare(","));
    let ws = build::take_leading_ws(next);
    build::set_leading_ws(next, if ws.is_empty() { " " } else { &ws });
  };
  class.args.insert(at, arg);
  if class.lpar.is_none() {
    class.lpar = Some(Leaf::bare("("));
    class.rpar = Some(Leaf::bare(")"));
  };
}

fn lower_class(c: &Node<ClassDef>, requests: &mut ImportRequests) -> Replacement {
  let mut class = c.clone();
  class.stx.leading_lines.clear();
  let mut stmts = Vec::new();
  let class_params = class.stx.type_params.take();
  if let Some(type_params) = &class_params {
    stmts.extend(declarations(type_params, requests));
    let base = generic_base(type_params, requests);
    add_base(&mut class.stx, base);
  };

  if let Suite::Block(block) = &mut class.stx.body {
    let mut body = Vec::with_capacity(block.stx.body.len());
    for mut stmt in take(&mut block.stx.body) {
      if let Stmt::FunctionDef(method) = stmt.stx.as_mut() {
        if let Some(type_params) = method.stx.type_params.take() {
          if uses_any(&method.stx.body, param_names(&type_params)) {
            let decls = declarations(&type_params, requests);
            prepend_to_body(&mut method.stx.body, decls, method.loc);
          };
          let mut decls = declarations(&type_params, requests);
          // Comments and blank lines above the method now sit above its declarations.
          if let Some(first) = decls.first_mut() {
            *first.stx.leading_lines_mut() = take(&mut method.stx.leading_lines);
          };
          body.extend(decls);
        };
      };
      body.push(stmt);
    }
    block.stx.body = body;
  };

  if let Some(type_params) = &class_params {
    let class_name = def_name(&class.stx.name);
    for name in param_names(type_params) {
      let Some(mangled) = mangle_private(&name, &class_name) else {
        continue;
      };
      if uses_any(&class.stx.body, vec![name.clone()]) {
        stmts.push(build::assign(
          type_params.loc,
          build::name_expr(type_params.loc, mangled),
          build::name_expr(type_params.loc, name),
        ));
      };
    }
  };

  stmts.push(Node::new(c.loc, Stmt::ClassDef(class)));
  Replacement::Stmts {
    stmts,
    trailing: Vec::new(),
  }
}

fn alias_stmts(alias: &Node<TypeAliasStmt>, requests: &mut ImportRequests) -> Vec<Node<Stmt>> {
  let loc = alias.loc;
  let mut stmts = match &alias.stx.type_params {
    Some(type_params) => declarations(type_params, requests),
    None => Vec::new(),
  };
  let value = union_or_clone(&alias.stx.value, requests);
  let name = build::name_expr(loc, alias.stx.name.stx.value.text.as_str());
  stmts.push(build::assign(loc, name, value));
  stmts
}

fn flush_items(items: &mut Vec<Node<SmallStmtItem>>, loc: Loc, out: &mut Vec<Node<Stmt>>) {
  if items.is_empty() {
    return;
  };
  let mut body = take(items);
  build::set_leading_ws(&mut body, "");
  if let Some(last) = body.last_mut() {
    last.stx.semicolon = None;
  };
  out.push(Node::new(
    loc,
    Stmt::Simple(Node::new(loc, SimpleStmtLine {
      leading_lines: Vec::new(),
      body,
      newline: Default::default(),
    })),
  ));
}

/// Splits a line at its `type` statements, which each expand to several lines.
fn lower_alias_line(line: &Node<SimpleStmtLine>, requests: &mut ImportRequests) -> LowerResult<Replacement> {
  let loc = line.loc;
  let mut stmts = Vec::new();
  let mut items = Vec::new();
  for item in line.stx.body.iter() {
    match &item.stx.stmt {
      SmallStmt::TypeAlias(alias) => {
        flush_items(&mut items, loc, &mut stmts);
        stmts.extend(alias_stmts(alias, requests));
      }
      _ => items.push(item.clone()),
    };
  }
  flush_items(&mut items, loc, &mut stmts);

  // The trailing comment stays at the end of the last line.
  match stmts.last_mut().map(|s| s.stx.as_mut()) {
    Some(Stmt::Simple(last)) => last.stx.newline = line.stx.newline.clone(),
    _ => return Err(LowerError::invariant("type alias produced no statements", Some(loc))),
  };
  Ok(Replacement::Stmts {
    stmts,
    trailing: Vec::new(),
  })
}
