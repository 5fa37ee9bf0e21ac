use super::NameSite;
use super::ScopeData;
use super::ScopeId;
use super::ScopeKind;
use ahash::HashMap;
use ahash::HashMapExt;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_py::ast::expr::*;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::pat::Pattern;
use parse_py::ast::stmt::*;
use std::collections::BTreeSet;

/// Scopes and name sites of a module, before resolution.
#[derive(Debug)]
pub struct Declarations {
  pub scopes: Vec<ScopeData>,
  pub sites: Vec<NameSite>,
  pub type_param_scopes: HashMap<NodeId, ScopeId>,
  pub body_scopes: HashMap<NodeId, ScopeId>,
  pub names_in_use: BTreeSet<String>,
}

#[derive(Default, Visitor)]
#[visitor(Name(enter))]
struct NameCollector {
  names: BTreeSet<String>,
}

impl NameCollector {
  fn enter_name(&mut self, name: &Name) {
    self.names.insert(name.value.text.clone());
  }
}

pub fn declare(module: &Node<Module>) -> Declarations {
  let mut declarer = Declarer {
    scopes: vec![ScopeData::new(ScopeId::MODULE, None, ScopeKind::Module, None)],
    sites: Vec::new(),
    type_param_scopes: HashMap::new(),
    body_scopes: HashMap::new(),
  };
  declarer.stmts(ScopeId::MODULE, &module.stx.body);

  let mut collector = NameCollector::default();
  module.drive(&mut collector);
  let mut names_in_use = collector.names;
  for scope in declarer.scopes.iter() {
    names_in_use.extend(scope.bindings.iter().cloned());
  }

  Declarations {
    scopes: declarer.scopes,
    sites: declarer.sites,
    type_param_scopes: declarer.type_param_scopes,
    body_scopes: declarer.body_scopes,
    names_in_use,
  }
}

struct Declarer {
  scopes: Vec<ScopeData>,
  sites: Vec<NameSite>,
  type_param_scopes: HashMap<NodeId, ScopeId>,
  body_scopes: HashMap<NodeId, ScopeId>,
}

impl Declarer {
  fn new_scope(&mut self, parent: ScopeId, kind: ScopeKind, owner: Option<&str>) -> ScopeId {
    let id = ScopeId(self.scopes.len() as u32);
    self
      .scopes
      .push(ScopeData::new(id, Some(parent), kind, owner.map(|o| o.to_string())));
    id
  }

  fn data(&mut self, scope: ScopeId) -> &mut ScopeData {
    &mut self.scopes[scope.index()]
  }

  fn site(&mut self, scope: ScopeId, name: &Node<Name>) {
    self.sites.push(NameSite {
      id: name.id,
      scope,
      name: name.stx.value.text.clone(),
    });
  }

  fn bind(&mut self, scope: ScopeId, name: &Node<Name>) {
    self.bind_str(scope, &name.stx.value.text);
    self.site(scope, name);
  }

  fn bind_str(&mut self, scope: ScopeId, name: &str) {
    self.data(scope).bindings.insert(name.to_string());
  }

  // Assignment expressions inside comprehensions bind in the enclosing function or module.
  fn walrus_scope(&self, mut scope: ScopeId) -> ScopeId {
    loop {
      let data = &self.scopes[scope.index()];
      match (data.kind, data.parent) {
        (ScopeKind::Comprehension, Some(parent)) => scope = parent,
        _ => return scope,
      };
    }
  }

  fn stmts(&mut self, scope: ScopeId, stmts: &[Node<Stmt>]) {
    for stmt in stmts {
      self.stmt(scope, stmt);
    }
  }

  fn suite(&mut self, scope: ScopeId, suite: &Suite) {
    match suite {
      Suite::Block(b) => self.stmts(scope, &b.stx.body),
      Suite::Inline(s) => {
        for item in s.stx.body.iter() {
          self.small_stmt(scope, &item.stx.stmt);
        }
      }
    };
  }

  fn else_clause(&mut self, scope: ScopeId, orelse: &Option<Node<ElseClause>>) {
    if let Some(e) = orelse {
      self.suite(scope, &e.stx.body);
    };
  }

  fn stmt(&mut self, scope: ScopeId, stmt: &Node<Stmt>) {
    match stmt.stx.as_ref() {
      Stmt::ClassDef(n) => self.class_def(scope, n),
      Stmt::FunctionDef(n) => self.function_def(scope, n),
      Stmt::For(n) => {
        self.target(scope, &n.stx.target);
        self.expr(scope, &n.stx.iter);
        self.suite(scope, &n.stx.body);
        self.else_clause(scope, &n.stx.orelse);
      }
      Stmt::If(n) => self.if_stmt(scope, n),
      Stmt::Match(n) => {
        self.expr(scope, &n.stx.subject);
        for case in n.stx.cases.iter() {
          self.pattern(scope, &case.stx.pattern);
          if let Some(guard) = &case.stx.guard {
            self.expr(scope, &guard.stx.test);
          };
          self.suite(scope, &case.stx.body);
        }
      }
      Stmt::Simple(n) => {
        for item in n.stx.body.iter() {
          self.small_stmt(scope, &item.stx.stmt);
        }
      }
      Stmt::Try(n) => {
        self.suite(scope, &n.stx.body);
        for handler in n.stx.handlers.iter() {
          if let Some(typ) = &handler.stx.typ {
            self.expr(scope, typ);
          };
          if let Some(name) = &handler.stx.name {
            self.bind(scope, &name.stx.name);
          };
          self.suite(scope, &handler.stx.body);
        }
        self.else_clause(scope, &n.stx.orelse);
        if let Some(f) = &n.stx.finalbody {
          self.suite(scope, &f.stx.body);
        };
      }
      Stmt::While(n) => {
        self.expr(scope, &n.stx.test);
        self.suite(scope, &n.stx.body);
        self.else_clause(scope, &n.stx.orelse);
      }
      Stmt::With(n) => {
        for item in n.stx.items.iter() {
          self.expr(scope, &item.stx.item);
          if let Some(target) = &item.stx.target {
            self.target(scope, &target.stx.target);
          };
        }
        self.suite(scope, &n.stx.body);
      }
    };
  }

  fn if_stmt(&mut self, scope: ScopeId, n: &Node<IfStmt>) {
    self.expr(scope, &n.stx.test);
    self.suite(scope, &n.stx.body);
    match &n.stx.orelse {
      Some(OrElse::Elif(elif)) => self.if_stmt(scope, elif),
      Some(OrElse::Else(e)) => self.suite(scope, &e.stx.body),
      None => {}
    };
  }

  fn small_stmt(&mut self, scope: ScopeId, stmt: &SmallStmt) {
    match stmt {
      SmallStmt::AnnAssign(n) => {
        self.target(scope, &n.stx.target);
        self.expr(scope, &n.stx.annotation.stx.annotation);
        if let Some(value) = &n.stx.value {
          self.expr(scope, value);
        };
      }
      SmallStmt::Assert(n) => {
        self.expr(scope, &n.stx.test);
        if let Some(msg) = &n.stx.msg {
          self.expr(scope, msg);
        };
      }
      SmallStmt::Assign(n) => {
        for target in n.stx.targets.iter() {
          self.target(scope, &target.stx.target);
        }
        self.expr(scope, &n.stx.value);
      }
      SmallStmt::AugAssign(n) => {
        self.target(scope, &n.stx.target);
        self.expr(scope, &n.stx.value);
      }
      SmallStmt::Break(_) | SmallStmt::Continue(_) | SmallStmt::Pass(_) => {}
      SmallStmt::Del(n) => self.target(scope, &n.stx.target),
      SmallStmt::Expr(n) => self.expr(scope, &n.stx.value),
      SmallStmt::Global(n) => {
        for item in n.stx.names.iter() {
          let name = &item.stx.name;
          self.data(scope).globals.insert(name.stx.value.text.clone());
          self.site(scope, name);
        }
      }
      SmallStmt::Nonlocal(n) => {
        for item in n.stx.names.iter() {
          let name = &item.stx.name;
          self.data(scope).nonlocals.insert(name.stx.value.text.clone());
          self.site(scope, name);
        }
      }
      SmallStmt::Import(n) => self.import_aliases(scope, &n.stx.names),
      SmallStmt::ImportFrom(n) => self.import_aliases(scope, &n.stx.names),
      SmallStmt::Raise(n) => {
        if let Some(exc) = &n.stx.exc {
          self.expr(scope, exc);
        };
        if let Some(cause) = &n.stx.cause {
          self.expr(scope, &cause.stx.cause);
        };
      }
      SmallStmt::Return(n) => {
        if let Some(value) = &n.stx.value {
          self.expr(scope, value);
        };
      }
      SmallStmt::TypeAlias(n) => self.type_alias(scope, n),
    };
  }

  fn import_aliases(&mut self, scope: ScopeId, names: &[Node<ImportAlias>]) {
    for alias in names {
      match &alias.stx.asname {
        Some(asname) => self.bind(scope, &asname.stx.name),
        None => self.bind_str(scope, alias.stx.bound_name()),
      };
    }
  }

  fn type_params(&mut self, scope: ScopeId, params: &Node<TypeParams>) {
    for param in params.stx.params.iter() {
      let kind = &param.stx.param;
      self.bind(scope, kind.name());
      if let TypeParamKind::TypeVar(t) = kind {
        if let Some(bound) = &t.stx.bound {
          self.expr(scope, &bound.stx.bound);
        };
      };
      if let Some(default) = kind.default() {
        self.expr(scope, &default.stx.value);
      };
    }
  }

  /// Opens the annotation scope of a generic definition, or returns `scope` when there are no type parameters.
  fn annotation_scope(&mut self, scope: ScopeId, owner: &str, params: &Option<Node<TypeParams>>) -> ScopeId {
    let Some(params) = params else {
      return scope;
    };
    let annotation = self.new_scope(scope, ScopeKind::Annotation, Some(owner));
    self.type_param_scopes.insert(params.id, annotation);
    self.type_params(annotation, params);
    annotation
  }

  fn decorators(&mut self, scope: ScopeId, decorators: &[Node<Decorator>]) {
    for d in decorators {
      self.expr(scope, &d.stx.expr);
    }
  }

  fn function_def(&mut self, scope: ScopeId, def: &Node<FunctionDef>) {
    let f = def.stx.as_ref();
    let owner = f.name.stx.value.text.as_str();
    self.decorators(scope, &f.decorators);
    self.bind(scope, &f.name);
    let annotation = self.annotation_scope(scope, owner, &f.type_params);
    let body = self.new_scope(annotation, ScopeKind::Function, Some(owner));
    self.body_scopes.insert(def.id, body);
    self.parameters(scope, annotation, body, &f.params);
    if let Some(returns) = &f.returns {
      self.expr(annotation, &returns.stx.annotation);
    };
    self.suite(body, &f.body);
  }

  fn class_def(&mut self, scope: ScopeId, def: &Node<ClassDef>) {
    let c = def.stx.as_ref();
    let owner = c.name.stx.value.text.as_str();
    self.decorators(scope, &c.decorators);
    self.bind(scope, &c.name);
    let annotation = self.annotation_scope(scope, owner, &c.type_params);
    self.args(annotation, &c.args);
    let body = self.new_scope(annotation, ScopeKind::Class, Some(owner));
    self.body_scopes.insert(def.id, body);
    self.suite(body, &c.body);
  }

  fn type_alias(&mut self, scope: ScopeId, alias: &Node<TypeAliasStmt>) {
    let a = alias.stx.as_ref();
    let owner = a.name.stx.value.text.as_str();
    self.bind(scope, &a.name);
    let annotation = self.new_scope(scope, ScopeKind::Annotation, Some(owner));
    self.body_scopes.insert(alias.id, annotation);
    if let Some(params) = &a.type_params {
      self.type_param_scopes.insert(params.id, annotation);
      self.type_params(annotation, params);
    };
    self.expr(annotation, &a.value);
  }

  // Defaults are evaluated where the definition runs, annotations in the annotation scope, and names bind in the body.
  fn parameters(&mut self, outer: ScopeId, annotation: ScopeId, body: ScopeId, params: &Node<Parameters>) {
    for param in params.stx.params.iter() {
      let p = param.stx.as_ref();
      if let Some(name) = &p.name {
        self.bind(body, name);
      };
      if let Some(a) = &p.annotation {
        self.expr(annotation, &a.stx.annotation);
      };
      if let Some(d) = &p.default {
        self.expr(outer, &d.stx.value);
      };
    }
  }

  fn args(&mut self, scope: ScopeId, args: &[Node<Arg>]) {
    for arg in args {
      self.expr(scope, &arg.stx.value);
    }
  }

  fn elements(&mut self, scope: ScopeId, elements: &[Node<Element>]) {
    for e in elements {
      self.expr(scope, &e.stx.value);
    }
  }

  fn fstring_parts(&mut self, scope: ScopeId, parts: &[FStringPart]) {
    for part in parts {
      let FStringPart::Field(field) = part else {
        continue;
      };
      self.expr(scope, &field.stx.expr);
      if let Some(spec) = &field.stx.spec {
        self.fstring_parts(scope, &spec.stx.parts);
      };
    }
  }

  /// A binding position: names bind, and anything else (attributes, subscripts) is evaluated.
  fn target(&mut self, scope: ScopeId, target: &Node<Expr>) {
    match target.stx.as_ref() {
      Expr::Name(n) => self.bind(scope, n),
      Expr::Tuple(t) => {
        for e in t.stx.elements.iter() {
          self.target(scope, &e.stx.value);
        }
      }
      Expr::List(l) => {
        for e in l.stx.elements.iter() {
          self.target(scope, &e.stx.value);
        }
      }
      Expr::Paren(p) => self.target(scope, &p.stx.inner),
      Expr::Starred(s) => self.target(scope, &s.stx.value),
      _ => self.expr(scope, target),
    };
  }

  fn expr(&mut self, scope: ScopeId, expr: &Node<Expr>) {
    match expr.stx.as_ref() {
      Expr::Attribute(n) => self.expr(scope, &n.stx.value),
      Expr::Await(n) => self.expr(scope, &n.stx.value),
      Expr::Binary(n) => {
        self.expr(scope, &n.stx.left);
        self.expr(scope, &n.stx.right);
      }
      Expr::Call(n) => {
        self.expr(scope, &n.stx.func);
        self.args(scope, &n.stx.args);
      }
      Expr::Comparison(n) => {
        self.expr(scope, &n.stx.left);
        for c in n.stx.comparisons.iter() {
          self.expr(scope, &c.stx.comparator);
        }
      }
      Expr::Comprehension(n) => self.comprehension(scope, n),
      Expr::Concat(n) => {
        for part in n.stx.parts.iter() {
          self.expr(scope, part);
        }
      }
      Expr::Constant(_) | Expr::Ellipsis(_) | Expr::Number(_) | Expr::Str(_) => {}
      Expr::Dict(n) => {
        for item in n.stx.items.iter() {
          if let Some(key) = &item.stx.key {
            self.expr(scope, key);
          };
          self.expr(scope, &item.stx.value);
        }
      }
      Expr::FString(n) => self.fstring_parts(scope, &n.stx.parts),
      Expr::IfElse(n) => {
        self.expr(scope, &n.stx.body);
        self.expr(scope, &n.stx.test);
        self.expr(scope, &n.stx.orelse);
      }
      Expr::Lambda(n) => {
        let body = self.new_scope(scope, ScopeKind::Lambda, None);
        self.body_scopes.insert(n.id, body);
        self.parameters(scope, scope, body, &n.stx.params);
        self.expr(body, &n.stx.body);
      }
      Expr::List(n) => self.elements(scope, &n.stx.elements),
      Expr::Name(n) => self.site(scope, n),
      Expr::NamedExpr(n) => {
        let target = self.walrus_scope(scope);
        self.bind(target, &n.stx.target);
        self.expr(scope, &n.stx.value);
      }
      Expr::Paren(n) => self.expr(scope, &n.stx.inner),
      Expr::Set(n) => self.elements(scope, &n.stx.elements),
      Expr::Starred(n) => self.expr(scope, &n.stx.value),
      Expr::Subscript(n) => {
        self.expr(scope, &n.stx.value);
        for element in n.stx.slices.iter() {
          match &element.stx.slice {
            Slice::Index(i) => self.expr(scope, &i.stx.value),
            Slice::Range(r) => {
              for part in [&r.stx.lower, &r.stx.upper, &r.stx.step].into_iter().flatten() {
                self.expr(scope, part);
              }
            }
          };
        }
      }
      Expr::Tuple(n) => self.elements(scope, &n.stx.elements),
      Expr::Unary(n) => self.expr(scope, &n.stx.operand),
      Expr::Yield(n) => {
        if let Some(value) = &n.stx.value {
          self.expr(scope, value);
        };
      }
    };
  }

  fn comprehension(&mut self, scope: ScopeId, comp: &Node<ComprehensionExpr>) {
    let inner = self.new_scope(scope, ScopeKind::Comprehension, None);
    self.body_scopes.insert(comp.id, inner);
    self.expr(inner, &comp.stx.elt);
    if let Some(value) = &comp.stx.dict_value {
      self.expr(inner, value);
    };
    for (i, clause) in comp.stx.clauses.iter().enumerate() {
      self.target(inner, &clause.stx.target);
      // The outermost iterable is evaluated before the comprehension's scope exists.
      self.expr(if i == 0 { scope } else { inner }, &clause.stx.iter);
      for cond in clause.stx.ifs.iter() {
        self.expr(inner, &cond.stx.test);
      }
    }
  }

  fn pattern(&mut self, scope: ScopeId, pattern: &Node<Pattern>) {
    match pattern.stx.as_ref() {
      Pattern::As(p) => {
        if let Some(inner) = &p.stx.pattern {
          self.pattern(scope, inner);
        };
        if p.stx.name.stx.value.text != "_" {
          self.bind(scope, &p.stx.name);
        };
      }
      Pattern::Class(p) => {
        self.expr(scope, &p.stx.cls);
        for e in p.stx.patterns.iter() {
          self.pattern(scope, &e.stx.pattern);
        }
        for k in p.stx.kwds.iter() {
          self.pattern(scope, &k.stx.pattern);
        }
      }
      Pattern::Group(p) => self.pattern(scope, &p.stx.pattern),
      Pattern::Mapping(p) => {
        for e in p.stx.elements.iter() {
          self.expr(scope, &e.stx.key);
          self.pattern(scope, &e.stx.pattern);
        }
        if let Some(rest) = &p.stx.rest {
          self.bind(scope, &rest.stx.name);
        };
      }
      Pattern::Or(p) => {
        for e in p.stx.patterns.iter() {
          self.pattern(scope, &e.stx.pattern);
        }
      }
      Pattern::Sequence(p) => {
        for e in p.stx.patterns.iter() {
          self.pattern(scope, &e.stx.pattern);
        }
      }
      Pattern::Singleton(_) => {}
      Pattern::Star(p) => {
        if p.stx.name.stx.value.text != "_" {
          self.bind(scope, &p.stx.name);
        };
      }
      Pattern::Value(p) => self.expr(scope, &p.stx.value),
    };
  }
}
