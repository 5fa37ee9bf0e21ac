//! Lexical scopes of a Python module and the resolution of every name to the scope that binds it.
//!
//! [`compute_scopes`] runs two passes:
//! - [`declare`] walks the tree, allocates a [`ScopeId`] for every scope and records the names each scope binds, plus every `Name` site (load or binding) and the scope it occurs in.
//! - [`resolve`] resolves each site to the scope holding its binding, following Python's rules: class bodies are invisible to nested functions and comprehensions but visible to annotation scopes directly inside them, `global` and `nonlocal` redirect lookups, and names that are never bound resolve to the module (builtins are treated as module names).
//!
//! ## Scope kinds
//!
//! - [`ScopeKind::Module`]: the top level.
//! - [`ScopeKind::Class`]: class bodies.
//! - [`ScopeKind::Function`] and [`ScopeKind::Lambda`]: function bodies; parameters bind here.
//! - [`ScopeKind::Comprehension`]: one per comprehension. The first iterable is evaluated in the enclosing scope.
//! - [`ScopeKind::Annotation`]: the type-parameter list of a generic function or class, and the value of a `type` statement. Annotations, bounds and bases of a generic definition are evaluated here.
use ahash::HashMap;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::Module;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

pub mod declare;
pub mod resolve;

pub use declare::declare;
pub use resolve::resolve;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(u32);

impl ScopeId {
  pub const MODULE: ScopeId = ScopeId(0);

  pub fn raw(self) -> u32 {
    self.0
  }

  fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
  Module,
  Class,
  Function,
  Lambda,
  Comprehension,
  Annotation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeData {
  pub id: ScopeId,
  pub parent: Option<ScopeId>,
  pub kind: ScopeKind,
  /// Name of the definition that owns the scope, if any.
  pub owner: Option<String>,
  pub bindings: BTreeSet<String>,
  pub globals: BTreeSet<String>,
  pub nonlocals: BTreeSet<String>,
  /// Every site resolved to a binding in this scope, in source order.
  pub references: BTreeMap<String, Vec<NodeId>>,
}

impl ScopeData {
  fn new(id: ScopeId, parent: Option<ScopeId>, kind: ScopeKind, owner: Option<String>) -> ScopeData {
    ScopeData {
      id,
      parent,
      kind,
      owner,
      bindings: BTreeSet::new(),
      globals: BTreeSet::new(),
      nonlocals: BTreeSet::new(),
      references: BTreeMap::new(),
    }
  }
}

/// A `Name` occurrence recorded by [`declare`].
#[derive(Debug, Clone)]
pub struct NameSite {
  pub id: NodeId,
  pub scope: ScopeId,
  pub name: String,
}

#[derive(Debug, Clone)]
pub struct Scopes {
  scopes: Vec<ScopeData>,
  // Keyed by the `Node<TypeParams>`.
  type_param_scopes: HashMap<NodeId, ScopeId>,
  // Keyed by the `Node<FunctionDef>`, `Node<ClassDef>`, `Node<LambdaExpr>`, `Node<ComprehensionExpr>` or `Node<TypeAliasStmt>`.
  body_scopes: HashMap<NodeId, ScopeId>,
  names_in_use: BTreeSet<String>,
}

impl Scopes {
  pub fn scope(&self, id: ScopeId) -> &ScopeData {
    &self.scopes[id.index()]
  }

  pub fn scopes(&self) -> &[ScopeData] {
    &self.scopes
  }

  /// The annotation scope introduced by a type-parameter list.
  pub fn type_param_scope(&self, type_params: NodeId) -> Option<ScopeId> {
    self.type_param_scopes.get(&type_params).copied()
  }

  /// The scope of a definition's body; for a `type` statement, the annotation scope of its value.
  pub fn body_scope(&self, def: NodeId) -> Option<ScopeId> {
    self.body_scopes.get(&def).copied()
  }

  /// Every site that resolves to `name` as bound in `scope`, in source order. This includes the binding sites themselves.
  pub fn references(&self, scope: ScopeId, name: &str) -> &[NodeId] {
    self
      .scope(scope)
      .references
      .get(name)
      .map(|r| r.as_slice())
      .unwrap_or_default()
  }

  /// Every identifier bound or referenced anywhere in the module, including attribute and keyword names.
  pub fn names_in_use(&self) -> impl Iterator<Item = &str> {
    self.names_in_use.iter().map(|n| n.as_str())
  }

  /// The scope a lookup of `name` from `scope` finds its binding in.
  pub fn resolve_name(&self, scope: ScopeId, name: &str) -> ScopeId {
    resolve::resolve_name(&self.scopes, scope, name)
  }
}

pub fn compute_scopes(module: &Node<Module>) -> Scopes {
  let declared = declare(module);
  resolve(declared)
}

#[cfg(test)]
mod tests;
