use super::declare::Declarations;
use super::ScopeData;
use super::ScopeId;
use super::ScopeKind;
use super::Scopes;

/// Resolves every recorded site and files it under the scope holding its binding.
pub fn resolve(declared: Declarations) -> Scopes {
  let Declarations {
    mut scopes,
    sites,
    type_param_scopes,
    body_scopes,
    names_in_use,
  } = declared;
  for site in sites {
    let target = resolve_name(&scopes, site.scope, &site.name);
    scopes[target.index()]
      .references
      .entry(site.name)
      .or_default()
      .push(site.id);
  }
  Scopes {
    scopes,
    type_param_scopes,
    body_scopes,
    names_in_use,
  }
}

pub(crate) fn resolve_name(scopes: &[ScopeData], from: ScopeId, name: &str) -> ScopeId {
  let from_kind = scopes[from.index()].kind;
  let mut current = from;
  let mut previous: Option<ScopeId> = None;
  loop {
    let data = &scopes[current.index()];
    // A class body is visible to its own statements and to the annotation scopes directly inside it, never to nested functions.
    let visible = data.kind != ScopeKind::Class
      || current == from
      || (previous == Some(from) && from_kind == ScopeKind::Annotation);
    if visible {
      if data.globals.contains(name) {
        return ScopeId::MODULE;
      };
      if !data.nonlocals.contains(name) && data.bindings.contains(name) {
        return current;
      };
    };
    match data.parent {
      Some(parent) => {
        previous = Some(current);
        current = parent;
      }
      None => return ScopeId::MODULE,
    };
  }
}
