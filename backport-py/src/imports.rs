//! Delivers the imports that generated code needs.
//!
//! Passes only record what they need in an [`ImportRequests`]. Once all passes have run, [`add_imports`] adds whatever the module doesn't already import, appending to a `from <module> import …` among the imports that open the module when there is one and otherwise inserting a new statement after the docstring and `__future__` imports.
use parse_py::ast::expr::Expr;
use parse_py::ast::node::Node;
use parse_py::ast::stmt::*;
use parse_py::ast::trivia::EmptyLine;
use parse_py::ast::trivia::Leaf;
use parse_py::build;
use parse_py::loc::Loc;
use std::mem::take;

/// `(module, name)` pairs in the order they were first requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRequests {
  entries: Vec<(String, String)>,
}

impl ImportRequests {
  pub fn new() -> ImportRequests {
    ImportRequests::default()
  }

  pub fn request(&mut self, module: &str, name: &str) {
    if !self.contains(module, name) {
      self.entries.push((module.to_string(), name.to_string()));
    };
  }

  pub fn typing(&mut self, name: &str) {
    self.request("typing", name);
  }

  pub fn contains(&self, module: &str, name: &str) -> bool {
    self.entries.iter().any(|(m, n)| m == module && n == name)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(m, n)| (m.as_str(), n.as_str()))
  }

  fn modules(&self) -> Vec<&str> {
    let mut out = Vec::<&str>::new();
    for (m, _) in self.entries.iter() {
      if !out.contains(&m.as_str()) {
        out.push(m);
      };
    }
    out
  }

  fn names_from<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .entries
      .iter()
      .filter(move |(m, _)| m == module)
      .map(|(_, n)| n.as_str())
  }
}

/// How many statements open the module before any other code runs: a docstring and the imports after it. Generated code may be used as early as the first statement after these, so only imports in this range bind names in time.
fn header_len(module: &Node<Module>) -> usize {
  let body = &module.stx.body;
  let mut end = usize::from(body.first().is_some_and(is_docstring));
  while body.get(end).is_some_and(is_import) {
    end += 1;
  }
  end
}

fn header_imports_from<'a>(
  module: &'a Node<Module>,
  path: &'a str,
) -> impl Iterator<Item = &'a Node<ImportFromStmt>> + 'a {
  module.stx.body[..header_len(module)]
    .iter()
    .filter_map(|s| match s.stx.as_ref() {
      Stmt::Simple(line) => Some(line),
      _ => None,
    })
    .flat_map(|line| line.stx.body.iter())
    .filter_map(move |item| match &item.stx.stmt {
      SmallStmt::ImportFrom(i) if i.stx.module_path() == path => Some(i),
      _ => None,
    })
}

/// Whether `name` is already bound by a `from <path> import …` in the module header.
fn already_imported(module: &Node<Module>, path: &str, name: &str) -> bool {
  header_imports_from(module, path).any(|i| {
    i.stx.star.is_some()
      || i
        .stx
        .names
        .iter()
        .any(|a| a.stx.asname.is_none() && a.stx.name.text.trim() == name)
  })
}

pub fn add_imports(mut module: Node<Module>, requests: &ImportRequests) -> Node<Module> {
  for path in requests.modules() {
    let missing: Vec<&str> = requests
      .names_from(path)
      .filter(|n| !already_imported(&module, path, n))
      .collect();
    if missing.is_empty() {
      continue;
    };
    if !append_to_existing(&mut module, path, &missing) {
      insert_new(&mut module, path, &missing);
    };
  }
  module
}

fn append_to_existing(module: &mut Node<Module>, path: &str, names: &[&str]) -> bool {
  let end = header_len(module);
  for stmt in module.stx.body[..end].iter_mut() {
    let Stmt::Simple(line) = stmt.stx.as_mut() else {
      continue;
    };
    for item in line.stx.body.iter_mut() {
      let SmallStmt::ImportFrom(import) = &mut item.stx.stmt else {
        continue;
      };
      if import.stx.star.is_some() || import.stx.module_path() != path {
        continue;
      };
      let loc = import.loc;
      let aliases = &mut import.stx.names;
      for name in names {
        if let Some(last) = aliases.last_mut() {
          if last.stx.comma.is_none() {
            last.stx.comma = Some(Leaf::bare(","));
          };
        };
        aliases.push(build::import_alias(loc, name));
      }
      return true;
    }
  }
  false
}

pub(crate) fn is_docstring(stmt: &Node<Stmt>) -> bool {
  let Stmt::Simple(line) = stmt.stx.as_ref() else {
    return false;
  };
  match line.stx.body.as_slice() {
    [item] => match &item.stx.stmt {
      SmallStmt::Expr(e) => matches!(e.stx.value.stx.as_ref(), Expr::Str(_) | Expr::Concat(_)),
      _ => false,
    },
    _ => false,
  }
}

fn is_future_import(stmt: &Node<Stmt>) -> bool {
  let Stmt::Simple(line) = stmt.stx.as_ref() else {
    return false;
  };
  line.stx.body.iter().all(|item| {
    matches!(&item.stx.stmt, SmallStmt::ImportFrom(i) if i.stx.module_path() == "__future__")
  })
}

fn is_import(stmt: &Node<Stmt>) -> bool {
  let Stmt::Simple(line) = stmt.stx.as_ref() else {
    return false;
  };
  line
    .stx
    .body
    .iter()
    .all(|item| matches!(&item.stx.stmt, SmallStmt::Import(_) | SmallStmt::ImportFrom(_)))
}

fn insert_new(module: &mut Node<Module>, path: &str, names: &[&str]) {
  let body = &mut module.stx.body;
  let mut at = 0;
  if body.first().is_some_and(is_docstring) {
    at = 1;
  };
  while body.get(at).is_some_and(is_future_import) {
    at += 1;
  }

  let mut import = build::import_from(Loc(0, 0), path, names);
  if at == 0 {
    // Header comments stay at the top of the file.
    if let Some(first) = body.first_mut() {
      *import.stx.leading_lines_mut() = take(first.stx.leading_lines_mut());
    };
  };
  body.insert(at, import);

  if let Some(next) = body.get_mut(at + 1) {
    if !is_import(next) {
      let lines = next.stx.leading_lines_mut();
      if lines.first().map_or(true, |l| l.has_comment()) {
        lines.insert(0, EmptyLine::blank());
      };
    };
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use parse_py::parse;
  use parse_py::print;

  fn add(source: &str, names: &[&str]) -> String {
    let module = parse(source).unwrap();
    let mut requests = ImportRequests::new();
    for n in names {
      requests.typing(n);
    }
    print(&add_imports(module, &requests))
  }

  #[test]
  fn test_inserts_before_code() {
    assert_eq!(
      add("x = 1\n", &["TypeVar", "Generic"]),
      "from typing import TypeVar, Generic\n\nx = 1\n"
    );
  }

  #[test]
  fn test_inserts_after_docstring_and_future_imports() {
    assert_eq!(
      add(
        "\"\"\"Doc.\"\"\"\nfrom __future__ import annotations\n\nimport os\n",
        &["Union"]
      ),
      "\"\"\"Doc.\"\"\"\nfrom __future__ import annotations\nfrom typing import Union\n\nimport os\n"
    );
  }

  #[test]
  fn test_keeps_header_comments_on_top() {
    assert_eq!(
      add("#!/usr/bin/env python\n# header\nx = 1\n", &["Union"]),
      "#!/usr/bin/env python\n# header\nfrom typing import Union\n\nx = 1\n"
    );
  }

  #[test]
  fn test_appends_to_existing_import() {
    assert_eq!(
      add("import os\nfrom typing import Any\n\nx = 1\n", &["Union", "Any"]),
      "import os\nfrom typing import Any, Union\n\nx = 1\n"
    );
  }

  #[test]
  fn test_ignores_imports_after_code() {
    assert_eq!(
      add("def f(x: Union[int, str]): pass\nfrom typing import Any\n", &["Union"]),
      "from typing import Union\n\ndef f(x: Union[int, str]): pass\nfrom typing import Any\n"
    );
    assert_eq!(
      add("x: Union[int, str] = 1\nfrom typing import Union\n", &["Union"]),
      "from typing import Union\n\nx: Union[int, str] = 1\nfrom typing import Union\n"
    );
  }

  #[test]
  fn test_star_import_covers_everything() {
    assert_eq!(add("from typing import *\n", &["Union"]), "from typing import *\n");
  }

  #[test]
  fn test_aliased_import_does_not_count() {
    assert_eq!(
      add("from typing import Union as U\n", &["Union"]),
      "from typing import Union as U, Union\n"
    );
  }

  #[test]
  fn test_no_requests_is_identity() {
    let source = "# comment\nx = 1\n";
    assert_eq!(add(source, &[]), source);
  }
}
