use std::collections::BTreeSet;

/// `__<owner>_…_<param>`, the name a type parameter is renamed to.
pub fn scoped_name(owners: &[&str], param: &str) -> String {
  let mut out = String::from("_");
  for owner in owners {
    out.push('_');
    out.push_str(owner);
  }
  out.push('_');
  out.push_str(param);
  out
}

/// How `name` reads inside the body of class `class`, if private name mangling rewrites it.
pub fn mangle_private(name: &str, class: &str) -> Option<String> {
  if !name.starts_with("__") || name.ends_with("__") {
    return None;
  };
  let class = class.trim_start_matches('_');
  if class.is_empty() {
    return None;
  };
  Some(format!("_{class}{name}"))
}

pub fn wrapper_name(func: &str) -> String {
  format!("__wrapper_func_{func}")
}

/// Hands out identifiers that don't collide with any name already in a module, nor with each other.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
  taken: BTreeSet<String>,
}

impl FreshNames {
  pub fn new<'a>(names_in_use: impl IntoIterator<Item = &'a str>) -> FreshNames {
    FreshNames {
      taken: names_in_use.into_iter().map(|n| n.to_string()).collect(),
    }
  }

  pub fn fresh(&mut self, candidate: String) -> String {
    let mut name = candidate.clone();
    let mut n = 0;
    while self.taken.contains(&name) {
      n += 1;
      name = format!("{candidate}_{n}");
    }
    self.taken.insert(name.clone());
    name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scoped_names() {
    assert_eq!(scoped_name(&["test"], "T"), "__test_T");
    assert_eq!(scoped_name(&["Test", "test"], "P"), "__Test_test_P");
    assert_eq!(wrapper_name("f"), "__wrapper_func_f");
  }

  #[test]
  fn test_mangle_private() {
    assert_eq!(mangle_private("__Test_T", "Test").as_deref(), Some("_Test__Test_T"));
    assert_eq!(mangle_private("__x", "_Priv").as_deref(), Some("_Priv__x"));
    assert_eq!(mangle_private("__T__", "A"), None);
    assert_eq!(mangle_private("__x", "__"), None);
    assert_eq!(mangle_private("x", "A"), None);
  }

  #[test]
  fn test_fresh_avoids_collisions() {
    let mut names = FreshNames::new(["__f_T", "__f_T_1", "x"]);
    assert_eq!(names.fresh("__f_U".into()), "__f_U");
    assert_eq!(names.fresh("__f_T".into()), "__f_T_2");
    // Names handed out are taken too.
    assert_eq!(names.fresh("__f_U".into()), "__f_U_1");
  }
}
