use backport_py::hook::HookConfig;
use backport_py::BuildHook;
use backport_py::TargetVersion;
use backport_py::TransferError;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::tempdir;

const PYPROJECT: &str = r#"[project]
name = "demo"

[tool.backport-py]
target = "3.9"
excludes = ["**/skip_*.py"]
"#;

fn write(path: &Path, contents: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, contents).unwrap();
}

fn project(root: &Path) -> BuildHook {
  write(&root.join("pyproject.toml"), PYPROJECT);
  write(&root.join("src/demo/__init__.py"), "from .core import ident\n");
  write(&root.join("src/demo/core.py"), "def ident[T](x: T) -> T:\n    return x\n");
  write(&root.join("src/demo/skip_me.py"), "match x:\n    case [a]:\n        pass\n");
  write(&root.join("src/demo/py.typed"), "");
  let config = HookConfig::from_pyproject(PYPROJECT).unwrap();
  BuildHook::new(root, config, None).unwrap()
}

#[test]
fn plans_included_files() {
  let dir = tempdir().unwrap();
  let hook = project(dir.path());
  let build = dir.path().join("build");
  let plan = hook.plan(&build).unwrap();

  assert_eq!(plan.python_tag, "py39");
  let sources: Vec<&PathBuf> = plan.files.keys().collect();
  assert_eq!(sources, vec![
    &PathBuf::from("demo/__init__.py"),
    &PathBuf::from("demo/core.py"),
  ]);
  assert_eq!(plan.files[&PathBuf::from("demo/core.py")], build.join("demo/core.py"));
  assert!(!build.exists());

  let json = serde_json::to_value(&plan).unwrap();
  assert_eq!(json["python_tag"], "py39");
}

#[test]
fn run_writes_backported_files() {
  let dir = tempdir().unwrap();
  let hook = project(dir.path());
  let build = dir.path().join("build");
  let plan = hook.run(&build).unwrap();

  assert_eq!(plan.files.len(), 2);
  let core = fs::read_to_string(build.join("demo/core.py")).unwrap();
  assert!(core.starts_with("from typing import TypeVar\n"));
  assert!(core.contains("ident = __wrapper_func_ident()\n"));
  assert!(!build.join("demo/skip_me.py").exists());
}

#[test]
fn env_override_wins() {
  let dir = tempdir().unwrap();
  project(dir.path());
  let config = HookConfig::from_pyproject(PYPROJECT).unwrap();
  let hook = BuildHook::new(dir.path(), config, Some("3.12")).unwrap();
  assert_eq!(hook.target(), TargetVersion { major: 3, minor: 12 });
  assert_eq!(hook.plan(&dir.path().join("build")).unwrap().python_tag, "py312");
}

#[test]
fn load_without_pyproject_uses_defaults() {
  let dir = tempdir().unwrap();
  write(&dir.path().join("src/m.py"), "x = 1\n");
  let hook = BuildHook::load(dir.path()).unwrap();
  assert_eq!(hook.config(), &HookConfig::default());
  let plan = hook.plan(&dir.path().join("build")).unwrap();
  assert_eq!(plan.files.keys().collect::<Vec<_>>(), vec![&PathBuf::from("m.py")]);
}

#[test]
fn load_rejects_bad_config() {
  let dir = tempdir().unwrap();
  write(&dir.path().join("pyproject.toml"), "[tool.backport-py]\nincludes = 3\n");
  assert!(matches!(BuildHook::load(dir.path()), Err(TransferError::Config(_))));

  write(&dir.path().join("pyproject.toml"), "[tool.backport-py]\nincludes = [\"[\"]\n");
  let hook = BuildHook::load(dir.path()).unwrap();
  assert!(matches!(hook.plan(&dir.path().join("build")), Err(TransferError::Glob(_))));
}
