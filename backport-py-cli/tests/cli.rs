use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn backport_py() -> Command {
  let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("backport-py");
  cmd.timeout(Duration::from_secs(10)).env_remove("BACKPORT_PY_TARGET");
  cmd
}

fn stdout_json(stdout: &[u8]) -> Value {
  serde_json::from_slice(stdout).expect("stdout should be valid JSON")
}

#[test]
fn transfers_in_place_by_default() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  fs::write(&path, "x: int | None = None\n").unwrap();

  backport_py().arg("transfer").arg(&path).assert().success();
  assert_eq!(
    fs::read_to_string(&path).unwrap(),
    "from typing import Union\n\nx: Union[int, None] = None\n"
  );
}

#[test]
fn transfer_respects_target_and_output() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("a.py");
  let dst = dir.path().join("out/a.py");
  fs::write(&src, "x: int | None = f\"{y}\"\n").unwrap();

  backport_py()
    .args(["transfer", "--target", "3.10", "-o"])
    .arg(&dst)
    .arg(&src)
    .assert()
    .success();
  assert_eq!(fs::read_to_string(&dst).unwrap(), "x: int | None = \"{:}\".format(y)\n");
}

#[test]
fn unsupported_construct_fails() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  let src = "match x:\n    case [a]:\n        pass\n";
  fs::write(&path, src).unwrap();

  backport_py()
    .arg("transfer")
    .arg(&path)
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("unsupported"));
  assert_eq!(fs::read_to_string(&path).unwrap(), src);
}

#[test]
fn rejects_bad_target() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  fs::write(&path, "x = 1\n").unwrap();
  backport_py()
    .args(["transfer", "-t", "2.7"])
    .arg(&path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("major version 2"));
}

#[test]
fn transfer_dir_keep_going_reports_failures() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("src");
  let dst = dir.path().join("dst");
  fs::create_dir_all(&src).unwrap();
  fs::write(src.join("a.py"), "print(f\"{a}\")\n").unwrap();
  fs::write(src.join("b.py"), "match x:\n    case [a]:\n        pass\n").unwrap();

  let assert = backport_py()
    .arg("transfer-dir")
    .arg(&src)
    .arg(&dst)
    .arg("--keep-going")
    .assert()
    .failure()
    .code(1);
  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.contains("b.py"), "unexpected stderr: {stderr}");
  assert_eq!(fs::read_to_string(dst.join("a.py")).unwrap(), "print(\"{:}\".format(a))\n");
}

#[test]
fn build_prints_plan() {
  let dir = tempdir().unwrap();
  fs::write(
    dir.path().join("pyproject.toml"),
    "[tool.backport-py]\ntarget = \"3.9\"\n",
  )
  .unwrap();
  fs::create_dir_all(dir.path().join("src/pkg")).unwrap();
  fs::write(dir.path().join("src/pkg/m.py"), "y: int | str\n").unwrap();
  let build = dir.path().join("build");

  let assert = backport_py()
    .arg("build")
    .arg("--project-dir")
    .arg(dir.path())
    .arg("--build-dir")
    .arg(&build)
    .assert()
    .success();
  let plan = stdout_json(&assert.get_output().stdout);
  assert_eq!(plan["python_tag"], "py39");
  assert_eq!(plan["files"].as_object().unwrap().len(), 1);
  assert_eq!(
    fs::read_to_string(build.join("pkg/m.py")).unwrap(),
    "from typing import Union\n\ny: Union[int, str]\n"
  );
}

#[test]
fn parse_dumps_tree_and_scopes() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  fs::write(&path, "def f(x):\n    return x\n").unwrap();

  let assert = backport_py().arg("parse").arg(&path).assert().success();
  let output = stdout_json(&assert.get_output().stdout);
  assert!(output.get("ast").is_some());
  assert!(output.get("scopes").is_none());

  let assert = backport_py().arg("parse").arg("--scopes").arg(&path).assert().success();
  let output = stdout_json(&assert.get_output().stdout);
  assert!(output["scopes"].as_array().unwrap().len() >= 2);
}
