use backport_py::transfer_dir;
use backport_py::transfer_file;
use backport_py::BatchPolicy;
use backport_py::TargetVersion;
use backport_py::TransferError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const GENERIC: &str = "def ident[T](x: T) -> T:\n    return x\n";
const UNSUPPORTED: &str = "match x:\n    case [a]:\n        pass\n";

fn write(path: &Path, contents: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, contents).unwrap();
}

#[test]
fn transfers_file_into_new_directory() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("a.py");
  let dst = dir.path().join("out/nested/a.py");
  write(&src, "x: int | None = None\n");

  transfer_file(&src, &dst, TargetVersion::PY38).unwrap();
  assert_eq!(
    fs::read_to_string(&dst).unwrap(),
    "from typing import Union\n\nx: Union[int, None] = None\n"
  );
  assert_eq!(fs::read_to_string(&src).unwrap(), "x: int | None = None\n");
}

#[test]
fn transfers_file_in_place() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  write(&path, "print(f\"{x}\")\n");
  transfer_file(&path, &path, TargetVersion::PY38).unwrap();
  assert_eq!(fs::read_to_string(&path).unwrap(), "print(\"{:}\".format(x))\n");
}

#[test]
fn failed_file_writes_nothing() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("bad.py");
  let dst = dir.path().join("out/bad.py");
  write(&src, UNSUPPORTED);

  let err = transfer_file(&src, &dst, TargetVersion::PY38).unwrap_err();
  assert!(matches!(err, TransferError::Lower(ref e) if e.is_unsupported()));
  assert!(!dst.exists());
  assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_source_names_path() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("missing.py");
  let err = transfer_file(&src, &dir.path().join("out.py"), TargetVersion::PY38).unwrap_err();
  match err {
    TransferError::Io { path, .. } => assert_eq!(path, src),
    other => panic!("expected an I/O error, got {other:?}"),
  };
}

#[test]
fn mirrors_directory() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("src");
  let dst = dir.path().join("dst");
  write(&src.join("pkg/__init__.py"), "");
  write(&src.join("pkg/generic.py"), GENERIC);
  write(&src.join("README.md"), "# not python\n");

  let report = transfer_dir(&src, &dst, TargetVersion::PY38, BatchPolicy::Abort).unwrap();
  assert!(report.is_success());
  assert_eq!(report.transferred, vec![
    src.join("pkg/__init__.py"),
    src.join("pkg/generic.py"),
  ]);
  assert_eq!(fs::read_to_string(dst.join("pkg/__init__.py")).unwrap(), "");
  assert!(fs::read_to_string(dst.join("pkg/generic.py"))
    .unwrap()
    .contains("def __wrapper_func_ident():"));
  assert!(!dst.join("README.md").exists());
}

#[test]
fn abort_stops_at_first_failure() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("src");
  let dst = dir.path().join("dst");
  write(&src.join("a.py"), GENERIC);
  write(&src.join("b.py"), UNSUPPORTED);
  write(&src.join("c.py"), GENERIC);

  let err = transfer_dir(&src, &dst, TargetVersion::PY38, BatchPolicy::default()).unwrap_err();
  match err {
    TransferError::InFile { path, source } => {
      assert_eq!(path, src.join("b.py"));
      assert!(matches!(*source, TransferError::Lower(_)));
    }
    other => panic!("expected a per-file error, got {other:?}"),
  };
  assert!(dst.join("a.py").exists());
  assert!(!dst.join("b.py").exists());
  assert!(!dst.join("c.py").exists());
}

#[test]
fn continue_records_failures() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("src");
  let dst = dir.path().join("dst");
  write(&src.join("a.py"), GENERIC);
  write(&src.join("b.py"), UNSUPPORTED);
  write(&src.join("c.py"), GENERIC);

  let report = transfer_dir(&src, &dst, TargetVersion::PY38, BatchPolicy::Continue).unwrap();
  assert!(!report.is_success());
  assert_eq!(report.transferred, vec![src.join("a.py"), src.join("c.py")]);
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].0, src.join("b.py"));
  assert!(dst.join("c.py").exists());
  assert!(!dst.join("b.py").exists());
}

#[test]
fn missing_directory_is_an_error() {
  let dir = tempdir().unwrap();
  let err = transfer_dir(
    &dir.path().join("nope"),
    &dir.path().join("dst"),
    TargetVersion::PY38,
    BatchPolicy::Abort,
  )
  .unwrap_err();
  assert!(matches!(err, TransferError::Io { .. }));
}
