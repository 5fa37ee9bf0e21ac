use backport_py::watch::ChangeKind;
use backport_py::watch::Watcher;
use backport_py::TargetVersion;
use backport_py::WatchSession;
use std::cell::Cell;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn kinds(changes: &[backport_py::watch::Change]) -> Vec<ChangeKind> {
  changes.iter().map(|c| c.kind).collect()
}

#[test]
fn watcher_reports_changes() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("a.py");
  let mut watcher = Watcher::dir(dir.path());
  assert!(watcher.poll().unwrap().is_empty());

  fs::write(&path, "x = 1\n").unwrap();
  fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
  let changes = watcher.poll().unwrap();
  assert_eq!(kinds(&changes), vec![ChangeKind::Created]);
  assert_eq!(changes[0].path, path);
  assert!(watcher.poll().unwrap().is_empty());

  fs::write(&path, "x = 22\n").unwrap();
  assert_eq!(kinds(&watcher.poll().unwrap()), vec![ChangeKind::Modified]);

  fs::remove_file(&path).unwrap();
  assert_eq!(kinds(&watcher.poll().unwrap()), vec![ChangeKind::Removed]);
  assert!(watcher.poll().unwrap().is_empty());
}

#[test]
fn file_session_mirrors_source() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("a.py");
  let dst = dir.path().join("out/a.py");
  fs::write(&src, "print(f\"{x}\")\n").unwrap();

  let mut session = WatchSession::file(&src, &dst, TargetVersion::PY38);
  assert_eq!(kinds(&session.step().unwrap()), vec![ChangeKind::Created]);
  assert_eq!(fs::read_to_string(&dst).unwrap(), "print(\"{:}\".format(x))\n");

  fs::write(&src, "print(f\"{x!r}\")\n").unwrap();
  assert_eq!(kinds(&session.step().unwrap()), vec![ChangeKind::Modified]);
  assert_eq!(fs::read_to_string(&dst).unwrap(), "print(\"{!r:}\".format(x))\n");

  fs::remove_file(&src).unwrap();
  assert_eq!(kinds(&session.step().unwrap()), vec![ChangeKind::Removed]);
  assert!(!dst.exists());
}

#[test]
fn dir_session_survives_failures() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("src");
  let dst = dir.path().join("dst");
  fs::create_dir_all(src.join("pkg")).unwrap();
  fs::write(src.join("pkg/good.py"), "x: int | None = None\n").unwrap();
  fs::write(src.join("pkg/bad.py"), "match x:\n    case [a]:\n        pass\n").unwrap();

  let mut session = WatchSession::dir(&src, &dst, TargetVersion::PY38);
  let changes = session.step().unwrap();
  assert_eq!(changes.len(), 2);
  assert!(dst.join("pkg/good.py").exists());
  assert!(!dst.join("pkg/bad.py").exists());

  fs::write(src.join("pkg/bad.py"), "y = 1\n").unwrap();
  session.step().unwrap();
  assert_eq!(fs::read_to_string(dst.join("pkg/bad.py")).unwrap(), "y = 1\n");
}

#[test]
fn run_stops_when_asked() {
  let dir = tempdir().unwrap();
  let src = dir.path().join("a.py");
  let dst = dir.path().join("b.py");
  fs::write(&src, "x = 1\n").unwrap();

  let polls = Cell::new(0);
  let mut session = WatchSession::file(&src, &dst, TargetVersion::PY38);
  session
    .run(Duration::from_millis(1), || {
      polls.set(polls.get() + 1);
      polls.get() > 3
    })
    .unwrap();
  assert_eq!(polls.get(), 4);
  assert_eq!(fs::read_to_string(&dst).unwrap(), "x = 1\n");
}
