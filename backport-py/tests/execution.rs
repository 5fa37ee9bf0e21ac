//! Runs source before and after backporting under the local `python3` and compares what each prints. Skipped when no interpreter is on the path.
use backport_py::transfer;
use std::process::Command;

fn python_version() -> Option<(u32, u32)> {
  let out = Command::new("python3")
    .args(["-c", "import sys; print(*sys.version_info[:2])"])
    .output()
    .ok()?;
  if !out.status.success() {
    return None;
  };
  let text = String::from_utf8(out.stdout).ok()?;
  let mut parts = text.split_whitespace();
  let major = parts.next()?.parse::<u32>().ok()?;
  let minor = parts.next()?.parse::<u32>().ok()?;
  Some((major, minor))
}

#[track_caller]
fn run_python(source: &str) -> String {
  let out = Command::new("python3").args(["-c", source]).output().unwrap();
  assert!(
    out.status.success(),
    "python3 failed on:\n{source}\n{}",
    String::from_utf8_lossy(&out.stderr)
  );
  String::from_utf8(out.stdout).unwrap()
}

/// The backported source always runs; the original only where the interpreter is at least `needs`.
#[track_caller]
fn assert_runs_same(source: &str, needs: (u32, u32), expected: &str) {
  let Some(version) = python_version() else {
    eprintln!("skipping execution check: python3 not available");
    return;
  };
  let lowered = transfer(source, "3.8").unwrap();
  assert_eq!(run_python(&lowered), expected, "backported:\n{lowered}");
  if version >= needs {
    assert_eq!(run_python(source), expected, "original:\n{source}");
  };
}

#[test]
fn match_takes_first_matching_case() {
  assert_runs_same(
    concat!(
      "def pick(v):\n",
      "    match v:\n",
      "        case \"a\":\n",
      "            return 1\n",
      "        case \"b\":\n",
      "            return 2\n",
      "        case _:\n",
      "            return 3\n",
      "print(pick(\"a\"))\n",
      "print(pick(\"b\"))\n",
      "print(pick(\"z\"))\n",
    ),
    (3, 10),
    "1\n2\n3\n",
  );
}

#[test]
fn match_class_patterns() {
  assert_runs_same(
    concat!(
      "class Point:\n",
      "    def __init__(self, x, y):\n",
      "        self.x = x\n",
      "        self.y = y\n",
      "def where(p):\n",
      "    match p:\n",
      "        case Point(x=0, y=0):\n",
      "            return \"origin\"\n",
      "        case Point(x=0):\n",
      "            return \"y-axis\"\n",
      "        case None:\n",
      "            return \"nowhere\"\n",
      "        case _:\n",
      "            return \"elsewhere\"\n",
      "for p in [Point(0, 0), Point(0, 5), None, Point(1, 1)]:\n",
      "    print(where(p))\n",
    ),
    (3, 10),
    "origin\ny-axis\nnowhere\nelsewhere\n",
  );
}

#[test]
fn generic_class_methods_see_class_params() {
  assert_runs_same(
    concat!(
      "from typing import cast\n",
      "\n",
      "class Box[T: int]:\n",
      "    def __init__(self, item: T) -> None:\n",
      "        self.item = item\n",
      "\n",
      "    def get(self) -> T:\n",
      "        return cast(T, self.item)\n",
      "\n",
      "print(Box[int](5).get())\n",
    ),
    (3, 12),
    "5\n",
  );
}

#[test]
fn generic_method_body_sees_its_params() {
  assert_runs_same(
    concat!(
      "from typing import cast\n",
      "\n",
      "class A:\n",
      "    def f[T](self, x: T) -> T:\n",
      "        return cast(T, x)\n",
      "\n",
      "print(A().f(3))\n",
    ),
    (3, 12),
    "3\n",
  );
}

#[test]
fn generic_class_with_generic_method() {
  assert_runs_same(
    concat!(
      "from typing import Tuple\n",
      "\n",
      "class Test[T: int]:\n",
      "    def test[P: str](self, x: T, y: P) -> Tuple[T, P]:\n",
      "        return x, y\n",
      "\n",
      "print(Test[int]().test(1, \"a\"))\n",
    ),
    (3, 12),
    "(1, 'a')\n",
  );
}

#[test]
fn fstrings_and_unions() {
  assert_runs_same(
    concat!(
      "x = 3.14159\n",
      "name = \"pi\"\n",
      "print(f\"{name!r:>6}={x:.2f} {x=:.1f}\")\n",
      "print(isinstance(x, int | float))\n",
      "def f(v: int | None = None) -> str | None:\n",
      "    return f\"{v}\"\n",
      "print(f(), f(2))\n",
    ),
    (3, 10),
    "  'pi'=3.14 x=3.1\nTrue\nNone 2\n",
  );
}
