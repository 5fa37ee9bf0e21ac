use super::print_tokens;
use crate::ast::stmt::Stmt;
use crate::ast::stmt::Suite;
use crate::parse;
use crate::print;

#[track_caller]
fn assert_round_trip(src: &str) {
  let module = parse(src).unwrap();
  let printed = print(&module);
  if printed != src {
    let diff = similar::TextDiff::from_lines(src, printed.as_str());
    panic!(
      "printed source differs:\n{}",
      diff.unified_diff().header("source", "printed")
    );
  }
}

#[test]
fn test_round_trip_simple_statements() {
  assert_round_trip("x = 1\n");
  assert_round_trip("x  =  y = (1 ,2)   # comment\n");
  assert_round_trip("a += 1; b -= 2 ;\n");
  assert_round_trip("import os.path as p, sys\nfrom . import (a as b,\n  c,)\nfrom ..x.y import *\n");
  assert_round_trip("del a[0], b.c\nglobal g, h\nassert x, 'msg'\nraise E from e\n");
  assert_round_trip("return\n");
  assert_round_trip("x: int = 5\ny: list[int]\n");
  assert_round_trip("type A[T] = dict[str, T]\n");
  assert_round_trip("value = a if b else c\nf = lambda x, *a, k=1, **kw: x\n");
}

#[test]
fn test_round_trip_expressions() {
  assert_round_trip("x = [i * 2 for i in range(10) if i % 2]\n");
  assert_round_trip("x = {k: v for k, v in items}\ny = {a, *b}\nz = {**a, 'b': 1}\n");
  assert_round_trip("x = a[1:2, ::3, ...]\ny = not a and b or c is not d\n");
  assert_round_trip("x = (yield)\nprint(*args, sep='', **kw)\n");
  assert_round_trip("if (n := len(a)) > 10: pass\n");
  assert_round_trip("x = 'a' \"b\" f'c{d}'\n");
  assert_round_trip("x = -a ** -b @ c // d\n");
  assert_round_trip("result = await f() if x else (y for y in z)\n");
}

#[test]
fn test_round_trip_fstrings() {
  assert_round_trip("f\"{x!r:>{width}.{precision}}\"\n");
  assert_round_trip("f'{x=}' f\"{ y = !s}\" rf'\\d{z}'\n");
  assert_round_trip("f'''multi\n{line}\nstring'''\n");
  assert_round_trip("f'{{literal}} {a[\"key\"]}'\n");
}

#[test]
fn test_round_trip_compound_statements() {
  assert_round_trip(
    "\
@decorator
@other(1)

class A(Base, metaclass=M):
    \"\"\"Doc.\"\"\"

    def f(self, a: int = 1, /, *, b) -> None:
        if a:
            pass
        elif b:  # comment
            return 1
        else:
            return 2

    async def g(self):
        async with a as b, c:
            async for x in y:
                await x
",
  );
  assert_round_trip(
    "\
try:
    x
except* (A, B) as e:
    pass
except C:
    pass
else:
    y
finally:
    z
while x:
    break
else:
    continue
with (
    open(a) as f,
    open(b) as g,
):
    pass
",
  );
}

#[test]
fn test_round_trip_match() {
  assert_round_trip(
    "\
match command.split():
    case [action]:
        pass
    case [\"go\", direction] | [\"move\", direction]:
        pass
    case Point(x=0, y=0) if flag:
        pass
    case {\"x\": 1, **rest}:
        pass
    case -1 | 1.5 | 2+3j | None:
        pass
    case _:
        pass
",
  );
}

#[test]
fn test_round_trip_trivia() {
  assert_round_trip("\u{feff}x = 1\n");
  assert_round_trip("x = 1\r\ny = 2\r\n");
  assert_round_trip("x = 1");
  assert_round_trip("# header\n\nx = (1,\n     # inside\n     2)\n\n\n# footer\n");
  assert_round_trip("x = 1 + \\\n    2\n");
  assert_round_trip("if a:\n\tb\n\tif c:\n\t\td\n");
  assert_round_trip("def f():\n    x\n    # trailing\n\n# top\ny\n");
  assert_round_trip("def f(): return 1\n");
  assert_round_trip("if a:\n    b\n# dedented comment\n    # indented comment\nelse:\n    c\n");
}

#[test]
fn test_empty_block_prints_pass() {
  let mut module = parse("if a:\n    b\nc\n").unwrap();
  let Stmt::If(stmt) = module.stx.body[0].stx.as_mut() else {
    panic!("expected if");
  };
  let Suite::Block(block) = &mut stmt.stx.body else {
    panic!("expected block");
  };
  block.stx.body.clear();
  assert_eq!(print(&module), "if a:\n    pass\nc\n");
}

#[test]
fn test_statement_moved_after_eof_line() {
  let mut module = parse("a = 1\nb = 2").unwrap();
  module.stx.body.swap(0, 1);
  assert_eq!(print(&module), "b = 2\na = 1\n");
}

#[test]
fn test_print_tokens() {
  let module = parse("x = foo( a ,b )\n").unwrap();
  let Stmt::Simple(line) = module.stx.body[0].stx.as_ref() else {
    panic!("expected simple statement");
  };
  assert_eq!(print_tokens(&line.stx.body), "x = foo( a ,b )");
}
