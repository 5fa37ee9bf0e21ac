use super::fstring::lower_fstrings;
use super::match_stmt::lower_matches;
use super::type_params::lower_type_params;
use super::union::flatten_union;
use super::union::lower_unions;
use crate::err::LowerResult;
use crate::imports::ImportRequests;
use parse_py::ast::node::Node;
use parse_py::ast::stmt::Module;
use parse_py::ast::stmt::SmallStmt;
use parse_py::ast::stmt::Stmt;
use parse_py::parse;
use parse_py::print;
use parse_py::print::print_tokens;

type Pass = fn(Node<Module>, &mut ImportRequests) -> LowerResult<Node<Module>>;

fn run(pass: Pass, src: &str) -> LowerResult<(String, ImportRequests)> {
  let module = parse(src).unwrap();
  let mut requests = ImportRequests::new();
  let module = pass(module, &mut requests)?;
  Ok((print(&module), requests))
}

#[track_caller]
fn assert_lowers(pass: Pass, src: &str, expected: &str) -> ImportRequests {
  let (actual, requests) = run(pass, src).unwrap();
  if actual != expected {
    let diff = similar::TextDiff::from_lines(expected, actual.as_str());
    panic!(
      "lowered source differs:\n{}",
      diff.unified_diff().header("expected", "actual")
    );
  };
  requests
}

#[track_caller]
fn assert_unsupported(pass: Pass, src: &str) {
  let err = run(pass, src).unwrap_err();
  assert!(err.is_unsupported(), "expected an unsupported construct, got {err}");
}

#[test]
fn test_match_literals_and_wildcard() {
  let requests = assert_lowers(
    lower_matches,
    "match x:\n    case 1:\n        a()\n    case \"s\":\n        b()\n    case None:\n        c()\n    case _:\n        d()\n",
    "if x == 1:\n    a()\nelif x == \"s\":\n    b()\nelif x is None:\n    c()\nelse:\n    d()\n",
  );
  assert!(requests.is_empty());
}

#[test]
fn test_match_class_patterns() {
  assert_lowers(
    lower_matches,
    "match p:\n    case Point(x=0, y=_):\n        origin()\n    case Point():\n        other()\n",
    "if isinstance(p, Point) and p.x == 0:\n    origin()\nelif isinstance(p, Point):\n    other()\n",
  );
}

#[test]
fn test_match_capture_compares() {
  assert_lowers(
    lower_matches,
    "match x:\n    case y:\n        a()\n",
    "if x == y:\n    a()\n",
  );
}

#[test]
fn test_match_parenthesizes_loose_subjects() {
  assert_lowers(
    lower_matches,
    "match a or b:\n    case 1:\n        pass\n",
    "if (a or b) == 1:\n    pass\n",
  );
}

#[test]
fn test_match_lone_wildcard_splices_body() {
  assert_lowers(
    lower_matches,
    "def f(x):\n    match x:\n        case _:\n            return 1\n",
    "def f(x):\n    return 1\n",
  );
}

#[test]
fn test_match_keeps_leading_comments() {
  assert_lowers(
    lower_matches,
    "x = 1\n\n# dispatch\nmatch x:\n    case 1:\n        pass\n",
    "x = 1\n\n# dispatch\nif x == 1:\n    pass\n",
  );
}

#[test]
fn test_match_nested_in_case_body() {
  assert_lowers(
    lower_matches,
    "match x:\n    case 1:\n        match y:\n            case 2:\n                pass\n",
    "if x == 1:\n    if y == 2:\n        pass\n",
  );
}

#[test]
fn test_match_rejects_unsupported_patterns() {
  assert_unsupported(lower_matches, "match x:\n    case 1 if y:\n        pass\n");
  assert_unsupported(lower_matches, "match x:\n    case 1 | 2:\n        pass\n");
  assert_unsupported(lower_matches, "match x:\n    case [a, b]:\n        pass\n");
  assert_unsupported(lower_matches, "match x:\n    case {\"k\": v}:\n        pass\n");
  assert_unsupported(lower_matches, "match x:\n    case P(a):\n        pass\n");
  assert_unsupported(lower_matches, "match x:\n    case P(a=b):\n        pass\n");
  assert_unsupported(
    lower_matches,
    "match x:\n    case _:\n        pass\n    case 1:\n        pass\n",
  );
}

#[test]
fn test_flatten_union_operands() {
  let module = parse("x = a | b | (c | d)\n").unwrap();
  let Stmt::Simple(line) = module.stx.body[0].stx.as_ref() else {
    panic!("expected simple statement");
  };
  let SmallStmt::Assign(assign) = &line.stx.body[0].stx.stmt else {
    panic!("expected assignment");
  };
  let operands: Vec<String> = flatten_union(&assign.stx.value)
    .unwrap()
    .iter()
    .map(|e| print_tokens(e).trim().to_string())
    .collect();
  assert_eq!(operands, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_union_in_annotations() {
  let requests = assert_lowers(
    lower_unions,
    "def f(x: int | None) -> str | bytes:\n    y: (a | b) | c = 1\n    return x\n",
    "def f(x: Union[int, None]) -> Union[str, bytes]:\n    y: Union[a, b, c] = 1\n    return x\n",
  );
  assert!(requests.contains("typing", "Union"));
}

#[test]
fn test_union_in_class_checks() {
  let requests = assert_lowers(
    lower_unions,
    "ok = isinstance(x, int | str) and issubclass(t, A | B | C)\n",
    "ok = isinstance(x, (int, str)) and issubclass(t, (A, B, C))\n",
  );
  assert!(requests.is_empty());
}

#[test]
fn test_union_in_explicit_alias() {
  assert_lowers(
    lower_unions,
    "X: TypeAlias = int | str\nY: typing.TypeAlias = bytes | None\n",
    "X: TypeAlias = Union[int, str]\nY: typing.TypeAlias = Union[bytes, None]\n",
  );
}

#[test]
fn test_union_leaves_other_positions_alone() {
  let source = "flags = a | b\nx: list[int | str] = []\nisinstance(x, int, y | z)\n";
  assert_lowers(lower_unions, source, source);
}

#[test]
fn test_fstring_fields() {
  assert_lowers(
    lower_fstrings,
    "x = f\"a{b}c{d!r:>10}\"\n",
    "x = \"a{:}c{!r:>10}\".format(b, d)\n",
  );
}

#[test]
fn test_fstring_self_documenting_fields() {
  assert_lowers(lower_fstrings, "f\"{x=}\"\n", "\"x={!r:}\".format(x)\n");
  assert_lowers(lower_fstrings, "f\"{x = }\"\n", "\"x = {!r:}\".format(x)\n");
  assert_lowers(lower_fstrings, "f\"{x=:.2f}\"\n", "\"x={:.2f}\".format(x)\n");
  assert_lowers(lower_fstrings, "f\"{x=!s}\"\n", "\"x={!s:}\".format(x)\n");
  assert_lowers(
    lower_fstrings,
    "f\"{d['k']=}\"\n",
    "\"d['k']={!r:}\".format(d['k'])\n",
  );
}

#[test]
fn test_fstring_without_fields_is_a_plain_literal() {
  assert_lowers(lower_fstrings, "s = f'{{a}}'\n", "s = '{a}'\n");
  assert_lowers(lower_fstrings, "s = F\"\"\n", "s = \"\"\n");
}

#[test]
fn test_fstring_prefixes_and_quotes() {
  assert_lowers(lower_fstrings, "p = rf'\\d{n}'\n", "p = r'\\d{:}'.format(n)\n");
  assert_lowers(
    lower_fstrings,
    "s = f\"\"\"a\n{b}\"\"\"\n",
    "s = \"\"\"a\n{:}\"\"\".format(b)\n",
  );
}

#[test]
fn test_fstring_nested_spec_field_is_unsupported() {
  assert_unsupported(lower_fstrings, "f\"{x:{w}}\"\n");
  assert_unsupported(lower_fstrings, "f\"{x:>{w}.{p}f}\"\n");
}

#[test]
fn test_fstring_nested_fstring_in_field() {
  assert_lowers(
    lower_fstrings,
    "f\"<{f'{x}'}>\"\n",
    "\"<{:}>\".format('{:}'.format(x))\n",
  );
}

#[test]
fn test_fstring_parenthesizes_tuple_fields() {
  assert_lowers(lower_fstrings, "f\"{a, b}\"\n", "\"{:}\".format((a, b))\n");
}

#[test]
fn test_fstring_concatenation() {
  assert_lowers(
    lower_fstrings,
    "s = \"a\" 'b' f\"{c}\"\n",
    "s = (\"a\" 'b' + \"{:}\".format(c))\n",
  );
  assert_lowers(lower_fstrings, "s = \"a\" f\"b\"\n", "s = \"a\" \"b\"\n");
}

#[test]
fn test_generic_function_is_wrapped() {
  let requests = assert_lowers(
    lower_type_params,
    "def test[T: int](x: T) -> T:\n    return x\n",
    "def __wrapper_func_test():\n    __test_T = TypeVar(\"__test_T\", bound=int)\n    def test(x: __test_T) -> __test_T:\n        return x\n    return test\ntest = __wrapper_func_test()\n",
  );
  assert_eq!(requests.iter().collect::<Vec<_>>(), vec![("typing", "TypeVar")]);
}

#[test]
fn test_type_param_kinds() {
  let requests = assert_lowers(
    lower_type_params,
    "def f[T: (int, str), *Ts, **P, U: int | None](x: T) -> T:\n    return x\n",
    "def __wrapper_func_f():\n    __f_T = TypeVar(\"__f_T\", int, str)\n    __f_Ts = TypeVarTuple(\"__f_Ts\")\n    __f_P = ParamSpec(\"__f_P\")\n    __f_U = TypeVar(\"__f_U\", bound=Union[int, None])\n    def f(x: __f_T) -> __f_T:\n        return x\n    return f\nf = __wrapper_func_f()\n",
  );
  for name in ["TypeVar", "TypeVarTuple", "ParamSpec", "Union"] {
    assert!(requests.contains("typing", name), "missing {name}");
  }
}

#[test]
fn test_type_param_defaults() {
  assert_lowers(
    lower_type_params,
    "def f[T = int](x: T) -> T:\n    return x\n",
    "def __wrapper_func_f():\n    __f_T = TypeVar(\"__f_T\", default=int)\n    def f(x: __f_T) -> __f_T:\n        return x\n    return f\nf = __wrapper_func_f()\n",
  );
}

#[test]
fn test_generic_class_and_method() {
  let requests = assert_lowers(
    lower_type_params,
    "class Test[T: int]:\n    def test[P: str](self, x: T, y: P) -> tuple[T, P]:\n        return x, y\n",
    "__Test_T = TypeVar(\"__Test_T\", bound=int)\n_Test__Test_T = __Test_T\nclass Test(Generic[__Test_T]):\n    __Test_test_P = TypeVar(\"__Test_test_P\", bound=str)\n    def test(self, x: __Test_T, y: __Test_test_P) -> tuple[__Test_T, __Test_test_P]:\n        return x, y\n",
  );
  assert_eq!(
    requests.iter().collect::<Vec<_>>(),
    vec![("typing", "TypeVar"), ("typing", "Generic")]
  );
}

#[test]
fn test_method_body_declares_its_type_vars() {
  assert_lowers(
    lower_type_params,
    "class A:\n    def f[T](self, x: T) -> T:\n        \"\"\"Doc.\"\"\"\n        return cast(T, x)\n",
    "class A:\n    __A_f_T = TypeVar(\"__A_f_T\")\n    def f(self, x: __A_f_T) -> __A_f_T:\n        \"\"\"Doc.\"\"\"\n        __A_f_T = TypeVar(\"__A_f_T\")\n        return cast(__A_f_T, x)\n",
  );
  // A body on the `def` line moves into a block.
  assert_lowers(
    lower_type_params,
    "class A:\n    def f[T](self, x: T) -> T: return cast(T, x)\n",
    "class A:\n    __A_f_T = TypeVar(\"__A_f_T\")\n    def f(self, x: __A_f_T) -> __A_f_T:\n        __A_f_T = TypeVar(\"__A_f_T\")\n        return cast(__A_f_T, x)\n",
  );
}

#[test]
fn test_class_params_bound_under_mangled_name() {
  // Only parameters the class body uses are rebound.
  assert_lowers(
    lower_type_params,
    "class Box[T, U]:\n    item: T\n",
    "__Box_T = TypeVar(\"__Box_T\")\n__Box_U = TypeVar(\"__Box_U\")\n_Box__Box_T = __Box_T\nclass Box(Generic[__Box_T, __Box_U]):\n    item: __Box_T\n",
  );
  // A class named only with underscores mangles nothing.
  assert_lowers(
    lower_type_params,
    "class __[T]:\n    item: T\n",
    "____T = TypeVar(\"____T\")\nclass __(Generic[____T]):\n    item: ____T\n",
  );
}

#[test]
fn test_generic_base_goes_before_keywords() {
  assert_lowers(
    lower_type_params,
    "class C[T](Base, metaclass=M):\n    pass\n",
    "__C_T = TypeVar(\"__C_T\")\nclass C(Base, Generic[__C_T], metaclass=M):\n    pass\n",
  );
  assert_lowers(
    lower_type_params,
    "class C[*Ts](metaclass=M):\n    pass\n",
    "__C_Ts = TypeVarTuple(\"__C_Ts\")\nclass C(Generic[Unpack[__C_Ts]], metaclass=M):\n    pass\n",
  );
}

#[test]
fn test_renaming_follows_scopes() {
  assert_lowers(
    lower_type_params,
    "def f[T](x: T) -> T:\n    def g(T):\n        return T\n    return g(x)\n",
    "def __wrapper_func_f():\n    __f_T = TypeVar(\"__f_T\")\n    def f(x: __f_T) -> __f_T:\n        def g(T):\n            return T\n        return g(x)\n    return f\nf = __wrapper_func_f()\n",
  );
}

#[test]
fn test_fresh_names_avoid_collisions() {
  assert_lowers(
    lower_type_params,
    "__f_T = 1\ndef f[T](x: T):\n    return x\n",
    "__f_T = 1\ndef __wrapper_func_f():\n    __f_T_1 = TypeVar(\"__f_T_1\")\n    def f(x: __f_T_1):\n        return x\n    return f\nf = __wrapper_func_f()\n",
  );
}

#[test]
fn test_type_aliases() {
  assert_lowers(
    lower_type_params,
    "type Pair[T] = tuple[T, T]\n",
    "__Pair_T = TypeVar(\"__Pair_T\")\nPair = tuple[__Pair_T, __Pair_T]\n",
  );
  let requests = assert_lowers(lower_type_params, "type N = int | None\n", "N = Union[int, None]\n");
  assert!(requests.contains("typing", "Union"));
  assert_lowers(
    lower_type_params,
    "x = 1; type A = int; y = 2  # c\n",
    "x = 1\nA = int\ny = 2  # c\n",
  );
}

#[test]
fn test_type_alias_in_single_line_block_is_unsupported() {
  assert_unsupported(lower_type_params, "if x: type A = int\n");
}

#[test]
fn test_passes_leave_plain_code_alone() {
  let source = "import os\n\n\nclass A(B):\n    def f(self, x: int) -> str:\n        return \"%s\" % x\n";
  for pass in [lower_matches, lower_type_params, lower_unions, lower_fstrings] {
    assert_lowers(pass, source, source);
  }
}
