//! Constructors for generated code. Every node gets a fresh identity and canonical whitespace: no space after an opening bracket, `, ` between elements, a single space around binary operators and after keywords.

use crate::ast::expr::*;
use crate::ast::node::Node;
use crate::ast::stmt::*;
use crate::ast::trivia::Leaf;
use crate::ast::trivia::Newline;
use crate::loc::Loc;
use crate::operator::OperatorName;
use derive_visitor::DriveMut;
use derive_visitor::VisitorMut;

#[derive(VisitorMut)]
#[visitor(Leaf(enter))]
struct FirstLeafWs<'a> {
  ws: &'a str,
  done: bool,
}

impl<'a> FirstLeafWs<'a> {
  fn enter_leaf(&mut self, leaf: &mut Leaf) {
    if !self.done {
      leaf.ws = self.ws.to_string();
      self.done = true;
    };
  }
}

/// Replaces the whitespace before the first token of `node`.
pub fn set_leading_ws<T: DriveMut>(node: &mut T, ws: &str) {
  node.drive_mut(&mut FirstLeafWs { ws, done: false });
}

/// Returns `node` with the whitespace before its first token replaced.
pub fn with_leading_ws<T: DriveMut>(mut node: T, ws: &str) -> T {
  set_leading_ws(&mut node, ws);
  node
}

pub fn name(loc: Loc, text: impl Into<String>) -> Node<Name> {
  Node::new(loc, Name {
    value: Leaf::bare(text),
  })
}

pub fn name_expr(loc: Loc, text: impl Into<String>) -> Node<Expr> {
  Node::new(loc, Expr::Name(name(loc, text)))
}

/// A string literal from its raw source text, including prefix and quotes.
pub fn raw_string(loc: Loc, raw: impl Into<String>) -> Node<Expr> {
  Node::new(
    loc,
    Expr::Str(Node::new(loc, StrExpr {
      value: Leaf::bare(raw),
    })),
  )
}

/// A double-quoted string literal holding `value`.
pub fn string(loc: Loc, value: &str) -> Node<Expr> {
  let mut raw = String::with_capacity(value.len() + 2);
  raw.push('"');
  for c in value.chars() {
    match c {
      '"' => raw.push_str("\\\""),
      '\\' => raw.push_str("\\\\"),
      '\n' => raw.push_str("\\n"),
      '\r' => raw.push_str("\\r"),
      '\t' => raw.push_str("\\t"),
      c => raw.push(c),
    };
  }
  raw.push('"');
  raw_string(loc, raw)
}

/// Wraps `expr` in parentheses when it binds more loosely than `min_prec`.
pub fn paren_below(expr: Node<Expr>, min_prec: u8) -> Node<Expr> {
  if expr.stx.precedence() >= min_prec {
    return expr;
  };
  paren(expr)
}

pub fn paren(expr: Node<Expr>) -> Node<Expr> {
  let loc = expr.loc;
  let mut inner = expr;
  let ws = take_leading_ws(&mut inner);
  Node::new(
    loc,
    Expr::Paren(Node::new(loc, ParenExpr {
      lpar: Leaf::new(ws, "("),
      inner,
      rpar: Leaf::bare(")"),
    })),
  )
}

#[derive(VisitorMut)]
#[visitor(Leaf(enter))]
struct TakeFirstLeafWs {
  ws: Option<String>,
}

impl TakeFirstLeafWs {
  fn enter_leaf(&mut self, leaf: &mut Leaf) {
    if self.ws.is_none() {
      self.ws = Some(std::mem::take(&mut leaf.ws));
    };
  }
}

/// Removes and returns the whitespace before the first token of `node`.
pub fn take_leading_ws<T: DriveMut>(node: &mut T) -> String {
  let mut visitor = TakeFirstLeafWs { ws: None };
  node.drive_mut(&mut visitor);
  visitor.ws.unwrap_or_default()
}

pub fn attribute(loc: Loc, value: Node<Expr>, attr: &str) -> Node<Expr> {
  Node::new(
    loc,
    Expr::Attribute(Node::new(loc, AttributeExpr {
      value: paren_below(value, crate::operator::PRECEDENCE_PRIMARY),
      dot: Leaf::bare("."),
      attr: name(loc, attr),
    })),
  )
}

/// A positional argument. Commas are filled in by [`call`].
pub fn arg(value: Node<Expr>) -> Node<Arg> {
  Node::new(value.loc, Arg {
    star: None,
    keyword: None,
    value,
    comma: None,
  })
}

pub fn keyword_arg(loc: Loc, key: &str, value: Node<Expr>) -> Node<Arg> {
  Node::new(loc, Arg {
    star: None,
    keyword: Some(Node::new(loc, ArgKeyword {
      name: name(loc, key),
      equal: Leaf::bare("="),
    })),
    value: with_leading_ws(value, ""),
    comma: None,
  })
}

pub fn call(loc: Loc, func: Node<Expr>, args: Vec<Node<Arg>>) -> Node<Expr> {
  let count = args.len();
  let args = args
    .into_iter()
    .enumerate()
    .map(|(i, mut a)| {
      set_leading_ws(&mut a, if i == 0 { "" } else { " " });
      a.stx.comma = (i + 1 < count).then(|| Leaf::bare(","));
      a
    })
    .collect();
  Node::new(
    loc,
    Expr::Call(Node::new(loc, CallExpr {
      func: paren_below(func, crate::operator::PRECEDENCE_PRIMARY),
      lpar: Leaf::bare("("),
      args,
      rpar: Leaf::bare(")"),
    })),
  )
}

/// Comma-separated elements with canonical spacing. A single element of a tuple keeps its trailing comma.
fn elements(values: Vec<Node<Expr>>, trailing_single: bool) -> Vec<Node<Element>> {
  let count = values.len();
  values
    .into_iter()
    .enumerate()
    .map(|(i, value)| {
      let value = with_leading_ws(value, if i == 0 { "" } else { " " });
      let comma = (i + 1 < count || (trailing_single && count == 1)).then(|| Leaf::bare(","));
      Node::new(value.loc, Element { value, comma })
    })
    .collect()
}

pub fn subscript(loc: Loc, value: Node<Expr>, slices: Vec<Node<Expr>>) -> Node<Expr> {
  let count = slices.len();
  let slices = slices
    .into_iter()
    .enumerate()
    .map(|(i, value)| {
      let value = with_leading_ws(value, if i == 0 { "" } else { " " });
      let slice_loc = value.loc;
      Node::new(slice_loc, SubscriptElement {
        slice: Slice::Index(Node::new(slice_loc, SliceIndex { value })),
        comma: (i + 1 < count).then(|| Leaf::bare(",")),
      })
    })
    .collect();
  Node::new(
    loc,
    Expr::Subscript(Node::new(loc, SubscriptExpr {
      value: paren_below(value, crate::operator::PRECEDENCE_PRIMARY),
      lbracket: Leaf::bare("["),
      slices,
      rbracket: Leaf::bare("]"),
    })),
  )
}

/// A parenthesized tuple.
pub fn tuple(loc: Loc, values: Vec<Node<Expr>>) -> Node<Expr> {
  Node::new(
    loc,
    Expr::Tuple(Node::new(loc, TupleExpr {
      lpar: Some(Leaf::bare("(")),
      elements: elements(values, true),
      rpar: Some(Leaf::bare(")")),
    })),
  )
}

/// `left <op> right` for a single comparison operator such as `==` or `is`.
pub fn compare(loc: Loc, left: Node<Expr>, operator: OperatorName, right: Node<Expr>) -> Node<Expr> {
  let op = operator.text().split(' ').map(Leaf::spaced).collect();
  let operand_prec = crate::operator::PRECEDENCE_COMPARISON + 1;
  let left = with_leading_ws(paren_below(left, operand_prec), "");
  let right = with_leading_ws(paren_below(right, operand_prec), " ");
  Node::new(
    loc,
    Expr::Comparison(Node::new(loc, ComparisonExpr {
      left,
      comparisons: vec![Node::new(loc, ComparisonTarget {
        operator,
        op,
        comparator: right,
      })],
    })),
  )
}

/// `left and right`.
pub fn and(loc: Loc, left: Node<Expr>, right: Node<Expr>) -> Node<Expr> {
  binary(loc, left, OperatorName::And, right)
}

/// A left-associative binary operation, parenthesizing operands as needed.
pub fn binary(loc: Loc, left: Node<Expr>, operator: OperatorName, right: Node<Expr>) -> Node<Expr> {
  let prec = operator.precedence();
  let left = with_leading_ws(paren_below(left, prec), "");
  let right = with_leading_ws(paren_below(right, prec + 1), " ");
  Node::new(
    loc,
    Expr::Binary(Node::new(loc, BinaryExpr {
      left,
      operator,
      op: Leaf::spaced(operator.text()),
      right,
    })),
  )
}

pub fn simple_line(loc: Loc, stmts: Vec<SmallStmt>) -> Node<Stmt> {
  let count = stmts.len();
  let body = stmts
    .into_iter()
    .enumerate()
    .map(|(i, mut stmt)| {
      set_leading_ws(&mut stmt, if i == 0 { "" } else { " " });
      Node::new(loc, SmallStmtItem {
        stmt,
        semicolon: (i + 1 < count).then(|| Leaf::bare(";")),
      })
    })
    .collect();
  Node::new(
    loc,
    Stmt::Simple(Node::new(loc, SimpleStmtLine {
      leading_lines: Vec::new(),
      body,
      newline: Newline::default(),
    })),
  )
}

/// `target = value` on its own line.
pub fn assign(loc: Loc, target: Node<Expr>, value: Node<Expr>) -> Node<Stmt> {
  let stmt = Node::new(loc, AssignStmt {
    targets: vec![Node::new(loc, AssignTarget {
      target: with_leading_ws(target, ""),
      equal: Leaf::spaced("="),
    })],
    value: with_leading_ws(value, " "),
  });
  simple_line(loc, vec![SmallStmt::Assign(stmt)])
}

pub fn expr_stmt(loc: Loc, value: Node<Expr>) -> Node<Stmt> {
  let stmt = Node::new(loc, ExprStmt { value });
  simple_line(loc, vec![SmallStmt::Expr(stmt)])
}

pub fn return_stmt(loc: Loc, value: Option<Node<Expr>>) -> Node<Stmt> {
  let stmt = Node::new(loc, ReturnStmt {
    return_kw: Leaf::bare("return"),
    value: value.map(|v| with_leading_ws(v, " ")),
  });
  simple_line(loc, vec![SmallStmt::Return(stmt)])
}

pub fn pass_stmt(loc: Loc) -> Node<Stmt> {
  let stmt = Node::new(loc, PassStmt {
    keyword: Leaf::bare("pass"),
  });
  simple_line(loc, vec![SmallStmt::Pass(stmt)])
}

fn import_aliases(loc: Loc, names: &[&str]) -> Vec<Node<ImportAlias>> {
  names
    .iter()
    .enumerate()
    .map(|(i, n)| {
      Node::new(loc, ImportAlias {
        name: Leaf::spaced(*n),
        asname: None,
        comma: (i + 1 < names.len()).then(|| Leaf::bare(",")),
      })
    })
    .collect()
}

/// A bare name for appending to an existing `from … import` list.
pub fn import_alias(loc: Loc, name: &str) -> Node<ImportAlias> {
  Node::new(loc, ImportAlias {
    name: Leaf::spaced(name),
    asname: None,
    comma: None,
  })
}

/// `from <module> import <names>`.
pub fn import_from(loc: Loc, module: &str, names: &[&str]) -> Node<Stmt> {
  let stmt = Node::new(loc, ImportFromStmt {
    from_kw: Leaf::bare("from"),
    module: Leaf::spaced(module),
    import_kw: Leaf::spaced("import"),
    lpar: None,
    star: None,
    names: import_aliases(loc, names),
    rpar: None,
  });
  simple_line(loc, vec![SmallStmt::ImportFrom(stmt)])
}

/// An indented block using the module's default indentation.
pub fn block(loc: Loc, body: Vec<Node<Stmt>>) -> Suite {
  Suite::Block(Node::new(loc, IndentedBlock {
    header: Newline::default(),
    indent: None,
    body,
    footer: Vec::new(),
  }))
}

/// An `if` (or, with `keyword` set to `elif`, an `elif`) branch with no continuation.
pub fn if_branch(loc: Loc, keyword: &str, test: Node<Expr>, body: Suite) -> Node<IfStmt> {
  Node::new(loc, IfStmt {
    leading_lines: Vec::new(),
    if_kw: Leaf::bare(keyword),
    test: with_leading_ws(test, " "),
    colon: Leaf::bare(":"),
    body,
    orelse: None,
  })
}

pub fn else_clause(loc: Loc, body: Suite) -> Node<ElseClause> {
  Node::new(loc, ElseClause {
    leading_lines: Vec::new(),
    else_kw: Leaf::bare("else"),
    colon: Leaf::bare(":"),
    body,
  })
}

/// `def <name>(): <body>` with no parameters or decorators.
pub fn function_def(loc: Loc, fn_name: &str, body: Vec<Node<Stmt>>) -> Node<Stmt> {
  Node::new(
    loc,
    Stmt::FunctionDef(Node::new(loc, FunctionDef {
      leading_lines: Vec::new(),
      decorators: Vec::new(),
      lines_after_decorators: Vec::new(),
      async_kw: None,
      def_kw: Leaf::bare("def"),
      name: Node::new(loc, Name {
        value: Leaf::spaced(fn_name),
      }),
      type_params: None,
      lpar: Leaf::bare("("),
      params: Node::new(loc, Parameters::default()),
      rpar: Leaf::bare(")"),
      returns: None,
      colon: Leaf::bare(":"),
      body: block(loc, body),
    })),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse;
  use crate::print;

  const LOC: Loc = Loc(0, 0);

  fn render(stmts: Vec<Node<Stmt>>) -> String {
    let mut module = parse("").unwrap();
    module.stx.body = stmts;
    print(&module)
  }

  #[test]
  fn test_type_var_declaration() {
    let value = call(LOC, name_expr(LOC, "TypeVar"), vec![
      arg(string(LOC, "__f_T")),
      keyword_arg(LOC, "bound", name_expr(LOC, "int")),
    ]);
    assert_eq!(
      render(vec![assign(LOC, name_expr(LOC, "__f_T"), value)]),
      "__f_T = TypeVar(\"__f_T\", bound=int)\n"
    );
  }

  #[test]
  fn test_if_chain_and_def() {
    let mut first = if_branch(
      LOC,
      "if",
      compare(LOC, name_expr(LOC, "x"), OperatorName::Equality, name_expr(LOC, "y")),
      block(LOC, vec![pass_stmt(LOC)]),
    );
    first.stx.orelse = Some(OrElse::Else(else_clause(
      LOC,
      block(LOC, vec![return_stmt(LOC, Some(name_expr(LOC, "z")))]),
    )));
    let def = function_def(LOC, "__wrapper_func_f", vec![Node::new(
      LOC,
      Stmt::If(first),
    )]);
    assert_eq!(
      render(vec![def]),
      "def __wrapper_func_f():\n    if x == y:\n        pass\n    else:\n        return z\n"
    );
  }

  #[test]
  fn test_parenthesizes_loose_operands() {
    let subject = binary(LOC, name_expr(LOC, "a"), OperatorName::Or, name_expr(LOC, "b"));
    let test = compare(LOC, subject, OperatorName::IsNot, name_expr(LOC, "None"));
    assert_eq!(render(vec![expr_stmt(LOC, test)]), "(a or b) is not None\n");
  }

  #[test]
  fn test_collections_and_imports() {
    let generic = subscript(LOC, name_expr(LOC, "Generic"), vec![
      name_expr(LOC, "T"),
      name_expr(LOC, "U"),
    ]);
    let single = tuple(LOC, vec![name_expr(LOC, "a")]);
    assert_eq!(
      render(vec![
        import_from(LOC, "typing", &["Generic", "TypeVar"]),
        expr_stmt(LOC, generic),
        expr_stmt(LOC, single),
      ]),
      "from typing import Generic, TypeVar\nGeneric[T, U]\n(a,)\n"
    );
  }

  #[test]
  fn test_leading_ws() {
    let module = parse("x = (  a +\n  b)\n").unwrap();
    let Stmt::Simple(line) = module.stx.body[0].stx.as_ref() else {
      panic!("expected simple statement");
    };
    let SmallStmt::Assign(stmt) = &line.stx.body[0].stx.stmt else {
      panic!("expected assignment");
    };
    let mut value = stmt.stx.value.clone();
    assert_eq!(take_leading_ws(&mut value), " ");
    assert_eq!(crate::print::print_tokens(&value), "(  a +\n  b)");
    set_leading_ws(&mut value, "\t");
    assert_eq!(crate::print::print_tokens(&value), "\t(  a +\n  b)");
  }
}
