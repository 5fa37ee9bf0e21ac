use super::node::Node;
use super::trivia::Leaf;
use crate::operator::OperatorName;
use crate::operator::PRECEDENCE_AWAIT;
use crate::operator::PRECEDENCE_COMPARISON;
use crate::operator::PRECEDENCE_IF_ELSE;
use crate::operator::PRECEDENCE_LAMBDA;
use crate::operator::PRECEDENCE_NAMED_EXPR;
use crate::operator::PRECEDENCE_PRIMARY;
use derive_more::derive::From;
use derive_more::derive::TryInto;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

// We must wrap each variant with Node<T> as otherwise we won't be able to visit Node<T> instead of just T.
#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Expr {
  Attribute(Node<AttributeExpr>),
  Await(Node<AwaitExpr>),
  Binary(Node<BinaryExpr>),
  Call(Node<CallExpr>),
  Comparison(Node<ComparisonExpr>),
  Comprehension(Node<ComprehensionExpr>),
  Concat(Node<ConcatExpr>),
  Constant(Node<ConstantExpr>),
  Dict(Node<DictExpr>),
  Ellipsis(Node<EllipsisExpr>),
  FString(Node<FStringExpr>),
  IfElse(Node<IfElseExpr>),
  Lambda(Node<LambdaExpr>),
  List(Node<ListExpr>),
  Name(Node<Name>),
  NamedExpr(Node<NamedExpr>),
  Number(Node<NumberExpr>),
  Paren(Node<ParenExpr>),
  Set(Node<SetExpr>),
  Starred(Node<StarredExpr>),
  Str(Node<StrExpr>),
  Subscript(Node<SubscriptExpr>),
  Tuple(Node<TupleExpr>),
  Unary(Node<UnaryExpr>),
  Yield(Node<YieldExpr>),
}

impl Expr {
  /// How tightly this expression binds; an operand with a lower value than its context needs parentheses.
  pub fn precedence(&self) -> u8 {
    match self {
      Expr::Binary(n) => n.stx.operator.precedence(),
      Expr::Unary(n) => n.stx.operator.precedence(),
      Expr::Comparison(_) => PRECEDENCE_COMPARISON,
      Expr::Await(_) => PRECEDENCE_AWAIT,
      Expr::IfElse(_) => PRECEDENCE_IF_ELSE,
      Expr::Lambda(_) => PRECEDENCE_LAMBDA,
      Expr::NamedExpr(_) | Expr::Yield(_) | Expr::Starred(_) => PRECEDENCE_NAMED_EXPR,
      // Without parentheses, a tuple only appears where a comma-separated list is allowed.
      Expr::Tuple(n) if n.stx.lpar.is_none() => 0,
      _ => PRECEDENCE_PRIMARY,
    }
  }

  pub fn as_name(&self) -> Option<&str> {
    match self {
      Expr::Name(n) => Some(n.stx.value.text.as_str()),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Name {
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AttributeExpr {
  pub value: Node<Expr>,
  pub dot: Leaf,
  pub attr: Node<Name>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AwaitExpr {
  pub await_kw: Leaf,
  pub value: Node<Expr>,
}

/// Arithmetic, bitwise and boolean (`and`/`or`) operators.
#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct BinaryExpr {
  pub left: Node<Expr>,
  #[drive(skip)]
  pub operator: OperatorName,
  pub op: Leaf,
  pub right: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ArgKeyword {
  pub name: Node<Name>,
  pub equal: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Arg {
  // `*` or `**`.
  pub star: Option<Leaf>,
  pub keyword: Option<Node<ArgKeyword>>,
  pub value: Node<Expr>,
  pub comma: Option<Leaf>,
}

impl Arg {
  pub fn is_keyword_like(&self) -> bool {
    self.keyword.is_some() || self.star.as_ref().is_some_and(|s| s.text == "**")
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct CallExpr {
  pub func: Node<Expr>,
  pub lpar: Leaf,
  pub args: Vec<Node<Arg>>,
  pub rpar: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ComparisonTarget {
  #[drive(skip)]
  pub operator: OperatorName,
  // Two leaves for `not in` and `is not`.
  pub op: Vec<Leaf>,
  pub comparator: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ComparisonExpr {
  pub left: Node<Expr>,
  pub comparisons: Vec<Node<ComparisonTarget>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ComprehensionKind {
  Dict,
  Generator,
  List,
  Set,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct CompIf {
  pub if_kw: Leaf,
  pub test: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct CompFor {
  pub async_kw: Option<Leaf>,
  pub for_kw: Leaf,
  pub target: Node<Expr>,
  pub in_kw: Leaf,
  pub iter: Node<Expr>,
  pub ifs: Vec<Node<CompIf>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ComprehensionExpr {
  #[drive(skip)]
  pub kind: ComprehensionKind,
  // Absent for a generator that is the sole argument of a call.
  pub open: Option<Leaf>,
  pub elt: Node<Expr>,
  pub colon: Option<Leaf>,
  pub dict_value: Option<Node<Expr>>,
  pub clauses: Vec<Node<CompFor>>,
  pub close: Option<Leaf>,
}

/// Implicitly concatenated string literals.
#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ConcatExpr {
  pub parts: Vec<Node<Expr>>,
}

/// `None`, `True` or `False`.
#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ConstantExpr {
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct DictItem {
  pub star2: Option<Leaf>,
  pub key: Option<Node<Expr>>,
  pub colon: Option<Leaf>,
  pub value: Node<Expr>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct DictExpr {
  pub lbrace: Leaf,
  pub items: Vec<Node<DictItem>>,
  pub rbrace: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct EllipsisExpr {
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FStringText {
  // Raw source text, with `{{` and `}}` still doubled.
  #[drive(skip)]
  pub value: String,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FStringConversion {
  pub bang: Leaf,
  pub name: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FStringSpec {
  pub colon: Leaf,
  pub parts: Vec<FStringPart>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FStringField {
  pub lbrace: Leaf,
  pub expr: Node<Expr>,
  // The `=` of a self-documenting field; its trailing whitespace is in the following leaf.
  pub debug: Option<Leaf>,
  pub conversion: Option<Node<FStringConversion>>,
  pub spec: Option<Node<FStringSpec>>,
  pub rbrace: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum FStringPart {
  Field(Node<FStringField>),
  Text(Node<FStringText>),
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FStringExpr {
  // Prefix and opening quote(s).
  pub start: Leaf,
  pub parts: Vec<FStringPart>,
  pub end: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct IfElseExpr {
  pub body: Node<Expr>,
  pub if_kw: Leaf,
  pub test: Node<Expr>,
  pub else_kw: Leaf,
  pub orelse: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct LambdaExpr {
  pub lambda_kw: Leaf,
  pub params: Node<Parameters>,
  pub colon: Leaf,
  pub body: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Element {
  pub value: Node<Expr>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ListExpr {
  pub lbracket: Leaf,
  pub elements: Vec<Node<Element>>,
  pub rbracket: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct NamedExpr {
  pub target: Node<Name>,
  pub walrus: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct NumberExpr {
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ParenExpr {
  pub lpar: Leaf,
  pub inner: Node<Expr>,
  pub rpar: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SetExpr {
  pub lbrace: Leaf,
  pub elements: Vec<Node<Element>>,
  pub rbrace: Leaf,
}

/// `*value`; `**value` only occurs in arguments and dict displays, which have their own fields for it.
#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct StarredExpr {
  pub star: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct StrExpr {
  // Raw literal including prefix and quotes.
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SliceIndex {
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SliceRange {
  pub lower: Option<Node<Expr>>,
  pub colon: Leaf,
  pub upper: Option<Node<Expr>>,
  pub step_colon: Option<Leaf>,
  pub step: Option<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Slice {
  Index(Node<SliceIndex>),
  Range(Node<SliceRange>),
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SubscriptElement {
  pub slice: Slice,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SubscriptExpr {
  pub value: Node<Expr>,
  pub lbracket: Leaf,
  pub slices: Vec<Node<SubscriptElement>>,
  pub rbracket: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TupleExpr {
  pub lpar: Option<Leaf>,
  pub elements: Vec<Node<Element>>,
  pub rpar: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct UnaryExpr {
  #[drive(skip)]
  pub operator: OperatorName,
  pub op: Leaf,
  pub operand: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct YieldExpr {
  pub yield_kw: Leaf,
  pub from_kw: Option<Leaf>,
  pub value: Option<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Annotation {
  // `:` for parameters and variables, `->` for return types.
  pub indicator: Leaf,
  pub annotation: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ParamDefault {
  pub equal: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Param {
  // `*`, `**`, or `/` for the positional-only marker. A bare `*` or `/` has no name.
  pub star: Option<Leaf>,
  pub name: Option<Node<Name>>,
  pub annotation: Option<Node<Annotation>>,
  pub default: Option<Node<ParamDefault>>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Default, Drive, DriveMut, Serialize)]
pub struct Parameters {
  pub params: Vec<Node<Param>>,
}
