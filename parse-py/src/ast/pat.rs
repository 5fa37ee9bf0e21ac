use super::expr::Expr;
use super::expr::Name;
use super::node::Node;
use super::trivia::Leaf;
use derive_more::derive::From;
use derive_more::derive::TryInto;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Pattern {
  // Also covers capture patterns (no inner pattern) and the wildcard `_`.
  As(Node<AsPattern>),
  Class(Node<ClassPattern>),
  Group(Node<GroupPattern>),
  Mapping(Node<MappingPattern>),
  Or(Node<OrPattern>),
  Sequence(Node<SequencePattern>),
  Singleton(Node<SingletonPattern>),
  Star(Node<StarPattern>),
  Value(Node<ValuePattern>),
}

impl Pattern {
  pub fn is_wildcard(&self) -> bool {
    match self {
      Pattern::As(p) => p.stx.pattern.is_none() && p.stx.name.stx.value.text == "_",
      _ => false,
    }
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AsPattern {
  pub pattern: Option<Node<Pattern>>,
  pub as_kw: Option<Leaf>,
  pub name: Node<Name>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct PatternElement {
  pub pattern: Node<Pattern>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MatchKeywordElement {
  pub key: Node<Name>,
  pub equal: Leaf,
  pub pattern: Node<Pattern>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ClassPattern {
  pub cls: Node<Expr>,
  pub lpar: Leaf,
  pub patterns: Vec<Node<PatternElement>>,
  pub kwds: Vec<Node<MatchKeywordElement>>,
  pub rpar: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct GroupPattern {
  pub lpar: Leaf,
  pub pattern: Node<Pattern>,
  pub rpar: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MappingElement {
  pub key: Node<Expr>,
  pub colon: Leaf,
  pub pattern: Node<Pattern>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MappingRest {
  pub star2: Leaf,
  pub name: Node<Name>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MappingPattern {
  pub lbrace: Leaf,
  pub elements: Vec<Node<MappingElement>>,
  pub rest: Option<Node<MappingRest>>,
  pub rbrace: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct OrElement {
  pub pattern: Node<Pattern>,
  pub bar: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct OrPattern {
  pub patterns: Vec<Node<OrElement>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SequencePattern {
  // `[`/`]`, `(`/`)`, or neither for an open sequence directly after `case`.
  pub lbracket: Option<Leaf>,
  pub patterns: Vec<Node<PatternElement>>,
  pub rbracket: Option<Leaf>,
}

/// `None`, `True` or `False`, compared by identity.
#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SingletonPattern {
  pub value: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct StarPattern {
  pub star: Leaf,
  // `_` for `*_`.
  pub name: Node<Name>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ValuePattern {
  // A literal, a signed or complex number, or a dotted name.
  pub value: Node<Expr>,
}
