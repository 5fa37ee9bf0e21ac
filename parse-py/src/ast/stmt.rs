use super::expr::Annotation;
use super::expr::Arg;
use super::expr::Expr;
use super::expr::Name;
use super::expr::Parameters;
use super::node::Node;
use super::pat::Pattern;
use super::trivia::EmptyLine;
use super::trivia::Leaf;
use super::trivia::Newline;
use derive_more::derive::From;
use derive_more::derive::TryInto;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Module {
  #[drive(skip)]
  pub bom: bool,
  pub body: Vec<Node<Stmt>>,
  // Blank and comment lines after the last statement.
  pub footer: Vec<EmptyLine>,
  #[drive(skip)]
  pub default_indent: String,
  #[drive(skip)]
  pub default_newline: String,
}

// We must wrap each variant with Node<T> as otherwise we won't be able to visit Node<T> instead of just T.
#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Stmt {
  ClassDef(Node<ClassDef>),
  For(Node<ForStmt>),
  FunctionDef(Node<FunctionDef>),
  If(Node<IfStmt>),
  Match(Node<MatchStmt>),
  Simple(Node<SimpleStmtLine>),
  Try(Node<TryStmt>),
  While(Node<WhileStmt>),
  With(Node<WithStmt>),
}

impl Stmt {
  pub fn leading_lines(&self) -> &Vec<EmptyLine> {
    match self {
      Stmt::ClassDef(n) => &n.stx.leading_lines,
      Stmt::For(n) => &n.stx.leading_lines,
      Stmt::FunctionDef(n) => &n.stx.leading_lines,
      Stmt::If(n) => &n.stx.leading_lines,
      Stmt::Match(n) => &n.stx.leading_lines,
      Stmt::Simple(n) => &n.stx.leading_lines,
      Stmt::Try(n) => &n.stx.leading_lines,
      Stmt::While(n) => &n.stx.leading_lines,
      Stmt::With(n) => &n.stx.leading_lines,
    }
  }

  pub fn leading_lines_mut(&mut self) -> &mut Vec<EmptyLine> {
    match self {
      Stmt::ClassDef(n) => &mut n.stx.leading_lines,
      Stmt::For(n) => &mut n.stx.leading_lines,
      Stmt::FunctionDef(n) => &mut n.stx.leading_lines,
      Stmt::If(n) => &mut n.stx.leading_lines,
      Stmt::Match(n) => &mut n.stx.leading_lines,
      Stmt::Simple(n) => &mut n.stx.leading_lines,
      Stmt::Try(n) => &mut n.stx.leading_lines,
      Stmt::While(n) => &mut n.stx.leading_lines,
      Stmt::With(n) => &mut n.stx.leading_lines,
    }
  }
}

/// The body of a compound statement.
#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Suite {
  Block(Node<IndentedBlock>),
  // Simple statements on the same line as the colon.
  Inline(Node<SimpleSuite>),
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct IndentedBlock {
  // Terminates the line holding the colon.
  pub header: Newline,
  // Relative to the enclosing block. None is the module's default indentation.
  #[drive(skip)]
  pub indent: Option<String>,
  pub body: Vec<Node<Stmt>>,
  pub footer: Vec<EmptyLine>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SimpleSuite {
  pub body: Vec<Node<SmallStmtItem>>,
  pub newline: Newline,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SimpleStmtLine {
  pub leading_lines: Vec<EmptyLine>,
  pub body: Vec<Node<SmallStmtItem>>,
  pub newline: Newline,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct SmallStmtItem {
  pub stmt: SmallStmt,
  pub semicolon: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum SmallStmt {
  AnnAssign(Node<AnnAssignStmt>),
  Assert(Node<AssertStmt>),
  Assign(Node<AssignStmt>),
  AugAssign(Node<AugAssignStmt>),
  Break(Node<BreakStmt>),
  Continue(Node<ContinueStmt>),
  Del(Node<DelStmt>),
  Expr(Node<ExprStmt>),
  Global(Node<GlobalStmt>),
  Import(Node<ImportStmt>),
  ImportFrom(Node<ImportFromStmt>),
  Nonlocal(Node<NonlocalStmt>),
  Pass(Node<PassStmt>),
  Raise(Node<RaiseStmt>),
  Return(Node<ReturnStmt>),
  TypeAlias(Node<TypeAliasStmt>),
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ExprStmt {
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AssignTarget {
  pub target: Node<Expr>,
  pub equal: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AssignStmt {
  pub targets: Vec<Node<AssignTarget>>,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AnnAssignStmt {
  pub target: Node<Expr>,
  pub annotation: Node<Annotation>,
  pub equal: Option<Leaf>,
  pub value: Option<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AugAssignStmt {
  pub target: Node<Expr>,
  pub op: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AssertStmt {
  pub assert_kw: Leaf,
  pub test: Node<Expr>,
  pub comma: Option<Leaf>,
  pub msg: Option<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct BreakStmt {
  pub keyword: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ContinueStmt {
  pub keyword: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct PassStmt {
  pub keyword: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct DelStmt {
  pub del_kw: Leaf,
  pub target: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct NameItem {
  pub name: Node<Name>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct GlobalStmt {
  pub keyword: Leaf,
  pub names: Vec<Node<NameItem>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct NonlocalStmt {
  pub keyword: Leaf,
  pub names: Vec<Node<NameItem>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct AsName {
  pub as_kw: Leaf,
  pub name: Node<Name>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ImportAlias {
  // Dotted module path or imported name, verbatim.
  pub name: Leaf,
  pub asname: Option<Node<AsName>>,
  pub comma: Option<Leaf>,
}

impl ImportAlias {
  /// The name bound by this alias.
  pub fn bound_name(&self) -> &str {
    match &self.asname {
      Some(a) => &a.stx.name.stx.value.text,
      None => self.name.text.split('.').next().unwrap_or_default().trim(),
    }
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ImportStmt {
  pub import_kw: Leaf,
  pub names: Vec<Node<ImportAlias>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ImportFromStmt {
  pub from_kw: Leaf,
  // Leading dots and dotted module path, verbatim.
  pub module: Leaf,
  pub import_kw: Leaf,
  pub lpar: Option<Leaf>,
  pub star: Option<Leaf>,
  pub names: Vec<Node<ImportAlias>>,
  pub rpar: Option<Leaf>,
}

impl ImportFromStmt {
  /// Module path with any interior whitespace removed.
  pub fn module_path(&self) -> String {
    self.module.text.chars().filter(|c| !c.is_whitespace()).collect()
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct RaiseFrom {
  pub from_kw: Leaf,
  pub cause: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct RaiseStmt {
  pub raise_kw: Leaf,
  pub exc: Option<Node<Expr>>,
  pub cause: Option<Node<RaiseFrom>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ReturnStmt {
  pub return_kw: Leaf,
  pub value: Option<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeAliasStmt {
  pub type_kw: Leaf,
  pub name: Node<Name>,
  pub type_params: Option<Node<TypeParams>>,
  pub equal: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeVarBound {
  pub colon: Leaf,
  // A parenthesized tuple here is a list of constraints.
  pub bound: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeParamDefault {
  pub equal: Leaf,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeVarParam {
  pub name: Node<Name>,
  pub bound: Option<Node<TypeVarBound>>,
  pub default: Option<Node<TypeParamDefault>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeVarTupleParam {
  pub star: Leaf,
  pub name: Node<Name>,
  pub default: Option<Node<TypeParamDefault>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ParamSpecParam {
  pub star2: Leaf,
  pub name: Node<Name>,
  pub default: Option<Node<TypeParamDefault>>,
}

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum TypeParamKind {
  ParamSpec(Node<ParamSpecParam>),
  TypeVar(Node<TypeVarParam>),
  TypeVarTuple(Node<TypeVarTupleParam>),
}

impl TypeParamKind {
  pub fn name(&self) -> &Node<Name> {
    match self {
      TypeParamKind::ParamSpec(p) => &p.stx.name,
      TypeParamKind::TypeVar(p) => &p.stx.name,
      TypeParamKind::TypeVarTuple(p) => &p.stx.name,
    }
  }

  pub fn default(&self) -> Option<&Node<TypeParamDefault>> {
    match self {
      TypeParamKind::ParamSpec(p) => p.stx.default.as_ref(),
      TypeParamKind::TypeVar(p) => p.stx.default.as_ref(),
      TypeParamKind::TypeVarTuple(p) => p.stx.default.as_ref(),
    }
  }
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeParam {
  pub param: TypeParamKind,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TypeParams {
  pub lbracket: Leaf,
  pub params: Vec<Node<TypeParam>>,
  pub rbracket: Leaf,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct Decorator {
  pub leading_lines: Vec<EmptyLine>,
  pub at: Leaf,
  pub expr: Node<Expr>,
  pub newline: Newline,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FunctionDef {
  pub leading_lines: Vec<EmptyLine>,
  pub decorators: Vec<Node<Decorator>>,
  pub lines_after_decorators: Vec<EmptyLine>,
  pub async_kw: Option<Leaf>,
  pub def_kw: Leaf,
  pub name: Node<Name>,
  pub type_params: Option<Node<TypeParams>>,
  pub lpar: Leaf,
  pub params: Node<Parameters>,
  pub rpar: Leaf,
  pub returns: Option<Node<Annotation>>,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ClassDef {
  pub leading_lines: Vec<EmptyLine>,
  pub decorators: Vec<Node<Decorator>>,
  pub lines_after_decorators: Vec<EmptyLine>,
  pub class_kw: Leaf,
  pub name: Node<Name>,
  pub type_params: Option<Node<TypeParams>>,
  pub lpar: Option<Leaf>,
  pub args: Vec<Node<Arg>>,
  pub rpar: Option<Leaf>,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ElseClause {
  pub leading_lines: Vec<EmptyLine>,
  pub else_kw: Leaf,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum OrElse {
  Elif(Node<IfStmt>),
  Else(Node<ElseClause>),
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct IfStmt {
  pub leading_lines: Vec<EmptyLine>,
  // `if`, or `elif` when this is the `orelse` of another if.
  pub if_kw: Leaf,
  pub test: Node<Expr>,
  pub colon: Leaf,
  pub body: Suite,
  pub orelse: Option<OrElse>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct WhileStmt {
  pub leading_lines: Vec<EmptyLine>,
  pub while_kw: Leaf,
  pub test: Node<Expr>,
  pub colon: Leaf,
  pub body: Suite,
  pub orelse: Option<Node<ElseClause>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ForStmt {
  pub leading_lines: Vec<EmptyLine>,
  pub async_kw: Option<Leaf>,
  pub for_kw: Leaf,
  pub target: Node<Expr>,
  pub in_kw: Leaf,
  pub iter: Node<Expr>,
  pub colon: Leaf,
  pub body: Suite,
  pub orelse: Option<Node<ElseClause>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct ExceptHandler {
  pub leading_lines: Vec<EmptyLine>,
  pub except_kw: Leaf,
  // `except*`.
  pub star: Option<Leaf>,
  pub typ: Option<Node<Expr>>,
  pub name: Option<Node<AsName>>,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct FinallyClause {
  pub leading_lines: Vec<EmptyLine>,
  pub finally_kw: Leaf,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct TryStmt {
  pub leading_lines: Vec<EmptyLine>,
  pub try_kw: Leaf,
  pub colon: Leaf,
  pub body: Suite,
  pub handlers: Vec<Node<ExceptHandler>>,
  pub orelse: Option<Node<ElseClause>>,
  pub finalbody: Option<Node<FinallyClause>>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct WithTarget {
  pub as_kw: Leaf,
  pub target: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct WithItem {
  pub item: Node<Expr>,
  pub target: Option<Node<WithTarget>>,
  pub comma: Option<Leaf>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct WithStmt {
  pub leading_lines: Vec<EmptyLine>,
  pub async_kw: Option<Leaf>,
  pub with_kw: Leaf,
  pub lpar: Option<Leaf>,
  pub items: Vec<Node<WithItem>>,
  pub rpar: Option<Leaf>,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MatchGuard {
  pub if_kw: Leaf,
  pub test: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MatchCase {
  pub leading_lines: Vec<EmptyLine>,
  pub case_kw: Leaf,
  pub pattern: Node<Pattern>,
  pub guard: Option<Node<MatchGuard>>,
  pub colon: Leaf,
  pub body: Suite,
}

#[derive(Clone, Debug, Drive, DriveMut, Serialize)]
pub struct MatchStmt {
  pub leading_lines: Vec<EmptyLine>,
  pub match_kw: Leaf,
  pub subject: Node<Expr>,
  pub colon: Leaf,
  pub header: Newline,
  // Indentation of the cases relative to the `match` line.
  #[drive(skip)]
  pub indent: Option<String>,
  pub cases: Vec<Node<MatchCase>>,
  pub footer: Vec<EmptyLine>,
}
