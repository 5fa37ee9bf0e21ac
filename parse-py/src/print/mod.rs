use crate::ast::expr::FStringText;
use crate::ast::node::Node;
use crate::ast::stmt::*;
use crate::ast::trivia::EmptyLine;
use crate::ast::trivia::Leaf;
use crate::ast::trivia::Newline;
use derive_visitor::Drive;
use derive_visitor::Visitor;

#[cfg(test)]
mod tests;

type LiteralText = FStringText;

// Statement-free subtrees hold their tokens in source order, so printing them is just concatenating every token and its leading trivia.
#[derive(Visitor)]
#[visitor(Leaf(enter), LiteralText(enter))]
struct TokenWriter<'a> {
  out: &'a mut String,
}

impl<'a> TokenWriter<'a> {
  fn enter_leaf(&mut self, leaf: &Leaf) {
    self.out.push_str(&leaf.ws);
    self.out.push_str(&leaf.text);
  }

  fn enter_literal_text(&mut self, text: &LiteralText) {
    self.out.push_str(&text.value);
  }
}

/// Prints an expression-level node (an expression, pattern, parameter list or simple statement) exactly as its tokens are spelled.
pub fn print_tokens<T: Drive>(node: &T) -> String {
  let mut out = String::new();
  node.drive(&mut TokenWriter { out: &mut out });
  out
}

/// Renders a module. Generated blocks use the module's default indentation and generated lines its default line terminator.
pub fn print_module(module: &Node<Module>) -> String {
  let mut printer = Printer::new(
    module.stx.default_indent.clone(),
    module.stx.default_newline.clone(),
  );
  printer.module(module);
  printer.finish()
}

pub struct Printer {
  out: String,
  default_indent: String,
  default_newline: String,
  indent: String,
  // Lengths of `indent` before each enclosing block was entered.
  indent_stack: Vec<usize>,
}

impl Printer {
  pub fn new(default_indent: impl Into<String>, default_newline: impl Into<String>) -> Printer {
    Printer {
      out: String::new(),
      default_indent: default_indent.into(),
      default_newline: default_newline.into(),
      indent: String::new(),
      indent_stack: Vec::new(),
    }
  }

  pub fn finish(self) -> String {
    self.out
  }

  fn tokens<T: Drive>(&mut self, node: &T) {
    node.drive(&mut TokenWriter { out: &mut self.out });
  }

  // A statement that ended the file without a line terminator may no longer be last after a rewrite.
  fn start_line(&mut self) {
    if !self.out.is_empty() && !self.out.ends_with(['\n', '\r']) {
      self.out.push_str(&self.default_newline);
    }
  }

  fn line_start(&mut self) {
    self.start_line();
    self.out.push_str(&self.indent);
  }

  fn newline(&mut self, newline: &Newline) {
    self.out.push_str(&newline.ws);
    match &newline.value {
      Some(v) => self.out.push_str(v),
      None => self.out.push_str(&self.default_newline),
    };
  }

  fn empty_lines(&mut self, lines: &[EmptyLine]) {
    for line in lines {
      self.start_line();
      if line.indent {
        self.out.push_str(&self.indent);
      };
      self.out.push_str(&line.ws);
      match &line.newline {
        Some(v) => self.out.push_str(v),
        None => self.out.push_str(&self.default_newline),
      };
    }
  }

  fn push_indent(&mut self, relative: &Option<String>) {
    self.indent_stack.push(self.indent.len());
    match relative {
      Some(r) => self.indent.push_str(r),
      None => self.indent.push_str(&self.default_indent),
    };
  }

  fn pop_indent(&mut self) {
    if let Some(len) = self.indent_stack.pop() {
      self.indent.truncate(len);
    };
  }

  pub fn module(&mut self, module: &Node<Module>) {
    if module.stx.bom {
      self.out.push('\u{feff}');
    };
    for stmt in module.stx.body.iter() {
      self.stmt(stmt);
    }
    self.empty_lines(&module.stx.footer);
  }

  pub fn stmt(&mut self, stmt: &Node<Stmt>) {
    match stmt.stx.as_ref() {
      Stmt::ClassDef(n) => self.class_def(n),
      Stmt::For(n) => self.for_stmt(n),
      Stmt::FunctionDef(n) => self.function_def(n),
      Stmt::If(n) => self.if_stmt(n),
      Stmt::Match(n) => self.match_stmt(n),
      Stmt::Simple(n) => {
        self.empty_lines(&n.stx.leading_lines);
        self.line_start();
        self.tokens(&n.stx.body);
        self.newline(&n.stx.newline);
      }
      Stmt::Try(n) => self.try_stmt(n),
      Stmt::While(n) => self.while_stmt(n),
      Stmt::With(n) => self.with_stmt(n),
    }
  }

  fn suite(&mut self, suite: &Suite) {
    match suite {
      Suite::Inline(s) => {
        self.tokens(&s.stx.body);
        self.newline(&s.stx.newline);
      }
      Suite::Block(b) => {
        self.newline(&b.stx.header);
        self.push_indent(&b.stx.indent);
        if b.stx.body.is_empty() {
          // Every statement was removed; a block can't be empty.
          self.line_start();
          self.out.push_str("pass");
          self.out.push_str(&self.default_newline);
        };
        for stmt in b.stx.body.iter() {
          self.stmt(stmt);
        }
        self.empty_lines(&b.stx.footer);
        self.pop_indent();
      }
    }
  }

  fn decorators(&mut self, decorators: &[Node<Decorator>], lines_after: &[EmptyLine]) {
    for d in decorators {
      self.empty_lines(&d.stx.leading_lines);
      self.line_start();
      self.tokens(&d.stx.at);
      self.tokens(&d.stx.expr);
      self.newline(&d.stx.newline);
    }
    self.empty_lines(lines_after);
  }

  fn function_def(&mut self, n: &Node<FunctionDef>) {
    let f = n.stx.as_ref();
    self.empty_lines(&f.leading_lines);
    self.decorators(&f.decorators, &f.lines_after_decorators);
    self.line_start();
    self.tokens(&f.async_kw);
    self.tokens(&f.def_kw);
    self.tokens(&f.name);
    self.tokens(&f.type_params);
    self.tokens(&f.lpar);
    self.tokens(&f.params);
    self.tokens(&f.rpar);
    self.tokens(&f.returns);
    self.tokens(&f.colon);
    self.suite(&f.body);
  }

  fn class_def(&mut self, n: &Node<ClassDef>) {
    let c = n.stx.as_ref();
    self.empty_lines(&c.leading_lines);
    self.decorators(&c.decorators, &c.lines_after_decorators);
    self.line_start();
    self.tokens(&c.class_kw);
    self.tokens(&c.name);
    self.tokens(&c.type_params);
    self.tokens(&c.lpar);
    self.tokens(&c.args);
    self.tokens(&c.rpar);
    self.tokens(&c.colon);
    self.suite(&c.body);
  }

  fn else_clause(&mut self, e: &Node<ElseClause>) {
    self.empty_lines(&e.stx.leading_lines);
    self.line_start();
    self.tokens(&e.stx.else_kw);
    self.tokens(&e.stx.colon);
    self.suite(&e.stx.body);
  }

  fn if_stmt(&mut self, n: &Node<IfStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.if_kw);
    self.tokens(&s.test);
    self.tokens(&s.colon);
    self.suite(&s.body);
    match &s.orelse {
      Some(OrElse::Elif(elif)) => self.if_stmt(elif),
      Some(OrElse::Else(e)) => self.else_clause(e),
      None => {}
    };
  }

  fn while_stmt(&mut self, n: &Node<WhileStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.while_kw);
    self.tokens(&s.test);
    self.tokens(&s.colon);
    self.suite(&s.body);
    if let Some(e) = &s.orelse {
      self.else_clause(e);
    };
  }

  fn for_stmt(&mut self, n: &Node<ForStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.async_kw);
    self.tokens(&s.for_kw);
    self.tokens(&s.target);
    self.tokens(&s.in_kw);
    self.tokens(&s.iter);
    self.tokens(&s.colon);
    self.suite(&s.body);
    if let Some(e) = &s.orelse {
      self.else_clause(e);
    };
  }

  fn try_stmt(&mut self, n: &Node<TryStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.try_kw);
    self.tokens(&s.colon);
    self.suite(&s.body);
    for h in s.handlers.iter() {
      let h = h.stx.as_ref();
      self.empty_lines(&h.leading_lines);
      self.line_start();
      self.tokens(&h.except_kw);
      self.tokens(&h.star);
      self.tokens(&h.typ);
      self.tokens(&h.name);
      self.tokens(&h.colon);
      self.suite(&h.body);
    }
    if let Some(e) = &s.orelse {
      self.else_clause(e);
    };
    if let Some(f) = &s.finalbody {
      self.empty_lines(&f.stx.leading_lines);
      self.line_start();
      self.tokens(&f.stx.finally_kw);
      self.tokens(&f.stx.colon);
      self.suite(&f.stx.body);
    };
  }

  fn with_stmt(&mut self, n: &Node<WithStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.async_kw);
    self.tokens(&s.with_kw);
    self.tokens(&s.lpar);
    self.tokens(&s.items);
    self.tokens(&s.rpar);
    self.tokens(&s.colon);
    self.suite(&s.body);
  }

  fn match_stmt(&mut self, n: &Node<MatchStmt>) {
    let s = n.stx.as_ref();
    self.empty_lines(&s.leading_lines);
    self.line_start();
    self.tokens(&s.match_kw);
    self.tokens(&s.subject);
    self.tokens(&s.colon);
    self.newline(&s.header);
    self.push_indent(&s.indent);
    for case in s.cases.iter() {
      let c = case.stx.as_ref();
      self.empty_lines(&c.leading_lines);
      self.line_start();
      self.tokens(&c.case_kw);
      self.tokens(&c.pattern);
      self.tokens(&c.guard);
      self.tokens(&c.colon);
      self.suite(&c.body);
    }
    self.empty_lines(&s.footer);
    self.pop_indent();
  }
}
