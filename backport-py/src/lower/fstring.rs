//! f-strings become `str.format` calls.
//!
//! The literal text is kept as written, so escapes and doubled braces mean the same thing in the template. Each replacement field becomes `{:spec}` carrying its conversion and format spec, and its expression becomes the next positional argument. A replacement field nested in a format spec has no lowering.
//!
//! A self-documenting field (`{x=}`) becomes its source text in the template, followed by a field converted with `!r` unless it has its own conversion or a format spec.
//!
//! When f-strings are implicitly concatenated with other literals, each f-string becomes its own call and the parts are joined with `+` inside parentheses.
use super::until_fixpoint;
use crate::err::LowerError;
use crate::err::LowerResult;
use crate::imports::ImportRequests;
use crate::replace::insert;
use crate::replace::new_map;
use crate::replace::Replacement;
use crate::replace::Replacer;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_py::ast::expr::*;
use parse_py::ast::node::Node;
use parse_py::ast::node::NodeId;
use parse_py::ast::stmt::Module;
use parse_py::ast::trivia::Leaf;
use parse_py::build;
use parse_py::loc::Loc;
use parse_py::operator::OperatorName;
use parse_py::operator::PRECEDENCE_LAMBDA;
use parse_py::print::print_tokens;
use tracing::debug;

pub fn lower_fstrings(module: Node<Module>, requests: &mut ImportRequests) -> LowerResult<Node<Module>> {
  until_fixpoint("fstring", module, round, requests)
}

type ExprNode = Node<Expr>;

fn is_target(expr: &Expr) -> bool {
  match expr {
    Expr::FString(_) => true,
    Expr::Concat(c) => c.stx.parts.iter().any(|p| matches!(p.stx.as_ref(), Expr::FString(_))),
    _ => false,
  }
}

// f-strings inside a target's fields are copied into the call's arguments and lowered in a later round.
#[derive(Visitor)]
#[visitor(ExprNode(enter, exit))]
struct FStringFinder {
  inside: Option<NodeId>,
  targets: Vec<(NodeId, Node<Expr>)>,
}

impl FStringFinder {
  fn enter_expr_node(&mut self, node: &ExprNode) {
    if self.inside.is_none() && is_target(&node.stx) {
      self.inside = Some(node.id);
      self.targets.push((node.id, node.clone()));
    };
  }

  fn exit_expr_node(&mut self, node: &ExprNode) {
    if self.inside == Some(node.id) {
      self.inside = None;
    };
  }
}

fn round(module: Node<Module>, _requests: &mut ImportRequests) -> LowerResult<(Node<Module>, usize)> {
  let mut finder = FStringFinder {
    inside: None,
    targets: Vec::new(),
  };
  module.drive(&mut finder);

  let mut map = new_map();
  for (id, target) in finder.targets {
    debug!(loc = ?target.loc, "lowering f-string");
    let lowered = match target.stx.as_ref() {
      Expr::Concat(c) => lower_concat(c)?,
      Expr::FString(f) => lower_fstring(f)?,
      _ => continue,
    };
    insert(&mut map, id, Replacement::Expr(lowered))?;
  }
  let lowered = map.len();
  let module = Replacer::new(map).apply(module)?;
  Ok((module, lowered))
}

/// How the template literal is quoted, which decides how text copied into it must be escaped.
struct Quoting {
  prefix: String,
  quote: char,
  triple: bool,
  raw: bool,
}

impl Quoting {
  fn of(f: &FStringExpr) -> Quoting {
    let start = f.start.text.as_str();
    let split = start.find(['"', '\'']).unwrap_or(start.len());
    let (prefix, quotes) = start.split_at(split);
    Quoting {
      prefix: prefix.chars().filter(|c| !matches!(c, 'f' | 'F')).collect(),
      quote: quotes.chars().next().unwrap_or('"'),
      triple: quotes.len() == 3,
      raw: prefix.contains(['r', 'R']),
    }
  }

  fn open(&self) -> String {
    let quotes = if self.triple { 3 } else { 1 };
    let mut out = self.prefix.clone();
    out.extend(std::iter::repeat(self.quote).take(quotes));
    out
  }

  /// Spells `text` so that it reads back literally inside the template.
  fn escape(&self, text: &str, loc: Loc) -> LowerResult<String> {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
      match c {
        '{' => out.push_str("{{"),
        '}' => out.push_str("}}"),
        c if self.raw => {
          let unrepresentable = c == self.quote || c == '\\' || (!self.triple && (c == '\n' || c == '\r'));
          if unrepresentable {
            return Err(LowerError::unsupported(
              "self-documenting field that a raw string cannot spell",
              loc,
            ));
          };
          out.push(c);
        }
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        c if c == self.quote => {
          out.push('\\');
          out.push(c);
        }
        c => out.push(c),
      };
    }
    Ok(out)
  }
}

struct Template<'a> {
  quoting: &'a Quoting,
  text: String,
  args: Vec<Node<Expr>>,
}

impl<'a> Template<'a> {
  fn part(&mut self, part: &FStringPart) -> LowerResult<()> {
    match part {
      FStringPart::Text(t) => self.text.push_str(&t.stx.value),
      FStringPart::Field(f) => self.field(f)?,
    };
    Ok(())
  }

  /// Appends `{!conv:spec}`, always with the colon, and queues the field's expression as the next argument.
  fn field(&mut self, field: &Node<FStringField>) -> LowerResult<()> {
    let f = field.stx.as_ref();
    if let Some(debug) = &f.debug {
      // The whitespace after `=` is part of the text and lives on the next token.
      let after = match (&f.conversion, &f.spec) {
        (Some(c), _) => &c.stx.bang.ws,
        (None, Some(s)) => &s.stx.colon.ws,
        (None, None) => &f.rbrace.ws,
      };
      let source = format!("{}{}={}", print_tokens(&f.expr), debug.ws, after);
      let escaped = self.quoting.escape(&source, field.loc)?;
      self.text.push_str(&escaped);
    };

    self.text.push('{');
    match &f.conversion {
      Some(c) => {
        self.text.push('!');
        self.text.push_str(&c.stx.name.text);
      }
      None if f.debug.is_some() && f.spec.is_none() => self.text.push_str("!r"),
      None => {}
    };
    self.text.push(':');
    self.args.push(build::paren_below(f.expr.clone(), PRECEDENCE_LAMBDA));
    if let Some(spec) = &f.spec {
      for part in spec.stx.parts.iter() {
        match part {
          FStringPart::Text(t) => self.text.push_str(&t.stx.value),
          FStringPart::Field(nested) => {
            return Err(LowerError::unsupported(
              "replacement field inside a format spec",
              nested.loc,
            ))
          }
        };
      }
    };
    self.text.push('}');
    Ok(())
  }
}

/// Resolves doubled braces, for a template that ends up with no fields and is not passed to `format`.
fn unescape_braces(text: &str) -> String {
  text.replace("{{", "{").replace("}}", "}")
}

fn lower_fstring(f: &Node<FStringExpr>) -> LowerResult<Node<Expr>> {
  let quoting = Quoting::of(&f.stx);
  let mut template = Template {
    quoting: &quoting,
    text: String::new(),
    args: Vec::new(),
  };
  for part in f.stx.parts.iter() {
    template.part(part)?;
  }

  let has_fields = f.stx.parts.iter().any(|p| matches!(p, FStringPart::Field(_)));
  let body = if has_fields {
    template.text
  } else {
    unescape_braces(&template.text)
  };
  let literal = build::raw_string(f.loc, format!("{}{}{}", quoting.open(), body, f.stx.end.text));
  let lowered = if has_fields {
    let format = build::attribute(f.loc, literal, "format");
    build::call(f.loc, format, template.args.into_iter().map(build::arg).collect())
  } else {
    literal
  };
  Ok(build::with_leading_ws(lowered, &f.stx.start.ws))
}

fn lower_concat(c: &Node<ConcatExpr>) -> LowerResult<Node<Expr>> {
  // Runs of plain literals stay implicitly concatenated.
  let mut operands: Vec<Node<Expr>> = Vec::new();
  let mut run: Vec<Node<Expr>> = Vec::new();
  for part in c.stx.parts.iter() {
    let Expr::FString(f) = part.stx.as_ref() else {
      run.push(part.clone());
      continue;
    };
    let lowered = lower_fstring(f)?;
    if let Expr::Str(_) = lowered.stx.as_ref() {
      run.push(lowered);
    } else {
      flush_run(&mut run, &mut operands);
      operands.push(lowered);
    };
  }
  flush_run(&mut run, &mut operands);

  let mut operands = operands.into_iter();
  let Some(mut joined) = operands.next() else {
    return Err(LowerError::invariant("empty string concatenation", Some(c.loc)));
  };
  if operands.len() == 0 {
    return Ok(joined);
  };
  for mut right in operands {
    // Line breaks between parts are kept.
    let ws = build::take_leading_ws(&mut right);
    build::set_leading_ws(&mut right, if ws.is_empty() { " " } else { &ws });
    joined = Node::new(
      c.loc,
      Expr::Binary(Node::new(c.loc, BinaryExpr {
        left: joined,
        operator: OperatorName::Addition,
        op: Leaf::spaced(OperatorName::Addition.text()),
        right,
      })),
    );
  }
  Ok(build::paren(joined))
}

fn flush_run(run: &mut Vec<Node<Expr>>, operands: &mut Vec<Node<Expr>>) {
  match run.len() {
    0 => {}
    1 => operands.extend(run.drain(..)),
    _ => {
      let loc = run[0].loc;
      let parts = std::mem::take(run);
      operands.push(Node::new(loc, Expr::Concat(Node::new(loc, ConcatExpr { parts }))));
    }
  };
}
