use ast::node::Node;
use ast::stmt::Module;
use error::SyntaxResult;
use lex::Lexer;
use parse::Parser;

pub mod ast;
pub mod build;
pub mod error;
pub mod lex;
pub mod loc;
pub mod operator;
pub mod parse;
pub mod print;
pub mod token;

/// Parses a module into a lossless tree. Printing the tree with [`print`] reproduces the source exactly.
pub fn parse(source: &str) -> SyntaxResult<Node<Module>> {
  let (bom, source) = match source.strip_prefix('\u{feff}') {
    Some(rest) => (true, rest),
    None => (false, source),
  };
  let lexer = Lexer::new(source);
  let mut parser = Parser::new(lexer);
  let mut module = parser.parse_module()?;
  module.stx.bom = bom;
  module.stx.default_newline = detect_newline(source).to_string();
  Ok(module)
}

fn detect_newline(source: &str) -> &'static str {
  match memchr::memchr2(b'\n', b'\r', source.as_bytes()) {
    Some(i) if source.as_bytes()[i] == b'\n' => "\n",
    Some(i) if source.as_bytes().get(i + 1) == Some(&b'\n') => "\r\n",
    Some(_) => "\r",
    None => "\n",
  }
}

pub fn print(module: &Node<Module>) -> String {
  print::print_module(module)
}
