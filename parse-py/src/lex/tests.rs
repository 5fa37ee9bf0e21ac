use crate::lex::fstring_quote;
use crate::lex::lex_next;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::token::TT;

fn lex_all(source: &str, mode: LexMode) -> Vec<(TT, String)> {
  let mut lexer = Lexer::new(source);
  let mut out = Vec::new();
  loop {
    let t = lex_next(&mut lexer, mode);
    if t.typ == TT::EOF {
      break;
    };
    out.push((t.typ, lexer[t.loc].to_string()));
  }
  out
}

fn types(source: &str, mode: LexMode) -> Vec<TT> {
  lex_all(source, mode).into_iter().map(|(t, _)| t).collect()
}

#[test]
fn lexes_statement_line() {
  assert_eq!(types("x = a.b(1, 'c')\n", LexMode::Standard), vec![
    TT::Identifier,
    TT::Equals,
    TT::Identifier,
    TT::Dot,
    TT::Identifier,
    TT::ParenthesisOpen,
    TT::LiteralNumber,
    TT::Comma,
    TT::LiteralString,
    TT::ParenthesisClose,
    TT::Newline,
  ]);
}

#[test]
fn longest_operator_wins() {
  assert_eq!(types("a //= b ** c -> d := e", LexMode::Bracketed), vec![
    TT::Identifier,
    TT::SlashSlashEquals,
    TT::Identifier,
    TT::AsteriskAsterisk,
    TT::Identifier,
    TT::HyphenChevronRight,
    TT::Identifier,
    TT::ColonEquals,
    TT::Identifier,
  ]);
}

#[test]
fn keywords_and_soft_keywords() {
  assert_eq!(types("def match case type None", LexMode::Bracketed), vec![
    TT::KeywordDef,
    TT::Identifier,
    TT::Identifier,
    TT::Identifier,
    TT::KeywordNone,
  ]);
}

#[test]
fn blank_and_comment_lines_are_single_tokens() {
  let tokens = lex_all("x\n\n  # note\ny\n", LexMode::Standard);
  assert_eq!(tokens, vec![
    (TT::Identifier, "x".to_string()),
    (TT::Newline, "\n".to_string()),
    (TT::EmptyLine, "\n".to_string()),
    (TT::EmptyLine, "  # note\n".to_string()),
    (TT::Identifier, "y".to_string()),
    (TT::Newline, "\n".to_string()),
  ]);
}

#[test]
fn first_token_of_line_carries_indentation() {
  let source = "if x:\n    pass\n";
  let mut lexer = Lexer::new(source);
  let mut indents = Vec::new();
  loop {
    let t = lex_next(&mut lexer, LexMode::Standard);
    if t.typ == TT::EOF {
      break;
    };
    if let Some(indent) = t.indent {
      indents.push((lexer[t.loc].to_string(), lexer[indent].to_string()));
    };
  }
  assert_eq!(indents, vec![
    ("if".to_string(), "".to_string()),
    ("pass".to_string(), "    ".to_string()),
  ]);
}

#[test]
fn trailing_comment_belongs_to_newline_trivia() {
  let source = "x  # hi\n";
  let mut lexer = Lexer::new(source);
  let x = lex_next(&mut lexer, LexMode::Standard);
  assert_eq!(x.typ, TT::Identifier);
  let nl = lex_next(&mut lexer, LexMode::Standard);
  assert_eq!(nl.typ, TT::Newline);
  assert_eq!(&lexer[nl.ws], "  # hi");
}

#[test]
fn newlines_are_trivia_in_brackets() {
  assert_eq!(types("a,\n  # c\n  b", LexMode::Bracketed), vec![
    TT::Identifier,
    TT::Comma,
    TT::Identifier,
  ]);
}

#[test]
fn numbers() {
  for n in ["0", "1_000", "0x_ff", "0o17", "0b1", "1.5", ".5", "1.", "1e-3", "2.5E+10j", "3j"] {
    assert_eq!(lex_all(n, LexMode::Bracketed), vec![(TT::LiteralNumber, n.to_string())], "{}", n);
  }
}

#[test]
fn strings_with_prefixes_and_escapes() {
  for s in [
    "'a'",
    "\"a\\\"b\"",
    "r'\\d'",
    "b'x'",
    "Rb\"x\"",
    "'''a\n'b'\n'''",
    "\"\"\"\"\"\"",
  ] {
    assert_eq!(lex_all(s, LexMode::Bracketed), vec![(TT::LiteralString, s.to_string())], "{}", s);
  }
}

#[test]
fn unterminated_string_is_invalid() {
  assert_eq!(types("'abc\n", LexMode::Bracketed)[0], TT::Invalid);
}

#[test]
fn fstring_parts() {
  let source = "f\"a {{b}} {c!r:>{w}} d\"";
  let mut lexer = Lexer::new(source);
  let start = lex_next(&mut lexer, LexMode::Standard);
  assert_eq!(start.typ, TT::FStringStart);
  let q = fstring_quote(&lexer[start.loc]);
  assert!(!q.triple && !q.raw);
  let middle = lex_next(&mut lexer, LexMode::FStringMiddle(q));
  assert_eq!((middle.typ, &lexer[middle.loc]), (TT::FStringMiddle, "a {{b}} "));
  assert_eq!(lex_next(&mut lexer, LexMode::FStringMiddle(q)).typ, TT::BraceOpen);
  assert_eq!(lex_next(&mut lexer, LexMode::Bracketed).typ, TT::Identifier);
  assert_eq!(lex_next(&mut lexer, LexMode::FStringFieldEnd).typ, TT::Exclamation);
  assert_eq!(lex_next(&mut lexer, LexMode::Bracketed).typ, TT::Identifier);
  assert_eq!(lex_next(&mut lexer, LexMode::FStringFieldEnd).typ, TT::Colon);
  let spec = lex_next(&mut lexer, LexMode::FStringSpec(q));
  assert_eq!((spec.typ, &lexer[spec.loc]), (TT::FStringMiddle, ">"));
  assert_eq!(lex_next(&mut lexer, LexMode::FStringSpec(q)).typ, TT::BraceOpen);
  assert_eq!(lex_next(&mut lexer, LexMode::Bracketed).typ, TT::Identifier);
  assert_eq!(lex_next(&mut lexer, LexMode::Bracketed).typ, TT::BraceClose);
  assert_eq!(lex_next(&mut lexer, LexMode::FStringSpec(q)).typ, TT::BraceClose);
  let tail = lex_next(&mut lexer, LexMode::FStringMiddle(q));
  assert_eq!((tail.typ, &lexer[tail.loc]), (TT::FStringMiddle, " d"));
  assert_eq!(lex_next(&mut lexer, LexMode::FStringMiddle(q)).typ, TT::FStringEnd);
}

#[test]
fn colon_equals_splits_at_field_end() {
  let mut lexer = Lexer::new(":=^10}");
  assert_eq!(lex_next(&mut lexer, LexMode::FStringFieldEnd).typ, TT::Colon);
}
