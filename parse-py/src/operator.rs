use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Associativity {
  Left,
  Right,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum OperatorName {
  Addition,
  And,
  BitwiseAnd,
  BitwiseLeftShift,
  BitwiseNot,
  BitwiseOr,
  BitwiseRightShift,
  BitwiseXor,
  Division,
  Equality,
  Exponentiation,
  FloorDivision,
  GreaterThan,
  GreaterThanOrEqual,
  In,
  Inequality,
  Is,
  IsNot,
  LessThan,
  LessThanOrEqual,
  MatrixMultiplication,
  Multiplication,
  Not,
  NotIn,
  Or,
  Remainder,
  Subtraction,
  UnaryNegation,
  UnaryPlus,
}

pub struct Operator {
  pub name: OperatorName,
  pub precedence: u8,
  pub associativity: Associativity,
}

// Precedence levels of the expression forms that are not operators, from loosest to tightest binding.
pub const PRECEDENCE_NAMED_EXPR: u8 = 1;
pub const PRECEDENCE_LAMBDA: u8 = 2;
pub const PRECEDENCE_IF_ELSE: u8 = 3;
pub const PRECEDENCE_OR: u8 = 4;
pub const PRECEDENCE_AND: u8 = 5;
pub const PRECEDENCE_NOT: u8 = 6;
pub const PRECEDENCE_COMPARISON: u8 = 7;
pub const PRECEDENCE_UNARY: u8 = 14;
pub const PRECEDENCE_AWAIT: u8 = 16;
pub const PRECEDENCE_PRIMARY: u8 = 17;

const PRECEDENCE_LEVELS: &[&[(OperatorName, Associativity)]] = &[
  // Level 1 is named expressions, 2 is lambda, 3 is conditional.
  &[],
  &[],
  &[],
  &[(OperatorName::Or, Associativity::Left)],
  &[(OperatorName::And, Associativity::Left)],
  &[(OperatorName::Not, Associativity::Right)],
  &[
    (OperatorName::Equality, Associativity::Left),
    (OperatorName::GreaterThan, Associativity::Left),
    (OperatorName::GreaterThanOrEqual, Associativity::Left),
    (OperatorName::In, Associativity::Left),
    (OperatorName::Inequality, Associativity::Left),
    (OperatorName::Is, Associativity::Left),
    (OperatorName::IsNot, Associativity::Left),
    (OperatorName::LessThan, Associativity::Left),
    (OperatorName::LessThanOrEqual, Associativity::Left),
    (OperatorName::NotIn, Associativity::Left),
  ],
  &[(OperatorName::BitwiseOr, Associativity::Left)],
  &[(OperatorName::BitwiseXor, Associativity::Left)],
  &[(OperatorName::BitwiseAnd, Associativity::Left)],
  &[
    (OperatorName::BitwiseLeftShift, Associativity::Left),
    (OperatorName::BitwiseRightShift, Associativity::Left),
  ],
  &[
    (OperatorName::Addition, Associativity::Left),
    (OperatorName::Subtraction, Associativity::Left),
  ],
  &[
    (OperatorName::Division, Associativity::Left),
    (OperatorName::FloorDivision, Associativity::Left),
    (OperatorName::MatrixMultiplication, Associativity::Left),
    (OperatorName::Multiplication, Associativity::Left),
    (OperatorName::Remainder, Associativity::Left),
  ],
  &[
    (OperatorName::BitwiseNot, Associativity::Right),
    (OperatorName::UnaryNegation, Associativity::Right),
    (OperatorName::UnaryPlus, Associativity::Right),
  ],
  &[(OperatorName::Exponentiation, Associativity::Right)],
];

pub static OPERATORS: Lazy<HashMap<OperatorName, Operator>> = Lazy::new(|| {
  let mut map = HashMap::<OperatorName, Operator>::new();
  for (i, level) in PRECEDENCE_LEVELS.iter().enumerate() {
    let precedence = (i + 1) as u8;
    for &(name, associativity) in level.iter() {
      map.insert(name, Operator {
        name,
        precedence,
        associativity,
      });
    }
  }
  map
});

#[rustfmt::skip]
pub static BINARY_OPERATOR_MAPPING: Lazy<HashMap<TT, &'static Operator>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static Operator>::new();
  map.insert(TT::Ampersand, &OPERATORS[&OperatorName::BitwiseAnd]);
  map.insert(TT::Asterisk, &OPERATORS[&OperatorName::Multiplication]);
  map.insert(TT::AsteriskAsterisk, &OPERATORS[&OperatorName::Exponentiation]);
  map.insert(TT::At, &OPERATORS[&OperatorName::MatrixMultiplication]);
  map.insert(TT::Bar, &OPERATORS[&OperatorName::BitwiseOr]);
  map.insert(TT::Caret, &OPERATORS[&OperatorName::BitwiseXor]);
  map.insert(TT::ChevronLeftChevronLeft, &OPERATORS[&OperatorName::BitwiseLeftShift]);
  map.insert(TT::ChevronRightChevronRight, &OPERATORS[&OperatorName::BitwiseRightShift]);
  map.insert(TT::Hyphen, &OPERATORS[&OperatorName::Subtraction]);
  map.insert(TT::KeywordAnd, &OPERATORS[&OperatorName::And]);
  map.insert(TT::KeywordOr, &OPERATORS[&OperatorName::Or]);
  map.insert(TT::Percent, &OPERATORS[&OperatorName::Remainder]);
  map.insert(TT::Plus, &OPERATORS[&OperatorName::Addition]);
  map.insert(TT::Slash, &OPERATORS[&OperatorName::Division]);
  map.insert(TT::SlashSlash, &OPERATORS[&OperatorName::FloorDivision]);
  map
});

// `not in` and `is not` span two tokens and are handled by the parser.
#[rustfmt::skip]
pub static COMPARISON_OPERATOR_MAPPING: Lazy<HashMap<TT, &'static Operator>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static Operator>::new();
  map.insert(TT::ChevronLeft, &OPERATORS[&OperatorName::LessThan]);
  map.insert(TT::ChevronLeftEquals, &OPERATORS[&OperatorName::LessThanOrEqual]);
  map.insert(TT::ChevronRight, &OPERATORS[&OperatorName::GreaterThan]);
  map.insert(TT::ChevronRightEquals, &OPERATORS[&OperatorName::GreaterThanOrEqual]);
  map.insert(TT::EqualsEquals, &OPERATORS[&OperatorName::Equality]);
  map.insert(TT::ExclamationEquals, &OPERATORS[&OperatorName::Inequality]);
  map.insert(TT::KeywordIn, &OPERATORS[&OperatorName::In]);
  map.insert(TT::KeywordIs, &OPERATORS[&OperatorName::Is]);
  map
});

#[rustfmt::skip]
pub static UNARY_OPERATOR_MAPPING: Lazy<HashMap<TT, &'static Operator>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static Operator>::new();
  map.insert(TT::Hyphen, &OPERATORS[&OperatorName::UnaryNegation]);
  map.insert(TT::KeywordNot, &OPERATORS[&OperatorName::Not]);
  map.insert(TT::Plus, &OPERATORS[&OperatorName::UnaryPlus]);
  map.insert(TT::Tilde, &OPERATORS[&OperatorName::BitwiseNot]);
  map
});

impl OperatorName {
  pub fn precedence(self) -> u8 {
    OPERATORS[&self].precedence
  }

  /// Source text of the operator; multi-word operators are separated by a single space.
  pub fn text(self) -> &'static str {
    match self {
      OperatorName::Addition => "+",
      OperatorName::And => "and",
      OperatorName::BitwiseAnd => "&",
      OperatorName::BitwiseLeftShift => "<<",
      OperatorName::BitwiseNot => "~",
      OperatorName::BitwiseOr => "|",
      OperatorName::BitwiseRightShift => ">>",
      OperatorName::BitwiseXor => "^",
      OperatorName::Division => "/",
      OperatorName::Equality => "==",
      OperatorName::Exponentiation => "**",
      OperatorName::FloorDivision => "//",
      OperatorName::GreaterThan => ">",
      OperatorName::GreaterThanOrEqual => ">=",
      OperatorName::In => "in",
      OperatorName::Inequality => "!=",
      OperatorName::Is => "is",
      OperatorName::IsNot => "is not",
      OperatorName::LessThan => "<",
      OperatorName::LessThanOrEqual => "<=",
      OperatorName::MatrixMultiplication => "@",
      OperatorName::Multiplication => "*",
      OperatorName::Not => "not",
      OperatorName::NotIn => "not in",
      OperatorName::Or => "or",
      OperatorName::Remainder => "%",
      OperatorName::Subtraction => "-",
      OperatorName::UnaryNegation => "-",
      OperatorName::UnaryPlus => "+",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn precedence_order() {
    assert!(OperatorName::Or.precedence() < OperatorName::And.precedence());
    assert_eq!(OperatorName::Not.precedence(), PRECEDENCE_NOT);
    assert_eq!(OperatorName::Is.precedence(), PRECEDENCE_COMPARISON);
    assert_eq!(OperatorName::UnaryNegation.precedence(), PRECEDENCE_UNARY);
    assert!(OperatorName::Exponentiation.precedence() < PRECEDENCE_AWAIT);
    assert!(OperatorName::BitwiseOr.precedence() < OperatorName::Addition.precedence());
  }
}
