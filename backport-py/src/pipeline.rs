use crate::err::LowerResult;
use crate::err::TransferError;
use crate::err::VersionError;
use crate::imports::add_imports;
use crate::imports::ImportRequests;
use crate::lower::fstring::lower_fstrings;
use crate::lower::match_stmt::lower_matches;
use crate::lower::type_params::lower_type_params;
use crate::lower::union::lower_unions;
use parse_py::ast::node::Node;
use parse_py::ast::stmt::Module;
use parse_py::parse;
use parse_py::print;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use tracing::instrument;

/// A Python 3 release that output must run on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct TargetVersion {
  pub major: u32,
  pub minor: u32,
}

impl TargetVersion {
  pub const PY38: TargetVersion = TargetVersion { major: 3, minor: 8 };

  pub fn new(major: u32, minor: u32) -> Result<TargetVersion, VersionError> {
    if major != 3 {
      return Err(VersionError::Major(major));
    };
    Ok(TargetVersion { major, minor })
  }

  /// The wheel tag for the version, e.g. `py38`.
  pub fn python_tag(&self) -> String {
    format!("py{}{}", self.major, self.minor)
  }
}

impl Default for TargetVersion {
  fn default() -> Self {
    TargetVersion::PY38
  }
}

impl fmt::Display for TargetVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

fn number(raw: &str, digits: &str) -> Result<u32, VersionError> {
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return Err(VersionError::Malformed(raw.to_string()));
  };
  digits
    .parse()
    .map_err(|_| VersionError::Malformed(raw.to_string()))
}

/// Accepts `3.8`, `py38`, `38`, `3.10`, `py310` and `310`.
impl FromStr for TargetVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let raw = s.trim();
    let (major, minor) = match raw.split_once('.') {
      Some((major, minor)) => (number(s, major)?, number(s, minor)?),
      None => {
        let digits = raw.strip_prefix("py").unwrap_or(raw);
        if digits.len() < 2 {
          return Err(VersionError::Malformed(s.to_string()));
        };
        // The major version is a single digit in every compact spelling.
        let (major, minor) = digits.split_at(1);
        (number(s, major)?, number(s, minor)?)
      }
    };
    TargetVersion::new(major, minor)
  }
}

/// A family of syntax rewrites, named after the PEP that introduced the syntax.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum RuleSet {
  /// `X | Y` unions (3.10).
  Pep604,
  /// `match` statements (3.10).
  Pep622,
  /// Type-parameter syntax (3.12).
  Pep695,
  /// f-strings (3.12 grammar).
  Pep701,
}

impl RuleSet {
  pub fn name(self) -> &'static str {
    match self {
      RuleSet::Pep604 => "pep604",
      RuleSet::Pep622 => "pep622",
      RuleSet::Pep695 => "pep695",
      RuleSet::Pep701 => "pep701",
    }
  }
}

/// The rule sets needed to run on `target`, in the order they must be applied. Type parameters go before unions so that unions in bounds and aliases are lowered with them.
pub fn rules_for_target(target: TargetVersion) -> Vec<RuleSet> {
  let mut rules = Vec::new();
  if target.minor < 12 {
    rules.extend([RuleSet::Pep695, RuleSet::Pep701]);
  };
  if target.minor < 10 {
    rules.extend([RuleSet::Pep622, RuleSet::Pep604]);
  };
  rules
}

/// Runs the passes for `rules` in order, then adds the imports they need.
pub fn transform(module: Node<Module>, rules: &[RuleSet]) -> LowerResult<Node<Module>> {
  let mut requests = ImportRequests::new();
  let mut module = module;
  for &rule in rules {
    debug!(rule = rule.name(), "running pass");
    module = match rule {
      RuleSet::Pep604 => lower_unions(module, &mut requests)?,
      RuleSet::Pep622 => lower_matches(module, &mut requests)?,
      RuleSet::Pep695 => lower_type_params(module, &mut requests)?,
      RuleSet::Pep701 => lower_fstrings(module, &mut requests)?,
    };
  }
  Ok(add_imports(module, &requests))
}

pub fn render(module: &Node<Module>) -> String {
  print(module)
}

/// Backports `source` so it runs on `target`, e.g. `"3.8"`.
#[instrument(skip_all, fields(version = %target))]
pub fn transfer(source: &str, target: &str) -> Result<String, TransferError> {
  let target: TargetVersion = target.parse()?;
  transfer_to(source, target)
}

pub fn transfer_to(source: &str, target: TargetVersion) -> Result<String, TransferError> {
  transfer_with_rules(source, &rules_for_target(target))
}

pub fn transfer_with_rules(source: &str, rules: &[RuleSet]) -> Result<String, TransferError> {
  let module = parse(source)?;
  let module = transform(module, rules)?;
  Ok(render(&module))
}
