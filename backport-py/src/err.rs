use parse_py::error::SyntaxError;
use parse_py::loc::Loc;
use std::io;
use std::path::PathBuf;

/// Errors raised while lowering a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
  /// The construct has no lowering. The file can't be backported.
  #[error("unsupported {construct} at [{}:{}]", loc.0, loc.1)]
  Unsupported { construct: String, loc: Loc },

  /// A pass produced or encountered a tree it should never see; this is a bug.
  #[error("invariant violated: {message}")]
  Invariant { message: String, loc: Option<Loc> },
}

impl LowerError {
  pub fn unsupported(construct: impl Into<String>, loc: Loc) -> LowerError {
    LowerError::Unsupported {
      construct: construct.into(),
      loc,
    }
  }

  pub fn invariant(message: impl Into<String>, loc: Option<Loc>) -> LowerError {
    LowerError::Invariant {
      message: message.into(),
      loc,
    }
  }

  pub fn is_unsupported(&self) -> bool {
    matches!(self, LowerError::Unsupported { .. })
  }

  pub fn loc(&self) -> Option<Loc> {
    match self {
      LowerError::Unsupported { loc, .. } => Some(*loc),
      LowerError::Invariant { loc, .. } => *loc,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
  #[error("unsupported major version {0}; only Python 3 targets exist")]
  Major(u32),

  #[error("malformed target version {0:?}")]
  Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
  #[error("syntax error: {0}")]
  Syntax(#[from] SyntaxError),

  #[error(transparent)]
  Lower(#[from] LowerError),

  #[error(transparent)]
  Version(#[from] VersionError),

  #[error("{}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("invalid glob: {0}")]
  Glob(#[from] globset::Error),

  /// A failure while transferring one file of a batch.
  #[error("{}: {source}", path.display())]
  InFile {
    path: PathBuf,
    #[source]
    source: Box<TransferError>,
  },
}

impl TransferError {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> TransferError {
    TransferError::Io {
      path: path.into(),
      source,
    }
  }

  pub fn in_file(path: impl Into<PathBuf>, source: TransferError) -> TransferError {
    match source {
      // I/O errors already name their path.
      e @ TransferError::Io { .. } | e @ TransferError::InFile { .. } => e,
      e => TransferError::InFile {
        path: path.into(),
        source: Box::new(e),
      },
    }
  }
}

pub type LowerResult<T> = Result<T, LowerError>;
