use crate::err::TransferError;
use crate::pipeline::transfer_to;
use crate::pipeline::TargetVersion;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::instrument;
use walkdir::WalkDir;

/// Backports one file. `dst` may be `src`; nothing is written if the file fails.
#[instrument(skip_all, fields(src = %src.display(), dst = %dst.display(), version = %target))]
pub fn transfer_file(src: &Path, dst: &Path, target: TargetVersion) -> Result<(), TransferError> {
  let source = fs::read_to_string(src).map_err(|e| TransferError::io(src, e))?;
  let output = transfer_to(&source, target)?;
  if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
  };
  fs::write(dst, output).map_err(|e| TransferError::io(dst, e))?;
  info!("transferred");
  Ok(())
}

/// What a batch does when a file fails.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BatchPolicy {
  /// Stop and return the first failure.
  #[default]
  Abort,
  /// Record the failure and carry on with the next file.
  Continue,
}

#[derive(Debug, Default)]
pub struct BatchReport {
  /// Source paths, in the order they were transferred.
  pub transferred: Vec<PathBuf>,
  pub failed: Vec<(PathBuf, TransferError)>,
}

impl BatchReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

pub fn is_python_source(path: &Path) -> bool {
  path.extension().is_some_and(|e| e == "py")
}

/// Every `*.py` file under `root`, sorted.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, TransferError> {
  let mut files = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(root).to_path_buf();
      TransferError::io(path, io::Error::from(e))
    })?;
    if entry.file_type().is_file() && is_python_source(entry.path()) {
      files.push(entry.into_path());
    };
  }
  Ok(files)
}

/// Backports every `*.py` file under `src_dir` to the same relative path under `dst_dir`.
#[instrument(skip_all, fields(src = %src_dir.display(), dst = %dst_dir.display(), version = %target))]
pub fn transfer_dir(
  src_dir: &Path,
  dst_dir: &Path,
  target: TargetVersion,
  policy: BatchPolicy,
) -> Result<BatchReport, TransferError> {
  let mut report = BatchReport::default();
  for src in discover(src_dir)? {
    let relative = src.strip_prefix(src_dir).unwrap_or(&src);
    let dst = dst_dir.join(relative);
    match transfer_file(&src, &dst, target) {
      Ok(()) => report.transferred.push(src),
      Err(err) => match policy {
        BatchPolicy::Abort => return Err(TransferError::in_file(&src, err)),
        BatchPolicy::Continue => {
          tracing::warn!(path = %src.display(), error = %err, "skipping file");
          report.failed.push((src, err));
        }
      },
    };
  }
  info!(
    transferred = report.transferred.len(),
    failed = report.failed.len(),
    "transferred directory"
  );
  Ok(report)
}
