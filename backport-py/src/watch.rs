//! Polling file watcher that keeps a destination in sync with a source file or tree.
//!
//! A watcher starts with an empty snapshot, so its first poll reports every existing file as created and the first session step transfers everything.
use crate::err::TransferError;
use crate::fs::discover;
use crate::fs::transfer_file;
use crate::pipeline::TargetVersion;
use ahash::RandomState;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use tracing::debug;
use tracing::error;
use tracing::info;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Fingerprint {
  mtime: Option<SystemTime>,
  len: u64,
  hash: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChangeKind {
  Created,
  Modified,
  Removed,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Change {
  pub kind: ChangeKind,
  pub path: PathBuf,
}

#[derive(Clone, Debug)]
enum Watched {
  File(PathBuf),
  Dir(PathBuf),
}

pub struct Watcher {
  watched: Watched,
  // Fixed seeds, so fingerprints are comparable across polls.
  hasher: RandomState,
  snapshot: BTreeMap<PathBuf, Fingerprint>,
}

impl Watcher {
  fn new(watched: Watched) -> Watcher {
    Watcher {
      watched,
      hasher: RandomState::with_seeds(0x6261, 0x636b, 0x706f, 0x7274),
      snapshot: BTreeMap::new(),
    }
  }

  pub fn file(path: impl Into<PathBuf>) -> Watcher {
    Watcher::new(Watched::File(path.into()))
  }

  /// Watches every `*.py` file under `root`.
  pub fn dir(root: impl Into<PathBuf>) -> Watcher {
    Watcher::new(Watched::Dir(root.into()))
  }

  fn fingerprint(&self, path: &Path) -> io::Result<Fingerprint> {
    let meta = fs::metadata(path)?;
    let bytes = fs::read(path)?;
    Ok(Fingerprint {
      mtime: meta.modified().ok(),
      len: meta.len(),
      hash: self.hasher.hash_one(&bytes),
    })
  }

  fn scan(&self) -> Result<BTreeMap<PathBuf, Fingerprint>, TransferError> {
    let paths = match &self.watched {
      Watched::File(path) if path.is_file() => vec![path.clone()],
      Watched::File(_) => Vec::new(),
      Watched::Dir(root) if root.is_dir() => discover(root)?,
      Watched::Dir(_) => Vec::new(),
    };
    let mut scan = BTreeMap::new();
    for path in paths {
      match self.fingerprint(&path) {
        Ok(fp) => {
          scan.insert(path, fp);
        }
        // Removed between listing and reading; the next poll reports it.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(TransferError::io(path, e)),
      };
    }
    Ok(scan)
  }

  /// Changes since the previous poll, sorted by path.
  pub fn poll(&mut self) -> Result<Vec<Change>, TransferError> {
    let scan = self.scan()?;
    let mut changes = Vec::new();
    for (path, fp) in scan.iter() {
      let kind = match self.snapshot.get(path) {
        None => ChangeKind::Created,
        Some(prev) if prev != fp => ChangeKind::Modified,
        Some(_) => continue,
      };
      changes.push(Change {
        kind,
        path: path.clone(),
      });
    }
    for path in self.snapshot.keys() {
      if !scan.contains_key(path) {
        changes.push(Change {
          kind: ChangeKind::Removed,
          path: path.clone(),
        });
      };
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    self.snapshot = scan;
    Ok(changes)
  }
}

/// Mirrors a watched source into a destination, backporting each change.
pub struct WatchSession {
  watcher: Watcher,
  src: PathBuf,
  dst: PathBuf,
  target: TargetVersion,
}

impl WatchSession {
  pub fn file(src: impl Into<PathBuf>, dst: impl Into<PathBuf>, target: TargetVersion) -> WatchSession {
    let src = src.into();
    WatchSession {
      watcher: Watcher::file(src.clone()),
      src,
      dst: dst.into(),
      target,
    }
  }

  pub fn dir(src_dir: impl Into<PathBuf>, dst_dir: impl Into<PathBuf>, target: TargetVersion) -> WatchSession {
    let src = src_dir.into();
    WatchSession {
      watcher: Watcher::dir(src.clone()),
      src,
      dst: dst_dir.into(),
      target,
    }
  }

  fn destination(&self, path: &Path) -> PathBuf {
    match &self.watcher.watched {
      Watched::File(_) => self.dst.clone(),
      Watched::Dir(_) => self.dst.join(path.strip_prefix(&self.src).unwrap_or(path)),
    }
  }

  /// Polls once and handles every change. Failures on individual files are logged and skipped.
  pub fn step(&mut self) -> Result<Vec<Change>, TransferError> {
    let changes = self.watcher.poll()?;
    for change in changes.iter() {
      let dst = self.destination(&change.path);
      debug!(path = %change.path.display(), kind = ?change.kind, "change");
      match change.kind {
        ChangeKind::Created | ChangeKind::Modified => {
          if let Err(err) = transfer_file(&change.path, &dst, self.target) {
            error!(path = %change.path.display(), error = %err, "transfer failed");
          };
        }
        ChangeKind::Removed => match fs::remove_file(&dst) {
          Ok(()) => info!(path = %dst.display(), "removed"),
          Err(e) if e.kind() == io::ErrorKind::NotFound => {}
          Err(e) => error!(path = %dst.display(), error = %e, "remove failed"),
        },
      };
    }
    Ok(changes)
  }

  /// Steps every `interval` until `stop` returns true. `stop` is checked before each step.
  pub fn run(&mut self, interval: Duration, mut stop: impl FnMut() -> bool) -> Result<(), TransferError> {
    while !stop() {
      self.step()?;
      std::thread::sleep(interval);
    }
    Ok(())
  }
}
