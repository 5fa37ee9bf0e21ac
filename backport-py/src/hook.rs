//! Build-backend integration: backports a package's sources into a build directory before they are packed into a wheel.
//!
//! Configuration lives in `pyproject.toml`:
//!
//! ```toml
//! [tool.backport-py]
//! target = "3.8"
//! package-dir = "src"
//! includes = ["**/*.py"]
//! excludes = ["**/_vendor/**"]
//! ```
//!
//! The `BACKPORT_PY_TARGET` environment variable overrides `target`.
use crate::err::TransferError;
use crate::fs::transfer_file;
use crate::pipeline::TargetVersion;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::instrument;
use walkdir::WalkDir;

pub const TARGET_ENV: &str = "BACKPORT_PY_TARGET";

#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HookConfig {
  pub target: Option<String>,
  pub package_dir: PathBuf,
  /// Globs relative to the package dir.
  pub includes: Vec<String>,
  pub excludes: Vec<String>,
}

impl Default for HookConfig {
  fn default() -> Self {
    HookConfig {
      target: None,
      package_dir: PathBuf::from("src"),
      includes: vec!["**/*.py".to_string()],
      excludes: Vec::new(),
    }
  }
}

#[derive(Default, Deserialize)]
struct PyProject {
  #[serde(default)]
  tool: Tool,
}

#[derive(Default, Deserialize)]
struct Tool {
  #[serde(rename = "backport-py", default)]
  backport_py: HookConfig,
}

impl HookConfig {
  /// Reads `[tool.backport-py]` from the contents of a `pyproject.toml`. A missing table means the defaults.
  pub fn from_pyproject(raw: &str) -> Result<HookConfig, TransferError> {
    let project: PyProject = toml::from_str(raw).map_err(|e| TransferError::Config(e.to_string()))?;
    Ok(project.tool.backport_py)
  }
}

/// The override wins over the configured target; with neither, the target is 3.8.
pub fn resolve_target(env_override: Option<&str>, config: &HookConfig) -> Result<TargetVersion, TransferError> {
  let raw = env_override
    .filter(|v| !v.trim().is_empty())
    .or(config.target.as_deref());
  Ok(match raw {
    Some(raw) => raw.parse()?,
    None => TargetVersion::default(),
  })
}

fn glob_set(globs: &[String]) -> Result<GlobSet, TransferError> {
  let mut builder = GlobSetBuilder::new();
  for raw in globs {
    builder.add(Glob::new(raw)?);
  }
  Ok(builder.build()?)
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct BuildPlan {
  pub python_tag: String,
  /// Source path relative to the package dir, to the output path in the build dir.
  pub files: BTreeMap<PathBuf, PathBuf>,
}

pub struct BuildHook {
  project_root: PathBuf,
  config: HookConfig,
  target: TargetVersion,
}

impl BuildHook {
  pub fn new(project_root: impl Into<PathBuf>, config: HookConfig, env_override: Option<&str>) -> Result<BuildHook, TransferError> {
    let target = resolve_target(env_override, &config)?;
    Ok(BuildHook {
      project_root: project_root.into(),
      config,
      target,
    })
  }

  /// Reads `pyproject.toml` under `project_root`, if any, and the target override from the environment.
  pub fn load(project_root: impl Into<PathBuf>) -> Result<BuildHook, TransferError> {
    let project_root = project_root.into();
    let pyproject = project_root.join("pyproject.toml");
    let config = match fs::read_to_string(&pyproject) {
      Ok(raw) => HookConfig::from_pyproject(&raw)?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => HookConfig::default(),
      Err(e) => return Err(TransferError::io(pyproject, e)),
    };
    let env = std::env::var(TARGET_ENV).ok();
    BuildHook::new(project_root, config, env.as_deref())
  }

  pub fn config(&self) -> &HookConfig {
    &self.config
  }

  pub fn target(&self) -> TargetVersion {
    self.target
  }

  pub fn package_dir(&self) -> PathBuf {
    self.project_root.join(&self.config.package_dir)
  }

  /// Lists the included sources and where each lands in `build_dir`, without touching the disk beyond reading the package dir.
  pub fn plan(&self, build_dir: &Path) -> Result<BuildPlan, TransferError> {
    let includes = glob_set(&self.config.includes)?;
    let excludes = glob_set(&self.config.excludes)?;
    let package_dir = self.package_dir();
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(&package_dir).sort_by_file_name() {
      let entry = entry.map_err(|e| {
        let path = e.path().unwrap_or(package_dir.as_path()).to_path_buf();
        TransferError::io(path, io::Error::from(e))
      })?;
      if !entry.file_type().is_file() {
        continue;
      };
      let Ok(relative) = entry.path().strip_prefix(&package_dir) else {
        continue;
      };
      if includes.is_match(relative) && !excludes.is_match(relative) {
        files.insert(relative.to_path_buf(), build_dir.join(relative));
      };
    }
    Ok(BuildPlan {
      python_tag: self.target.python_tag(),
      files,
    })
  }

  /// Backports every planned file into `build_dir`. The first failure aborts the build.
  #[instrument(skip_all, fields(build_dir = %build_dir.display(), version = %self.target))]
  pub fn run(&self, build_dir: &Path) -> Result<BuildPlan, TransferError> {
    let plan = self.plan(build_dir)?;
    let package_dir = self.package_dir();
    for (relative, output) in plan.files.iter() {
      let src = package_dir.join(relative);
      transfer_file(&src, output, self.target).map_err(|e| TransferError::in_file(&src, e))?;
    }
    info!(files = plan.files.len(), tag = %plan.python_tag, "build hook finished");
    Ok(plan)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_without_table() {
    let config = HookConfig::from_pyproject("[project]\nname = \"demo\"\n").unwrap();
    assert_eq!(config, HookConfig::default());
    assert_eq!(config.package_dir, PathBuf::from("src"));
    assert_eq!(config.includes, vec!["**/*.py"]);
  }

  #[test]
  fn test_reads_table() {
    let config = HookConfig::from_pyproject(
      "[tool.backport-py]\ntarget = \"3.9\"\npackage-dir = \"lib\"\nexcludes = [\"**/skip_*.py\"]\n",
    )
    .unwrap();
    assert_eq!(config.target.as_deref(), Some("3.9"));
    assert_eq!(config.package_dir, PathBuf::from("lib"));
    assert_eq!(config.includes, vec!["**/*.py"]);
    assert_eq!(config.excludes, vec!["**/skip_*.py"]);
  }

  #[test]
  fn test_rejects_unknown_keys() {
    let err = HookConfig::from_pyproject("[tool.backport-py]\ntargte = \"3.9\"\n").unwrap_err();
    assert!(matches!(err, TransferError::Config(_)));
  }

  #[test]
  fn test_target_precedence() {
    let mut config = HookConfig::default();
    assert_eq!(resolve_target(None, &config).unwrap(), TargetVersion::PY38);
    config.target = Some("3.9".to_string());
    assert_eq!(resolve_target(None, &config).unwrap(), TargetVersion { major: 3, minor: 9 });
    assert_eq!(resolve_target(Some("3.10"), &config).unwrap(), TargetVersion { major: 3, minor: 10 });
    assert_eq!(resolve_target(Some(""), &config).unwrap(), TargetVersion { major: 3, minor: 9 });
    assert!(matches!(
      resolve_target(Some("2.7"), &config),
      Err(TransferError::Version(_))
    ));
  }
}
