//! Rewrites Python source that uses newer syntax into equivalent source for older interpreters.
//!
//! Four rule sets are supported:
//! - `match` statements become `if`/`elif`/`else` chains.
//! - Type parameters on functions, classes and `type` aliases become `TypeVar` declarations, wrapper functions and `Generic` bases.
//! - `X | Y` in annotations becomes `Union[X, Y]`, and in `isinstance`/`issubclass` a tuple.
//! - f-strings become `str.format` calls.
//!
//! Code that needs none of these comes back byte-for-byte unchanged.
//!
//! ```
//! let out = backport_py::transfer("x: int | None = None\n", "3.8").unwrap();
//! assert_eq!(out, "from typing import Union\n\nx: Union[int, None] = None\n");
//! ```
pub mod err;
pub mod fresh;
pub mod fs;
pub mod hook;
pub mod imports;
pub mod lower;
pub mod pipeline;
pub mod replace;
pub mod watch;

pub use err::TransferError;
pub use fs::transfer_dir;
pub use fs::transfer_file;
pub use fs::BatchPolicy;
pub use fs::BatchReport;
pub use hook::BuildHook;
pub use hook::BuildPlan;
pub use pipeline::rules_for_target;
pub use pipeline::transfer;
pub use pipeline::transfer_to;
pub use pipeline::transfer_with_rules;
pub use pipeline::RuleSet;
pub use pipeline::TargetVersion;
pub use watch::WatchSession;
