//! Child-process runner for forge-mcp
//!
//! Every local version-control operation the server performs goes through a
//! [`ShellRunner`]. The production runner, [`SystemShell`], spawns one
//! isolated child process per invocation with its working directory set to
//! the target repository; the parent's working directory and environment
//! are never touched.
//!
//! [`Git`] layers the handful of git commands the server needs on top of any
//! runner, so tests can swap in a recording runner and observe the exact
//! command lines issued.

pub mod error;
pub mod git;
pub mod runner;

pub use error::{ExecutionError, Result};
pub use git::Git;
pub use runner::{CommandLine, CommandOutput, ShellRunner, SystemShell};
