//! Shared test utilities for the forge-mcp workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: real git repositories in temporary directories
//! - [`shell`]: [`RecordingShell`], a runner that records every command line
//! - [`host`]: [`StubHost`], an in-memory source host

pub mod git;
pub mod host;
pub mod shell;

pub use git::{TempRepo, head_hash};
pub use host::StubHost;
pub use shell::RecordingShell;
