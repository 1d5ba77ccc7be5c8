//! Transports
//!
//! Both transports hand raw message text to [`McpServer`](crate::McpServer)
//! and forward what comes back.
//!
//! - [`sse`]: HTTP server, one event stream per client session
//! - [`stdio`]: newline-delimited JSON-RPC on stdin/stdout, one client

pub mod sse;
pub mod stdio;

pub use sse::{SseState, router};
pub use stdio::{run_stdio, serve_lines};
