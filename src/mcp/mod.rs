//! MCP (Model Context Protocol) server surface.
//!
//! Speaks line-delimited JSON-RPC 2.0 on stdin/stdout.  Only the tool
//! subset of the protocol is implemented: `initialize`, `tools/list`, and
//! `tools/call`, which is all a tool-only server needs.

mod protocol;
mod server;

pub use server::McpServer;
