//! Model Context Protocol (MCP) interface for LLM integration
//!
//! Exposes `make_vapi_call` as an MCP tool that agents can discover and use.
//! The server is stateless and communicates over HTTP (`POST /mcp`, see the
//! `web` module) or stdio.

mod server;
mod types;

pub use server::{McpServer, TOOL_NAME};
pub use types::*;
