//! HTTP transport for the MCP server
//!
//! Serves the stateless streamable-HTTP endpoint at `/mcp` plus a
//! `/health` probe for hosting platforms.

mod routes;
mod server;

pub use server::{AppState, WebConfig, WebServer};
