//! MCP server surface: shared context, stdio startup, and tool handlers.
pub mod server;
pub mod tools;
