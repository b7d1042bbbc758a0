//! MCP adapter over the chart service

mod tools;

pub use tools::AstrolabeServer;
