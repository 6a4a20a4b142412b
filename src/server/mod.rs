//! Front-ends. Each one turns inbound requests into `ToolRouter::dispatch`
//! calls and relays the envelope back over its own transport.

pub mod http;
pub mod mcp;

pub use http::{app, routes};
pub use mcp::GatewayMcpServer;
