//! JSON-RPC Protocol
//!
//! Line-delimited JSON-RPC 2.0 over stdin/stdout: one request per line, one
//! response per line, empty lines ignored.

pub mod stdio;
pub mod types;

pub use stdio::StdioTransport;
pub use types::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
