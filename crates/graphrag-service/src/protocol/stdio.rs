//! stdio Transport
//!
//! Reads line-delimited JSON-RPC requests from standard input and writes one
//! response per line to standard output, flushing after each. Requests are
//! fully resolved in arrival order; responses come back in the same order.
//! EOF on stdin ends the loop cleanly.

use std::io::{self, BufRead, BufReader, Write};

use serde_json::Value;
use tracing::{debug, error, warn};

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::server::RpcServer;

/// stdio transport driving an [`RpcServer`].
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Run the request loop until EOF.
    pub fn run(self, server: RpcServer) -> Result<(), io::Error> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let reader = BufReader::new(stdin.lock());
        let mut stdout = stdout.lock();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to read line: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            debug!("received {} bytes", line.len());

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    warn!("failed to parse request: {}", e);
                    // Salvage the id when the line is at least valid JSON
                    let id = serde_json::from_str::<Value>(&line)
                        .ok()
                        .and_then(|v| v.get("id").cloned());
                    let response = JsonRpcResponse::error(id, JsonRpcError::parse_error());
                    Self::write_response(&mut stdout, &response)?;
                    continue;
                }
            };

            let response = server.handle_request(request);
            Self::write_response(&mut stdout, &response)?;
        }

        Ok(())
    }

    fn write_response(
        stdout: &mut impl Write,
        response: &JsonRpcResponse,
    ) -> Result<(), io::Error> {
        match serde_json::to_string(response) {
            Ok(json) => {
                debug!("sending {} bytes", json.len());
                writeln!(stdout, "{}", json)?;
            }
            Err(e) => {
                error!("failed to serialize response: {}", e);
                // Minimal error response so the client doesn't hang
                let fallback = r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":0}"#;
                writeln!(stdout, "{}", fallback)?;
            }
        }
        stdout.flush()
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
