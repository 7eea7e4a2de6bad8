//! stdio transport: line-delimited JSON-RPC over stdin/stdout.

use std::io::{self, BufRead, BufReader, Write};

use tracing::{debug, error, warn};

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::server::McpServer;

/// Minimal fallback when even error serialization fails; keeps the client
/// from hanging on a silent request.
const FALLBACK_ERROR: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// stdio transport for the MCP server.
pub struct StdioTransport;

impl StdioTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs the server until stdin closes.
    ///
    /// Requests on a single connection are sequential, so lines are
    /// processed one at a time; tool handlers still run on the blocking
    /// pool inside [`McpServer`].
    ///
    /// # Errors
    ///
    /// Returns an error only when stdout becomes unwritable.
    pub async fn run(self, server: McpServer) -> Result<(), io::Error> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let reader = BufReader::new(stdin.lock());
        let mut stdout = stdout.lock();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to read line: {e}");
                    break;
                },
            };
            if line.trim().is_empty() {
                continue;
            }
            debug!("received {} bytes", line.len());

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    warn!("failed to parse request: {e}");
                    Self::send(&mut stdout, &JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(),
                    ))?;
                    continue;
                },
            };

            if let Some(response) = server.handle_request(request).await {
                Self::send(&mut stdout, &response)?;
            }
        }
        Ok(())
    }

    fn send(stdout: &mut impl Write, response: &JsonRpcResponse) -> Result<(), io::Error> {
        match serde_json::to_string(response) {
            Ok(json) => {
                debug!("sending {} bytes", json.len());
                writeln!(stdout, "{json}")?;
            },
            Err(e) => {
                error!("failed to serialize response: {e}");
                writeln!(stdout, "{FALLBACK_ERROR}")?;
            },
        }
        stdout.flush()
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}
