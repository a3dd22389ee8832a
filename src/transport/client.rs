use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::thread;

use serde_json::{Value, json};

use crate::error::AgentError;
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

/// A persistent connection to the automation backend server.
///
/// Spawns a long-lived child process speaking JSON-RPC 2.0, one JSON object
/// per line over stdin/stdout. Requests carry monotonically increasing ids;
/// notifications carry none. The child's stderr is relayed on a side thread
/// that never touches automation state.
pub struct McpTransport {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    request_id: u64,
    verbose: bool,
}

impl McpTransport {
    /// Spawn the backend command and perform the initialize handshake.
    pub fn launch(command: &str, args: &[String], verbose: bool) -> Result<Self, AgentError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AgentError::SubprocessSpawn {
                command: command.to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::TransportIo("Failed to capture backend stdin".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::TransportIo("Failed to capture backend stdout".into()))?;

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        eprintln!("[backend] {}", line.trim());
                    }
                }
            });
        }

        let mut transport = McpTransport {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_id: 0,
            verbose,
        };

        transport.initialize()?;
        Ok(transport)
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Send a request and block until the correlated response line arrives.
    pub fn send_request(&mut self, method: &str, params: Value) -> Result<Value, AgentError> {
        let id = self.next_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        self.write_line(&request)?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| AgentError::TransportIo(format!("Failed to read backend response: {}", e)))?;

        if line.trim().is_empty() {
            return Err(AgentError::TransportIo(
                "No response from backend (process may have died)".into(),
            ));
        }

        if self.verbose {
            eprintln!("<- {}", line.trim());
        }

        let response: Value = serde_json::from_str(line.trim()).map_err(|e| AgentError::JsonParse {
            context: "backend response".into(),
            source: e,
        })?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(AgentError::Rpc {
                method: method.to_string(),
                message,
            });
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    pub fn send_notification(&mut self, method: &str, params: Value) -> Result<(), AgentError> {
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write_line(&notification)
    }

    fn write_line(&mut self, message: &Value) -> Result<(), AgentError> {
        let text = serde_json::to_string(message).map_err(|e| AgentError::JsonSerialize {
            context: "backend request".into(),
            source: e,
        })?;

        if self.verbose {
            eprintln!("-> {}", text);
        }

        writeln!(self.stdin, "{}", text)
            .map_err(|e| AgentError::TransportIo(format!("Failed to write to backend stdin: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| AgentError::TransportIo(format!("Failed to flush backend stdin: {}", e)))
    }

    fn initialize(&mut self) -> Result<(), AgentError> {
        self.send_request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "clientInfo": { "name": "mobile-agent", "version": env!("CARGO_PKG_VERSION") },
            }),
        )?;
        self.send_notification("notifications/initialized", json!({}))
    }

    pub fn list_tools(&mut self) -> Result<Value, AgentError> {
        self.send_request("tools/list", json!({}))
    }

    /// Terminate the backend process. Best-effort; safe to call twice.
    pub fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Backend for McpTransport {
    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError> {
        let result = self.send_request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )?;
        Ok(ToolOutcome::from_rpc_result(&result))
    }
}

impl Drop for McpTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
