//! MCP server loop (read, dispatch, respond).

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListResourcesResult, ListToolsResult, ReadResourceParams,
    ReadResourceResult, Resource, ResourcesCapability, ServerCapabilities, ServerInfo, Tool,
    ToolsCapability,
};

/// Protocol version answered to `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Maximum size of a single inbound message (1MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Serves tools and resources to an MCP client.
///
/// Tool and resource failures that the caller should see as protocol errors
/// are returned as [`JsonRpcError`]; failures the model should read are
/// returned as a [`CallToolResult`] with `is_error` set.
pub trait Handler: Send + Sync {
    fn server_info(&self) -> ServerInfo;

    fn instructions(&self) -> Option<String> {
        None
    }

    fn list_tools(&self) -> Vec<Tool>;

    fn call_tool(
        &self,
        params: CallToolParams,
    ) -> impl Future<Output = std::result::Result<CallToolResult, JsonRpcError>> + Send;

    fn list_resources(&self) -> Vec<Resource>;

    fn read_resource(
        &self,
        uri: &str,
    ) -> impl Future<Output = std::result::Result<ReadResourceResult, JsonRpcError>> + Send;
}

/// A line-delimited JSON-RPC server driving a [`Handler`].
pub struct Server<H> {
    handler: H,
    initialized: bool,
}

impl<H: Handler> Server<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve one message per line from `reader`, writing responses to `writer`.
    ///
    /// Lines longer than [`MAX_MESSAGE_SIZE`] are never buffered whole: the
    /// remainder is skipped and answered with an invalid-request error. Lines
    /// that are not UTF-8 are answered with a parse error. Either way the
    /// loop keeps serving.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = (&mut reader)
                .take(MAX_MESSAGE_SIZE as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await?;
            if bytes_read == 0 {
                debug!("input closed, stopping server");
                break;
            }

            let response = if buf.len() > MAX_MESSAGE_SIZE && buf.last() != Some(&b'\n') {
                let size = buf.len() + skip_line(&mut reader).await?;
                warn!(size, "message too large");
                Some(too_large(size))
            } else {
                match std::str::from_utf8(&buf) {
                    Ok(line) => self.handle_line(line).await,
                    Err(e) => {
                        warn!(error = %e, "message is not valid UTF-8");
                        Some(JsonRpcResponse::failure(
                            None,
                            JsonRpcError::parse_error(format!("message is not valid UTF-8: {e}")),
                        ))
                    }
                }
            };

            let Some(response) = response else {
                continue;
            };

            let response_json = serde_json::to_string(&response)?;
            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok(())
    }

    /// Handle one raw message. Returns `None` for notifications and blank lines.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.len() > MAX_MESSAGE_SIZE {
            warn!(size = line.len(), "message too large");
            return Some(too_large(line.len()));
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "unparsable message");
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        self.handle(request).await
    }

    /// Handle one parsed request.
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "request");

        if request.is_notification() {
            if request.method == "notifications/initialized" {
                self.initialized = true;
            }
            return None;
        }

        let id = request.id.clone();
        let response = match self.dispatch(request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        };
        Some(response)
    }

    async fn dispatch(&mut self, request: JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => {
                let _params: InitializeParams = parse_params(request.params)?;
                self.initialized = true;
                to_result(&InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability::default()),
                        resources: Some(ResourcesCapability::default()),
                    },
                    server_info: self.handler.server_info(),
                    instructions: self.handler.instructions(),
                })
            }
            "ping" => Ok(Value::Object(Default::default())),
            _ if !self.initialized => Err(JsonRpcError::new(
                JsonRpcError::NOT_INITIALIZED,
                "server not initialized",
            )),
            "tools/list" => to_result(&ListToolsResult {
                tools: self.handler.list_tools(),
            }),
            "tools/call" => {
                let params: CallToolParams = parse_params(request.params)?;
                let result = self.handler.call_tool(params).await?;
                to_result(&result)
            }
            "resources/list" => to_result(&ListResourcesResult {
                resources: self.handler.list_resources(),
            }),
            "resources/read" => {
                let params: ReadResourceParams = parse_params(request.params)?;
                let result = self.handler.read_resource(&params.uri).await?;
                to_result(&result)
            }
            method => Err(JsonRpcError::method_not_found(method)),
        }
    }
}

fn too_large(size: usize) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        None,
        JsonRpcError::invalid_request(format!(
            "message too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
        )),
    )
}

/// Consume input up to and including the next newline. Returns the number of
/// bytes skipped.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut skipped = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(skipped);
        }
        let (amount, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        reader.consume(amount);
        skipped += amount;
        if done {
            return Ok(skipped);
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_result(value: &impl Serialize) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestId, ResourceContents, ToolContent};
    use serde_json::json;

    struct Echo;

    impl Handler for Echo {
        fn server_info(&self) -> ServerInfo {
            ServerInfo::new("echo", "0.0.1")
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![Tool {
                name: "echo".to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
                meta: None,
            }]
        }

        async fn call_tool(
            &self,
            params: CallToolParams,
        ) -> std::result::Result<CallToolResult, JsonRpcError> {
            if params.name != "echo" {
                return Err(JsonRpcError::invalid_params("unknown tool"));
            }
            let text = params.arguments.unwrap_or(Value::Null).to_string();
            Ok(CallToolResult {
                content: vec![ToolContent::text(text)],
                structured_content: None,
                is_error: false,
            })
        }

        fn list_resources(&self) -> Vec<Resource> {
            Vec::new()
        }

        async fn read_resource(
            &self,
            uri: &str,
        ) -> std::result::Result<ReadResourceResult, JsonRpcError> {
            if uri == "ui://echo" {
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: uri.to_string(),
                        mime_type: None,
                        text: "<html></html>".to_string(),
                        meta: None,
                    }],
                })
            } else {
                Err(JsonRpcError::resource_not_found(uri))
            }
        }
    }

    async fn initialized() -> Server<Echo> {
        let mut server = Server::new(Echo);
        let init = JsonRpcRequest::new(1i64, "initialize");
        server.handle(init).await.unwrap().into_result().unwrap();
        server
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let mut server = Server::new(Echo);
        let resp = server
            .handle(JsonRpcRequest::new(1i64, "initialize"))
            .await
            .unwrap();
        assert_eq!(resp.id, Some(RequestId::Number(1)));
        let result = resp.into_result().unwrap();
        assert_eq!(result["serverInfo"]["name"], "echo");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn rejects_calls_before_initialize() {
        let mut server = Server::new(Echo);
        let err = server
            .handle(JsonRpcRequest::new(1i64, "tools/list"))
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, JsonRpcError::NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let mut server = Server::new(Echo);
        let note = JsonRpcRequest::notification("notifications/initialized");
        assert!(server.handle(note).await.is_none());
    }

    #[tokio::test]
    async fn malformed_line_is_parse_error() {
        let mut server = Server::new(Echo);
        let resp = server.handle_line("{not json").await.unwrap();
        assert_eq!(resp.id, None);
        assert_eq!(resp.into_result().unwrap_err().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn unknown_method() {
        let mut server = initialized().await;
        let err = server
            .handle(JsonRpcRequest::new(2i64, "prompts/list"))
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn call_tool_round_trip() {
        let mut server = initialized().await;
        let req = JsonRpcRequest::new(3i64, "tools/call")
            .with_params(json!({"name": "echo", "arguments": {"x": 1}}));
        let result = server.handle(req).await.unwrap().into_result().unwrap();
        assert_eq!(result["content"][0]["text"], r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn missing_resource_is_reported() {
        let mut server = initialized().await;
        let req = JsonRpcRequest::new(4i64, "resources/read").with_params(json!({"uri": "ui://nope"}));
        let err = server.handle(req).await.unwrap().into_result().unwrap_err();
        assert_eq!(err.code, JsonRpcError::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_writes_one_line_per_response() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        let mut server = Server::new(Echo);
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let ping: JsonRpcResponse = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(ping.id, Some(RequestId::Number(2)));
    }

    fn responses(output: Vec<u8>) -> Vec<JsonRpcResponse> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn invalid_utf8_is_answered_and_serving_continues() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        let mut server = Server::new(Echo);
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let responses = responses(output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, None);
        let err = responses[0].clone().into_result().unwrap_err();
        assert_eq!(err.code, JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[1].id, Some(RequestId::Number(2)));
        assert!(responses[1].clone().into_result().is_ok());
    }

    #[tokio::test]
    async fn oversized_line_is_rejected_and_skipped() {
        let mut input = vec![b'x'; MAX_MESSAGE_SIZE + 10];
        input.push(b'\n');
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        let mut server = Server::new(Echo);
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let responses = responses(output);
        assert_eq!(responses.len(), 2);
        let err = responses[0].clone().into_result().unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_REQUEST);
        assert!(err.message.contains("too large"), "{}", err.message);
        assert_eq!(responses[1].id, Some(RequestId::Number(3)));
    }

    #[tokio::test]
    async fn line_at_size_limit_is_processed() {
        let ping = r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#;
        let mut input = ping.as_bytes().to_vec();
        input.resize(MAX_MESSAGE_SIZE, b' ');
        input.push(b'\n');

        let mut output = Vec::new();
        let mut server = Server::new(Echo);
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let responses = responses(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, Some(RequestId::Number(4)));
        assert!(responses[0].clone().into_result().is_ok());
    }
}
