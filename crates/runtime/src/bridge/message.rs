//! Host → widget wire messages.

use mcp::{CallToolResult, JsonRpcRequest, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOOL_RESULT: &str = "ui/notifications/tool-result";
pub const CONTEXT_CHANGED: &str = "ui/notifications/host-context-changed";
pub const RESOURCE_TEARDOWN: &str = "ui/resource-teardown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Visible area in CSS pixels. Hosts may report fractional sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// A full snapshot of host display context. Never a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HostContext {
    pub theme: Theme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl HostContext {
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            viewport: None,
        }
    }
}

/// A parsed host message.
#[derive(Debug, Clone)]
pub enum HostMessage {
    /// The result of the tool call that opened the widget; `None` when the
    /// host had nothing to deliver.
    ToolResult(Option<CallToolResult>),
    ContextChanged(HostContext),
    /// Teardown request; must be answered with an empty result.
    Teardown { id: Option<RequestId> },
}

impl HostMessage {
    /// Parse one raw JSON-RPC message. The error is a human-readable reason.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let request: JsonRpcRequest =
            serde_json::from_str(raw).map_err(|e| format!("unparsable host message: {e}"))?;
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            TOOL_RESULT => {
                let result: Option<CallToolResult> = serde_json::from_value(params)
                    .map_err(|e| format!("malformed tool result: {e}"))?;
                Ok(HostMessage::ToolResult(result))
            }
            CONTEXT_CHANGED => {
                let context: HostContext = serde_json::from_value(params)
                    .map_err(|e| format!("malformed host context: {e}"))?;
                Ok(HostMessage::ContextChanged(context))
            }
            RESOURCE_TEARDOWN => Ok(HostMessage::Teardown { id: request.id }),
            other => Err(format!("unknown host message: {other}")),
        }
    }
}
