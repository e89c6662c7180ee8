//! Widget-initiated tool invocation.

use std::future::Future;
use std::sync::Arc;

use auth::{Authenticator, IdentityToken};
use calc::{ParameterSet, ResultRecord};
use mcp::CallToolResult;
use tracing::debug;

use crate::error::{ErrorKind, InvokeError};
use crate::gateway::InvocationGateway;

/// The widget's outbound action: recompute with new parameters.
///
/// Calls may overlap; the widget decides which answer still matters.
pub trait ToolCaller: Send + Sync + 'static {
    fn invoke_server_tool(
        &self,
        params: ParameterSet,
    ) -> impl Future<Output = Result<ResultRecord, InvokeError>> + Send;
}

/// Forwards widget calls to an [`InvocationGateway`] under the host's identity.
pub struct GatewayCaller<A> {
    gateway: Arc<InvocationGateway<A>>,
    token: Option<IdentityToken>,
}

impl<A> GatewayCaller<A> {
    pub fn new(gateway: Arc<InvocationGateway<A>>, token: Option<IdentityToken>) -> Self {
        Self { gateway, token }
    }
}

impl<A: Authenticator + 'static> ToolCaller for GatewayCaller<A> {
    async fn invoke_server_tool(&self, params: ParameterSet) -> Result<ResultRecord, InvokeError> {
        let arguments = serde_json::to_value(params)
            .map_err(|e| InvokeError::new(ErrorKind::Internal, e.to_string()))?;
        let result = self
            .gateway
            .invoke(self.token.as_ref(), Some(arguments))?
            .into_call_tool_result();
        decode_tool_result(result)
    }
}

/// Read the structured channel of a tool result back into a record.
///
/// An `is_error` result keeps its error kind when the structured payload
/// names one.
pub fn decode_tool_result(result: CallToolResult) -> Result<ResultRecord, InvokeError> {
    if result.is_error {
        let kind = result
            .structured_content
            .as_ref()
            .and_then(|v| v.get("error")?.get("kind")?.as_str())
            .and_then(ErrorKind::parse)
            .unwrap_or(ErrorKind::Internal);
        return Err(InvokeError::new(kind, result.text()));
    }

    let structured = result.structured_content.ok_or_else(|| {
        InvokeError::new(ErrorKind::TransportParse, "tool result has no structured content")
    })?;
    serde_json::from_value(structured).map_err(|e| {
        debug!(error = %e, "undecodable structured content");
        InvokeError::new(
            ErrorKind::TransportParse,
            format!("malformed structured content: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::KeyList;
    use mcp::ToolContent;
    use serde_json::json;

    fn caller(token: Option<&str>) -> GatewayCaller<KeyList> {
        let gateway = InvocationGateway::new(KeyList::default().with_key("host", "secret"));
        GatewayCaller::new(Arc::new(gateway), token.map(IdentityToken::new))
    }

    #[tokio::test]
    async fn forwards_to_gateway() {
        let params = ParameterSet::new(10_000.0, 2.5, 5.0, 100.0);
        let record = caller(Some("secret")).invoke_server_tool(params).await.unwrap();
        assert_eq!(record.inputs, params);
        assert_eq!(record.metrics.profit, 10_000.0);
    }

    #[tokio::test]
    async fn surfaces_authentication_failure() {
        let err = caller(None)
            .invoke_server_tool(ParameterSet::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn surfaces_validation_failure() {
        let err = caller(Some("secret"))
            .invoke_server_tool(ParameterSet::default().with_budget(-5.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("monthlyBudget"));
    }

    #[test]
    fn error_result_keeps_kind() {
        let result = CallToolResult {
            content: vec![ToolContent::text("cpc must be > 0")],
            structured_content: Some(json!({"error": {"kind": "validation", "message": "cpc must be > 0"}})),
            is_error: true,
        };
        let err = decode_tool_result(result).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "cpc must be > 0");
    }

    #[test]
    fn missing_structured_content_is_transport_error() {
        let result = CallToolResult {
            content: vec![ToolContent::text("{}")],
            structured_content: None,
            is_error: false,
        };
        assert_eq!(
            decode_tool_result(result).unwrap_err().kind,
            ErrorKind::TransportParse
        );
    }
}
