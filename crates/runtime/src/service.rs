//! MCP handler serving the tool directory through the gateway.

use std::sync::Arc;

use auth::{Authenticator, IdentityToken};
use mcp::{
    CallToolParams, CallToolResult, Handler, JsonRpcError, ReadResourceResult, Resource,
    ResourceContents, ServerInfo, Tool, ToolContent,
};
use serde_json::json;
use tracing::{error, info};

use crate::assets::AssetLoader;
use crate::directory::{APP_MIME_TYPE, ToolDirectory, ToolKind};
use crate::error::GatewayError;
use crate::gateway::InvocationGateway;

/// Serves the ROI calculator tool and its widget template.
pub struct CalculatorService<A, L> {
    name: String,
    gateway: Arc<InvocationGateway<A>>,
    directory: ToolDirectory,
    assets: L,
}

impl<A: Authenticator, L: AssetLoader> CalculatorService<A, L> {
    pub fn new(
        name: impl Into<String>,
        gateway: Arc<InvocationGateway<A>>,
        directory: ToolDirectory,
        assets: L,
    ) -> Self {
        Self {
            name: name.into(),
            gateway,
            directory,
            assets,
        }
    }

    pub fn gateway(&self) -> &Arc<InvocationGateway<A>> {
        &self.gateway
    }
}

/// Map a gateway failure onto the boundary.
///
/// Authentication and transport failures are protocol errors. Validation
/// and internal failures are tool results flagged `isError`, still carrying
/// both the text and the structured channel.
pub fn package_error(err: GatewayError) -> Result<CallToolResult, JsonRpcError> {
    let kind = err.kind();
    let message = err.to_string();
    match err {
        GatewayError::Authentication(_) => Err(JsonRpcError::unauthorized(message)),
        GatewayError::TransportParse(_) => Err(JsonRpcError::parse_error(message)),
        GatewayError::Validation(_) | GatewayError::Internal(_) => Ok(CallToolResult {
            content: vec![ToolContent::text(message.clone())],
            structured_content: Some(json!({
                "error": { "kind": kind.as_str(), "message": message }
            })),
            is_error: true,
        }),
    }
}

impl<A: Authenticator, L: AssetLoader> Handler for CalculatorService<A, L> {
    fn server_info(&self) -> ServerInfo {
        ServerInfo::new(self.name.clone(), env!("CARGO_PKG_VERSION"))
    }

    fn instructions(&self) -> Option<String> {
        Some(
            "Call calculate_roi with a monthly budget, cost per click, conversion rate and \
             average order value. UI-capable hosts can render the linked widget."
                .to_string(),
        )
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.directory.tools().map(|entry| entry.tool.clone()).collect()
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
        let entry = self
            .directory
            .tool(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown tool: {}", params.name)))?;
        let token = params.authorization().and_then(IdentityToken::from_header);

        match entry.kind {
            ToolKind::CalculateRoi => match self.gateway.invoke(token.as_ref(), params.arguments) {
                Ok(response) => {
                    info!(tool = %params.name, "tool call succeeded");
                    Ok(response.into_call_tool_result())
                }
                Err(e) => {
                    info!(tool = %params.name, kind = e.kind().as_str(), "tool call failed");
                    package_error(e)
                }
            },
        }
    }

    fn list_resources(&self) -> Vec<Resource> {
        self.directory.resources().map(|r| r.to_mcp()).collect()
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, JsonRpcError> {
        let resource = self
            .directory
            .resource(uri)
            .ok_or_else(|| JsonRpcError::resource_not_found(uri))?;

        let bytes = self.assets.load(&resource.template).map_err(|e| {
            error!(%uri, error = %e, "failed to load template");
            JsonRpcError::internal(format!("failed to load template for {uri}"))
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            error!(%uri, error = %e, "template is not UTF-8");
            JsonRpcError::internal(format!("template for {uri} is not valid UTF-8"))
        })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: resource.uri.clone(),
                mime_type: Some(APP_MIME_TYPE.to_string()),
                text,
                meta: Some(resource.meta()),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::EmbeddedAssets;
    use crate::directory::{CALCULATE_ROI, WIDGET_URI};
    use auth::KeyList;
    use mcp::{JsonRpcRequest, Server};

    fn service() -> CalculatorService<KeyList, EmbeddedAssets> {
        let gateway = InvocationGateway::new(KeyList::default().with_key("host", "secret"));
        CalculatorService::new(
            "roi-calculator",
            Arc::new(gateway),
            ToolDirectory::builtin().unwrap(),
            EmbeddedAssets,
        )
    }

    fn call(arguments: serde_json::Value, authorization: Option<&str>) -> CallToolParams {
        CallToolParams {
            name: CALCULATE_ROI.to_string(),
            arguments: Some(arguments),
            meta: authorization.map(|a| json!({ "authorization": a })),
        }
    }

    #[tokio::test]
    async fn successful_call_carries_both_channels() {
        let result = service()
            .call_tool(call(json!({"monthlyBudget": 10000}), Some("Bearer secret")))
            .await
            .unwrap();
        assert!(!result.is_error);
        let text: serde_json::Value = serde_json::from_str(&result.text()).unwrap();
        assert_eq!(Some(text), result.structured_content);
    }

    #[tokio::test]
    async fn unauthenticated_call_is_protocol_error() {
        let err = service().call_tool(call(json!({}), None)).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::UNAUTHORIZED);
        assert!(err.message.contains("re-authenticate"));
    }

    #[tokio::test]
    async fn validation_failure_is_flagged_result() {
        let result = service()
            .call_tool(call(json!({"cpc": 0}), Some("secret")))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text().contains("cpc must be > 0"));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let mut params = call(json!({}), Some("secret"));
        params.name = "nope".to_string();
        let err = service().call_tool(params).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn reads_widget_template() {
        let result = service().read_resource(WIDGET_URI).await.unwrap();
        let contents = &result.contents[0];
        assert_eq!(contents.mime_type.as_deref(), Some(APP_MIME_TYPE));
        assert!(contents.text.contains("<html"));
    }

    #[tokio::test]
    async fn serves_over_json_rpc() {
        let mut server = Server::new(service());
        server
            .handle(JsonRpcRequest::new(1i64, "initialize"))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let tools = server
            .handle(JsonRpcRequest::new(2i64, "tools/list"))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(tools["tools"][0]["name"], CALCULATE_ROI);
        assert_eq!(tools["tools"][0]["_meta"]["ui"]["resourceUri"], WIDGET_URI);

        let req = JsonRpcRequest::new(3i64, "tools/call").with_params(json!({
            "name": CALCULATE_ROI,
            "arguments": {"monthlyBudget": 10000, "cpc": 2.5, "conversionRatePercent": 5, "averageOrderValue": 100},
            "_meta": {"authorization": "Bearer secret"}
        }));
        let result = server.handle(req).await.unwrap().into_result().unwrap();
        assert_eq!(result["structuredContent"]["metrics"]["roiPercent"], 100.0);
        assert_eq!(result["content"][0]["type"], "text");
    }
}
