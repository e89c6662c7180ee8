//! Invocation gateway: authenticate, compute, package.

use auth::{Authenticator, Identity, IdentityToken};
use calc::{ParameterSet, ResultRecord};
use mcp::{CallToolResult, ToolContent};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::GatewayError;

/// A successful invocation carrying both delivery channels.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    text: String,
    structured: Value,
    record: ResultRecord,
}

impl ToolResponse {
    /// Package `record` as JSON text plus structured content.
    pub fn new(record: ResultRecord) -> Result<Self, GatewayError> {
        let text = serde_json::to_string_pretty(&record)
            .map_err(|e| GatewayError::Internal(format!("serialize result: {e}")))?;
        let structured = serde_json::to_value(&record)
            .map_err(|e| GatewayError::Internal(format!("serialize result: {e}")))?;
        Ok(Self {
            text,
            structured,
            record,
        })
    }

    /// Textual channel, for hosts that cannot render UI.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn record(&self) -> &ResultRecord {
        &self.record
    }

    pub fn into_record(self) -> ResultRecord {
        self.record
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        CallToolResult {
            content: vec![ToolContent::text(self.text)],
            structured_content: Some(self.structured),
            is_error: false,
        }
    }
}

/// Authenticates callers and runs the calculator for them.
pub struct InvocationGateway<A> {
    authenticator: A,
}

impl<A: Authenticator> InvocationGateway<A> {
    pub fn new(authenticator: A) -> Self {
        Self { authenticator }
    }

    /// Invoke with raw tool arguments. `None` or `null` means "all defaults".
    pub fn invoke(
        &self,
        token: Option<&IdentityToken>,
        arguments: Option<Value>,
    ) -> Result<ToolResponse, GatewayError> {
        let identity = self.authenticate(token)?;
        let params = parse_arguments(arguments)?;
        self.run(&identity, &params)
    }

    /// Invoke with an already typed parameter set.
    pub fn invoke_params(
        &self,
        token: Option<&IdentityToken>,
        params: &ParameterSet,
    ) -> Result<ToolResponse, GatewayError> {
        let identity = self.authenticate(token)?;
        self.run(&identity, params)
    }

    fn authenticate(&self, token: Option<&IdentityToken>) -> Result<Identity, GatewayError> {
        self.authenticator.authenticate(token).map_err(|e| {
            warn!(error = %e, "rejected invocation");
            GatewayError::Authentication(e)
        })
    }

    fn run(&self, identity: &Identity, params: &ParameterSet) -> Result<ToolResponse, GatewayError> {
        let record = calc::compute(params).inspect_err(|e| {
            debug!(caller = %identity, error = %e, "invalid parameters");
        })?;

        if !record.is_finite() {
            error!(caller = %identity, ?params, "computation produced a non-finite value");
            return Err(GatewayError::Internal(
                "computation produced a non-finite value".to_string(),
            ));
        }

        debug!(
            caller = %identity,
            profit = record.metrics.profit,
            roi = record.metrics.roi_percent,
            "computed"
        );
        ToolResponse::new(record).inspect_err(|e| error!(error = %e, "failed to package result"))
    }
}

fn parse_arguments(arguments: Option<Value>) -> Result<ParameterSet, GatewayError> {
    let arguments = match arguments {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value @ Value::Object(_)) => value,
        Some(_) => {
            return Err(GatewayError::Validation(
                "arguments must be a JSON object".to_string(),
            ));
        }
    };
    serde_json::from_value(arguments).map_err(|e| GatewayError::Validation(e.to_string()))
}
