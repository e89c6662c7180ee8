//! Host side of the bridge.

use std::time::Duration;

use calc::ResultRecord;
use mcp::{CallToolResult, JsonRpcResponse};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::caller::decode_tool_result;
use super::message::{HostContext, HostMessage};
use crate::error::{BridgeError, ErrorKind};
use crate::widget::WidgetPort;

/// Events the bridge delivers into a widget.
#[derive(Debug)]
pub enum BridgeEvent {
    /// The tool result that opened the widget, or why there is none.
    InitialResult(Result<ResultRecord, String>),
    ContextChanged(HostContext),
    /// Terminal. The widget releases everything and then acknowledges.
    TeardownRequested(oneshot::Sender<TeardownAck>),
    TransportError(String),
}

/// Empty acknowledgment returned once a widget has released its resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownAck {}

/// Host-side handle enforcing the delivery contract for one widget.
///
/// The initial result is delivered at most once and teardown is requested
/// at most once; after teardown every delivery fails with
/// [`BridgeError::TornDown`].
pub struct HostBridge {
    port: WidgetPort,
    grace: Duration,
    initial_delivered: bool,
    torn_down: bool,
}

impl HostBridge {
    pub fn new(port: WidgetPort, grace: Duration) -> Self {
        Self {
            port,
            grace,
            initial_delivered: false,
            torn_down: false,
        }
    }

    /// Deliver the result of the tool call that opened the widget.
    pub fn deliver_initial(&mut self, result: Option<CallToolResult>) -> Result<(), BridgeError> {
        self.ensure_live()?;
        if self.initial_delivered {
            warn!("dropping duplicate initial result");
            return Err(BridgeError::InitialAlreadyDelivered);
        }
        self.initial_delivered = true;

        let event = match result.map(decode_tool_result) {
            None => BridgeEvent::InitialResult(Err("host delivered no tool result".to_string())),
            Some(Ok(record)) => BridgeEvent::InitialResult(Ok(record)),
            Some(Err(e)) if e.kind == ErrorKind::TransportParse => {
                warn!(reason = %e.message, "undecodable initial result");
                BridgeEvent::InitialResult(Err(format!("transport error: {}", e.message)))
            }
            Some(Err(e)) => BridgeEvent::InitialResult(Err(e.message)),
        };
        Ok(self.port.send(event)?)
    }

    /// Forward a host context snapshot. Never waits on in-flight work.
    pub fn change_context(&self, context: HostContext) -> Result<(), BridgeError> {
        self.ensure_live()?;
        Ok(self.port.send(BridgeEvent::ContextChanged(context))?)
    }

    /// Report an inbound delivery or parse failure.
    pub fn transport_error(&self, reason: impl Into<String>) -> Result<(), BridgeError> {
        self.ensure_live()?;
        let reason = reason.into();
        warn!(%reason, "transport error");
        Ok(self.port.send(BridgeEvent::TransportError(reason))?)
    }

    /// Ask the widget to tear down and wait up to the grace period for its
    /// acknowledgment. Never retried: a missed acknowledgment is a leak.
    pub async fn teardown(&mut self) -> Result<TeardownAck, BridgeError> {
        self.ensure_live()?;
        self.torn_down = true;

        let (ack_tx, ack_rx) = oneshot::channel();
        self.port.send(BridgeEvent::TeardownRequested(ack_tx))?;

        match tokio::time::timeout(self.grace, ack_rx).await {
            Ok(Ok(ack)) => {
                info!("widget teardown acknowledged");
                Ok(ack)
            }
            Ok(Err(_)) => {
                error!("widget exited without acknowledging teardown");
                Err(BridgeError::Closed(crate::error::WidgetClosed))
            }
            Err(_) => {
                error!(grace = ?self.grace, "teardown not acknowledged; widget leaked");
                Err(BridgeError::TeardownTimeout(self.grace))
            }
        }
    }

    /// Route one raw host message. Returns the JSON-RPC response for
    /// messages that expect one.
    pub async fn deliver_raw(&mut self, raw: &str) -> Result<Option<Value>, BridgeError> {
        match HostMessage::parse(raw) {
            Ok(HostMessage::ToolResult(result)) => self.deliver_initial(result).map(|()| None),
            Ok(HostMessage::ContextChanged(context)) => self.change_context(context).map(|()| None),
            Ok(HostMessage::Teardown { id }) => {
                let ack = self.teardown().await?;
                let result = serde_json::to_value(ack).unwrap_or_else(|_| Value::Object(Default::default()));
                let response = JsonRpcResponse::success(id, result);
                Ok(serde_json::to_value(response).ok())
            }
            Err(reason) => self.transport_error(reason).map(|()| None),
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn ensure_live(&self) -> Result<(), BridgeError> {
        if self.torn_down {
            Err(BridgeError::TornDown)
        } else {
            Ok(())
        }
    }
}
