//! Host bridge: the host-side channel into an embedded widget.
//!
//! Inbound, the host delivers the initial tool result, context changes,
//! transport failures and the final teardown request. Outbound, the widget
//! re-invokes the tool through a [`ToolCaller`], answered directly rather
//! than through the initial-delivery path.

mod caller;
mod host;
mod message;

pub use caller::{GatewayCaller, ToolCaller, decode_tool_result};
pub use host::{BridgeEvent, HostBridge, TeardownAck};
pub use message::{HostContext, HostMessage, Theme, Viewport};
