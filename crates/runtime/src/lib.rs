//! Widget runtime: invocation gateway, host bridge and widget state machine.
//!
//! # Overview
//!
//! - **InvocationGateway**: authenticates a caller, runs the calculator and
//!   packages the result for both text-only and UI-capable hosts.
//! - **ToolDirectory**: tools and the UI resources they render into, linked
//!   once at startup.
//! - **HostBridge**: the host's side of an embedded widget. Delivers the
//!   initial result and context changes, and requests teardown.
//! - **Widget**: the single owner of UI state. Debounces edits, re-invokes
//!   the tool directly through a [`ToolCaller`] and keeps only the latest
//!   answer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use auth::{IdentityToken, KeyList};
//! use runtime::{
//!     GatewayCaller, HeadlessSurface, HostBridge, InvocationGateway, Widget, WidgetConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(InvocationGateway::new(KeyList::default().with_key("host", "s3cret")));
//! let token = IdentityToken::new("s3cret");
//!
//! let initial = gateway.invoke(Some(&token), None)?.into_call_tool_result();
//! let caller = GatewayCaller::new(Arc::clone(&gateway), Some(token));
//! let (port, handle, task) = Widget::spawn(WidgetConfig::default(), caller, HeadlessSurface::new());
//!
//! let mut bridge = HostBridge::new(port, Duration::from_secs(2));
//! bridge.deliver_initial(Some(initial))?;
//! handle.edit(calc::ParameterSet::new(20_000.0, 2.5, 5.0, 100.0))?;
//!
//! bridge.teardown().await?;
//! let surface = task.await?;
//! assert_eq!(surface.live_charts(), 0);
//! # Ok(())
//! # }
//! ```

mod assets;
pub mod bridge;
mod directory;
mod error;
mod gateway;
mod service;
pub mod widget;

pub use assets::{AssetLoader, EmbeddedAssets, FsAssetLoader};
pub use bridge::{
    BridgeEvent, GatewayCaller, HostBridge, HostContext, HostMessage, TeardownAck, Theme,
    ToolCaller, Viewport,
};
pub use directory::{
    APP_MIME_TYPE, CALCULATE_ROI, ContentSecurity, ToolDirectory, ToolEntry, ToolKind,
    UiResource, WIDGET_TEMPLATE, WIDGET_URI,
};
pub use error::{
    BridgeError, Error, ErrorKind, GatewayError, InvokeError, Result, WidgetClosed,
};
pub use gateway::{InvocationGateway, ToolResponse};
pub use service::{CalculatorService, package_error};
pub use widget::{
    ChartId, ChartSpec, Frame, HeadlessSurface, Palette, Surface, Widget, WidgetConfig,
    WidgetHandle, WidgetPort, WidgetSnapshot, WidgetState,
};
