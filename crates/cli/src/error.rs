//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No accepted keys are configured, so every call would be rejected.
    #[error("no API keys configured. Add [auth.keys] to roiwidget.toml or set auth.env_key")]
    NoKeys,

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A tool invocation failed.
    #[error(transparent)]
    Gateway(#[from] runtime::GatewayError),

    /// The host bridge rejected a delivery.
    #[error(transparent)]
    Bridge(#[from] runtime::BridgeError),

    /// The widget stopped before the simulation finished.
    #[error(transparent)]
    Widget(#[from] runtime::WidgetClosed),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// The MCP server loop failed.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    /// The widget task panicked or was cancelled.
    #[error("widget task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
