use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Runtime setup errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to load asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset path escapes the asset root: {0}")]
    AssetPath(String),

    #[error("tool {tool} links to unregistered resource {uri}")]
    UnknownResource { tool: String, uri: String },

    #[error("tool already registered: {0}")]
    DuplicateTool(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The four failure kinds visible at the invocation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Validation,
    TransportParse,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Validation => "validation",
            ErrorKind::TransportParse => "transport",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "authentication" => Some(ErrorKind::Authentication),
            "validation" => Some(ErrorKind::Validation),
            "transport" => Some(ErrorKind::TransportParse),
            "internal" => Some(ErrorKind::Internal),
            _ => None,
        }
    }
}

/// A failed invocation, as reported by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed ({0}); re-authenticate and try again")]
    Authentication(#[from] auth::Error),

    #[error("invalid parameters: {0}")]
    Validation(String),

    #[error("malformed message: {0}")]
    TransportParse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Authentication(_) => ErrorKind::Authentication,
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::TransportParse(_) => ErrorKind::TransportParse,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<calc::ValidationError> for GatewayError {
    fn from(e: calc::ValidationError) -> Self {
        GatewayError::Validation(e.to_string())
    }
}

/// A failed `invoke_server_tool` call, as seen by the widget.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct InvokeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl InvokeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for InvokeError {
    fn from(e: GatewayError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// The widget's event loop has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("widget is closed")]
pub struct WidgetClosed;

/// Host bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("initial result already delivered")]
    InitialAlreadyDelivered,

    #[error("widget already torn down")]
    TornDown,

    #[error("teardown not acknowledged within {0:?}")]
    TeardownTimeout(Duration),

    #[error(transparent)]
    Closed(#[from] WidgetClosed),
}
