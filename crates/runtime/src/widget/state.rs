use calc::{ParameterSet, ResultRecord};
use uuid::Uuid;

use super::surface::ChartId;
use crate::bridge::HostContext;

/// What the widget is showing. Exactly one variant is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WidgetState {
    #[default]
    Idle,
    Loading,
    Success(ResultRecord),
    Error(String),
}

impl WidgetState {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetState::Idle => "idle",
            WidgetState::Loading => "loading",
            WidgetState::Success(_) => "success",
            WidgetState::Error(_) => "error",
        }
    }

    pub fn record(&self) -> Option<&ResultRecord> {
        match self {
            WidgetState::Success(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            WidgetState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A point-in-time copy of a widget's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub id: Uuid,
    pub state: WidgetState,
    pub context: HostContext,
    /// Parameters of the most recently issued recomputation.
    pub params: Option<ParameterSet>,
    pub issued_seq: u64,
    pub applied_seq: u64,
    pub debounce_armed: bool,
    pub chart: Option<ChartId>,
}
