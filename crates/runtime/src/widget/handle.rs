use calc::{ParameterSet, ResultRecord};
use tokio::sync::{mpsc, oneshot};

use super::state::WidgetSnapshot;
use crate::bridge::BridgeEvent;
use crate::error::{InvokeError, WidgetClosed};

/// User-driven actions.
#[derive(Debug)]
pub(crate) enum UiAction {
    Edit(ParameterSet),
    Reset,
    Retry,
    Snapshot(oneshot::Sender<WidgetSnapshot>),
}

/// Everything a widget reacts to.
#[derive(Debug)]
pub(crate) enum Inbox {
    Bridge(BridgeEvent),
    Ui(UiAction),
    DebounceExpired { generation: u64 },
    Resolved {
        seq: u64,
        outcome: Result<ResultRecord, InvokeError>,
    },
}

/// The widget's inbound event sink, held by the host bridge.
#[derive(Debug, Clone)]
pub struct WidgetPort {
    tx: mpsc::UnboundedSender<Inbox>,
}

impl WidgetPort {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbox>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: BridgeEvent) -> Result<(), WidgetClosed> {
        self.tx.send(Inbox::Bridge(event)).map_err(|_| WidgetClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// UI-side handle: parameter edits, reset, retry and inspection.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    tx: mpsc::UnboundedSender<Inbox>,
}

impl WidgetHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbox>) -> Self {
        Self { tx }
    }

    /// Record a parameter edit; recomputation follows once edits settle.
    pub fn edit(&self, params: ParameterSet) -> Result<(), WidgetClosed> {
        self.send(UiAction::Edit(params))
    }

    /// Leave the error view.
    pub fn reset(&self) -> Result<(), WidgetClosed> {
        self.send(UiAction::Reset)
    }

    /// Re-issue the last recomputation from the error view.
    pub fn retry(&self) -> Result<(), WidgetClosed> {
        self.send(UiAction::Retry)
    }

    /// Current observable state, once every earlier message has been handled.
    pub async fn snapshot(&self) -> Result<WidgetSnapshot, WidgetClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(UiAction::Snapshot(tx))?;
        rx.await.map_err(|_| WidgetClosed)
    }

    fn send(&self, action: UiAction) -> Result<(), WidgetClosed> {
        self.tx.send(Inbox::Ui(action)).map_err(|_| WidgetClosed)
    }
}
