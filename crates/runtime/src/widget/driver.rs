//! The widget event loop.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use calc::{ParameterSet, ResultRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::debounce::Debouncer;
use super::handle::{Inbox, UiAction, WidgetHandle, WidgetPort};
use super::state::{WidgetSnapshot, WidgetState};
use super::surface::{ChartId, ChartSpec, Frame, Surface};
use crate::bridge::{BridgeEvent, HostContext, TeardownAck, ToolCaller};
use crate::error::InvokeError;

/// Default quiet period before an edit triggers recomputation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub debounce: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// One widget instance. See the [module docs](super) for the message model.
pub struct Widget<C, S> {
    id: Uuid,
    state: WidgetState,
    context: HostContext,
    params: Option<ParameterSet>,
    caller: Arc<C>,
    surface: S,
    chart: Option<ChartId>,
    debouncer: Debouncer<ParameterSet>,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: Vec<JoinHandle<()>>,
    initial_seen: bool,
    inbox: mpsc::UnboundedReceiver<Inbox>,
    loopback: mpsc::WeakUnboundedSender<Inbox>,
}

impl<C: ToolCaller, S: Surface> Widget<C, S> {
    /// Build a widget and the two handles that feed it.
    pub fn new(config: WidgetConfig, caller: C, surface: S) -> (Self, WidgetPort, WidgetHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let widget = Self {
            id: Uuid::new_v4(),
            state: WidgetState::Idle,
            context: HostContext::default(),
            params: None,
            caller: Arc::new(caller),
            surface,
            chart: None,
            debouncer: Debouncer::new(config.debounce),
            issued_seq: 0,
            applied_seq: 0,
            in_flight: Vec::new(),
            initial_seen: false,
            inbox,
            loopback: tx.downgrade(),
        };
        (widget, WidgetPort::new(tx.clone()), WidgetHandle::new(tx))
    }

    /// Build a widget and run it on its own task. The task yields the
    /// surface back once the widget has torn down.
    pub fn spawn(config: WidgetConfig, caller: C, surface: S) -> (WidgetPort, WidgetHandle, JoinHandle<S>) {
        let (widget, port, handle) = Self::new(config, caller, surface);
        (port, handle, tokio::spawn(widget.run()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Process messages until teardown, or until every port and handle is
    /// dropped.
    pub async fn run(mut self) -> S {
        info!(widget = %self.id, "widget started");
        self.render();

        while let Some(message) = self.inbox.recv().await {
            if self.handle(message).is_break() {
                return self.surface;
            }
        }

        debug!(widget = %self.id, "all handles dropped");
        self.release_all();
        self.surface
    }

    fn handle(&mut self, message: Inbox) -> ControlFlow<()> {
        match message {
            Inbox::Bridge(event) => return self.on_bridge(event),
            Inbox::Ui(action) => self.on_ui(action),
            Inbox::DebounceExpired { generation } => {
                if let Some(params) = self.debouncer.fire(generation) {
                    self.issue(params);
                }
            }
            Inbox::Resolved { seq, outcome } => self.on_resolved(seq, outcome),
        }
        ControlFlow::Continue(())
    }

    fn on_bridge(&mut self, event: BridgeEvent) -> ControlFlow<()> {
        match event {
            BridgeEvent::InitialResult(outcome) => {
                if self.initial_seen || self.issued_seq > 0 {
                    warn!(widget = %self.id, "ignoring late initial result");
                } else {
                    self.initial_seen = true;
                    match outcome {
                        Ok(record) => {
                            self.params = Some(record.inputs);
                            self.show(WidgetState::Success(record));
                        }
                        Err(message) => self.show(WidgetState::Error(message)),
                    }
                }
            }
            BridgeEvent::ContextChanged(context) => self.apply_context(context),
            BridgeEvent::TransportError(reason) => {
                warn!(widget = %self.id, %reason, "transport error");
                self.show(WidgetState::Error(format!("transport error: {reason}")));
            }
            BridgeEvent::TeardownRequested(ack) => {
                self.release_all();
                info!(widget = %self.id, "widget torn down");
                if ack.send(TeardownAck::default()).is_err() {
                    warn!(widget = %self.id, "host stopped waiting for teardown acknowledgment");
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_ui(&mut self, action: UiAction) {
        match action {
            UiAction::Edit(params) => {
                let loopback = self.loopback.clone();
                self.debouncer.arm(params, move |generation| {
                    if let Some(tx) = loopback.upgrade() {
                        let _ = tx.send(Inbox::DebounceExpired { generation });
                    }
                });
            }
            UiAction::Reset => {
                if matches!(self.state, WidgetState::Error(_)) {
                    self.show(WidgetState::Idle);
                }
            }
            UiAction::Retry => {
                if matches!(self.state, WidgetState::Error(_)) {
                    match self.params {
                        Some(params) => self.issue(params),
                        None => self.show(WidgetState::Idle),
                    }
                }
            }
            UiAction::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn issue(&mut self, params: ParameterSet) {
        self.issued_seq += 1;
        let seq = self.issued_seq;
        self.params = Some(params);
        info!(widget = %self.id, seq, "recomputing");

        self.in_flight.retain(|task| !task.is_finished());
        let caller = Arc::clone(&self.caller);
        let loopback = self.loopback.clone();
        self.in_flight.push(tokio::spawn(async move {
            let outcome = caller.invoke_server_tool(params).await;
            if let Some(tx) = loopback.upgrade() {
                let _ = tx.send(Inbox::Resolved { seq, outcome });
            }
        }));

        self.show(WidgetState::Loading);
    }

    fn on_resolved(&mut self, seq: u64, outcome: Result<ResultRecord, InvokeError>) {
        self.in_flight.retain(|task| !task.is_finished());
        if seq != self.issued_seq {
            debug!(widget = %self.id, seq, latest = self.issued_seq, "discarding superseded response");
            return;
        }

        self.applied_seq = seq;
        match outcome {
            Ok(record) => self.show(WidgetState::Success(record)),
            Err(e) => {
                warn!(widget = %self.id, seq, kind = e.kind.as_str(), error = %e, "recomputation failed");
                self.show(WidgetState::Error(e.to_string()));
            }
        }
    }

    fn apply_context(&mut self, context: HostContext) {
        let previous = std::mem::replace(&mut self.context, context);

        if previous.theme != context.theme {
            // Charts are themed at creation; a theme switch needs a fresh one.
            if let WidgetState::Success(record) = &self.state {
                if let Some(id) = self.chart.take() {
                    self.surface.release_chart(id);
                }
                let spec = ChartSpec::new(&record.chart_data, &self.context);
                self.chart = Some(self.surface.create_chart(spec));
            }
        } else if previous.viewport != context.viewport {
            if let (Some(id), Some(viewport)) = (self.chart, context.viewport) {
                self.surface.resize_chart(id, viewport);
            }
        }

        debug!(widget = %self.id, theme = ?context.theme, "host context applied");
        self.render();
    }

    fn show(&mut self, state: WidgetState) {
        self.release_chart();
        if let WidgetState::Success(record) = &state {
            let spec = ChartSpec::new(&record.chart_data, &self.context);
            self.chart = Some(self.surface.create_chart(spec));
        }
        self.state = state;
        self.render();
    }

    fn render(&mut self) {
        let frame = Frame {
            widget: self.id,
            state: &self.state,
            context: &self.context,
            chart: self.chart,
        };
        self.surface.render(&frame);
    }

    fn release_chart(&mut self) {
        if let Some(id) = self.chart.take() {
            self.surface.release_chart(id);
        }
    }

    fn release_all(&mut self) {
        self.debouncer.cancel();
        for task in self.in_flight.drain(..) {
            task.abort();
        }
        self.release_chart();
    }

    fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            id: self.id,
            state: self.state.clone(),
            context: self.context,
            params: self.params,
            issued_seq: self.issued_seq,
            applied_seq: self.applied_seq,
            debounce_armed: self.debouncer.is_armed(),
            chart: self.chart,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;
    use crate::bridge::{Theme, Viewport};
    use crate::error::{ErrorKind, WidgetClosed};
    use crate::widget::{HeadlessSurface, Palette};

    /// Computes locally after a per-call delay, recording every call.
    #[derive(Clone, Default)]
    struct ScriptedCaller {
        calls: Arc<Mutex<Vec<ParameterSet>>>,
        delays: Arc<Mutex<VecDeque<Duration>>>,
    }

    impl ScriptedCaller {
        fn with_delays(delays: &[u64]) -> Self {
            let caller = Self::default();
            caller
                .delays
                .lock()
                .unwrap()
                .extend(delays.iter().map(|ms| Duration::from_millis(*ms)));
            caller
        }

        fn calls(&self) -> Vec<ParameterSet> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ToolCaller for ScriptedCaller {
        async fn invoke_server_tool(&self, params: ParameterSet) -> Result<ResultRecord, InvokeError> {
            self.calls.lock().unwrap().push(params);
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
            calc::compute(&params).map_err(|e| InvokeError::new(ErrorKind::Validation, e.to_string()))
        }
    }

    fn spawn(caller: &ScriptedCaller) -> (WidgetPort, WidgetHandle, JoinHandle<HeadlessSurface>) {
        Widget::spawn(WidgetConfig::default(), caller.clone(), HeadlessSurface::new())
    }

    fn params(budget: f64) -> ParameterSet {
        ParameterSet::default().with_budget(budget)
    }

    fn record(budget: f64) -> ResultRecord {
        calc::compute(&params(budget)).unwrap()
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn teardown(port: &WidgetPort) -> TeardownAck {
        let (tx, rx) = oneshot::channel();
        port.send(BridgeEvent::TeardownRequested(tx)).unwrap();
        rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn initial_result_renders_success() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Success(record(10_000.0)));
        assert_eq!(snap.params, Some(params(10_000.0)));
        assert!(snap.chart.is_some());
        assert!(caller.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn initial_failure_renders_error() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        port.send(BridgeEvent::InitialResult(Err("boom".into()))).unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Error("boom".into()));
        assert!(snap.chart.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_initial_result_is_ignored() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        port.send(BridgeEvent::InitialResult(Ok(record(1_000.0)))).unwrap();
        port.send(BridgeEvent::InitialResult(Ok(record(2_000.0)))).unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state.record(), Some(&record(1_000.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_within_window_coalesce_into_one_call() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();

        for budget in [1_000.0, 2_000.0, 3_000.0, 4_000.0, 5_000.0] {
            handle.edit(params(budget)).unwrap();
            settle(100).await;
        }
        let during = handle.snapshot().await.unwrap();
        assert!(during.debounce_armed);
        assert_eq!(during.state.name(), "success");
        assert!(caller.calls().is_empty());

        settle(600).await;
        assert_eq!(caller.calls(), vec![params(5_000.0)]);
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Success(record(5_000.0)));
        assert_eq!((snap.issued_seq, snap.applied_seq), (1, 1));
        assert!(!snap.debounce_armed);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_leaves_state_unchanged_until_timer_fires() {
        let caller = ScriptedCaller::default();
        let (_port, handle, _task) = spawn(&caller);

        handle.edit(params(700.0)).unwrap();
        settle(499).await;
        assert_eq!(handle.snapshot().await.unwrap().state, WidgetState::Idle);
        settle(10).await;
        assert_eq!(caller.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_response_is_discarded() {
        // First call answers after the second one.
        let caller = ScriptedCaller::with_delays(&[1_000, 10]);
        let (_port, handle, _task) = spawn(&caller);

        handle.edit(params(1_000.0)).unwrap();
        settle(600).await;
        assert_eq!(handle.snapshot().await.unwrap().state, WidgetState::Loading);

        handle.edit(params(2_000.0)).unwrap();
        settle(600).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Success(record(2_000.0)));
        assert_eq!(snap.applied_seq, 2);

        settle(1_000).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Success(record(2_000.0)));
        assert_eq!(snap.applied_seq, 2);
        assert_eq!(caller.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn context_change_applies_during_recomputation() {
        let caller = ScriptedCaller::with_delays(&[10_000]);
        let (port, handle, _task) = spawn(&caller);

        handle.edit(params(1_000.0)).unwrap();
        settle(600).await;

        port.send(BridgeEvent::ContextChanged(HostContext::with_theme(Theme::Dark)))
            .unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Loading);
        assert_eq!(snap.context.theme, Theme::Dark);
    }

    #[tokio::test(start_paused = true)]
    async fn context_changes_apply_in_order() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        for theme in [Theme::Dark, Theme::Light, Theme::Dark] {
            port.send(BridgeEvent::ContextChanged(HostContext::with_theme(theme)))
                .unwrap();
        }
        assert_eq!(handle.snapshot().await.unwrap().context.theme, Theme::Dark);
    }

    #[tokio::test(start_paused = true)]
    async fn theme_switch_replaces_chart() {
        let caller = ScriptedCaller::default();
        let (port, handle, task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();
        let before = handle.snapshot().await.unwrap().chart.unwrap();

        port.send(BridgeEvent::ContextChanged(HostContext::with_theme(Theme::Dark)))
            .unwrap();
        let after = handle.snapshot().await.unwrap().chart.unwrap();
        assert_ne!(before, after);

        teardown(&port).await;
        let surface = task.await.unwrap();
        assert_eq!(surface.charts_created(), 2);
        assert_eq!(surface.charts_released(), 2);
        assert_eq!(surface.chart_specs()[1].theme, Theme::Dark);
        assert_eq!(surface.chart_specs()[1].palette, Palette::for_theme(Theme::Dark));
    }

    #[tokio::test(start_paused = true)]
    async fn viewport_change_resizes_in_place() {
        let caller = ScriptedCaller::default();
        let (port, handle, task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();
        let before = handle.snapshot().await.unwrap().chart;

        let viewport = Viewport { width: 320.0, height: 200.0 };
        port.send(BridgeEvent::ContextChanged(HostContext {
            theme: Theme::Light,
            viewport: Some(viewport),
        }))
        .unwrap();
        assert_eq!(handle.snapshot().await.unwrap().chart, before);

        teardown(&port).await;
        let surface = task.await.unwrap();
        assert_eq!(surface.charts_created(), 1);
        assert_eq!(surface.chart_specs()[0].viewport, Some(viewport));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_debounce() {
        let caller = ScriptedCaller::default();
        let (port, handle, task) = spawn(&caller);

        handle.edit(params(1_000.0)).unwrap();
        settle(100).await;
        assert_eq!(teardown(&port).await, TeardownAck::default());

        settle(2_000).await;
        assert!(caller.calls().is_empty());
        let surface = task.await.unwrap();
        assert_eq!(surface.live_charts(), 0);
        assert!(matches!(handle.snapshot().await, Err(WidgetClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_drops_in_flight_response() {
        let caller = ScriptedCaller::with_delays(&[1_000]);
        let (port, handle, task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();

        handle.edit(params(3_000.0)).unwrap();
        settle(600).await;
        assert_eq!(caller.calls().len(), 1);

        teardown(&port).await;
        settle(2_000).await;
        let surface = task.await.unwrap();
        assert_eq!(surface.live_charts(), 0);
        assert_eq!(surface.charts_created(), surface.charts_released());
        assert_eq!(surface.last_state(), Some("loading"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_recomputation_then_reset() {
        let caller = ScriptedCaller::default();
        let (_port, handle, _task) = spawn(&caller);

        handle.edit(params(-1.0)).unwrap();
        settle(600).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.state.error().unwrap().contains("monthlyBudget"));

        handle.reset().unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state, WidgetState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_outside_error_is_ignored() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();

        handle.reset().unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state.name(), "success");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_reissues_last_parameters() {
        let caller = ScriptedCaller::default();
        let (_port, handle, _task) = spawn(&caller);

        handle.edit(params(-1.0)).unwrap();
        settle(600).await;
        handle.retry().unwrap();
        settle(10).await;

        assert_eq!(caller.calls(), vec![params(-1.0), params(-1.0)]);
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.issued_seq, 2);
        assert_eq!(snap.state.name(), "error");
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_renders_error() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        port.send(BridgeEvent::TransportError("bad frame".into())).unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state.error(), Some("transport error: bad frame"));
    }

    #[tokio::test(start_paused = true)]
    async fn initial_result_after_transport_error_renders_success() {
        let caller = ScriptedCaller::default();
        let (port, handle, _task) = spawn(&caller);

        port.send(BridgeEvent::TransportError("malformed host context".into()))
            .unwrap();
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, WidgetState::Success(record(10_000.0)));
        assert!(snap.chart.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_releases_resources() {
        let caller = ScriptedCaller::default();
        let (port, handle, task) = spawn(&caller);
        port.send(BridgeEvent::InitialResult(Ok(record(10_000.0)))).unwrap();
        handle.edit(params(2_000.0)).unwrap();

        drop(port);
        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.live_charts(), 0);
        settle(1_000).await;
        assert!(caller.calls().is_empty());
    }
}
