//! Rendering boundary.

use std::collections::BTreeSet;

use calc::ChartData;
use tracing::trace;
use uuid::Uuid;

use super::state::WidgetState;
use crate::bridge::{HostContext, Theme, Viewport};

/// Handle to a chart allocated on a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChartId(pub u64);

/// Colors a chart is drawn with. Fixed per theme at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub line: &'static str,
    pub grid: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: "#ffffff",
                line: "#0969da",
                grid: "#d0d7de",
            },
            Theme::Dark => Palette {
                background: "#0d1117",
                line: "#4493f8",
                grid: "#30363d",
            },
        }
    }
}

/// Everything needed to allocate a profit-curve chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub theme: Theme,
    pub palette: Palette,
    pub viewport: Option<Viewport>,
    pub budgets: Vec<f64>,
    pub profits: Vec<f64>,
}

impl ChartSpec {
    pub fn new(data: &ChartData, context: &HostContext) -> Self {
        Self {
            theme: context.theme,
            palette: Palette::for_theme(context.theme),
            viewport: context.viewport,
            budgets: data.budget_scenarios.clone(),
            profits: data.profit_curve.clone(),
        }
    }
}

/// One rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub widget: Uuid,
    pub state: &'a WidgetState,
    pub context: &'a HostContext,
    pub chart: Option<ChartId>,
}

/// Where a widget draws. The widget owns every chart it creates and
/// releases each one exactly once.
pub trait Surface: Send + 'static {
    fn render(&mut self, frame: &Frame<'_>);

    fn create_chart(&mut self, spec: ChartSpec) -> ChartId;

    fn resize_chart(&mut self, id: ChartId, viewport: Viewport);

    fn release_chart(&mut self, id: ChartId);
}

/// A surface with no display that tracks chart allocations.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_id: u64,
    live: BTreeSet<ChartId>,
    created: usize,
    released: usize,
    frames: usize,
    last_state: Option<&'static str>,
    last_theme: Theme,
    specs: Vec<ChartSpec>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_charts(&self) -> usize {
        self.live.len()
    }

    pub fn charts_created(&self) -> usize {
        self.created
    }

    pub fn charts_released(&self) -> usize {
        self.released
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn last_state(&self) -> Option<&'static str> {
        self.last_state
    }

    pub fn last_theme(&self) -> Theme {
        self.last_theme
    }

    /// Specs of every chart ever created, oldest first.
    pub fn chart_specs(&self) -> &[ChartSpec] {
        &self.specs
    }
}

impl Surface for HeadlessSurface {
    fn render(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        self.last_state = Some(frame.state.name());
        self.last_theme = frame.context.theme;
        trace!(widget = %frame.widget, state = frame.state.name(), "frame");
    }

    fn create_chart(&mut self, spec: ChartSpec) -> ChartId {
        self.next_id += 1;
        let id = ChartId(self.next_id);
        self.live.insert(id);
        self.created += 1;
        self.specs.push(spec);
        id
    }

    fn resize_chart(&mut self, id: ChartId, viewport: Viewport) {
        debug_assert!(self.live.contains(&id), "resize of released chart");
        if let Some(spec) = self.specs.get_mut(id.0 as usize - 1) {
            spec.viewport = Some(viewport);
        }
    }

    fn release_chart(&mut self, id: ChartId) {
        if self.live.remove(&id) {
            self.released += 1;
        }
    }
}
