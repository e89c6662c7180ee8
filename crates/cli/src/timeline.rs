//! A surface that prints what the widget draws, with timestamps.

use chrono::Local;
use runtime::{ChartId, ChartSpec, Frame, HeadlessSurface, Surface, Viewport, WidgetState};

/// Prints each frame and chart operation as it happens, and keeps the
/// allocation counts of a [`HeadlessSurface`] for the final report.
#[derive(Debug, Default)]
pub struct TimelineSurface {
    inner: HeadlessSurface,
}

impl TimelineSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charts(&self) -> &HeadlessSurface {
        &self.inner
    }
}

pub fn stamp(line: impl std::fmt::Display) {
    println!("[{}] {line}", Local::now().format("%H:%M:%S%.3f"));
}

fn describe(state: &WidgetState) -> String {
    match state {
        WidgetState::Idle => "idle".to_string(),
        WidgetState::Loading => "loading...".to_string(),
        WidgetState::Success(record) => format!(
            "success: budget {:.2}, profit {:.2}, ROI {:.2}%",
            record.inputs.monthly_budget, record.metrics.profit, record.metrics.roi_percent
        ),
        WidgetState::Error(message) => format!("error: {message}"),
    }
}

impl Surface for TimelineSurface {
    fn render(&mut self, frame: &Frame<'_>) {
        stamp(format_args!(
            "render [{:?}] {}",
            frame.context.theme,
            describe(frame.state)
        ));
        self.inner.render(frame);
    }

    fn create_chart(&mut self, spec: ChartSpec) -> ChartId {
        let theme = spec.theme;
        let points = spec.budgets.len();
        let id = self.inner.create_chart(spec);
        stamp(format_args!("chart {} created ({theme:?}, {points} points)", id.0));
        id
    }

    fn resize_chart(&mut self, id: ChartId, viewport: Viewport) {
        stamp(format_args!(
            "chart {} resized to {:.0}x{:.0}",
            id.0, viewport.width, viewport.height
        ));
        self.inner.resize_chart(id, viewport);
    }

    fn release_chart(&mut self, id: ChartId) {
        stamp(format_args!("chart {} released", id.0));
        self.inner.release_chart(id);
    }
}
