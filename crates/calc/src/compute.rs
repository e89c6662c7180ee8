//! Metric formulas and chart data.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::ParameterSet;

/// Number of points in the budget scenario sweep.
pub const SCENARIO_COUNT: usize = 10;

/// Derived campaign metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub profit: f64,
    pub roi_percent: f64,
    pub break_even_budget: f64,
}

/// Profit across a sweep of budgets from zero to twice the input budget.
///
/// `budget_scenarios` and `profit_curve` are index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub budget_scenarios: Vec<f64>,
    pub profit_curve: Vec<f64>,
}

/// The output of one computation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub inputs: ParameterSet,
    pub metrics: Metrics,
    pub chart_data: ChartData,
}

impl ResultRecord {
    /// True when every metric and chart point is a finite number.
    pub fn is_finite(&self) -> bool {
        let m = &self.metrics;
        [
            m.clicks,
            m.conversions,
            m.revenue,
            m.profit,
            m.roi_percent,
            m.break_even_budget,
        ]
        .iter()
        .chain(&self.chart_data.budget_scenarios)
        .chain(&self.chart_data.profit_curve)
        .all(|v| v.is_finite())
    }
}

/// Validate `params` and compute its [`ResultRecord`].
pub fn compute(params: &ParameterSet) -> Result<ResultRecord> {
    params.validate()?;

    let clicks = clicks(params.monthly_budget, params.cpc);
    let conversions = conversions(clicks, params.conversion_rate_percent);
    let revenue = conversions * params.average_order_value;
    let profit = revenue - params.monthly_budget;
    let roi_percent = (profit / params.monthly_budget) * 100.0;

    let budget_scenarios: Vec<f64> = (0..SCENARIO_COUNT)
        .map(|i| ((2.0 * params.monthly_budget / 9.0) * i as f64).floor())
        .collect();
    let profit_curve = budget_scenarios
        .iter()
        .map(|&budget| profit_at(params, budget))
        .collect();

    Ok(ResultRecord {
        inputs: *params,
        metrics: Metrics {
            clicks,
            conversions,
            revenue,
            profit,
            roi_percent,
            break_even_budget: break_even_budget(params),
        },
        chart_data: ChartData {
            budget_scenarios,
            profit_curve,
        },
    })
}

/// Profit for `budget` with the remaining inputs of `params`.
pub fn profit_at(params: &ParameterSet, budget: f64) -> f64 {
    let clicks = clicks(budget, params.cpc);
    let conversions = conversions(clicks, params.conversion_rate_percent);
    conversions * params.average_order_value - budget
}

fn clicks(budget: f64, cpc: f64) -> f64 {
    (budget / cpc).floor()
}

fn conversions(clicks: f64, conversion_rate_percent: f64) -> f64 {
    (clicks * conversion_rate_percent / 100.0).floor()
}

// Zero stands in for "undefined" when nothing converts.
fn break_even_budget(params: &ParameterSet) -> f64 {
    if params.conversion_rate_percent > 0.0 && params.average_order_value > 0.0 {
        (params.cpc / ((params.conversion_rate_percent / 100.0) * params.average_order_value))
            .ceil()
    } else {
        0.0
    }
}
