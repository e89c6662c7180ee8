//! Ad-spend ROI calculator.
//!
//! A pure, deterministic function from a [`ParameterSet`] (monthly budget,
//! cost per click, conversion rate, average order value) to a
//! [`ResultRecord`] holding the derived metrics and chart data.
//!
//! # Example
//!
//! ```
//! use calc::{ParameterSet, compute};
//!
//! let params = ParameterSet::new(10_000.0, 2.5, 5.0, 100.0);
//! let record = compute(&params)?;
//! assert_eq!(record.metrics.clicks, 4000.0);
//! assert_eq!(record.metrics.roi_percent, 100.0);
//! # Ok::<(), calc::ValidationError>(())
//! ```

mod compute;
mod error;
mod params;
mod render;

pub use compute::{ChartData, Metrics, ResultRecord, SCENARIO_COUNT, compute, profit_at};
pub use error::{Constraint, Result, ValidationError};
pub use params::ParameterSet;
pub use render::summary;
