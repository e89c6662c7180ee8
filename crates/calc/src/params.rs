//! Calculator inputs.

use serde::{Deserialize, Serialize};

use crate::error::{Constraint, Result, ValidationError};

const DEFAULT_MONTHLY_BUDGET: f64 = 10_000.0;
const DEFAULT_CPC: f64 = 2.5;
const DEFAULT_CONVERSION_RATE_PERCENT: f64 = 5.0;
const DEFAULT_AVERAGE_ORDER_VALUE: f64 = 100.0;

/// The four calculator inputs.
///
/// Missing fields take their defaults when deserialized, so a bare `{}`
/// argument object is a valid request. Unknown fields are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterSet {
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget: f64,
    #[serde(default = "default_cpc")]
    pub cpc: f64,
    #[serde(default = "default_conversion_rate_percent")]
    pub conversion_rate_percent: f64,
    #[serde(default = "default_average_order_value")]
    pub average_order_value: f64,
}

fn default_monthly_budget() -> f64 {
    DEFAULT_MONTHLY_BUDGET
}

fn default_cpc() -> f64 {
    DEFAULT_CPC
}

fn default_conversion_rate_percent() -> f64 {
    DEFAULT_CONVERSION_RATE_PERCENT
}

fn default_average_order_value() -> f64 {
    DEFAULT_AVERAGE_ORDER_VALUE
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            monthly_budget: DEFAULT_MONTHLY_BUDGET,
            cpc: DEFAULT_CPC,
            conversion_rate_percent: DEFAULT_CONVERSION_RATE_PERCENT,
            average_order_value: DEFAULT_AVERAGE_ORDER_VALUE,
        }
    }
}

impl ParameterSet {
    pub fn new(
        monthly_budget: f64,
        cpc: f64,
        conversion_rate_percent: f64,
        average_order_value: f64,
    ) -> Self {
        Self {
            monthly_budget,
            cpc,
            conversion_rate_percent,
            average_order_value,
        }
    }

    /// Return a copy with a different monthly budget.
    pub fn with_budget(self, monthly_budget: f64) -> Self {
        Self {
            monthly_budget,
            ..self
        }
    }

    /// Check every field against its constraint, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("monthlyBudget", self.monthly_budget, Constraint::Positive),
            ("cpc", self.cpc, Constraint::Positive),
            (
                "conversionRatePercent",
                self.conversion_rate_percent,
                Constraint::Percentage,
            ),
            (
                "averageOrderValue",
                self.average_order_value,
                Constraint::Positive,
            ),
        ];

        for (field, value, constraint) in fields {
            if !value.is_finite() {
                return Err(ValidationError {
                    field,
                    constraint: Constraint::Finite,
                    value,
                });
            }
            let ok = match constraint {
                Constraint::Positive => value > 0.0,
                Constraint::Percentage => (0.0..=100.0).contains(&value),
                Constraint::Finite => true,
            };
            if !ok {
                return Err(ValidationError {
                    field,
                    constraint,
                    value,
                });
            }
        }
        Ok(())
    }
}
