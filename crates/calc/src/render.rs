//! Human-readable rendering of a result.

use std::fmt::Write as _;

use crate::compute::ResultRecord;

/// Render a short multi-line summary of `record`.
pub fn summary(record: &ResultRecord) -> String {
    let inputs = &record.inputs;
    let m = &record.metrics;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Budget ${:.2}/mo at ${:.2} CPC, {}% conversion, ${:.2} AOV",
        inputs.monthly_budget,
        inputs.cpc,
        inputs.conversion_rate_percent,
        inputs.average_order_value
    );
    let _ = writeln!(out, "  clicks:       {}", m.clicks);
    let _ = writeln!(out, "  conversions:  {}", m.conversions);
    let _ = writeln!(out, "  revenue:      ${:.2}", m.revenue);
    let _ = writeln!(out, "  profit:       ${:.2}", m.profit);
    let _ = writeln!(out, "  ROI:          {:.1}%", m.roi_percent);
    if m.break_even_budget > 0.0 {
        let _ = write!(out, "  break-even:   ${}", m.break_even_budget);
    } else {
        let _ = write!(out, "  break-even:   n/a");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParameterSet, compute};

    #[test]
    fn summary_lists_metrics() {
        let record = compute(&ParameterSet::new(10_000.0, 2.5, 5.0, 100.0)).unwrap();
        let text = summary(&record);
        assert!(text.contains("clicks:       4000"));
        assert!(text.contains("ROI:          100.0%"));
        assert!(text.contains("break-even:   $1"));
    }

    #[test]
    fn degenerate_break_even_is_not_applicable() {
        let record = compute(&ParameterSet::new(100.0, 1.0, 0.0, 10.0)).unwrap();
        assert!(summary(&record).ends_with("n/a"));
    }
}
