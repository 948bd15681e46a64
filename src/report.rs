use std::fmt::Write;

use crate::dashboard::{DashboardMetrics, Drilldown};
use crate::format::{format_value, AxisBound, AxisDomain};
use crate::insights::INSIGHT_TITLES;
use crate::models::{Dimension, Filter};

/// Drops leading emoji/punctuation so cards start at the first word.
pub fn clean_insight(text: &str) -> &str {
    text.trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
}

pub fn insight_title(index: usize) -> &'static str {
    INSIGHT_TITLES.get(index).copied().unwrap_or("Insight")
}

fn write_insights(output: &mut String, insights: &[String]) {
    if insights.is_empty() {
        let _ = writeln!(output, "No insights.");
        return;
    }
    for (index, text) in insights.iter().enumerate() {
        let _ = writeln!(output, "- **{}**: {}", insight_title(index), clean_insight(text));
    }
}

fn domain_label(domain: &AxisDomain) -> String {
    let bound = |b: &AxisBound| match b {
        AxisBound::Value(v) => format!("{v:.1}"),
        AxisBound::Auto => "auto".to_string(),
    };
    format!("[{}, {}]", bound(&domain.low), bound(&domain.high))
}

pub fn build_report(
    filter: &Filter,
    metrics: &DashboardMetrics,
    insights: &[String],
    drilldown: Option<&Drilldown>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Talent Dashboard");
    let _ = writeln!(
        output,
        "Business unit: {} | Function: {} | Window: {}",
        filter.business_unit_label(),
        filter.function_label(),
        filter.window_key()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headcount Overview");
    let _ = writeln!(
        output,
        "- Total Headcount: {}",
        format_value(Some(metrics.headcount.total as f64), false)
    );
    let _ = writeln!(
        output,
        "- Available Headcount: {}",
        format_value(Some(metrics.headcount.available as f64), false)
    );
    let _ = writeln!(
        output,
        "- Open Positions: {}",
        format_value(Some(metrics.headcount.gap as f64), false)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Performance Indicators");
    for (kpi, reading) in metrics.kpis.iter() {
        let _ = writeln!(output, "- {}: {}", kpi.label(), reading.display);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## AI-Driven Insights");
    write_insights(&mut output, insights);

    if let Some(drilldown) = drilldown {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Drill-down: {}", drilldown.kpi.label());
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### 12-month Trend (axis {})",
            domain_label(&drilldown.trend_domain)
        );
        if drilldown.trend.is_empty() {
            let _ = writeln!(output, "No hires recorded for this window.");
        }
        for point in &drilldown.trend {
            let _ = writeln!(
                output,
                "- {}: {}",
                point.period,
                format_value(Some(point.value), false)
            );
        }

        let peers = match drilldown.comparison_dimension {
            Dimension::BusinessUnit => "Business Units",
            Dimension::Function => "Functions",
        };
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### Comparison across {} (axis {})",
            peers,
            domain_label(&drilldown.comparison_domain)
        );
        if drilldown.comparison.is_empty() {
            let _ = writeln!(output, "No peers to compare.");
        }
        for point in &drilldown.comparison {
            let _ = writeln!(
                output,
                "- {}: {}",
                point.category,
                format_value(Some(point.value), false)
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Commentary");
        write_insights(&mut output, &drilldown.insights);
    }

    output
}
