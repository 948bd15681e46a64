use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::db::{self, HireScope};
use crate::error::DashboardError;
use crate::format::{series_domain, AxisDomain};
use crate::metrics::KpiTotals;
use crate::mock::MockDataset;
use crate::models::{
    ComparisonPoint, Dimension, Filter, HeadcountSummary, KpiName, KpiSummary, TrendPoint,
};
use crate::prng::{synthetic_trend, MONTHS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub headcount: HeadcountSummary,
    pub kpis: KpiSummary,
    /// Long-form commentary shipped with the data, if any.
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drilldown {
    pub kpi: KpiName,
    pub trend: Vec<TrendPoint>,
    pub trend_domain: AxisDomain,
    pub comparison_dimension: Dimension,
    pub comparison: Vec<ComparisonPoint>,
    pub comparison_domain: AxisDomain,
    pub insights: Vec<String>,
}

/// Where dashboard numbers come from.
pub enum Dataset {
    /// Precomputed blocks; trends are synthesized.
    Mock(MockDataset),
    /// Row-level hires aggregated with SQL. Buckets resolve against `as_of`.
    /// `baseline` supplies summary KPI values while the store holds no hires.
    Rows {
        pool: SqlitePool,
        as_of: NaiveDate,
        baseline: MockDataset,
    },
}

impl Dataset {
    pub async fn compute_metrics(
        &self,
        filter: &Filter,
    ) -> Result<DashboardMetrics, DashboardError> {
        match self {
            Dataset::Mock(data) => {
                let block = data.block_for(filter)?;
                Ok(DashboardMetrics {
                    headcount: block.headcount,
                    kpis: block.kpis(),
                    insights: block.insights.clone(),
                })
            }
            Dataset::Rows { pool, as_of, .. } => {
                let scope = HireScope::new(filter, *as_of);
                let totals = db::fetch_kpi_totals(pool, &scope).await?;
                let headcount =
                    db::fetch_headcount(pool, filter.business_unit, filter.function).await?;
                Ok(DashboardMetrics {
                    headcount,
                    kpis: totals.summary(),
                    insights: Vec::new(),
                })
            }
        }
    }

    pub async fn compute_drilldown(
        &self,
        filter: &Filter,
        kpi_name: &str,
    ) -> Result<Drilldown, DashboardError> {
        let kpi: KpiName = kpi_name.parse()?;
        let dimension = Dimension::for_filter(filter);

        let (trend, comparison, insights) = match self {
            Dataset::Mock(data) => {
                let block = data.block_for(filter)?;
                let trend = synthetic_trend(
                    &filter.fingerprint(kpi),
                    block.kpi_value(kpi),
                    filter.trend_span(),
                );
                (
                    trend,
                    data.comparison(filter, kpi),
                    data.drilldown_insights(block, kpi),
                )
            }
            Dataset::Rows {
                pool,
                as_of,
                baseline,
            } => {
                let scope = HireScope::new(filter, *as_of);
                let trend = rows_trend(pool, baseline, &scope, filter, kpi).await?;
                let comparison = rows_comparison(pool, &scope, dimension, kpi).await?;
                (trend, comparison, Vec::new())
            }
        };

        Ok(Drilldown {
            kpi,
            trend_domain: series_domain(trend.iter().map(|p| p.value)),
            comparison_domain: series_domain(comparison.iter().map(|p| p.value)),
            trend,
            comparison_dimension: dimension,
            comparison,
            insights,
        })
    }
}

async fn rows_trend(
    pool: &SqlitePool,
    baseline: &MockDataset,
    scope: &HireScope,
    filter: &Filter,
    kpi: KpiName,
) -> Result<Vec<TrendPoint>, DashboardError> {
    if db::count_hires(pool).await? == 0 {
        let current = baseline
            .block(
                filter.business_unit_label(),
                filter.function_label(),
                filter.nearest_bucket(),
            )
            .kpi_value(kpi);
        debug!(kpi = kpi.label(), current, "no row-level hires, synthesizing trend");
        return Ok(synthetic_trend(
            &filter.fingerprint(kpi),
            current,
            filter.trend_span(),
        ));
    }

    let with_year = scope.start.year() != scope.end.year();
    let months = db::fetch_monthly_totals(pool, scope).await?;
    Ok(months
        .into_iter()
        .map(|(period, totals)| TrendPoint {
            period: month_label(&period, with_year),
            value: totals.value(kpi),
        })
        .collect())
}

async fn rows_comparison(
    pool: &SqlitePool,
    scope: &HireScope,
    dimension: Dimension,
    kpi: KpiName,
) -> Result<Vec<ComparisonPoint>, DashboardError> {
    let groups: HashMap<String, KpiTotals> =
        db::fetch_group_totals(pool, &scope.across(dimension), dimension)
            .await?
            .into_iter()
            .collect();

    // Peers without hires in scope still get a zero entry.
    let mut points: Vec<ComparisonPoint> = dimension
        .categories()
        .into_iter()
        .map(|category| ComparisonPoint {
            category: category.to_string(),
            value: groups
                .get(category)
                .copied()
                .unwrap_or_default()
                .value(kpi),
        })
        .collect();

    points.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(points)
}

/// `2025-03` → `Mar`, or `Mar 2025` when the window spans several years;
/// anything unparseable is shown as-is.
fn month_label(period: &str, with_year: bool) -> String {
    let month = period
        .get(5..7)
        .and_then(|month| month.parse::<usize>().ok())
        .and_then(|month| month.checked_sub(1))
        .and_then(|index| MONTHS.get(index));

    match (month, period.get(..4)) {
        (Some(month), Some(year)) if with_year => format!("{month} {year}"),
        (Some(month), _) => (*month).to_string(),
        (None, _) => period.to_string(),
    }
}

/// Last successfully computed dashboard plus the latest failure message.
/// A failed recomputation never overwrites good numbers.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub metrics: Option<DashboardMetrics>,
    pub error: Option<String>,
}

impl DashboardState {
    pub fn apply(&mut self, result: Result<DashboardMetrics, DashboardError>) {
        match result {
            Ok(metrics) => {
                self.metrics = Some(metrics);
                self.error = None;
            }
            Err(err) => {
                error!(error = %err, "failed to recompute dashboard");
                self.error = Some(format!("Failed to load dashboard data: {err}"));
            }
        }
    }
}
