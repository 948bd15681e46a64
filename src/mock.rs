//! Static demo dataset keyed by `"{unit}|{function}"` and date bucket.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::DashboardError;
use crate::format::{format_value, parse_numeric};
use crate::models::{
    Bucket, BusinessUnit, ComparisonPoint, Filter, Function, HeadcountSummary, KpiName,
    KpiReading, KpiSummary, ALL_FUNCTIONS, ALL_UNITS,
};

const MOCK_DATASET: &str = include_str!("../data/mock_dataset.json");

/// Peer units listed in comparisons, in display order.
pub const COMPARISON_UNITS: [BusinessUnit; 6] = [
    BusinessUnit::Energy,
    BusinessUnit::Fmcg,
    BusinessUnit::Tech,
    BusinessUnit::Media,
    BusinessUnit::Manufacturing,
    BusinessUnit::Retail,
];

/// Peer functions listed in comparisons, in display order.
pub const COMPARISON_FUNCTIONS: [Function; 7] = [
    Function::Sales,
    Function::Marketing,
    Function::Hr,
    Function::Finance,
    Function::Procurement,
    Function::Legal,
    Function::Others,
];

#[derive(Debug, Clone, Deserialize)]
pub struct MockBlock {
    pub headcount: HeadcountSummary,
    kpis: BTreeMap<KpiName, Value>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default, rename = "drilldownInsights")]
    drilldown_insights: BTreeMap<KpiName, Vec<String>>,
}

impl MockBlock {
    pub fn kpis(&self) -> KpiSummary {
        let mut summary = KpiSummary::default();
        for kpi in KpiName::ALL {
            let reading = match self.kpis.get(&kpi) {
                Some(Value::String(text)) => KpiReading {
                    value: parse_numeric(text),
                    display: text.clone(),
                },
                Some(Value::Number(number)) => {
                    let value = number.as_f64().unwrap_or(0.0);
                    KpiReading {
                        value,
                        display: kpi.display(value),
                    }
                }
                _ => KpiReading {
                    value: 0.0,
                    display: format_value(None, false),
                },
            };
            summary.insert(kpi, reading);
        }
        summary
    }

    pub fn kpi_value(&self, kpi: KpiName) -> f64 {
        match self.kpis.get(&kpi) {
            Some(Value::String(text)) => parse_numeric(text),
            Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// One step of the key fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupStep {
    Exact,
    UnitWide,
    Global,
}

const LOOKUP_CHAIN: [LookupStep; 3] = [LookupStep::Exact, LookupStep::UnitWide, LookupStep::Global];

impl LookupStep {
    fn key(self, unit: &str, function: &str) -> String {
        match self {
            LookupStep::Exact => format!("{unit}|{function}"),
            LookupStep::UnitWide => format!("{unit}|{ALL_FUNCTIONS}"),
            LookupStep::Global => format!("{ALL_UNITS}|{ALL_FUNCTIONS}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockDataset {
    blocks: HashMap<String, HashMap<Bucket, MockBlock>>,
    default: MockBlock,
}

impl MockDataset {
    pub fn embedded() -> Result<Self, DashboardError> {
        Self::from_json(MOCK_DATASET)
    }

    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves a block: first key in the chain that exists, then the
    /// requested bucket, then `ytd`, then the built-in default block.
    pub fn block(&self, unit: &str, function: &str, bucket: Bucket) -> &MockBlock {
        let combo = LOOKUP_CHAIN.iter().find_map(|step| {
            let key = step.key(unit, function);
            self.blocks.get(&key).map(|combo| {
                debug!(?step, %key, "mock lookup matched");
                combo
            })
        });

        combo
            .and_then(|combo| combo.get(&bucket).or_else(|| combo.get(&Bucket::Ytd)))
            .unwrap_or(&self.default)
    }

    pub fn block_for(&self, filter: &Filter) -> Result<&MockBlock, DashboardError> {
        let bucket = filter.bucket().ok_or(DashboardError::UnsupportedWindow)?;
        Ok(self.block(
            filter.business_unit_label(),
            filter.function_label(),
            bucket,
        ))
    }

    /// Per-KPI commentary; blocks without their own fall back to the
    /// default block's.
    pub fn drilldown_insights(&self, block: &MockBlock, kpi: KpiName) -> Vec<String> {
        let source = if block.drilldown_insights.is_empty() {
            &self.default.drilldown_insights
        } else {
            &block.drilldown_insights
        };
        source.get(&kpi).cloned().unwrap_or_default()
    }

    /// Comparison in fixed enumeration order, always read from `ytd` blocks.
    pub fn comparison(&self, filter: &Filter, kpi: KpiName) -> Vec<ComparisonPoint> {
        match filter.function {
            Some(function) => COMPARISON_UNITS
                .iter()
                .map(|unit| ComparisonPoint {
                    category: unit.label().to_string(),
                    value: self
                        .block(unit.label(), function.label(), Bucket::Ytd)
                        .kpi_value(kpi),
                })
                .collect(),
            None => COMPARISON_FUNCTIONS
                .iter()
                .map(|function| ComparisonPoint {
                    category: function.label().to_string(),
                    value: self
                        .block(filter.business_unit_label(), function.label(), Bucket::Ytd)
                        .kpi_value(kpi),
                })
                .collect(),
        }
    }
}
