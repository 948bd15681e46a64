use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::format::format_value;

pub const ALL_UNITS: &str = "All Units";
pub const ALL_FUNCTIONS: &str = "All Functions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BusinessUnit {
    Tech,
    #[serde(rename = "FMCG")]
    Fmcg,
    Energy,
    Media,
    Manufacturing,
    Retail,
}

impl BusinessUnit {
    pub const ALL: [BusinessUnit; 6] = [
        BusinessUnit::Tech,
        BusinessUnit::Fmcg,
        BusinessUnit::Energy,
        BusinessUnit::Media,
        BusinessUnit::Manufacturing,
        BusinessUnit::Retail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BusinessUnit::Tech => "Tech",
            BusinessUnit::Fmcg => "FMCG",
            BusinessUnit::Energy => "Energy",
            BusinessUnit::Media => "Media",
            BusinessUnit::Manufacturing => "Manufacturing",
            BusinessUnit::Retail => "Retail",
        }
    }
}

impl FromStr for BusinessUnit {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|unit| unit.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownBusinessUnit(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Function {
    Sales,
    Marketing,
    #[serde(rename = "HR")]
    Hr,
    Finance,
    Procurement,
    Legal,
    Operations,
    #[serde(rename = "R&D")]
    RnD,
    Others,
}

impl Function {
    pub const ALL: [Function; 9] = [
        Function::Sales,
        Function::Marketing,
        Function::Hr,
        Function::Finance,
        Function::Procurement,
        Function::Legal,
        Function::Operations,
        Function::RnD,
        Function::Others,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Function::Sales => "Sales",
            Function::Marketing => "Marketing",
            Function::Hr => "HR",
            Function::Finance => "Finance",
            Function::Procurement => "Procurement",
            Function::Legal => "Legal",
            Function::Operations => "Operations",
            Function::RnD => "R&D",
            Function::Others => "Others",
        }
    }
}

impl FromStr for Function {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|function| function.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownFunction(wanted.to_string()))
    }
}

/// Relative reporting window used instead of explicit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Ytd,
    Last6Months,
    Last3Months,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Ytd => "ytd",
            Bucket::Last6Months => "last6Months",
            Bucket::Last3Months => "last3Months",
        }
    }

    /// Assumed historical swing for synthetic trends; wider windows swing more.
    pub fn span(self) -> f64 {
        match self {
            Bucket::Ytd => 0.10,
            Bucket::Last6Months => 0.15,
            Bucket::Last3Months => 0.25,
        }
    }

    pub fn date_range(self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            Bucket::Ytd => as_of.with_ordinal(1).unwrap_or(as_of),
            Bucket::Last6Months => as_of
                .checked_sub_months(Months::new(6))
                .unwrap_or(NaiveDate::MIN),
            Bucket::Last3Months => as_of
                .checked_sub_months(Months::new(3))
                .unwrap_or(NaiveDate::MIN),
        };
        (start, as_of)
    }
}

impl FromStr for Bucket {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ytd" => Ok(Bucket::Ytd),
            "last6months" => Ok(Bucket::Last6Months),
            "last3months" => Ok(Bucket::Last3Months),
            other => Err(DashboardError::UnknownBucket(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    Range { start: NaiveDate, end: NaiveDate },
    Bucket(Bucket),
}

impl DateWindow {
    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidDateRange { start, end });
        }
        Ok(DateWindow::Range { start, end })
    }
}

impl FromStr for DateWindow {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("..") {
            Some((start, end)) => {
                let parse = |raw: &str| {
                    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                        .map_err(|_| DashboardError::MalformedFilter(s.to_string()))
                };
                DateWindow::range(parse(start)?, parse(end)?)
            }
            None => s.parse().map(DateWindow::Bucket),
        }
    }
}

/// Immutable filter selection; `None` stands for the "all" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub business_unit: Option<BusinessUnit>,
    pub function: Option<Function>,
    pub window: DateWindow,
}

impl Filter {
    pub fn new(
        business_unit: Option<BusinessUnit>,
        function: Option<Function>,
        window: DateWindow,
    ) -> Self {
        Self {
            business_unit,
            function,
            window,
        }
    }

    /// Parses display labels, mapping the "All Units"/"All Functions"
    /// sentinels (or `all`) to `None`.
    pub fn from_labels(
        business_unit: &str,
        function: &str,
        window: DateWindow,
    ) -> Result<Self, DashboardError> {
        let business_unit = if is_sentinel(business_unit, ALL_UNITS) {
            None
        } else {
            Some(business_unit.parse()?)
        };
        let function = if is_sentinel(function, ALL_FUNCTIONS) {
            None
        } else {
            Some(function.parse()?)
        };
        Ok(Self::new(business_unit, function, window))
    }

    /// Parses `"<unit>|<function>|<bucket or start..end>"`.
    pub fn parse_line(line: &str) -> Result<Self, DashboardError> {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [unit, function, window] => Self::from_labels(unit, function, window.parse()?),
            _ => Err(DashboardError::MalformedFilter(line.to_string())),
        }
    }

    pub fn business_unit_label(&self) -> &'static str {
        self.business_unit.map_or(ALL_UNITS, BusinessUnit::label)
    }

    pub fn function_label(&self) -> &'static str {
        self.function.map_or(ALL_FUNCTIONS, Function::label)
    }

    pub fn bucket(&self) -> Option<Bucket> {
        match self.window {
            DateWindow::Bucket(bucket) => Some(bucket),
            DateWindow::Range { .. } => None,
        }
    }

    pub fn date_range(&self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self.window {
            DateWindow::Range { start, end } => (start, end),
            DateWindow::Bucket(bucket) => bucket.date_range(as_of),
        }
    }

    pub fn window_key(&self) -> String {
        match self.window {
            DateWindow::Range { start, end } => format!("{start}..{end}"),
            DateWindow::Bucket(bucket) => bucket.as_str().to_string(),
        }
    }

    /// The bucket itself, or for explicit ranges the bucket of similar length.
    pub fn nearest_bucket(&self) -> Bucket {
        match self.window {
            DateWindow::Bucket(bucket) => bucket,
            DateWindow::Range { start, end } => match (end - start).num_days() {
                ..=92 => Bucket::Last3Months,
                93..=183 => Bucket::Last6Months,
                _ => Bucket::Ytd,
            },
        }
    }

    pub fn trend_span(&self) -> f64 {
        self.nearest_bucket().span()
    }

    /// Fingerprint seeding the synthetic trend for one KPI under this filter.
    pub fn fingerprint(&self, kpi: KpiName) -> String {
        format!(
            "{}|{}|{}|{}",
            self.business_unit_label(),
            self.function_label(),
            kpi.label(),
            self.window_key()
        )
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.business_unit_label(),
            self.function_label(),
            self.window_key()
        )
    }
}

fn is_sentinel(value: &str, sentinel: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(sentinel) || value.eq_ignore_ascii_case("all")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KpiName {
    #[serde(rename = "Total Hires")]
    TotalHires,
    #[serde(rename = "Avg. Time to Fill")]
    AvgTimeToFill,
    #[serde(rename = "Avg. Cost Per Hire")]
    AvgCostPerHire,
    #[serde(rename = "IJP Adherence")]
    IjpAdherence,
    #[serde(rename = "Build Ratio")]
    BuildRatio,
    #[serde(rename = "Diversity %")]
    Diversity,
}

impl KpiName {
    pub const ALL: [KpiName; 6] = [
        KpiName::TotalHires,
        KpiName::AvgTimeToFill,
        KpiName::AvgCostPerHire,
        KpiName::IjpAdherence,
        KpiName::BuildRatio,
        KpiName::Diversity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KpiName::TotalHires => "Total Hires",
            KpiName::AvgTimeToFill => "Avg. Time to Fill",
            KpiName::AvgCostPerHire => "Avg. Cost Per Hire",
            KpiName::IjpAdherence => "IJP Adherence",
            KpiName::BuildRatio => "Build Ratio",
            KpiName::Diversity => "Diversity %",
        }
    }

    pub fn display(self, value: f64) -> String {
        match self {
            KpiName::TotalHires => format_value(Some(value), false),
            KpiName::AvgTimeToFill => format!("{} days", format_value(Some(value), false)),
            KpiName::AvgCostPerHire => format_value(Some(value), true),
            KpiName::IjpAdherence | KpiName::BuildRatio | KpiName::Diversity => {
                format!("{}%", format_value(Some(value), false))
            }
        }
    }
}

impl FromStr for KpiName {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kpi| kpi.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownKpi(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReading {
    pub value: f64,
    pub display: String,
}

/// Fixed-key KPI card values, ordered as the dashboard shows them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KpiSummary {
    readings: BTreeMap<KpiName, KpiReading>,
}

impl KpiSummary {
    pub fn insert(&mut self, kpi: KpiName, reading: KpiReading) {
        self.readings.insert(kpi, reading);
    }

    pub fn get(&self, kpi: KpiName) -> Option<&KpiReading> {
        self.readings.get(&kpi)
    }

    pub fn value(&self, kpi: KpiName) -> f64 {
        self.get(kpi).map_or(0.0, |reading| reading.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (KpiName, &KpiReading)> {
        self.readings.iter().map(|(kpi, reading)| (*kpi, reading))
    }

    /// Label → display string, the shape the insight service expects.
    pub fn display_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(kpi, reading)| (kpi.label().to_string(), reading.display.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadcountSummary {
    pub total: u64,
    pub available: u64,
    pub gap: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sourcing {
    Build,
    Buy,
}

impl Sourcing {
    pub fn as_str(self) -> &'static str {
        match self {
            Sourcing::Build => "Build",
            Sourcing::Buy => "Buy",
        }
    }
}

impl FromStr for Sourcing {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "build" => Ok(Sourcing::Build),
            "buy" => Ok(Sourcing::Buy),
            other => Err(DashboardError::UnknownSourcing(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HireRecord {
    pub business_unit: BusinessUnit,
    pub function: Function,
    pub role_title: String,
    pub hire_date: NaiveDate,
    pub time_to_fill: i64,
    pub cost_per_hire: i64,
    pub ijp_adherence: bool,
    pub sourcing: Sourcing,
    pub diversity: bool,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub category: String,
    pub value: f64,
}

/// Peer dimension a drill-down compares across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    BusinessUnit,
    Function,
}

impl Dimension {
    /// A pinned function compares business units; otherwise functions.
    pub fn for_filter(filter: &Filter) -> Self {
        if filter.function.is_some() {
            Dimension::BusinessUnit
        } else {
            Dimension::Function
        }
    }

    /// Every peer label along this dimension, in enumeration order.
    pub fn categories(self) -> Vec<&'static str> {
        match self {
            Dimension::BusinessUnit => BusinessUnit::ALL.iter().map(|unit| unit.label()).collect(),
            Dimension::Function => Function::ALL.iter().map(|function| function.label()).collect(),
        }
    }
}
