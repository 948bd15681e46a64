use serde::{Serialize, Serializer};

pub const CURRENCY_SYMBOL: &str = "₹";
pub const PLACEHOLDER: &str = "—";

/// Keeps only digits and decimal points, then parses what is left.
/// Anything unparseable or non-finite becomes 0.
pub fn parse_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Half-up rounding toward positive infinity, the way the dashboard charts
/// have always rounded.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Renders a rounded value with Indian digit grouping (`12,34,567`).
pub fn format_value(value: Option<f64>, is_currency: bool) -> String {
    let value = match value {
        Some(v) if v.is_finite() => round_half_up(v),
        _ => return PLACEHOLDER.to_string(),
    };

    let sign = if value < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", value.abs());
    let prefix = if is_currency { CURRENCY_SYMBOL } else { "" };

    format!("{sign}{prefix}{}", group_indian(&digits))
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisBound {
    Value(f64),
    Auto,
}

impl Serialize for AxisBound {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AxisBound::Value(value) => serializer.serialize_f64(*value),
            AxisBound::Auto => serializer.serialize_str("auto"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisDomain {
    pub low: AxisBound,
    pub high: AxisBound,
}

/// Pads a chart axis so extreme points are not clipped.
///
/// A flat series (`min == max`) is widened by 10% away from zero and 5%
/// toward it, so the value always sits strictly inside the domain.
pub fn pad_domain(min: f64, max: f64) -> AxisDomain {
    if !min.is_finite() || !max.is_finite() {
        return AxisDomain {
            low: AxisBound::Value(0.0),
            high: AxisBound::Auto,
        };
    }

    let (low, high) = if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        if min >= 0.0 {
            (min - pad / 2.0, min + pad)
        } else {
            (min - pad, min + pad / 2.0)
        }
    } else {
        let margin = (max - min) * 0.05;
        (min - margin, max + margin)
    };

    AxisDomain {
        low: AxisBound::Value(low),
        high: AxisBound::Value(high),
    }
}

/// Domain over a series' own extremes; empty series get `[0, auto]`.
pub fn series_domain(values: impl IntoIterator<Item = f64>) -> AxisDomain {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    pad_domain(min, max)
}
