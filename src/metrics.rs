use crate::models::{HireRecord, KpiName, KpiReading, KpiSummary, Sourcing};

/// Counts and sums over a set of hires; every KPI derives from these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KpiTotals {
    pub hires: i64,
    pub time_to_fill_days: i64,
    pub cost_per_hire: i64,
    pub ijp_hires: i64,
    pub build_hires: i64,
    pub diverse_hires: i64,
}

impl KpiTotals {
    pub fn from_records(records: &[HireRecord]) -> Self {
        records.iter().fold(Self::default(), |mut totals, record| {
            totals.hires += 1;
            totals.time_to_fill_days += record.time_to_fill;
            totals.cost_per_hire += record.cost_per_hire;
            totals.ijp_hires += i64::from(record.ijp_adherence);
            totals.build_hires += i64::from(record.sourcing == Sourcing::Build);
            totals.diverse_hires += i64::from(record.diversity);
            totals
        })
    }

    pub fn value(&self, kpi: KpiName) -> f64 {
        match kpi {
            KpiName::TotalHires => self.hires as f64,
            KpiName::AvgTimeToFill => mean(self.time_to_fill_days, self.hires),
            KpiName::AvgCostPerHire => mean(self.cost_per_hire, self.hires),
            KpiName::IjpAdherence => percentage(self.ijp_hires, self.hires),
            KpiName::BuildRatio => percentage(self.build_hires, self.hires),
            KpiName::Diversity => percentage(self.diverse_hires, self.hires),
        }
    }

    pub fn summary(&self) -> KpiSummary {
        let mut summary = KpiSummary::default();
        for kpi in KpiName::ALL {
            let value = self.value(kpi);
            summary.insert(
                kpi,
                KpiReading {
                    value,
                    display: kpi.display(value),
                },
            );
        }
        summary
    }
}

fn mean(total: i64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}
