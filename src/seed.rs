use chrono::{Duration, NaiveDate};

use crate::models::{BusinessUnit, Function, HireRecord, Sourcing};
use crate::prng::SeededRng;

pub const SEED: u64 = 20_250_101;
pub const OVERALL: &str = "Overall";

const UNITS: [(BusinessUnit, i64); 4] = [
    (BusinessUnit::Energy, 30_000),
    (BusinessUnit::Fmcg, 200_000),
    (BusinessUnit::Tech, 100_000),
    (BusinessUnit::Media, 5_000),
];

const FUNCTIONS: [(Function, f64); 7] = [
    (Function::Sales, 0.30),
    (Function::Marketing, 0.15),
    (Function::Hr, 0.10),
    (Function::Finance, 0.10),
    (Function::Procurement, 0.10),
    (Function::Legal, 0.05),
    (Function::Others, 0.20),
];

struct KpiRange {
    time_to_fill: (i64, i64),
    cost_per_hire: (i64, i64),
}

struct Personality {
    ijp: f64,
    build: f64,
    diversity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub business_group: String,
    pub function: String,
    pub total_headcount: i64,
    pub available_headcount: i64,
    pub gap: i64,
}

#[derive(Debug, Clone)]
pub struct SeedHire {
    pub source_key: String,
    pub record: HireRecord,
}

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub hires: Vec<SeedHire>,
    pub summaries: Vec<SummaryRow>,
}

fn kpi_range(unit: BusinessUnit, function: Function) -> KpiRange {
    let (time_to_fill, cost_per_hire) = match (unit, function) {
        (BusinessUnit::Tech, Function::Sales) => ((60, 110), (50_000, 85_000)),
        (BusinessUnit::Tech, Function::Marketing) => ((75, 120), (55_000, 90_000)),
        (BusinessUnit::Tech, Function::Others) => ((70, 130), (40_000, 70_000)),
        (BusinessUnit::Tech, Function::Legal) => ((100, 180), (80_000, 150_000)),
        (BusinessUnit::Fmcg, Function::Sales) => ((45, 80), (35_000, 60_000)),
        (BusinessUnit::Fmcg, Function::Marketing) => ((60, 95), (40_000, 70_000)),
        (BusinessUnit::Energy, Function::Legal) => ((110, 190), (90_000, 160_000)),
        _ => ((70, 130), (30_000, 70_000)),
    };
    KpiRange {
        time_to_fill,
        cost_per_hire,
    }
}

fn personality(unit: BusinessUnit) -> Personality {
    let (ijp, build, diversity) = match unit {
        BusinessUnit::Fmcg => (0.95, 0.40, 0.25),
        BusinessUnit::Energy => (0.85, 0.55, 0.20),
        BusinessUnit::Media => (0.90, 0.50, 0.30),
        _ => (0.75, 0.65, 0.35),
    };
    Personality {
        ijp,
        build,
        diversity,
    }
}

fn source_mix(unit: BusinessUnit) -> &'static [(&'static str, f64)] {
    match unit {
        BusinessUnit::Tech => &[
            ("Referral", 0.50),
            ("Agency", 0.30),
            ("Portal", 0.15),
            ("Internal", 0.05),
        ],
        BusinessUnit::Fmcg => &[
            ("Portal", 0.50),
            ("Campus", 0.20),
            ("Agency", 0.15),
            ("Referral", 0.10),
        ],
        _ => &[
            ("Portal", 0.50),
            ("Agency", 0.20),
            ("Referral", 0.15),
            ("Internal", 0.05),
        ],
    }
}

fn role_titles(function: Function) -> &'static [&'static str] {
    match function {
        Function::Sales => &[
            "Account Executive",
            "Sales Development Rep",
            "Regional Sales Manager",
        ],
        Function::Marketing => &[
            "Digital Marketing Specialist",
            "Content Strategist",
            "Brand Manager",
        ],
        Function::Hr => &[
            "HR Business Partner",
            "Talent Acquisition Specialist",
            "HR Generalist",
        ],
        Function::Finance => &["Financial Analyst", "Accountant", "Controller"],
        Function::Procurement => &[
            "Procurement Officer",
            "Category Manager",
            "Sourcing Specialist",
        ],
        Function::Legal => &["Corporate Counsel", "Paralegal", "Compliance Officer"],
        Function::Others => &[
            "Data Scientist",
            "Software Engineer",
            "Product Manager",
            "DevOps Engineer",
        ],
        Function::Operations | Function::RnD => &["General Staff"],
    }
}

/// Cumulative draw over a weighted mix; the last entry absorbs rounding.
fn choose_source(rng: &mut SeededRng, mix: &[(&'static str, f64)]) -> &'static str {
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for (source, weight) in mix {
        cumulative += weight;
        if roll <= cumulative {
            return source;
        }
    }
    mix.last().map_or("Unknown", |(source, _)| source)
}

/// Builds a reproducible year of hires plus headcount summaries whose
/// per-function rows add up exactly to each unit's `Overall` row.
pub fn generate(seed: u64) -> SeedData {
    let mut rng = SeededRng::new(seed);
    let mut data = SeedData::default();

    let year_start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN);
    let year_end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN);
    let days_in_year = (year_end - year_start).num_days();
    let mut outlier_injected = false;

    for (unit, headcount) in UNITS {
        let total = headcount;
        let available = (total as f64 * rng.uniform(0.85, 0.95)) as i64;
        let gap = total - available;
        data.summaries.push(SummaryRow {
            business_group: unit.label().to_string(),
            function: OVERALL.to_string(),
            total_headcount: total,
            available_headcount: available,
            gap,
        });

        let unit_hires = (headcount as f64 * rng.uniform(0.08, 0.12)) as i64;
        let traits = personality(unit);
        let (mut running_total, mut running_available, mut running_gap) = (0, 0, 0);

        for (index, (function, weight)) in FUNCTIONS.iter().enumerate() {
            let (func_total, func_available, func_gap) = if index < FUNCTIONS.len() - 1 {
                (
                    (total as f64 * weight) as i64,
                    (available as f64 * weight) as i64,
                    (gap as f64 * weight) as i64,
                )
            } else {
                (
                    total - running_total,
                    available - running_available,
                    gap - running_gap,
                )
            };
            running_total += func_total;
            running_available += func_available;
            running_gap += func_gap;

            data.summaries.push(SummaryRow {
                business_group: unit.label().to_string(),
                function: function.label().to_string(),
                total_headcount: func_total,
                available_headcount: func_available,
                gap: func_gap,
            });

            let function_hires = (unit_hires as f64 * weight) as i64;
            let range = kpi_range(unit, *function);

            for n in 0..function_hires {
                let offset = rng.int_between(0, days_in_year);
                let hire_date = year_start + Duration::days(offset);
                let mut cost_per_hire =
                    rng.int_between(range.cost_per_hire.0, range.cost_per_hire.1);
                let mut time_to_fill = rng.int_between(range.time_to_fill.0, range.time_to_fill.1);

                if unit == BusinessUnit::Tech {
                    let trend = 1.0 + (offset as f64 / days_in_year as f64) * 0.5;
                    time_to_fill = (time_to_fill as f64 * trend) as i64;
                }

                if unit == BusinessUnit::Energy
                    && *function == Function::Legal
                    && !outlier_injected
                {
                    cost_per_hire *= 3;
                    outlier_injected = true;
                }

                let role_title = rng
                    .pick(role_titles(*function))
                    .copied()
                    .unwrap_or("General Staff");

                let record = HireRecord {
                    business_unit: unit,
                    function: *function,
                    role_title: role_title.to_string(),
                    hire_date,
                    time_to_fill,
                    cost_per_hire,
                    ijp_adherence: rng.chance(traits.ijp),
                    sourcing: if rng.chance(traits.build) {
                        Sourcing::Build
                    } else {
                        Sourcing::Buy
                    },
                    diversity: rng.chance(traits.diversity),
                    source: choose_source(&mut rng, source_mix(unit)).to_string(),
                };

                data.hires.push(SeedHire {
                    source_key: format!("seed-{}-{}-{n:05}", unit.label(), function.label()),
                    record,
                });
            }
        }
    }

    data
}
