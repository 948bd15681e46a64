use std::path::Path;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::format::parse_numeric;
use crate::metrics::KpiTotals;
use crate::models::{BusinessUnit, Dimension, Filter, Function, HeadcountSummary, HireRecord};
use crate::seed::{self, SeedData, OVERALL};

const ALL_UNITS_ROW: &str = "All Units";

const KPI_COLUMNS: &str = "COUNT(*) AS hires, \
     COALESCE(SUM(time_to_fill), 0) AS time_to_fill_days, \
     COALESCE(SUM(cost_per_hire), 0) AS cost_per_hire, \
     COALESCE(SUM(CASE WHEN ijp_adherence THEN 1 ELSE 0 END), 0) AS ijp_hires, \
     COALESCE(SUM(CASE WHEN build_buy_ratio = 'Build' THEN 1 ELSE 0 END), 0) AS build_hires, \
     COALESCE(SUM(CASE WHEN diversity_ratio THEN 1 ELSE 0 END), 0) AS diverse_hires";

pub async fn init_db(pool: &SqlitePool) -> Result<(), DashboardError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Row-level slice of `hiring_data` selected by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HireScope {
    pub business_unit: Option<BusinessUnit>,
    pub function: Option<Function>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HireScope {
    pub fn new(filter: &Filter, as_of: NaiveDate) -> Self {
        let (start, end) = filter.date_range(as_of);
        Self {
            business_unit: filter.business_unit,
            function: filter.function,
            start,
            end,
        }
    }

    /// Releases the pin on the compared dimension so every peer shows up.
    pub fn across(self, dimension: Dimension) -> Self {
        match dimension {
            Dimension::BusinessUnit => Self {
                business_unit: None,
                ..self
            },
            Dimension::Function => Self {
                function: None,
                ..self
            },
        }
    }

    fn query(&self, select: &str) -> (String, Vec<String>) {
        let mut query = format!(
            "SELECT {select} FROM hiring_data WHERE hire_date >= ? AND hire_date <= ?"
        );
        let mut binds = vec![
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        ];

        if let Some(unit) = self.business_unit {
            query.push_str(" AND business_group = ?");
            binds.push(unit.label().to_string());
        }

        if let Some(function) = self.function {
            query.push_str(" AND function = ?");
            binds.push(function.label().to_string());
        }

        (query, binds)
    }
}

fn totals_from_row(row: &SqliteRow) -> Result<KpiTotals, sqlx::Error> {
    Ok(KpiTotals {
        hires: row.try_get("hires")?,
        time_to_fill_days: row.try_get("time_to_fill_days")?,
        cost_per_hire: row.try_get("cost_per_hire")?,
        ijp_hires: row.try_get("ijp_hires")?,
        build_hires: row.try_get("build_hires")?,
        diverse_hires: row.try_get("diverse_hires")?,
    })
}

async fn fetch_rows(
    pool: &SqlitePool,
    query: &str,
    binds: &[String],
) -> Result<Vec<SqliteRow>, DashboardError> {
    let mut rows = sqlx::query(query);
    for value in binds {
        rows = rows.bind(value.as_str());
    }
    Ok(rows.fetch_all(pool).await?)
}

pub async fn count_hires(pool: &SqlitePool) -> Result<i64, DashboardError> {
    let row = sqlx::query("SELECT COUNT(*) AS hires FROM hiring_data")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("hires")?)
}

pub async fn fetch_kpi_totals(
    pool: &SqlitePool,
    scope: &HireScope,
) -> Result<KpiTotals, DashboardError> {
    let (query, binds) = scope.query(KPI_COLUMNS);
    let rows = fetch_rows(pool, &query, &binds).await?;
    match rows.first() {
        Some(row) => Ok(totals_from_row(row)?),
        None => Ok(KpiTotals::default()),
    }
}

/// Totals per calendar month (`YYYY-MM`), oldest first.
pub async fn fetch_monthly_totals(
    pool: &SqlitePool,
    scope: &HireScope,
) -> Result<Vec<(String, KpiTotals)>, DashboardError> {
    let (mut query, binds) =
        scope.query(&format!("strftime('%Y-%m', hire_date) AS period, {KPI_COLUMNS}"));
    query.push_str(" GROUP BY period ORDER BY period");

    let rows = fetch_rows(pool, &query, &binds).await?;
    let mut months = Vec::with_capacity(rows.len());
    for row in rows {
        months.push((row.try_get("period")?, totals_from_row(&row)?));
    }
    Ok(months)
}

/// Totals per business unit or per function.
pub async fn fetch_group_totals(
    pool: &SqlitePool,
    scope: &HireScope,
    dimension: Dimension,
) -> Result<Vec<(String, KpiTotals)>, DashboardError> {
    let column = match dimension {
        Dimension::BusinessUnit => "business_group",
        Dimension::Function => "function",
    };
    let (mut query, binds) = scope.query(&format!("{column} AS category, {KPI_COLUMNS}"));
    query.push_str(" GROUP BY category");

    let rows = fetch_rows(pool, &query, &binds).await?;
    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        groups.push((row.try_get("category")?, totals_from_row(&row)?));
    }
    Ok(groups)
}

/// Most recent hires in scope.
pub async fn fetch_hires(
    pool: &SqlitePool,
    scope: &HireScope,
    limit: usize,
) -> Result<Vec<HireRecord>, DashboardError> {
    let (mut query, binds) = scope.query(
        "business_group, function, role_title, hire_date, time_to_fill, cost_per_hire, \
         ijp_adherence, build_buy_ratio, diversity_ratio, source",
    );
    query.push_str(&format!(" ORDER BY hire_date DESC, id DESC LIMIT {limit}"));

    let rows = fetch_rows(pool, &query, &binds).await?;
    let mut hires = Vec::with_capacity(rows.len());

    for row in rows {
        hires.push(HireRecord {
            business_unit: row.try_get::<String, _>("business_group")?.parse()?,
            function: row.try_get::<String, _>("function")?.parse()?,
            role_title: row.try_get("role_title")?,
            hire_date: row.try_get("hire_date")?,
            time_to_fill: row.try_get("time_to_fill")?,
            cost_per_hire: row.try_get("cost_per_hire")?,
            ijp_adherence: row.try_get("ijp_adherence")?,
            sourcing: row.try_get::<String, _>("build_buy_ratio")?.parse()?,
            diversity: row.try_get("diversity_ratio")?,
            source: row.try_get("source")?,
        });
    }

    Ok(hires)
}

/// Headcount comes from `business_summary`, never from hires. A unit with
/// all functions reads its `Overall` row; "all units" sums per-unit rows and
/// skips any pre-rolled `All Units` row so nothing is counted twice.
pub async fn fetch_headcount(
    pool: &SqlitePool,
    business_unit: Option<BusinessUnit>,
    function: Option<Function>,
) -> Result<HeadcountSummary, DashboardError> {
    let mut query = String::from(
        "SELECT COALESCE(SUM(total_headcount), 0) AS total, \
         COALESCE(SUM(available_headcount), 0) AS available, \
         COALESCE(SUM(gap), 0) AS gap \
         FROM business_summary WHERE function = ?",
    );
    let mut binds = vec![function.map_or(OVERALL, Function::label).to_string()];

    match business_unit {
        Some(unit) => {
            query.push_str(" AND business_group = ?");
            binds.push(unit.label().to_string());
        }
        None => {
            query.push_str(" AND business_group != ?");
            binds.push(ALL_UNITS_ROW.to_string());
        }
    }

    let rows = fetch_rows(pool, &query, &binds).await?;
    let Some(row) = rows.first() else {
        return Ok(HeadcountSummary::default());
    };

    let total: i64 = row.try_get("total")?;
    let available: i64 = row.try_get("available")?;
    let gap: i64 = row.try_get("gap")?;

    if gap != total - available {
        warn!(total, available, gap, "stored headcount gap differs from total - available");
    }

    Ok(HeadcountSummary {
        total: u64::try_from(total).unwrap_or(0),
        available: u64::try_from(available).unwrap_or(0),
        gap: u64::try_from(gap).unwrap_or(0),
    })
}

async fn insert_hire(
    conn: &mut SqliteConnection,
    source_key: &str,
    record: &HireRecord,
) -> Result<bool, DashboardError> {
    let result = sqlx::query(
        r#"
        INSERT INTO hiring_data
        (source_key, business_group, function, role_title, hire_date, cost_per_hire,
         time_to_fill, ijp_adherence, build_buy_ratio, diversity_ratio, source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(source_key)
    .bind(record.business_unit.label())
    .bind(record.function.label())
    .bind(&record.role_title)
    .bind(record.hire_date)
    .bind(record.cost_per_hire)
    .bind(record.time_to_fill)
    .bind(record.ijp_adherence)
    .bind(record.sourcing.as_str())
    .bind(record.diversity)
    .bind(&record.source)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_seed(pool: &SqlitePool, data: &SeedData) -> Result<usize, DashboardError> {
    let mut tx = pool.begin().await?;

    for row in &data.summaries {
        sqlx::query(
            r#"
            INSERT INTO business_summary
            (business_group, function, total_headcount, available_headcount, gap)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (business_group, function) DO UPDATE
            SET total_headcount = excluded.total_headcount,
                available_headcount = excluded.available_headcount,
                gap = excluded.gap
            "#,
        )
        .bind(&row.business_group)
        .bind(&row.function)
        .bind(row.total_headcount)
        .bind(row.available_headcount)
        .bind(row.gap)
        .execute(&mut *tx)
        .await?;
    }

    let mut inserted = 0usize;
    for hire in &data.hires {
        if insert_hire(&mut tx, &hire.source_key, &hire.record).await? {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn seed(pool: &SqlitePool) -> Result<usize, DashboardError> {
    let data = seed::generate(seed::SEED);
    info!(
        hires = data.hires.len(),
        summaries = data.summaries.len(),
        "generated seed data"
    );
    insert_seed(pool, &data).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub totals: KpiTotals,
}

/// Imports hires from CSV in one transaction; any bad row aborts the batch.
pub async fn import_csv(
    pool: &SqlitePool,
    csv_path: &Path,
) -> Result<ImportOutcome, DashboardError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        business_group: String,
        function: String,
        role_title: String,
        hire_date: NaiveDate,
        time_to_fill: i64,
        cost_per_hire: String,
        ijp_adherence: bool,
        build_buy_ratio: String,
        diversity_ratio: bool,
        source: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut tx = pool.begin().await?;
    let mut imported = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let record = HireRecord {
            business_unit: row.business_group.parse()?,
            function: row.function.parse()?,
            role_title: row.role_title,
            hire_date: row.hire_date,
            time_to_fill: row.time_to_fill,
            cost_per_hire: parse_numeric(&row.cost_per_hire) as i64,
            ijp_adherence: row.ijp_adherence,
            sourcing: row.build_buy_ratio.parse()?,
            diversity: row.diversity_ratio,
            source: row.source,
        };

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_hire(&mut tx, &source_key, &record).await? {
            imported.push(record);
        }
    }

    tx.commit().await?;

    Ok(ImportOutcome {
        inserted: imported.len(),
        totals: KpiTotals::from_records(&imported),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Bucket, DateWindow, KpiName, Sourcing};
    use crate::seed::{SeedHire, SummaryRow};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::Write;

    pub(crate) async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn hire(
        key: &str,
        unit: BusinessUnit,
        function: Function,
        hire_date: NaiveDate,
        time_to_fill: i64,
        cost: i64,
        ijp: bool,
        sourcing: Sourcing,
        diverse: bool,
    ) -> SeedHire {
        SeedHire {
            source_key: key.to_string(),
            record: HireRecord {
                business_unit: unit,
                function,
                role_title: "Analyst".to_string(),
                hire_date,
                time_to_fill,
                cost_per_hire: cost,
                ijp_adherence: ijp,
                sourcing,
                diversity: diverse,
                source: "Portal".to_string(),
            },
        }
    }

    fn summary(unit: &str, function: &str, total: i64, available: i64) -> SummaryRow {
        SummaryRow {
            business_group: unit.to_string(),
            function: function.to_string(),
            total_headcount: total,
            available_headcount: available,
            gap: total - available,
        }
    }

    /// Small fixture: two units, three functions, hires across three months.
    pub(crate) fn fixture() -> SeedData {
        use BusinessUnit::{Fmcg, Tech};
        use Function::{Legal, Marketing, Sales};
        use Sourcing::{Build, Buy};

        SeedData {
            hires: vec![
                hire("t1", Tech, Sales, date(2025, 1, 10), 60, 80_000, true, Build, true),
                hire("t2", Tech, Sales, date(2025, 1, 20), 80, 60_000, false, Buy, false),
                hire("t3", Tech, Legal, date(2025, 2, 5), 120, 150_000, true, Build, false),
                hire("t4", Tech, Marketing, date(2025, 3, 15), 90, 70_000, true, Buy, true),
                hire("f1", Fmcg, Sales, date(2025, 2, 14), 50, 40_000, true, Build, true),
                hire("f2", Fmcg, Marketing, date(2025, 3, 1), 70, 50_000, false, Build, false),
                hire("f3", Fmcg, Sales, date(2024, 12, 30), 40, 30_000, true, Buy, true),
            ],
            summaries: vec![
                summary("Tech", "Overall", 1000, 900),
                summary("Tech", "Sales", 400, 350),
                summary("Tech", "Legal", 100, 95),
                summary("Tech", "Marketing", 500, 455),
                summary("FMCG", "Overall", 2000, 1800),
                summary("FMCG", "Sales", 1500, 1340),
                summary("FMCG", "Marketing", 500, 460),
                summary("All Units", "Overall", 3000, 2700),
            ],
        }
    }

    pub(crate) fn year_2025() -> DateWindow {
        DateWindow::range(date(2025, 1, 1), date(2025, 12, 31)).unwrap()
    }

    #[test]
    fn scope_builds_parameterised_where_clause() {
        let filter = Filter::new(
            Some(BusinessUnit::Tech),
            Some(Function::Sales),
            DateWindow::Bucket(Bucket::Last3Months),
        );
        let scope = HireScope::new(&filter, date(2025, 6, 30));
        let (query, binds) = scope.query("COUNT(*) AS hires");
        assert_eq!(
            query,
            "SELECT COUNT(*) AS hires FROM hiring_data WHERE hire_date >= ? AND hire_date <= ? \
             AND business_group = ? AND function = ?"
        );
        assert_eq!(binds, vec!["2025-03-30", "2025-06-30", "Tech", "Sales"]);

        let (open_query, open_binds) = scope.across(Dimension::BusinessUnit).query("1");
        assert!(!open_query.contains("business_group"));
        assert_eq!(open_binds.len(), 3);
    }

    #[tokio::test]
    async fn aggregates_filtered_hires() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let filter = Filter::new(Some(BusinessUnit::Tech), None, year_2025());
        let totals = fetch_kpi_totals(&pool, &HireScope::new(&filter, date(2025, 12, 31)))
            .await
            .unwrap();

        assert_eq!(totals.hires, 4);
        assert_eq!(totals.value(KpiName::AvgTimeToFill), 87.5);
        assert_eq!(totals.value(KpiName::AvgCostPerHire), 90_000.0);
        assert_eq!(totals.value(KpiName::IjpAdherence), 75.0);
        assert_eq!(totals.value(KpiName::BuildRatio), 50.0);
        assert_eq!(totals.value(KpiName::Diversity), 50.0);
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let window = DateWindow::range(date(2025, 1, 10), date(2025, 1, 20)).unwrap();
        let filter = Filter::new(None, None, window);
        let totals = fetch_kpi_totals(&pool, &HireScope::new(&filter, date(2025, 12, 31)))
            .await
            .unwrap();
        assert_eq!(totals.hires, 2);
    }

    #[tokio::test]
    async fn empty_scope_returns_zero_totals() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let filter = Filter::new(Some(BusinessUnit::Media), None, year_2025());
        let totals = fetch_kpi_totals(&pool, &HireScope::new(&filter, date(2025, 12, 31)))
            .await
            .unwrap();
        assert_eq!(totals, KpiTotals::default());
        assert_eq!(totals.value(KpiName::Diversity), 0.0);
    }

    #[tokio::test]
    async fn groups_by_month_in_order() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let filter = Filter::new(None, None, year_2025());
        let months = fetch_monthly_totals(&pool, &HireScope::new(&filter, date(2025, 12, 31)))
            .await
            .unwrap();
        let periods: Vec<&str> = months.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(periods, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(months[0].1.hires, 2);
        assert_eq!(months[1].1.hires, 2);
    }

    #[tokio::test]
    async fn groups_by_dimension() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let filter = Filter::new(None, Some(Function::Sales), year_2025());
        let scope = HireScope::new(&filter, date(2025, 12, 31)).across(Dimension::BusinessUnit);
        let mut groups = fetch_group_totals(&pool, &scope, Dimension::BusinessUnit)
            .await
            .unwrap();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "FMCG");
        assert_eq!(groups[0].1.hires, 1);
        assert_eq!(groups[1].0, "Tech");
        assert_eq!(groups[1].1.hires, 2);
    }

    #[tokio::test]
    async fn headcount_follows_unit_and_function_rules() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let tech_overall = fetch_headcount(&pool, Some(BusinessUnit::Tech), None).await.unwrap();
        assert_eq!(
            tech_overall,
            HeadcountSummary {
                total: 1000,
                available: 900,
                gap: 100
            }
        );

        let tech_sales = fetch_headcount(&pool, Some(BusinessUnit::Tech), Some(Function::Sales))
            .await
            .unwrap();
        assert_eq!(tech_sales.total, 400);

        let all_sales = fetch_headcount(&pool, None, Some(Function::Sales)).await.unwrap();
        assert_eq!(all_sales.total, 1900);
        assert_eq!(all_sales.available, 1690);

        let everything = fetch_headcount(&pool, None, None).await.unwrap();
        assert_eq!(everything.total, 3000);
        assert_eq!(everything.gap, 300);

        let missing = fetch_headcount(&pool, Some(BusinessUnit::Retail), None).await.unwrap();
        assert_eq!(missing, HeadcountSummary::default());
    }

    #[tokio::test]
    async fn fetches_recent_hires_first() {
        let pool = memory_pool().await;
        insert_seed(&pool, &fixture()).await.unwrap();

        let filter = Filter::new(Some(BusinessUnit::Tech), None, year_2025());
        let hires = fetch_hires(&pool, &HireScope::new(&filter, date(2025, 12, 31)), 2)
            .await
            .unwrap();
        assert_eq!(hires.len(), 2);
        assert_eq!(hires[0].hire_date, date(2025, 3, 15));
        assert_eq!(hires[0].function, Function::Marketing);
        assert_eq!(hires[1].sourcing, Sourcing::Build);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = memory_pool().await;
        assert_eq!(insert_seed(&pool, &fixture()).await.unwrap(), 7);
        assert_eq!(insert_seed(&pool, &fixture()).await.unwrap(), 0);
        assert_eq!(count_hires(&pool).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn imports_csv_and_skips_duplicates() {
        let pool = memory_pool().await;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "business_group,function,role_title,hire_date,time_to_fill,cost_per_hire,\
             ijp_adherence,build_buy_ratio,diversity_ratio,source,source_key"
        )
        .unwrap();
        writeln!(
            file,
            "Tech,Sales,Account Executive,2025-04-01,60,\"₹80,000\",true,Build,\
             false,Referral,csv-1"
        )
        .unwrap();
        writeln!(
            file,
            "Media,HR,HR Generalist,2025-04-02,40,50000,false,Buy,true,Portal,"
        )
        .unwrap();
        file.flush().unwrap();

        let outcome = import_csv(&pool, file.path()).await.unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.totals.value(KpiName::AvgCostPerHire), 65_000.0);
        assert_eq!(outcome.totals.value(KpiName::BuildRatio), 50.0);

        let again = import_csv(&pool, file.path()).await.unwrap();
        assert_eq!(again.inserted, 1, "rows without a key get a fresh one");
        assert_eq!(count_hires(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn bad_csv_row_rolls_back_the_batch() {
        let pool = memory_pool().await;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "business_group,function,role_title,hire_date,time_to_fill,cost_per_hire,\
             ijp_adherence,build_buy_ratio,diversity_ratio,source,source_key"
        )
        .unwrap();
        writeln!(
            file,
            "Tech,Sales,Account Executive,2025-04-01,60,80000,true,Build,false,Referral,ok-1"
        )
        .unwrap();
        writeln!(
            file,
            "Aerospace,Sales,Pilot,2025-04-01,60,80000,true,Build,false,Referral,bad-1"
        )
        .unwrap();
        file.flush().unwrap();

        let result = import_csv(&pool, file.path()).await;
        assert!(matches!(result, Err(DashboardError::UnknownBusinessUnit(_))));
        assert_eq!(count_hires(&pool).await.unwrap(), 0);
    }
}
