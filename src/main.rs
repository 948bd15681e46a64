use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod dashboard;
mod db;
mod error;
mod format;
mod insights;
mod metrics;
mod mock;
mod models;
mod prng;
mod report;
mod seed;

use config::Config;
use dashboard::{DashboardMetrics, DashboardState, Dataset, Drilldown};
use insights::{InsightClient, InsightRequest, InsightScheduler, InsightUpdate};
use mock::MockDataset;
use models::{DateWindow, Filter, ALL_FUNCTIONS, ALL_UNITS};

#[derive(Parser)]
#[command(name = "talent-dashboard")]
#[command(about = "Headcount and hiring KPI dashboard with drill-down trends", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// Built-in demo dataset
    Mock,
    /// Row-level hires in the SQLite database
    Db,
}

#[derive(Args, Clone, Debug)]
struct FilterArgs {
    #[arg(long, default_value = ALL_UNITS)]
    business_unit: String,
    #[arg(long, default_value = ALL_FUNCTIONS)]
    function: String,
    /// ytd, last6Months or last3Months
    #[arg(long, default_value = "ytd", conflicts_with_all = ["start", "end"])]
    bucket: String,
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_filter(&self) -> anyhow::Result<Filter> {
        let window = match (self.start, self.end) {
            (Some(start), Some(end)) => DateWindow::range(start, end)?,
            _ => DateWindow::Bucket(self.bucket.parse()?),
        };
        Ok(Filter::from_labels(&self.business_unit, &self.function, window)?)
    }
}

#[derive(Args, Clone, Debug)]
struct SourceArgs {
    #[arg(long, value_enum, default_value_t = Source::Mock)]
    source: Source,
    /// Reference date buckets resolve against (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl SourceArgs {
    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a reproducible year of synthetic hires and headcount summaries
    Seed,
    /// Import hires from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the most recent hires matching a filter
    Hires {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show headcount, KPI cards and insights
    Metrics {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show the trend and peer comparison for one KPI
    Drilldown {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        kpi: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        kpi: Option<String>,
        #[arg(long, default_value = "talent-report.md")]
        out: PathBuf,
    },
    /// Read `unit|function|bucket` lines from stdin and refresh on each one
    Watch {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Serialize)]
struct MetricsOutput<'a> {
    filter: &'a Filter,
    #[serde(flatten)]
    metrics: &'a DashboardMetrics,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the pool and brings the schema up to date.
async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    db::init_db(&pool).await?;
    Ok(pool)
}

async fn open_dataset(config: &Config, source: &SourceArgs) -> anyhow::Result<Dataset> {
    let mock = MockDataset::embedded().context("embedded mock dataset is malformed")?;
    match source.source {
        Source::Mock => Ok(Dataset::Mock(mock)),
        Source::Db => Ok(Dataset::Rows {
            pool: connect(config).await?,
            as_of: source.as_of(),
            baseline: mock,
        }),
    }
}

/// Mock blocks carry their own commentary; live data asks the service.
async fn resolve_insights(
    config: &Config,
    filter: &Filter,
    as_of: NaiveDate,
    metrics: &DashboardMetrics,
) -> anyhow::Result<Vec<String>> {
    if !metrics.insights.is_empty() {
        return Ok(metrics.insights.clone());
    }
    let Some(url) = &config.insights_url else {
        return Ok(Vec::new());
    };
    let client = InsightClient::new(url.as_str(), config.insights_timeout)?;
    let request = InsightRequest::new(filter, as_of, &metrics.kpis);
    Ok(insights::fetch_or_placeholder(&client, request).await)
}

async fn render_drilldown(
    config: &Config,
    dataset: &Dataset,
    filter: &Filter,
    as_of: NaiveDate,
    drilldown: &Drilldown,
) -> anyhow::Result<String> {
    let metrics = dataset.compute_metrics(filter).await?;
    let insights = resolve_insights(config, filter, as_of, &metrics).await?;
    Ok(report::build_report(filter, &metrics, &insights, Some(drilldown)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = Config::from_env()?;

    match cli.command {
        Commands::InitDb => {
            connect(&config).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} new hires).");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let outcome = db::import_csv(&pool, &csv)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!("Inserted {} hires from {}.", outcome.inserted, csv.display());
            for (kpi, reading) in outcome.totals.summary().iter() {
                println!("- {}: {}", kpi.label(), reading.display);
            }
        }
        Commands::Hires {
            filter,
            as_of,
            limit,
        } => {
            let filter = filter.to_filter()?;
            let pool = connect(&config).await?;
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let hires = db::fetch_hires(&pool, &db::HireScope::new(&filter, as_of), limit).await?;

            if hires.is_empty() {
                println!("No hires found for {filter}.");
                return Ok(());
            }

            println!("Most recent hires for {filter}:");
            for hire in hires {
                println!(
                    "- {} {} ({} / {}) filled in {} days at {} [{}{}{}]",
                    hire.hire_date,
                    hire.role_title,
                    hire.business_unit.label(),
                    hire.function.label(),
                    hire.time_to_fill,
                    format::format_value(Some(hire.cost_per_hire as f64), true),
                    hire.sourcing.as_str(),
                    if hire.ijp_adherence { ", IJP" } else { "" },
                    if hire.diversity { ", diverse" } else { "" },
                );
            }
        }
        Commands::Metrics {
            filter,
            source,
            json,
        } => {
            let filter = filter.to_filter()?;
            let dataset = open_dataset(&config, &source).await?;
            let mut metrics = dataset.compute_metrics(&filter).await?;
            metrics.insights = resolve_insights(&config, &filter, source.as_of(), &metrics).await?;

            if json {
                let output = MetricsOutput {
                    filter: &filter,
                    metrics: &metrics,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", report::build_report(&filter, &metrics, &metrics.insights, None));
            }
        }
        Commands::Drilldown {
            filter,
            source,
            kpi,
            json,
        } => {
            let filter = filter.to_filter()?;
            let dataset = open_dataset(&config, &source).await?;
            let drilldown = dataset.compute_drilldown(&filter, &kpi).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&drilldown)?);
            } else {
                let report =
                    render_drilldown(&config, &dataset, &filter, source.as_of(), &drilldown)
                        .await?;
                print!("{report}");
            }
        }
        Commands::Report {
            filter,
            source,
            kpi,
            out,
        } => {
            let filter = filter.to_filter()?;
            let dataset = open_dataset(&config, &source).await?;
            let metrics = dataset.compute_metrics(&filter).await?;
            let insights = resolve_insights(&config, &filter, source.as_of(), &metrics).await?;
            let drilldown: Option<Drilldown> = match kpi {
                Some(kpi) => Some(dataset.compute_drilldown(&filter, &kpi).await?),
                None => None,
            };

            let report = report::build_report(&filter, &metrics, &insights, drilldown.as_ref());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch { source } => {
            let dataset = open_dataset(&config, &source).await?;
            watch(&config, &dataset, source.as_of()).await?;
        }
    }

    Ok(())
}

async fn next_update(
    updates: &mut Option<tokio::sync::mpsc::UnboundedReceiver<InsightUpdate>>,
) -> Option<InsightUpdate> {
    match updates {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn print_state(filter: &Filter, state: &DashboardState) {
    if let Some(error) = &state.error {
        println!("! {error} (previous figures kept)");
        return;
    }
    let Some(metrics) = &state.metrics else {
        return;
    };

    println!("== {filter}");
    println!(
        "Headcount {} | available {} | open {}",
        format::format_value(Some(metrics.headcount.total as f64), false),
        format::format_value(Some(metrics.headcount.available as f64), false),
        format::format_value(Some(metrics.headcount.gap as f64), false)
    );
    for (kpi, reading) in metrics.kpis.iter() {
        println!("  {}: {}", kpi.label(), reading.display);
    }
    for (index, text) in metrics.insights.iter().enumerate() {
        println!("  {}: {}", report::insight_title(index), report::clean_insight(text));
    }
}

fn print_insights(update: &InsightUpdate) {
    println!("-- insights for {}", update.filter);
    for (index, text) in update.insights.iter().enumerate() {
        println!("  {}: {}", report::insight_title(index), report::clean_insight(text));
    }
}

/// Interactive loop: KPIs refresh immediately on every filter line, while
/// service insights are debounced so bursts of edits cost one call.
async fn watch(config: &Config, dataset: &Dataset, as_of: NaiveDate) -> anyhow::Result<()> {
    let (mut scheduler, mut updates) = match &config.insights_url {
        Some(url) => {
            let client = InsightClient::new(url.as_str(), config.insights_timeout)?;
            let (scheduler, updates) = InsightScheduler::new(client, config.insights_debounce);
            (Some(scheduler), Some(updates))
        }
        None => (None, None),
    };

    let mut state = DashboardState::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting_insights = false;
    info!("reading filters as `unit|function|bucket`, one per line");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let filter = match Filter::parse_line(line) {
                    Ok(filter) => filter,
                    Err(err) => {
                        warn!(error = %err, "ignoring filter line");
                        continue;
                    }
                };

                state.apply(dataset.compute_metrics(&filter).await);
                print_state(&filter, &state);

                if state.error.is_none() {
                    if let (Some(scheduler), Some(metrics)) =
                        (scheduler.as_mut(), state.metrics.as_ref())
                    {
                        let request = InsightRequest::new(&filter, as_of, &metrics.kpis);
                        scheduler.schedule(filter, request);
                        awaiting_insights = true;
                    }
                }
            }
            Some(update) = next_update(&mut updates) => {
                awaiting_insights = false;
                print_insights(&update);
            }
        }
    }

    if awaiting_insights {
        let grace = config.insights_debounce + config.insights_timeout;
        if let Ok(Some(update)) = tokio::time::timeout(grace, next_update(&mut updates)).await {
            print_insights(&update);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{date, memory_pool};
    use crate::models::Bucket;
    use std::time::Duration;

    fn config(insights_url: Option<String>) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            insights_url,
            insights_timeout: Duration::from_secs(2),
            insights_debounce: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn drilldown_text_asks_the_insight_service_for_row_data() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let dataset = Dataset::Rows {
            pool: memory_pool().await,
            as_of: date(2025, 12, 31),
            baseline: MockDataset::embedded().unwrap(),
        };
        let filter = Filter::new(None, None, DateWindow::Bucket(Bucket::Ytd));
        let drilldown = dataset.compute_drilldown(&filter, "Total Hires").await.unwrap();

        let offline = config(Some(format!("http://{address}/insights")));
        let report = render_drilldown(&offline, &dataset, &filter, date(2025, 12, 31), &drilldown)
            .await
            .unwrap();
        assert!(report.contains("- **Key Observation**: AI insights are unavailable right now"));
        assert!(report.contains("## Drill-down: Total Hires"));

        let disabled = config(None);
        let report = render_drilldown(&disabled, &dataset, &filter, date(2025, 12, 31), &drilldown)
            .await
            .unwrap();
        assert!(report.contains("## AI-Driven Insights\nNo insights."));
    }
}
