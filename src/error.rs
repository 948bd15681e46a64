use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Unknown business unit: {0}")]
    UnknownBusinessUnit(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown date bucket: {0}")]
    UnknownBucket(String),

    #[error("Unknown KPI for drilldown: {0}")]
    UnknownKpi(String),

    #[error("Unknown build/buy classification: {0}")]
    UnknownSourcing(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Malformed filter line: {0}")]
    MalformedFilter(String),

    #[error("The mock dataset only supports date buckets, not explicit ranges")]
    UnsupportedWindow,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insight service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Insight service returned no insights")]
    EmptyInsights,
}
