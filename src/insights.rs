//! Client for the external insight-generation service and the debounced
//! scheduler that keeps rapid filter changes down to one outbound call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DashboardError;
use crate::models::{Filter, KpiSummary};

pub const INSIGHT_TITLES: [&str; 3] = ["Key Observation", "Potential Risk", "Recommendation"];
pub const INSIGHTS_UNAVAILABLE: &str =
    "⚠️ AI insights are unavailable right now. KPI figures are unaffected.";

pub fn placeholder() -> Vec<String> {
    vec![INSIGHTS_UNAVAILABLE.to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRequest {
    pub business_group: Option<String>,
    pub function: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kpi_summary: BTreeMap<String, String>,
}

impl InsightRequest {
    pub fn new(filter: &Filter, as_of: NaiveDate, kpis: &KpiSummary) -> Self {
        let (start_date, end_date) = filter.date_range(as_of);
        Self {
            business_group: filter.business_unit.map(|unit| unit.label().to_string()),
            function: filter.function.map(|function| function.label().to_string()),
            start_date,
            end_date,
            kpi_summary: kpis.display_map(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct InsightResponse {
    insights: Vec<String>,
}

pub trait InsightProvider: Send + Sync + 'static {
    fn generate(
        &self,
        request: InsightRequest,
    ) -> impl Future<Output = Result<Vec<String>, DashboardError>> + Send;
}

#[derive(Debug, Clone)]
pub struct InsightClient {
    http: reqwest::Client,
    endpoint: String,
}

impl InsightClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

impl InsightProvider for InsightClient {
    fn generate(
        &self,
        request: InsightRequest,
    ) -> impl Future<Output = Result<Vec<String>, DashboardError>> + Send {
        async move {
            let response: InsightResponse = self
                .http
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if response.insights.is_empty() {
                return Err(DashboardError::EmptyInsights);
            }
            Ok(response.insights)
        }
    }
}

/// Calls the provider once; any failure degrades to the placeholder.
pub async fn fetch_or_placeholder<P: InsightProvider>(
    provider: &P,
    request: InsightRequest,
) -> Vec<String> {
    match provider.generate(request).await {
        Ok(insights) => insights,
        Err(err) => {
            warn!(error = %err, "insight service unavailable");
            placeholder()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightUpdate {
    pub filter: Filter,
    pub insights: Vec<String>,
}

/// Debounces insight calls: each `schedule` cancels the task that has not
/// fired yet, and results from superseded calls are dropped on arrival.
pub struct InsightScheduler<P> {
    provider: Arc<P>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    updates: mpsc::UnboundedSender<InsightUpdate>,
}

impl<P: InsightProvider> InsightScheduler<P> {
    pub fn new(provider: P, delay: Duration) -> (Self, mpsc::UnboundedReceiver<InsightUpdate>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            provider: Arc::new(provider),
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            updates,
        };
        (scheduler, receiver)
    }

    pub fn schedule(&mut self, filter: Filter, request: InsightRequest) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        let provider = Arc::clone(&self.provider);
        let generation = Arc::clone(&self.generation);
        let updates = self.updates.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return;
            }

            debug!(%filter, "requesting insights");
            let insights = fetch_or_placeholder(provider.as_ref(), request).await;

            if generation.load(Ordering::SeqCst) != ticket {
                debug!(%filter, "dropping superseded insights");
                return;
            }
            let _ = updates.send(InsightUpdate { filter, insights });
        }));
    }
}
