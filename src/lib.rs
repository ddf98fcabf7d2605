pub mod aggregate;
pub mod auth;
pub mod charts;
pub mod config;
pub mod date_util;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod storage;

pub use aggregate::{AggregationPayload, ClientRecord, DataCoverage};
pub use auth::{Authenticator, Operator};
pub use config::Settings;
pub use error::{Error, Result};
pub use pipeline::{NoopProgress, PipelineOutcome, ReportProgress, ReportStep};
pub use query::catalog::QueryName;
pub use query::period::Period;
pub use report::{DataWarning, Report, ReportCache, ReportId};
pub use storage::Database;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use charts::raster::{default_rasterizer, Rasterizer};
use llm::prompt::PromptTemplate;
use llm::{MessagesClient, TextGenerator};
use pipeline::PipelineContext;

/// Outcome of a report request as seen by callers.
#[derive(Debug)]
pub enum ReportOutcome {
    Generated(Arc<Report>),
    ClientNotFound,
}

/// Main entry point: the database pool, the LLM client, prompts and the
/// in-memory report cache.
pub struct ClientAnalytics {
    db: Database,
    generator: Arc<dyn TextGenerator>,
    rasterizer: Arc<dyn Rasterizer>,
    narrative_prompt: PromptTemplate,
    chart_prompt: PromptTemplate,
    model: String,
    chart_timeout: Duration,
    snapshot_dir: Option<PathBuf>,
    cache: ReportCache,
}

impl ClientAnalytics {
    pub fn new(db: Database, generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            db,
            generator,
            rasterizer: default_rasterizer(),
            narrative_prompt: PromptTemplate::narrative_default(),
            chart_prompt: PromptTemplate::chart_default(),
            model: model.into(),
            chart_timeout: Duration::from_secs(10),
            snapshot_dir: None,
            cache: ReportCache::default(),
        }
    }

    /// Open the database and build the LLM client described by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let db = Database::open_at(&settings.db_path, settings.db_pool_size, settings.db_timeout).await?;
        let generator = Arc::new(MessagesClient::new(&settings.llm)?);
        let narrative_prompt = PromptTemplate::load_or(
            settings.prompt_file.as_deref(),
            llm::prompt::NARRATIVE_PROMPT,
        )?;
        let chart_prompt = PromptTemplate::load_or(
            settings.graph_prompt_file.as_deref(),
            llm::prompt::CHART_PROMPT,
        )?;
        Ok(Self::new(db, generator, settings.llm.model.clone())
            .with_prompts(narrative_prompt, chart_prompt)
            .with_chart_timeout(settings.chart_timeout)
            .with_snapshot_dir(settings.data_dir.clone()))
    }

    pub fn with_prompts(mut self, narrative: PromptTemplate, chart: PromptTemplate) -> Self {
        self.narrative_prompt = narrative;
        self.chart_prompt = chart;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_chart_timeout(mut self, timeout: Duration) -> Self {
        self.chart_timeout = timeout;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.snapshot_dir = Some(dir);
        self
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run the six queries for `client_name` without involving the LLM.
    pub async fn payload(&self, client_name: &str, now: NaiveDateTime) -> Result<AggregationPayload> {
        let period = Period::containing(now.date());
        aggregate::aggregate(&self.db, client_name, &period, now.date()).await
    }

    pub async fn generate_report(
        &self,
        operator: &Operator,
        client_name: &str,
        progress: &dyn ReportProgress,
    ) -> Result<ReportOutcome> {
        let now = chrono::Local::now().naive_local();
        self.generate_report_at(operator, client_name, now, progress).await
    }

    /// Generate a report as of `now` and add it to the cache. Every call
    /// produces a new report.
    pub async fn generate_report_at(
        &self,
        operator: &Operator,
        client_name: &str,
        now: NaiveDateTime,
        progress: &dyn ReportProgress,
    ) -> Result<ReportOutcome> {
        let ctx = PipelineContext {
            db: &self.db,
            generator: self.generator.as_ref(),
            rasterizer: Arc::clone(&self.rasterizer),
            narrative_prompt: &self.narrative_prompt,
            chart_prompt: &self.chart_prompt,
            model: &self.model,
            chart_timeout: self.chart_timeout,
            snapshot_dir: self.snapshot_dir.as_deref(),
        };
        match pipeline::run(&ctx, client_name, operator, now, progress).await {
            Ok(PipelineOutcome::Generated(report)) => {
                let report = self.cache.push(report);
                log::info!("Report {} for {} cached", report.id(), report.client_name());
                Ok(ReportOutcome::Generated(report))
            }
            Ok(PipelineOutcome::ClientNotFound) => Ok(ReportOutcome::ClientNotFound),
            Err(e) => {
                log::error!("Report for {client_name:?} failed: {e}");
                Err(e)
            }
        }
    }

    /// Cached reports, newest first.
    pub fn recent_reports(&self) -> Vec<Arc<Report>> {
        self.cache.recent()
    }

    pub fn report(&self, id: ReportId) -> Option<Arc<Report>> {
        self.cache.get(id)
    }
}
