use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::aggregate::{self, AggregationPayload, DataCoverage};
use crate::auth::Operator;
use crate::charts::raster::Rasterizer;
use crate::charts::{executor, ChartFigure, ChartImage, ChartSet, IMAGE_HEIGHT, IMAGE_WIDTH};
use crate::error::{Error, Result};
use crate::llm::agents::chart_code::generate_chart_code;
use crate::llm::agents::narrative::{generate_narrative, NarrativeOutcome};
use crate::llm::prompt::PromptTemplate;
use crate::llm::TextGenerator;
use crate::query::period::Period;
use crate::report::{markdown, pdf, snapshot, DataWarning, Report, ReportHeader};

/// The four user-visible stages of a report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStep {
    FetchingData,
    WritingNarrative,
    BuildingCharts,
    RenderingDocuments,
}

impl ReportStep {
    pub const COUNT: usize = 4;

    pub fn index(&self) -> usize {
        match self {
            ReportStep::FetchingData => 0,
            ReportStep::WritingNarrative => 1,
            ReportStep::BuildingCharts => 2,
            ReportStep::RenderingDocuments => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportStep::FetchingData => "Fetching client data",
            ReportStep::WritingNarrative => "Generating insights",
            ReportStep::BuildingCharts => "Creating visualizations",
            ReportStep::RenderingDocuments => "Rendering report",
        }
    }
}

/// Callback trait for reporting pipeline progress.
pub trait ReportProgress: Send + Sync {
    fn on_step(&self, client_name: &str, step: ReportStep);
    fn on_warning(&self, client_name: &str, warning: DataWarning);
}

/// No-op progress reporter.
pub struct NoopProgress;

impl ReportProgress for NoopProgress {
    fn on_step(&self, _client_name: &str, _step: ReportStep) {}
    fn on_warning(&self, _client_name: &str, _warning: DataWarning) {}
}

/// Everything a run needs besides the request itself.
pub struct PipelineContext<'a> {
    pub db: &'a crate::storage::Database,
    pub generator: &'a dyn TextGenerator,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub narrative_prompt: &'a PromptTemplate,
    pub chart_prompt: &'a PromptTemplate,
    pub model: &'a str,
    pub chart_timeout: Duration,
    /// Snapshots are skipped when unset.
    pub snapshot_dir: Option<&'a Path>,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Generated(Report),
    /// Neither the portfolio nor the ticketing data knows the client. No LLM
    /// call was made.
    ClientNotFound,
}

/// Generate one report for `client_name` as of `now`.
///
/// Fatal: an empty client name, an unreachable database or LLM, and a failed
/// narrative. Everything after the narrative degrades into warnings.
pub async fn run(
    ctx: &PipelineContext<'_>,
    client_name: &str,
    operator: &Operator,
    now: NaiveDateTime,
    progress: &dyn ReportProgress,
) -> Result<PipelineOutcome> {
    let client_name = client_name.trim();
    if client_name.is_empty() {
        return Err(Error::InvalidClient("client name is empty".into()));
    }
    let period = Period::containing(now.date());
    log::info!("Generating report for {client_name} ({}) as {operator}", period.label());

    progress.on_step(client_name, ReportStep::FetchingData);
    let payload = aggregate::aggregate(ctx.db, client_name, &period, now.date()).await?;

    let mut warnings = Vec::new();
    match payload.coverage() {
        DataCoverage::NotFound => {
            log::info!("No data found for {client_name}");
            return Ok(PipelineOutcome::ClientNotFound);
        }
        DataCoverage::TicketsOnly => warnings.push(DataWarning::TicketingOnly),
        DataCoverage::DemographicsOnly => warnings.push(DataWarning::NoRecentTickets),
        DataCoverage::Full => {}
    }
    let payload = Arc::new(payload);

    progress.on_step(client_name, ReportStep::WritingNarrative);
    let narrative = match generate_narrative(ctx.generator, ctx.narrative_prompt, ctx.model, &payload).await? {
        NarrativeOutcome::Generated(text) => text,
        NarrativeOutcome::Failed(reason) => return Err(Error::GenerationFailed(reason)),
    };

    // Only runs that produced a narrative leave a snapshot behind
    let snapshot_path = ctx.snapshot_dir.and_then(|dir| {
        match snapshot::write(dir, client_name, now, operator.username(), &payload) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Could not write data snapshot for {client_name}: {e}");
                warnings.push(DataWarning::SnapshotNotWritten);
                None
            }
        }
    });

    progress.on_step(client_name, ReportStep::BuildingCharts);
    let charts = build_charts(ctx, &payload).await;
    let images = if charts.is_empty() || ctx.rasterizer.is_available() {
        rasterize_all(Arc::clone(&ctx.rasterizer), charts, ctx.chart_timeout).await
    } else {
        log::warn!("{} chart(s) dropped: no image backend in this build", charts.len());
        warnings.push(DataWarning::ChartRenderingUnavailable);
        Vec::new()
    };
    if images.is_empty() {
        warnings.push(DataWarning::NoCharts);
    }

    progress.on_step(client_name, ReportStep::RenderingDocuments);
    let header = ReportHeader {
        client_name,
        generated_at: now,
        generated_by: operator.username(),
    };
    let markdown = markdown::render(&header, &narrative, &images);
    let pdf = render_pdf(client_name, now, operator.username(), &narrative, &images).await;
    if pdf.is_none() {
        warnings.push(DataWarning::PdfUnavailable);
    }

    for warning in &warnings {
        progress.on_warning(client_name, *warning);
    }

    Ok(PipelineOutcome::Generated(Report::new(
        client_name.to_string(),
        now,
        operator.clone(),
        period,
        payload,
        narrative,
        images,
        markdown,
        pdf,
        warnings,
        snapshot_path,
    )))
}

async fn build_charts(ctx: &PipelineContext<'_>, payload: &Arc<AggregationPayload>) -> ChartSet {
    match generate_chart_code(ctx.generator, ctx.chart_prompt, ctx.model, payload).await {
        Some(source) => executor::execute(source, Arc::clone(payload), ctx.chart_timeout).await,
        None => ChartSet::default(),
    }
}

/// Rasterize each chart on a blocking thread. A chart that fails or runs past
/// `timeout` is dropped from the report.
async fn rasterize_all(rasterizer: Arc<dyn Rasterizer>, charts: ChartSet, timeout: Duration) -> Vec<ChartImage> {
    let mut images = Vec::with_capacity(charts.len());
    for (slot, figure) in charts.iter() {
        let rasterizer = Arc::clone(&rasterizer);
        let figure: ChartFigure = figure.clone();
        let task = tokio::task::spawn_blocking(move || rasterizer.rasterize(&figure, IMAGE_WIDTH, IMAGE_HEIGHT));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(png))) => images.push(ChartImage {
                slot,
                title: slot.title().to_string(),
                png,
            }),
            Ok(Ok(Err(e))) => log::warn!("Could not rasterize {}: {e}", slot.binding()),
            Ok(Err(e)) => log::error!("Rasterizer task for {} aborted: {e}", slot.binding()),
            Err(_) => log::warn!("Rasterizing {} exceeded {timeout:?}", slot.binding()),
        }
    }
    images
}

async fn render_pdf(
    client_name: &str,
    now: NaiveDateTime,
    generated_by: &str,
    narrative: &str,
    images: &[ChartImage],
) -> Option<Vec<u8>> {
    let client_name = client_name.to_string();
    let generated_by = generated_by.to_string();
    let narrative = narrative.to_string();
    let images = images.to_vec();
    let task = tokio::task::spawn_blocking(move || {
        let header = ReportHeader {
            client_name: &client_name,
            generated_at: now,
            generated_by: &generated_by,
        };
        pdf::render_report(&header, &narrative, &images)
    });
    match task.await {
        Ok(Ok(bytes)) => Some(bytes),
        Ok(Err(e)) => {
            log::warn!("PDF rendering failed: {e}");
            None
        }
        Err(e) => {
            log::error!("PDF rendering task aborted: {e}");
            None
        }
    }
}
