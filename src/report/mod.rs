pub mod markdown;
pub mod pdf;
pub mod snapshot;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::aggregate::AggregationPayload;
use crate::auth::Operator;
use crate::charts::ChartImage;
use crate::error::Result;
use crate::query::period::Period;

/// Reports kept in memory, newest first.
pub const REPORT_CACHE_CAPACITY: usize = 10;

/// The facts printed at the top of every rendering.
#[derive(Debug, Clone, Copy)]
pub struct ReportHeader<'a> {
    pub client_name: &'a str,
    pub generated_at: NaiveDateTime,
    pub generated_by: &'a str,
}

impl ReportHeader<'_> {
    pub fn generated_on(&self) -> String {
        self.generated_at.format("%B %d, %Y at %I:%M %p").to_string()
    }
}

/// Client name made safe for a file name: spaces become `_`, commas and
/// path separators are removed.
pub fn sanitize_file_stem(client_name: &str) -> String {
    client_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            ',' | '/' | '\\' => None,
            c => Some(c),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReportId(u64);

static NEXT_REPORT_ID: AtomicU64 = AtomicU64::new(1);

impl ReportId {
    fn next() -> Self {
        Self(NEXT_REPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-fatal conditions surfaced alongside a finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWarning {
    /// No portfolio row, tickets only.
    TicketingOnly,
    /// Portfolio row but no tickets in the trailing window.
    NoRecentTickets,
    NoCharts,
    /// Charts were produced but this build cannot turn them into images.
    ChartRenderingUnavailable,
    PdfUnavailable,
    SnapshotNotWritten,
}

impl DataWarning {
    pub fn message(&self) -> &'static str {
        match self {
            DataWarning::TicketingOnly => "Limited data available: client found in ticketing system only",
            DataWarning::NoRecentTickets => "Limited analytics: no recent tickets found for this client",
            DataWarning::NoCharts => "No charts could be generated for this report",
            DataWarning::ChartRenderingUnavailable => {
                "Charts were generated but this build has no image backend (enable the `kaleido` feature)"
            }
            DataWarning::PdfUnavailable => "PDF could not be generated; Markdown only",
            DataWarning::SnapshotNotWritten => "Data snapshot could not be saved",
        }
    }
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A finished report. Immutable; generating again yields a new instance.
#[derive(Debug)]
pub struct Report {
    pub(crate) id: ReportId,
    pub(crate) client_name: String,
    pub(crate) generated_at: NaiveDateTime,
    pub(crate) generated_by: Operator,
    pub(crate) period: Period,
    pub(crate) payload: Arc<AggregationPayload>,
    pub(crate) narrative: String,
    pub(crate) charts: Vec<ChartImage>,
    pub(crate) markdown: String,
    pub(crate) pdf: Option<Vec<u8>>,
    pub(crate) warnings: Vec<DataWarning>,
    pub(crate) snapshot_path: Option<PathBuf>,
}

impl Report {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        client_name: String,
        generated_at: NaiveDateTime,
        generated_by: Operator,
        period: Period,
        payload: Arc<AggregationPayload>,
        narrative: String,
        charts: Vec<ChartImage>,
        markdown: String,
        pdf: Option<Vec<u8>>,
        warnings: Vec<DataWarning>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            id: ReportId::next(),
            client_name,
            generated_at,
            generated_by,
            period,
            payload,
            narrative,
            charts,
            markdown,
            pdf,
            warnings,
            snapshot_path,
        }
    }

    pub fn id(&self) -> ReportId {
        self.id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    pub fn generated_by(&self) -> &Operator {
        &self.generated_by
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn payload(&self) -> &AggregationPayload {
        &self.payload
    }

    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn charts(&self) -> &[ChartImage] {
        &self.charts
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn pdf(&self) -> Option<&[u8]> {
        self.pdf.as_deref()
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub fn markdown_file_name(&self) -> String {
        format!("{}_Report.md", sanitize_file_stem(&self.client_name))
    }

    pub fn pdf_file_name(&self) -> String {
        format!("{}_Report.pdf", sanitize_file_stem(&self.client_name))
    }

    /// Write the Markdown and, when present, the PDF into `dir`.
    pub fn write_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(2);

        let md_path = dir.join(self.markdown_file_name());
        std::fs::write(&md_path, &self.markdown)?;
        written.push(md_path);

        if let Some(pdf) = &self.pdf {
            let pdf_path = dir.join(self.pdf_file_name());
            std::fs::write(&pdf_path, pdf)?;
            written.push(pdf_path);
        }
        Ok(written)
    }
}

/// Most-recent-N report cache. Lives only as long as the process.
pub struct ReportCache {
    capacity: usize,
    reports: Mutex<VecDeque<Arc<Report>>>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(REPORT_CACHE_CAPACITY)
    }
}

impl ReportCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            reports: Mutex::new(VecDeque::new()),
        }
    }

    /// Add a report as the newest entry, evicting the oldest beyond capacity.
    pub fn push(&self, report: Report) -> Arc<Report> {
        let report = Arc::new(report);
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.push_front(Arc::clone(&report));
        while reports.len() > self.capacity {
            if let Some(evicted) = reports.pop_back() {
                log::debug!("Evicted report {} for {}", evicted.id, evicted.client_name);
            }
        }
        report
    }

    /// Cached reports, newest first.
    pub fn recent(&self) -> Vec<Arc<Report>> {
        let reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.iter().cloned().collect()
    }

    pub fn get(&self, id: ReportId) -> Option<Arc<Report>> {
        let reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
