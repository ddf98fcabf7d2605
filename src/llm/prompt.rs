use std::path::Path;

use crate::error::{Error, Result};

const DATA_SLOT: &str = "{data}";

/// A prompt with exactly one `{data}` substitution point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        match text.matches(DATA_SLOT).count() {
            1 => Ok(Self { text }),
            n => Err(Error::Config(format!(
                "prompt template must contain exactly one {DATA_SLOT} marker, found {n}"
            ))),
        }
    }

    /// Load `path`, falling back to `default` when the file is missing or
    /// unreadable. A readable file with a bad marker count is still an error.
    pub fn load_or(path: Option<&Path>, default: &str) -> Result<Self> {
        let Some(path) = path else {
            return Self::new(default);
        };
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loaded prompt template from {}", path.display());
                Self::new(text)
            }
            Err(e) => {
                log::warn!(
                    "Could not read prompt file {}, using built-in default: {e}",
                    path.display()
                );
                Self::new(default)
            }
        }
    }

    pub fn narrative_default() -> Self {
        Self {
            text: NARRATIVE_PROMPT.to_string(),
        }
    }

    pub fn chart_default() -> Self {
        Self {
            text: CHART_PROMPT.to_string(),
        }
    }

    pub fn render(&self, data: &str) -> String {
        self.text.replacen(DATA_SLOT, data, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub const NARRATIVE_PROMPT: &str = r#"You are a business analyst preparing a client insight report for the operations team.
Write a professional report from the client data below, using this structure:

## Client Overview
**Client Name: [Client Name]**
Centre, seat count, floors, move-in and move-out dates. If the move-out date has
passed, state how many days ago. Say whether this is a new, renewal or expansion client.

## Pricing Overview
The client's price per seat against the centre average, and the resulting premium
or discount as a percentage.

## Ticketing Trends (Last 6 Months)
Total tickets, monthly resolution patterns, and whether the trend is improving.

## Top Issues Breakdown
The main categories and subcategories with resolved and unresolved counts, plus the
infrastructure needs and pain points they point to.

## SLA Performance (Current Month)
Tickets logged, resolved within SLA, breached, and the compliance rate.

## Escalation Analysis
Escalation levels, statuses and how effectively they were resolved.

## Key Insights & Recommendations
Satisfaction indicators, service improvement areas and retention insights.

Client data (JSON, one key per query):
{data}

Format with Markdown headings and bold key metrics. Use only the data provided."#;

pub const CHART_PROMPT: &str = r#"Produce a JSON chart program for the client data below. Respond with ONLY a
JSON object whose keys are fig1, fig2, fig3 and fig4:

1. fig1: monthly ticket trends (line chart from monthly_trend, x = month,
   series total_tickets, resolved_tickets and unresolved_tickets)
2. fig2: issue categories (horizontal bar chart from issues_breakdown,
   x = sub_category, series total_tickets)
3. fig3: escalation distribution (bar chart from escalation_analysis,
   x = escalation_level, series ticket_count)
4. fig4: SLA overview (bar chart from sla_compliance using columns
   within_sla and sla_breached)

Each chart is an object:
{"type": "line" | "bar" | "area", "title": "...", "source": "<query name>",
 "x": "<column>", "series": [{"name": "...", "y": "<column>"}],
 "columns": [{"label": "...", "field": "<column>"}],
 "orientation": "v" | "h", "x_title": "...", "y_title": "..."}

Use either "series" (one trace per entry across all rows) or "columns" (one
trace built from fields of the first row). Omit a chart when its source is empty.

Data: {data}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_have_one_slot() {
        assert!(PromptTemplate::new(NARRATIVE_PROMPT).is_ok());
        assert!(PromptTemplate::new(CHART_PROMPT).is_ok());
    }

    #[test]
    fn test_marker_count_validated() {
        assert!(matches!(PromptTemplate::new("no marker"), Err(Error::Config(_))));
        assert!(matches!(
            PromptTemplate::new("{data} and {data}"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_render_substitutes_once() {
        let t = PromptTemplate::new("Data: {data}.").unwrap();
        assert_eq!(t.render("{\"x\": \"{data}\"}"), "Data: {\"x\": \"{data}\"}.");
    }

    #[test]
    fn test_load_or_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Custom {{data}} prompt").unwrap();
        let t = PromptTemplate::load_or(Some(file.path()), NARRATIVE_PROMPT).unwrap();
        assert_eq!(t.as_str(), "Custom {data} prompt");
    }

    #[test]
    fn test_load_or_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let t = PromptTemplate::load_or(Some(&dir.path().join("absent.txt")), CHART_PROMPT).unwrap();
        assert_eq!(t, PromptTemplate::chart_default());
    }

    #[test]
    fn test_load_or_rejects_file_without_marker() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "nothing to fill").unwrap();
        assert!(PromptTemplate::load_or(Some(file.path()), NARRATIVE_PROMPT).is_err());
    }
}
