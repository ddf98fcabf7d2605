use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::catalog::QueryName;

/// One result row: column name to scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRecord(Map<String, Value>);

impl ClientRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Numeric value of `column`; integers widen to `f64`.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.0.get(column).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.0.get(column).and_then(Value::as_i64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }
}

/// The six query results for one client, serialized in catalog order.
///
/// Every slot is always present; a query that failed and a query that
/// matched nothing both leave an empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationPayload {
    pub client_demographics: Vec<ClientRecord>,
    pub center_avg_pricing: Vec<ClientRecord>,
    pub monthly_trend: Vec<ClientRecord>,
    pub issues_breakdown: Vec<ClientRecord>,
    pub sla_compliance: Vec<ClientRecord>,
    pub escalation_analysis: Vec<ClientRecord>,
}

impl AggregationPayload {
    pub fn rows(&self, query: QueryName) -> &[ClientRecord] {
        match query {
            QueryName::ClientDemographics => &self.client_demographics,
            QueryName::CenterAvgPricing => &self.center_avg_pricing,
            QueryName::MonthlyTrend => &self.monthly_trend,
            QueryName::IssuesBreakdown => &self.issues_breakdown,
            QueryName::SlaCompliance => &self.sla_compliance,
            QueryName::EscalationAnalysis => &self.escalation_analysis,
        }
    }

    pub fn set(&mut self, query: QueryName, rows: Vec<ClientRecord>) {
        let slot = match query {
            QueryName::ClientDemographics => &mut self.client_demographics,
            QueryName::CenterAvgPricing => &mut self.center_avg_pricing,
            QueryName::MonthlyTrend => &mut self.monthly_trend,
            QueryName::IssuesBreakdown => &mut self.issues_breakdown,
            QueryName::SlaCompliance => &mut self.sla_compliance,
            QueryName::EscalationAnalysis => &mut self.escalation_analysis,
        };
        *slot = rows;
    }

    pub fn coverage(&self) -> DataCoverage {
        match (
            self.client_demographics.is_empty(),
            self.monthly_trend.is_empty(),
        ) {
            (false, false) => DataCoverage::Full,
            (false, true) => DataCoverage::DemographicsOnly,
            (true, false) => DataCoverage::TicketsOnly,
            (true, true) => DataCoverage::NotFound,
        }
    }

    /// Pretty JSON with keys in catalog order, as sent to the LLM.
    pub fn to_prompt_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Which of the two anchor queries returned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCoverage {
    Full,
    /// Contract data but no tickets in the trailing window.
    DemographicsOnly,
    /// Tickets but no portfolio row.
    TicketsOnly,
    NotFound,
}
