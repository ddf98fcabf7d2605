use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::period::{trailing_window_start, Period};

/// The six aggregation queries every report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryName {
    ClientDemographics,
    CenterAvgPricing,
    MonthlyTrend,
    IssuesBreakdown,
    SlaCompliance,
    EscalationAnalysis,
}

impl QueryName {
    /// Catalog order; also the key order of the serialized payload.
    pub const ALL: [QueryName; 6] = [
        QueryName::ClientDemographics,
        QueryName::CenterAvgPricing,
        QueryName::MonthlyTrend,
        QueryName::IssuesBreakdown,
        QueryName::SlaCompliance,
        QueryName::EscalationAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryName::ClientDemographics => "client_demographics",
            QueryName::CenterAvgPricing => "center_avg_pricing",
            QueryName::MonthlyTrend => "monthly_trend",
            QueryName::IssuesBreakdown => "issues_breakdown",
            QueryName::SlaCompliance => "sla_compliance",
            QueryName::EscalationAnalysis => "escalation_analysis",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.as_str() == s)
    }
}

impl std::fmt::Display for QueryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ready-to-run statement. `params` bind to `?1`, `?2`, ... in order.
#[derive(Debug, Clone)]
pub struct QueryStatement {
    pub name: QueryName,
    pub sql: String,
    pub params: Vec<String>,
}

/// Build the six statements for `client` in `period`, with `today` anchoring
/// the trailing window and days-since-moveout.
pub fn build_catalog(client: &str, period: &Period, today: NaiveDate) -> Result<Vec<QueryStatement>> {
    let client = client.trim();
    if client.is_empty() {
        return Err(Error::InvalidClient("client name is empty".into()));
    }
    let seat = period.seat_column()?;
    let revenue = period.revenue_column()?;

    let today_str = today.format("%Y-%m-%d").to_string();
    let window_start = trailing_window_start(today).format("%Y-%m-%d").to_string();
    let (month_start, _) = period.date_range();
    let month_start = month_start.format("%Y-%m-%d").to_string();
    let month_end = period.next_month_start().format("%Y-%m-%d").to_string();
    let client = client.to_string();

    Ok(vec![
        QueryStatement {
            name: QueryName::ClientDemographics,
            sql: demographics_sql(&seat, &revenue),
            params: vec![client.clone(), today_str],
        },
        QueryStatement {
            name: QueryName::CenterAvgPricing,
            sql: center_pricing_sql(&seat, &revenue),
            params: vec![client.clone()],
        },
        QueryStatement {
            name: QueryName::MonthlyTrend,
            sql: MONTHLY_TREND_SQL.to_string(),
            params: vec![client.clone(), window_start.clone()],
        },
        QueryStatement {
            name: QueryName::IssuesBreakdown,
            sql: ISSUES_BREAKDOWN_SQL.to_string(),
            params: vec![client.clone(), window_start.clone()],
        },
        QueryStatement {
            name: QueryName::SlaCompliance,
            sql: SLA_COMPLIANCE_SQL.to_string(),
            params: vec![client.clone(), month_start, month_end],
        },
        QueryStatement {
            name: QueryName::EscalationAnalysis,
            sql: ESCALATION_ANALYSIS_SQL.to_string(),
            params: vec![client, window_start],
        },
    ])
}

fn demographics_sql(seat: &str, revenue: &str) -> String {
    format!(
        "SELECT
            centre AS centre_name,
            client_name,
            client_id,
            move_in AS move_in_date,
            move_out AS move_out_date,
            stage_strategy AS client_type,
            status,
            floor AS floor_info,
            COALESCE({seat}, 0) AS current_month_seats,
            COALESCE({revenue}, 0) AS current_month_revenue,
            CASE
                WHEN COALESCE({seat}, 0) > 0 AND COALESCE({revenue}, 0) > 0 THEN
                    ROUND(CAST(COALESCE({revenue}, 0) AS REAL) / MAX(COALESCE({seat}, 0), 1), 2)
                ELSE 0.0
            END AS current_month_price_per_seat,
            escalation,
            escalation_frequency,
            first_escalation_date,
            CASE
                WHEN move_out IS NOT NULL AND date(move_out) < date(?2) THEN
                    CAST(julianday(date(?2)) - julianday(date(move_out)) AS INTEGER)
                ELSE 0
            END AS days_since_moveout
         FROM portfolio
         WHERE status IN ('Active', 'Inactive') AND client_name = ?1"
    )
}

fn center_pricing_sql(seat: &str, revenue: &str) -> String {
    format!(
        "SELECT
            p.centre AS centre,
            COUNT(*) AS total_clients_in_center,
            SUM(COALESCE({seat}, 0)) AS total_center_seats,
            SUM(COALESCE({revenue}, 0)) AS total_center_revenue,
            ROUND(AVG(
                CASE
                    WHEN COALESCE({seat}, 0) > 0 AND COALESCE({revenue}, 0) > 0 THEN
                        CAST(COALESCE({revenue}, 0) AS REAL) / COALESCE({seat}, 0)
                    ELSE NULL
                END
            ), 2) AS center_avg_price_per_seat
         FROM portfolio p
         WHERE p.status = 'Active'
           AND p.client_name <> ?1
           AND p.centre = (
               SELECT centre FROM portfolio WHERE client_name = ?1 LIMIT 1
           )
         GROUP BY p.centre"
    )
}

const MONTHLY_TREND_SQL: &str = "SELECT
        strftime('%Y-%m', created_at) AS month,
        COUNT(CASE WHEN client_status = 'Closed' THEN 1 END) AS resolved_tickets,
        COUNT(CASE WHEN client_status = 'Open' THEN 1 END) AS unresolved_tickets,
        COUNT(*) AS total_tickets,
        ROUND(AVG(CASE WHEN client_status = 'Closed' AND tat IS NOT NULL THEN tat END), 2) AS avg_tat
     FROM tickets
     WHERE company_name = ?1
       AND created_at >= ?2
     GROUP BY strftime('%Y-%m', created_at)
     ORDER BY month";

const ISSUES_BREAKDOWN_SQL: &str = "SELECT
        category,
        sub_category,
        COUNT(CASE WHEN client_status = 'Closed' THEN 1 END) AS resolved_count,
        COUNT(CASE WHEN client_status = 'Open' THEN 1 END) AS unresolved_count,
        COUNT(*) AS total_tickets,
        ROUND(AVG(CASE WHEN client_status = 'Closed' AND tat IS NOT NULL THEN tat END), 2) AS avg_tat,
        ROUND(COUNT(CASE WHEN client_status = 'Closed' THEN 1 END) * 100.0 / COUNT(*), 2) AS resolution_rate
     FROM tickets
     WHERE company_name = ?1
       AND created_at >= ?2
       AND category IS NOT NULL
       AND category <> 'AC'
     GROUP BY category, sub_category
     ORDER BY total_tickets DESC, category, sub_category";

const SLA_COMPLIANCE_SQL: &str = "SELECT
        COUNT(*) AS total_tickets,
        COUNT(CASE WHEN is_due_date_breached = 0 THEN 1 END) AS within_sla,
        COUNT(CASE WHEN is_due_date_breached = 1 THEN 1 END) AS sla_breached,
        CASE
            WHEN COUNT(*) = 0 THEN 0.0
            ELSE ROUND(COUNT(CASE WHEN is_due_date_breached = 0 THEN 1 END) * 100.0 / COUNT(*), 2)
        END AS sla_compliance_rate,
        ROUND(AVG(CASE WHEN is_due_date_breached = 0 AND tat IS NOT NULL THEN tat END), 2) AS avg_tat_within_sla,
        ROUND(AVG(CASE WHEN is_due_date_breached = 1 AND tat IS NOT NULL THEN tat END), 2) AS avg_tat_breached
     FROM tickets
     WHERE company_name = ?1
       AND created_at >= ?2
       AND created_at < ?3";

const ESCALATION_ANALYSIS_SQL: &str = "SELECT
        escalation_level,
        escalation_status,
        COUNT(*) AS ticket_count,
        ROUND(AVG(tat), 2) AS avg_resolution_time,
        COUNT(CASE WHEN client_status = 'Closed' THEN 1 END) AS resolved_count,
        COUNT(CASE WHEN client_status = 'Open' THEN 1 END) AS unresolved_count,
        ROUND(COUNT(CASE WHEN client_status = 'Closed' THEN 1 END) * 100.0 / COUNT(*), 2) AS resolution_rate
     FROM tickets
     WHERE company_name = ?1
       AND created_at >= ?2
       AND escalation_level IS NOT NULL
     GROUP BY escalation_level, escalation_status
     ORDER BY escalation_level, escalation_status";
