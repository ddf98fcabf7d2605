//! Evaluator for chart programs.
//!
//! A chart program is a JSON object whose keys are bindings. The bindings
//! `fig1`..`fig4` hold chart expressions that read from the aggregation
//! payload; every other binding is ignored. The only thing an expression can
//! reach is the payload, and evaluation is bounded by the limits below.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::aggregate::{AggregationPayload, ClientRecord};
use crate::charts::{ChartFigure, ChartKind, ChartOrientation, ChartSet, ChartSlot, ChartTrace};
use crate::query::catalog::QueryName;

pub const MAX_PROGRAM_BYTES: usize = 64 * 1024;
pub const MAX_TRACES: usize = 8;
pub const MAX_POINTS: usize = 5000;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program is {0} bytes, limit is {MAX_PROGRAM_BYTES}")]
    TooLarge(usize),

    #[error("syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("program must be a JSON object of bindings")]
    NotAnObject,

    #[error("{binding}: {message}")]
    Binding { binding: &'static str, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChartExpr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: Option<String>,
    source: String,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    series: Vec<SeriesExpr>,
    #[serde(default)]
    columns: Vec<ColumnExpr>,
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    x_title: Option<String>,
    #[serde(default)]
    y_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeriesExpr {
    #[serde(default)]
    name: Option<String>,
    y: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnExpr {
    #[serde(default)]
    label: Option<String>,
    field: String,
}

/// Evaluate `source` against `payload`.
///
/// Any error inside a chart expression fails the whole evaluation. Slot
/// bindings that are not objects are skipped, and a chart whose source query
/// returned no rows leaves its slot empty.
pub fn evaluate(source: &str, payload: &AggregationPayload) -> Result<ChartSet, ProgramError> {
    if source.len() > MAX_PROGRAM_BYTES {
        return Err(ProgramError::TooLarge(source.len()));
    }
    let program: Value = serde_json::from_str(source)?;
    let Value::Object(mut bindings) = program else {
        return Err(ProgramError::NotAnObject);
    };

    let mut charts = ChartSet::default();
    for slot in ChartSlot::ALL {
        let binding = slot.binding();
        let expr = match bindings.remove(binding) {
            None | Some(Value::Null) => continue,
            Some(value) if !value.is_object() => {
                log::debug!("{binding} is not a chart expression, ignoring it");
                continue;
            }
            Some(value) => serde_json::from_value::<ChartExpr>(value).map_err(|e| {
                ProgramError::Binding {
                    binding,
                    message: e.to_string(),
                }
            })?,
        };
        let fail = |message: String| ProgramError::Binding { binding, message };

        match build_figure(slot, &expr, payload).map_err(fail)? {
            Some(figure) => charts.insert(slot, figure),
            None => log::debug!("{binding}: source {} is empty, slot left unfilled", expr.source),
        }
    }

    if !bindings.is_empty() {
        let ignored: Vec<&str> = bindings.keys().map(String::as_str).collect();
        log::debug!("Ignoring chart program bindings: {}", ignored.join(", "));
    }
    Ok(charts)
}

fn build_figure(
    slot: ChartSlot,
    expr: &ChartExpr,
    payload: &AggregationPayload,
) -> Result<Option<ChartFigure>, String> {
    let kind = match expr.kind.as_str() {
        "line" => ChartKind::Line,
        "bar" => ChartKind::Bar,
        "area" => ChartKind::Area,
        other => return Err(format!("unknown chart type {other:?}")),
    };
    let orientation = match expr.orientation.as_deref() {
        None | Some("v") => ChartOrientation::Vertical,
        Some("h") => ChartOrientation::Horizontal,
        Some(other) => return Err(format!("unknown orientation {other:?}")),
    };
    let query = QueryName::parse(&expr.source)
        .ok_or_else(|| format!("unknown source {:?}", expr.source))?;
    let rows = payload.rows(query);

    let traces = match (expr.series.is_empty(), expr.columns.is_empty()) {
        (false, true) => series_traces(expr, rows)?,
        (true, false) => column_traces(&expr.columns, rows)?,
        (true, true) => return Err("chart needs either series or columns".into()),
        (false, false) => return Err("chart cannot have both series and columns".into()),
    };
    let Some(traces) = traces else {
        return Ok(None);
    };

    Ok(Some(ChartFigure {
        kind,
        title: expr.title.clone().unwrap_or_else(|| slot.title().to_string()),
        orientation,
        x_title: expr.x_title.clone(),
        y_title: expr.y_title.clone(),
        traces,
    }))
}

fn series_traces(expr: &ChartExpr, rows: &[ClientRecord]) -> Result<Option<Vec<ChartTrace>>, String> {
    let x_column = expr.x.as_deref().ok_or("series charts need an x column")?;
    if expr.series.len() > MAX_TRACES {
        return Err(format!("{} series, limit is {MAX_TRACES}", expr.series.len()));
    }
    if rows.len() > MAX_POINTS {
        return Err(format!("{} points, limit is {MAX_POINTS}", rows.len()));
    }
    if rows.is_empty() {
        return Ok(None);
    }

    let x = rows
        .iter()
        .map(|row| label(row, x_column))
        .collect::<Result<Vec<_>, _>>()?;
    let traces = expr
        .series
        .iter()
        .map(|s| -> Result<ChartTrace, String> {
            let y = rows
                .iter()
                .map(|row| number(row, &s.y))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ChartTrace {
                name: s.name.clone().unwrap_or_else(|| s.y.clone()),
                x: x.clone(),
                y,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(traces))
}

fn column_traces(columns: &[ColumnExpr], rows: &[ClientRecord]) -> Result<Option<Vec<ChartTrace>>, String> {
    if columns.len() > MAX_POINTS {
        return Err(format!("{} points, limit is {MAX_POINTS}", columns.len()));
    }
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let mut x = Vec::with_capacity(columns.len());
    let mut y = Vec::with_capacity(columns.len());
    for c in columns {
        x.push(c.label.clone().unwrap_or_else(|| c.field.clone()));
        y.push(number(row, &c.field)?);
    }
    Ok(Some(vec![ChartTrace {
        name: String::new(),
        x,
        y,
    }]))
}

fn label(row: &ClientRecord, column: &str) -> Result<String, String> {
    match row.get(column) {
        None => Err(format!("no column {column:?}")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
    }
}

fn number(row: &ClientRecord, column: &str) -> Result<Option<f64>, String> {
    match row.get(column) {
        None => Err(format!("no column {column:?}")),
        Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(format!("column {column:?} is not numeric: {other}")),
    }
}
