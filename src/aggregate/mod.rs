pub mod types;

pub use types::*;

use base64::Engine;
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::catalog::{build_catalog, QueryStatement};
use crate::query::period::Period;
use crate::storage::Database;

/// Run the six catalog queries for `client` in sequence on one connection and
/// collect them into a payload.
///
/// A query that fails is logged and leaves its slot empty. Only losing the
/// connection itself (or exceeding the database timeout) is an error.
pub async fn aggregate(
    db: &Database,
    client: &str,
    period: &Period,
    today: NaiveDate,
) -> Result<AggregationPayload> {
    let catalog = build_catalog(client, period, today)?;
    let client_label = client.trim().to_string();

    let run = db.reader().call(move |conn| {
        let mut payload = AggregationPayload::default();
        for stmt in &catalog {
            match run_statement(conn, stmt) {
                Ok(rows) => {
                    log::info!("{}: {} row(s) for {client_label}", stmt.name, rows.len());
                    payload.set(stmt.name, rows);
                }
                Err(e) => {
                    log::error!("Query {} failed for {client_label}: {e}", stmt.name);
                }
            }
        }
        Ok::<AggregationPayload, rusqlite::Error>(payload)
    });

    tokio::time::timeout(db.timeout(), run)
        .await
        .map_err(|_| Error::DatabaseUnavailable("aggregation queries timed out".into()))?
        .map_err(|e| Error::DatabaseUnavailable(e.to_string()))
}

fn run_statement(
    conn: &rusqlite::Connection,
    stmt: &QueryStatement,
) -> rusqlite::Result<Vec<ClientRecord>> {
    log::debug!("{}: {}", stmt.name, stmt.sql);
    let mut prepared = conn.prepare(&stmt.sql)?;
    let columns: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = prepared.query(rusqlite::params_from_iter(stmt.params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = ClientRecord::default();
        for (i, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        // NaN and infinities have no JSON form
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(base64::engine::general_purpose::STANDARD.encode(b)),
    }
}
