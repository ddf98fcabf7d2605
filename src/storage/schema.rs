use std::collections::HashSet;

use rusqlite_migration::{Migrations, M};

use crate::error::Result;
use crate::query::period::Period;

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

/// Column names currently present on `table`.
pub fn existing_columns(
    conn: &rusqlite::Connection,
    table: &str,
) -> std::result::Result<HashSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(names)
}

/// Add the seat/revenue columns for each period that the portfolio table is
/// missing. Returns the number of columns added.
pub fn ensure_period_columns(conn: &rusqlite::Connection, periods: &[Period]) -> Result<usize> {
    let existing = existing_columns(conn, "portfolio")?;
    let mut added = 0;
    for period in periods {
        for column in [period.seat_column()?, period.revenue_column()?] {
            if existing.contains(&column) {
                continue;
            }
            conn.execute_batch(&format!(
                "ALTER TABLE portfolio ADD COLUMN {column} REAL"
            ))?;
            log::debug!("Added portfolio column {column}");
            added += 1;
        }
    }
    Ok(added)
}

/// `back` months before `center` through `ahead` months after it, oldest first.
pub fn period_window(center: Period, back: u32, ahead: u32) -> Vec<Period> {
    let mut start = center;
    for _ in 0..back {
        start = start.previous();
    }
    let mut periods = Vec::with_capacity((back + ahead + 1) as usize);
    let mut p = start;
    for _ in 0..=(back + ahead) {
        periods.push(p);
        p = p.next();
    }
    periods
}
