//! Seed data shared by the aggregation and pipeline tests.

use chrono::NaiveDate;
use rusqlite::params;

use crate::query::period::Period;

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

pub(crate) fn period() -> Period {
    Period::containing(today())
}

pub(crate) struct ClientRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub centre: &'a str,
    pub status: &'a str,
    pub seats: Option<f64>,
    pub revenue: Option<f64>,
    pub move_out: Option<&'a str>,
}

fn client<'a>(
    id: &'a str,
    name: &'a str,
    centre: &'a str,
    status: &'a str,
    seats: f64,
    revenue: f64,
    move_out: Option<&'a str>,
) -> ClientRow<'a> {
    ClientRow {
        id,
        name,
        centre,
        status,
        seats: Some(seats),
        revenue: Some(revenue),
        move_out,
    }
}

pub(crate) fn insert_client(
    conn: &rusqlite::Connection,
    period: &Period,
    row: &ClientRow<'_>,
) -> rusqlite::Result<()> {
    let seat = period.seat_column().unwrap();
    let revenue = period.revenue_column().unwrap();
    conn.execute(
        &format!(
            "INSERT INTO portfolio (client_id, client_name, centre, move_in, move_out,
                stage_strategy, status, floor, escalation, escalation_frequency,
                first_escalation_date, {seat}, {revenue})
             VALUES (?1, ?2, ?3, '2024-01-01', ?4, 'Renewal', ?5, '3rd Floor', 'No', 0, NULL, ?6, ?7)"
        ),
        params![row.id, row.name, row.centre, row.move_out, row.status, row.seats, row.revenue],
    )?;
    Ok(())
}

pub(crate) struct TicketRow<'a> {
    pub company: &'a str,
    pub category: Option<&'a str>,
    pub sub_category: Option<&'a str>,
    pub status: &'a str,
    pub created_at: String,
    pub tat: Option<f64>,
    pub breached: Option<i64>,
    pub escalation_level: Option<&'a str>,
    pub escalation_status: Option<&'a str>,
}

/// One Acme ticket shape and how many copies of it to insert.
fn acme_ticket<'a>(
    created_at: &str,
    category: Option<(&'a str, &'a str)>,
    status: &'a str,
    tat: Option<f64>,
    breached: i64,
    escalation: Option<(&'a str, &'a str)>,
    copies: usize,
) -> (TicketRow<'a>, usize) {
    let ticket = TicketRow {
        company: "Acme Corp",
        category: category.map(|(c, _)| c),
        sub_category: category.map(|(_, s)| s),
        status,
        created_at: created_at.to_string(),
        tat,
        breached: Some(breached),
        escalation_level: escalation.map(|(l, _)| l),
        escalation_status: escalation.map(|(_, s)| s),
    };
    (ticket, copies)
}

pub(crate) fn insert_ticket(
    conn: &rusqlite::Connection,
    t: &TicketRow<'_>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tickets (company_name, category, sub_category, client_status, created_at,
            tat, is_due_date_breached, escalation_level, escalation_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            t.company,
            t.category,
            t.sub_category,
            t.status,
            t.created_at,
            t.tat,
            t.breached,
            t.escalation_level,
            t.escalation_status
        ],
    )?;
    Ok(())
}

/// "Acme Corp" at Koramangala: 50 seats for 500000 this month, 20 tickets in
/// each of May..Oct 2026 (120 total), four of them per month in category "AC".
/// Every month: 12 closed, 8 open; the two open Electrical tickets breach SLA
/// and are escalated to L1, the four open Housekeeping tickets sit at L2.
///
/// "Globex" has three L3 escalations in August, one of them closed.
/// "Vandelay" at Whitefield moves out after `today()`.
pub(crate) fn seed_acme(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let period = period();
    let clients = [
        client("C-001", "Acme Corp", "Koramangala", "Active", 50.0, 500000.0, Some("2026-09-30")),
        client("C-002", "Globex", "Koramangala", "Active", 20.0, 300000.0, None),
        client("C-003", "Initech", "Koramangala", "Active", 0.0, 0.0, None),
        client("C-004", "Umbrella", "Koramangala", "Inactive", 10.0, 50000.0, Some("2025-12-31")),
        client("C-005", "Hooli", "Whitefield", "Active", 80.0, 640000.0, None),
        client("C-006", "Vandelay", "Whitefield", "Active", 12.0, 96000.0, Some("2027-03-31")),
    ];
    for c in &clients {
        insert_client(conn, &period, c)?;
    }

    for month in 5..=10 {
        let created_at = format!("2026-{month:02}-10 09:30:00");
        let batches = [
            acme_ticket(&created_at, Some(("AC", "Cooling")), "Closed", Some(1.0), 0, None, 4),
            acme_ticket(
                &created_at,
                Some(("Electrical", "Power Outage")),
                "Closed",
                Some(4.0),
                0,
                None,
                6,
            ),
            acme_ticket(
                &created_at,
                Some(("Electrical", "Power Outage")),
                "Open",
                None,
                1,
                Some(("L1", "Open")),
                2,
            ),
            acme_ticket(
                &created_at,
                Some(("Housekeeping", "Cleaning")),
                "Closed",
                Some(2.0),
                0,
                None,
                2,
            ),
            acme_ticket(
                &created_at,
                Some(("Housekeeping", "Cleaning")),
                "Open",
                None,
                0,
                Some(("L2", "Pending")),
                4,
            ),
            acme_ticket(&created_at, None, "Open", None, 0, None, 2),
        ];
        for (ticket, n) in &batches {
            for _ in 0..*n {
                insert_ticket(conn, ticket)?;
            }
        }
    }

    for (status, tat) in [("Closed", Some(6.0)), ("Open", None), ("Open", None)] {
        insert_ticket(
            conn,
            &TicketRow {
                company: "Globex",
                category: Some("Plumbing"),
                sub_category: Some("Leak"),
                status,
                created_at: "2026-08-05 11:00:00".into(),
                tat,
                breached: Some(0),
                escalation_level: Some("L3"),
                escalation_status: Some("Escalated"),
            },
        )?;
    }

    // Outside the trailing window and another company's ticket
    insert_ticket(
        conn,
        &TicketRow {
            company: "Acme Corp",
            category: Some("Electrical"),
            sub_category: Some("Power Outage"),
            status: "Closed",
            created_at: "2026-03-01 10:00:00".into(),
            tat: Some(100.0),
            breached: Some(1),
            escalation_level: Some("L3"),
            escalation_status: Some("Closed"),
        },
    )?;
    insert_ticket(
        conn,
        &TicketRow {
            company: "Globex",
            category: Some("Electrical"),
            sub_category: Some("Power Outage"),
            status: "Open",
            created_at: "2026-10-02 10:00:00".into(),
            tat: None,
            breached: Some(1),
            escalation_level: Some("L1"),
            escalation_status: Some("Open"),
        },
    )?;
    Ok(())
}
