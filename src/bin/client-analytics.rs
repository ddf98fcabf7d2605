use std::path::PathBuf;

use clap::{Parser, Subcommand};

use client_analytics::{
    Authenticator, ClientAnalytics, DataWarning, Period, ReportOutcome, ReportStep, Settings,
};

#[derive(Parser)]
#[command(name = "client-analytics", about = "Client analytics report generator")]
struct Cli {
    /// Database path (default: ANALYTICS_DB_PATH or ~/.client-analytics/analytics.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl client_analytics::ReportProgress for StderrProgress {
    fn on_step(&self, client_name: &str, step: ReportStep) {
        eprintln!(
            "[{}/{}] {}: {}...",
            step.index() + 1,
            ReportStep::COUNT,
            client_name,
            step.label()
        );
    }

    fn on_warning(&self, _client_name: &str, warning: DataWarning) {
        eprintln!("  Warning: {warning}");
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the analytics schema and per-month seat/revenue columns
    Init {
        /// Months of history (including the current one) to add columns for;
        /// next month is always added too
        #[arg(long, default_value = "12")]
        months: u32,
    },
    /// Show the reporting period and the columns it reads
    Period {
        /// Period to inspect (YYYY-MM, default: current month)
        period: Option<String>,
    },
    /// Print the six aggregation queries for a client
    Sql {
        client: String,
        /// Period (YYYY-MM, default: current month)
        #[arg(long)]
        period: Option<String>,
    },
    /// Run the aggregation queries for a client without calling the LLM
    Payload {
        client: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate reports for one or more clients
    Report {
        /// Client names, processed in order
        #[arg(required = true)]
        clients: Vec<String>,
        /// Operator username
        #[arg(long)]
        user: String,
        /// Operator password (default: ANALYTICS_PASSWORD)
        #[arg(long)]
        password: Option<String>,
        /// Directory for the Markdown and PDF files (default: ANALYTICS_DATA_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("Could not load .env: {e}");
        }
    }

    let mut settings = Settings::from_env()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    match cli.command {
        Commands::Init { months } => {
            let periods =
                client_analytics::storage::schema::period_window(Period::current(), months.saturating_sub(1), 1);
            let added = client_analytics::Database::init_at(&settings.db_path, periods).await?;
            println!(
                "Initialized {} ({added} period column(s) added)",
                settings.db_path.display()
            );
        }
        Commands::Period { period } => {
            let p = parse_period(period.as_deref())?;
            println!("Period:  {} ({})", p.label(), p.to_key());
            println!("  Seats:   {}", p.seat_column()?);
            println!("  Revenue: {}", p.revenue_column()?);
            let (start, end) = p.date_range();
            println!("  Range:   {start} .. {end}");
        }
        Commands::Sql { client, period } => {
            let p = parse_period(period.as_deref())?;
            let today = chrono::Local::now().date_naive();
            for stmt in client_analytics::query::catalog::build_catalog(&client, &p, today)? {
                println!("-- {} {:?}", stmt.name, stmt.params);
                println!("{};\n", stmt.sql.trim());
            }
        }
        Commands::Payload { client, json } => {
            let db = client_analytics::Database::open_at(
                &settings.db_path,
                settings.db_pool_size,
                settings.db_timeout,
            )
            .await?;
            let now = chrono::Local::now().naive_local();
            let period = Period::containing(now.date());
            let payload =
                client_analytics::aggregate::aggregate(&db, &client, &period, now.date()).await?;
            if json {
                println!("{}", payload.to_prompt_json()?);
            } else {
                println!("{client} ({})", period.label());
                println!("  Coverage: {:?}", payload.coverage());
                for name in client_analytics::QueryName::ALL {
                    println!("  {:<22} {} row(s)", name.as_str(), payload.rows(name).len());
                }
            }
        }
        Commands::Report {
            clients,
            user,
            password,
            out,
        } => {
            handle_report(&settings, clients, &user, password, out).await?;
        }
    }

    Ok(())
}

fn parse_period(period: Option<&str>) -> anyhow::Result<Period> {
    Ok(match period {
        Some(p) => Period::parse(p)?,
        None => Period::current(),
    })
}

async fn handle_report(
    settings: &Settings,
    clients: Vec<String>,
    user: &str,
    password: Option<String>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let authenticator = Authenticator::new(settings.users.clone());
    if authenticator.is_empty() {
        anyhow::bail!("No operators configured. Set ANALYTICS_USERS=user:password[,...]");
    }
    let password = match password {
        Some(p) => p,
        None => std::env::var("ANALYTICS_PASSWORD")
            .map_err(|_| anyhow::anyhow!("Pass --password or set ANALYTICS_PASSWORD"))?,
    };
    let operator = match authenticator.login(user, &password) {
        Ok(op) => op,
        Err(e) => anyhow::bail!("{}", e.user_message()),
    };

    let analytics = match ClientAnalytics::from_settings(settings).await {
        Ok(a) => a,
        Err(e) => anyhow::bail!("{}", e.user_message()),
    };
    let out_dir = out.unwrap_or_else(|| settings.data_dir.join("reports"));

    let mut failures = 0usize;
    for client in &clients {
        match analytics
            .generate_report(&operator, client, &StderrProgress)
            .await
        {
            Ok(ReportOutcome::Generated(report)) => {
                let written = report.write_files(&out_dir)?;
                println!("Report {} for {}:", report.id(), report.client_name());
                for path in written {
                    println!("  {}", path.display());
                }
                if report.pdf().is_none() {
                    println!("  (PDF unavailable; Markdown only)");
                }
            }
            Ok(ReportOutcome::ClientNotFound) => {
                println!("{client}: no data found. Check the client name and try again.");
                failures += 1;
            }
            Err(e) => {
                eprintln!("{client}: {}", e.user_message());
                failures += 1;
            }
        }
    }

    let recent = analytics.recent_reports();
    if !recent.is_empty() {
        println!("\nRecent reports:");
        for report in recent {
            println!(
                "  {:<6} {:<30} {}  by {}  ({} chart(s))",
                report.id().to_string(),
                report.client_name(),
                report.generated_at().format("%Y-%m-%d %H:%M"),
                report.generated_by(),
                report.charts().len()
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} report(s) failed", clients.len());
    }
    Ok(())
}
