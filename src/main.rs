use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{AppEnvironment, Settings};
use core_types::{Catalog, FamilyKind, RowOutcome, SeedOptions, SeedReport};
use database::{
    database_info, ping, probe, ConnectionPool, Family, QueryExecutor, SchemaManager, SeedManager,
    StatisticsAggregator, PROBE_TIMEOUT,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// The main entry point for the playground backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG as well as the DB_* settings.
    dotenvy::dotenv().ok();
    let _guard = configuration::init_tracing();

    let cli = Cli::parse();
    let settings = configuration::load_settings().context("Failed to load settings")?;

    let command = cli.command.name();
    tracing::info!(command, environment = %settings.server.environment, "Running command.");

    let result = match cli.command {
        Commands::Serve(args) => handle_serve(args, settings).await,
        Commands::CreateTables(args) => handle_create_tables(args, &settings).await,
        Commands::Seed(args) => handle_seed(args, &settings).await,
        Commands::Stats(args) => handle_stats(args, &settings).await,
        Commands::Probe => handle_probe(&settings).await,
        Commands::Env => handle_env(&settings),
    };

    if let Err(e) = &result {
        tracing::error!(command, error = ?e, "Command failed.");
    }
    result
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Demo backend: connection pooling, schema bootstrap, seeding and statistics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Create the tables of one family if they do not exist.
    CreateTables(FamilyArgs),
    /// Load the built-in catalog of one family.
    Seed(SeedArgs),
    /// Print counts, average and maximum rating, and the top-rated records.
    Stats(StatsArgs),
    /// Check TCP reachability of the database and run a round trip.
    Probe,
    /// Show the resolved, redacted configuration.
    Env,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "serve",
            Commands::CreateTables(_) => "create-tables",
            Commands::Seed(_) => "seed",
            Commands::Stats(_) => "stats",
            Commands::Probe => "probe",
            Commands::Env => "env",
        }
    }
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Overrides APP_ENV.
    #[arg(long, value_enum)]
    environment: Option<AppEnvironment>,
}

#[derive(Parser)]
struct FamilyArgs {
    /// `tags` or `categories`.
    #[arg(long)]
    family: FamilyKind,
}

#[derive(Parser)]
struct SeedArgs {
    #[command(flatten)]
    family: FamilyArgs,

    /// Upsert into the existing rows instead of clearing them first.
    #[arg(long)]
    keep_existing: bool,

    /// Print the full report as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct StatsArgs {
    #[command(flatten)]
    family: FamilyArgs,

    /// How many top-rated records to list.
    #[arg(long, default_value_t = 3)]
    top: i64,
}

fn executor(settings: &Settings) -> QueryExecutor {
    QueryExecutor::new(ConnectionPool::connect_lazy(settings))
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(environment) = args.environment {
        settings.server.environment = environment;
    }
    web_server::run_server(settings).await
}

async fn handle_create_tables(args: FamilyArgs, settings: &Settings) -> anyhow::Result<()> {
    let family = Family::of(args.family);
    let created = SchemaManager::new(executor(settings))
        .ensure_schema(&family.tables)
        .await
        .with_context(|| format!("Failed to create the {} tables", family.kind))?;

    println!("Ensured {} tables for {}: {}", created.len(), family.kind, created.join(", "));
    Ok(())
}

async fn handle_seed(args: SeedArgs, settings: &Settings) -> anyhow::Result<()> {
    let family = Family::of(args.family.family);
    let executor = executor(settings);

    let missing = SchemaManager::new(executor.clone())
        .missing_tables(&family.tables)
        .await
        .context("Failed to inspect the schema")?;
    if !missing.is_empty() {
        anyhow::bail!(
            "Tables are missing ({}); run `create-tables --family {}` first",
            missing.join(", "),
            family.kind
        );
    }

    let catalog = Catalog::builtin(family.kind)?;
    let options = SeedOptions {
        clear_existing: !args.keep_existing,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!(
        "Seeding {} parents and {} children...",
        catalog.parents.len(),
        catalog.children.len()
    ));

    let result = SeedManager::new(executor, family).seed(&catalog, options).await;
    spinner.finish_and_clear();
    let report = result.with_context(|| format!("Seeding {} aborted", family.kind))?;
    for outcome in report.failures() {
        if let RowOutcome::Failed { title, error } = outcome {
            tracing::warn!(title = %title, error = %error, "Record was not seeded.");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_seed_report(&report);
    }
    Ok(())
}

fn print_seed_report(report: &SeedReport) {
    let mut summary = Table::new();
    summary.set_header(vec![
        "Family",
        "Cleared",
        "Parents",
        "Children",
        "Succeeded",
        "Failed",
        "Avg rating",
    ]);
    summary.add_row(vec![
        report.family.to_string(),
        report.cleared.to_string(),
        report.parents_processed.to_string(),
        report.children_total.to_string(),
        report.children_succeeded.to_string(),
        report.children_failed.to_string(),
        report.average_rating.map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}")),
    ]);
    println!("{summary}");

    let mut sample = Table::new();
    sample.set_header(vec!["Status", "ID", "Title", "Rating", "Parents / Error"]);
    for outcome in &report.sample {
        let row = match outcome {
            RowOutcome::Inserted { id, title, rating, parents, unresolved } => {
                let mut linked = parents.join(", ");
                if !unresolved.is_empty() {
                    linked.push_str(&format!(" (unresolved: {})", unresolved.join(", ")));
                }
                vec![
                    "ok".to_string(),
                    id.to_string(),
                    title.clone(),
                    rating.map_or_else(|| "-".to_string(), |r| r.to_string()),
                    linked,
                ]
            }
            RowOutcome::Failed { title, error } => vec![
                "failed".to_string(),
                "-".to_string(),
                title.clone(),
                "-".to_string(),
                error.clone(),
            ],
        };
        sample.add_row(row);
    }
    println!("{sample}");

    if report.children_failed > 0 {
        let mut failures = Table::new();
        failures.set_header(vec!["Failed record", "Error"]);
        for outcome in report.failures() {
            if let RowOutcome::Failed { title, error } = outcome {
                failures.add_row(vec![title.clone(), error.clone()]);
            }
        }
        println!("{failures}");
    }
}

async fn handle_stats(args: StatsArgs, settings: &Settings) -> anyhow::Result<()> {
    let family = Family::of(args.family.family);
    let stats = StatisticsAggregator::new(executor(settings), family);
    let summary = stats.summary().await.context("Failed to compute statistics")?;
    let top = stats.top_rated(args.top).await.context("Failed to load top-rated records")?;

    let mut table = Table::new();
    table.set_header(vec!["Parents", "Children", "Avg rating", "Max rating"]);
    table.add_row(vec![
        summary.total_parents.to_string(),
        summary.total_children.to_string(),
        summary.average_rating.map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}")),
        summary.max_rating.map_or_else(|| "-".to_string(), |max| max.to_string()),
    ]);
    println!("{table}");

    let mut ranking = Table::new();
    ranking.set_header(vec!["ID", "Title", "Image", "Rating"]);
    for child in top {
        ranking.add_row(vec![
            child.id.to_string(),
            child.title,
            child.image.unwrap_or_default(),
            child.rating.map_or_else(|| "-".to_string(), |r| r.to_string()),
        ]);
    }
    println!("{ranking}");
    Ok(())
}

async fn handle_probe(settings: &Settings) -> anyhow::Result<()> {
    let db = &settings.database;
    match probe(&db.host, db.port, PROBE_TIMEOUT).await {
        Ok(reached) => println!("TCP {} reachable in {} ms", reached.target, reached.elapsed_ms),
        Err(failure) => {
            eprintln!("{failure}");
            for hint in failure.hints() {
                eprintln!("  - {hint}");
            }
            return Err(failure.into());
        }
    }

    let executor = executor(settings);
    ping(&executor).await.context("Connected over TCP but the database round trip failed")?;

    let info = database_info(&executor).await;
    let mut table = Table::new();
    table.set_header(vec!["Item", "Value"]);
    for (name, value) in &info.items {
        table.add_row(vec![name.to_string(), value.clone()]);
    }
    println!("{table}");
    Ok(())
}

fn handle_env(settings: &Settings) -> anyhow::Result<()> {
    let diagnostics = database::ConnectionDiagnostics::collect(settings);
    let db = &settings.database;

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["target".to_string(), diagnostics.to_string()]);
    table.add_row(vec!["pool_size".to_string(), db.pool_size.to_string()]);
    table.add_row(vec!["acquire_timeout".to_string(), format!("{:?}", db.acquire_timeout)]);
    table.add_row(vec!["statement_timeout".to_string(), format!("{:?}", db.statement_timeout)]);
    table.add_row(vec!["idle_timeout".to_string(), format!("{:?}", db.idle_timeout)]);
    table.add_row(vec!["charset".to_string(), db.charset.clone()]);
    table.add_row(vec!["server.port".to_string(), settings.server.port.to_string()]);
    table.add_row(vec!["server.environment".to_string(), settings.server.environment.to_string()]);
    for (name, value) in &diagnostics.observed_environment.vars {
        table.add_row(vec![name.clone(), value.clone().unwrap_or_else(|| "(unset)".to_string())]);
    }
    println!("{table}");
    Ok(())
}
