//! Tally CLI binary.
//!
//! Runs value and moat scorecards over a local fact store, persists the
//! summaries and prints reports.

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tally::data::FactStore;
use tally::output::{
    ExportFormat, Exporter, MoatScoresSortBy, ScoresFilter, ScoresSortBy, SortDirection,
    SummaryWriter, moat_scorecard_table, moat_scores_table, scores_table, select_moat_scores,
    select_scores, value_scorecard_table,
};
use tally::scoring::{CheckFamily, ScoringConfig, available_checks};
use tally::{CancelFlag, Scorer};
use tracing_subscriber::EnvFilter;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally: value and moat scorecards from US-GAAP facts", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database holding facts, prices and scores
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Scoring configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value-score every company and store the summaries
    Score(BatchArgs),

    /// Moat-score every company and store the summaries
    Moat(BatchArgs),

    /// Show the full scorecard for one company
    Company {
        /// Internal company id
        company_id: u64,

        /// Show the moat scorecard instead of the value scorecard
        #[arg(long)]
        moat: bool,

        /// Price date (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Write the individual checks to this file (.csv or .json)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// List stored summaries, filtered and sorted
    Report {
        /// Report moat summaries instead of value summaries
        #[arg(long)]
        moat: bool,

        /// Sort key, e.g. score, market-cap, upside, roe-cf
        #[arg(long, default_value = "score")]
        sort_by: String,

        /// Sort direction (asc or desc)
        #[arg(long, default_value = "desc")]
        direction: SortDirection,

        /// Minimum overall score
        #[arg(long)]
        min_score: Option<usize>,

        /// Maximum overall score
        #[arg(long)]
        max_score: Option<usize>,

        /// Exchange to keep
        #[arg(long)]
        exchange: Option<String>,

        /// Rows to print
        #[arg(long, default_value = "25")]
        limit: usize,

        /// Write every selected row to this file (.csv or .json)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// List the scorecard checks and their thresholds
    Checks {
        /// Only one family (value or moat)
        #[arg(long)]
        family: Option<String>,
    },

    /// Show fact store statistics
    Stats,
}

#[derive(Args)]
struct BatchArgs {
    /// Price date (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Rows to print
    #[arg(long, default_value = "25")]
    limit: usize,

    /// Also write the summaries to this file (.csv or .json)
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> CliResult {
    let cli = Cli::parse();
    let db = cli.db.unwrap_or_else(default_db_path);
    let config = match &cli.config {
        Some(path) => ScoringConfig::from_json_file(path)?,
        None => ScoringConfig::default(),
    };

    match cli.command {
        Commands::Score(args) => run_value_batch(&db, config, args).await?,
        Commands::Moat(args) => run_moat_batch(&db, config, args).await?,
        Commands::Company {
            company_id,
            moat,
            as_of,
            export,
        } => show_company(&db, config, company_id, moat, as_of, export.as_deref()).await?,
        Commands::Report {
            moat,
            sort_by,
            direction,
            min_score,
            max_score,
            exchange,
            limit,
            export,
        } => {
            let filter = ScoresFilter {
                min_score,
                max_score,
                exchange,
            };
            if moat {
                report_moat(&db, &filter, sort_by.parse()?, direction, limit, export.as_deref())?;
            } else {
                report_value(&db, &filter, sort_by.parse()?, direction, limit, export.as_deref())?;
            }
        }
        Commands::Checks { family } => list_checks(family.as_deref())?,
        Commands::Stats => show_stats(&db)?,
    }

    Ok(())
}

/// Default database location under the user's data directory.
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("tally.db")
}

fn open_store(db: &Path) -> CliResult<FactStore> {
    if let Some(parent) = db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(FactStore::new(db)?)
}

/// Cancel flag tripped by Ctrl-C.
fn interrupt_flag() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            flag.cancel();
        }
    });
    cancel
}

fn spinner(message: &str) -> CliResult<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn export_rows<T: Exporter>(rows: &T, path: &Path) -> CliResult {
    let format = ExportFormat::from_path(path)?;
    rows.export_to_file(path, format)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_value_batch(db: &Path, config: ScoringConfig, args: BatchArgs) -> CliResult {
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let scorer = Scorer::new(open_store(db)?, config);

    let pb = spinner(&format!("Computing value scores as of {}", as_of))?;
    let rows = match scorer.compute_all(as_of, &interrupt_flag()).await {
        Ok(rows) => {
            pb.finish_with_message(format!("Scored {} companies", rows.len()));
            rows
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    let written = SummaryWriter::new(db)?.replace_scores(&rows)?;
    println!("Stored {} value summaries", written);

    let top = select_scores(
        &rows,
        &ScoresFilter::default(),
        ScoresSortBy::OverallScore,
        SortDirection::Descending,
    );
    println!("{}", scores_table(&top[..top.len().min(args.limit)]));

    if let Some(path) = &args.export {
        export_rows(&top, path)?;
    }
    Ok(())
}

async fn run_moat_batch(db: &Path, config: ScoringConfig, args: BatchArgs) -> CliResult {
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let scorer = Scorer::new(open_store(db)?, config);

    let pb = spinner(&format!("Computing moat scores as of {}", as_of))?;
    let rows = match scorer.compute_all_moat(as_of, &interrupt_flag()).await {
        Ok(rows) => {
            pb.finish_with_message(format!("Scored {} companies", rows.len()));
            rows
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    let written = SummaryWriter::new(db)?.replace_moat_scores(&rows)?;
    println!("Stored {} moat summaries", written);

    let top = select_moat_scores(
        &rows,
        &ScoresFilter::default(),
        MoatScoresSortBy::OverallScore,
        SortDirection::Descending,
    );
    println!("{}", moat_scores_table(&top[..top.len().min(args.limit)]));

    if let Some(path) = &args.export {
        export_rows(&top, path)?;
    }
    Ok(())
}

async fn show_company(
    db: &Path,
    config: ScoringConfig,
    company_id: u64,
    moat: bool,
    as_of: Option<NaiveDate>,
    export: Option<&Path>,
) -> CliResult {
    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let scorer = Scorer::new(open_store(db)?, config);
    let cancel = interrupt_flag();

    let title = match scorer.source().load_company(company_id)? {
        Some(company) => format!(
            "{} ({})",
            company.name.as_deref().unwrap_or(company.cik.as_str()),
            company.ticker.as_deref().unwrap_or("-")
        ),
        None => format!("Company {}", company_id),
    };

    if moat {
        let result = scorer.compute_one_moat(company_id, as_of, &cancel).await?;
        println!("{}", moat_scorecard_table(&title, &result));
        if let Some(path) = export {
            export_rows(&result.checks, path)?;
        }
    } else {
        let result = scorer.compute_one(company_id, as_of, &cancel).await?;
        println!("{}", value_scorecard_table(&title, &result));
        if let Some(path) = export {
            export_rows(&result.checks, path)?;
        }
    }
    Ok(())
}

fn report_value(
    db: &Path,
    filter: &ScoresFilter,
    sort_by: ScoresSortBy,
    direction: SortDirection,
    limit: usize,
    export: Option<&Path>,
) -> CliResult {
    let rows = SummaryWriter::new(db)?.load_scores()?;
    let selected = select_scores(&rows, filter, sort_by, direction);

    println!("{} of {} companies match", selected.len(), rows.len());
    println!("{}", scores_table(&selected[..selected.len().min(limit)]));

    if let Some(path) = export {
        export_rows(&selected, path)?;
    }
    Ok(())
}

fn report_moat(
    db: &Path,
    filter: &ScoresFilter,
    sort_by: MoatScoresSortBy,
    direction: SortDirection,
    limit: usize,
    export: Option<&Path>,
) -> CliResult {
    let rows = SummaryWriter::new(db)?.load_moat_scores()?;
    let selected = select_moat_scores(&rows, filter, sort_by, direction);

    println!("{} of {} companies match", selected.len(), rows.len());
    println!("{}", moat_scores_table(&selected[..selected.len().min(limit)]));

    if let Some(path) = export {
        export_rows(&selected, path)?;
    }
    Ok(())
}

fn list_checks(family: Option<&str>) -> CliResult {
    let family = match family.map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("value") => Some(CheckFamily::Value),
        Some("moat") => Some(CheckFamily::Moat),
        Some(other) => return Err(format!("Unknown check family: {}", other).into()),
    };

    println!("{}", "=".repeat(80));
    println!("{:<6} {:>3}  {:<36} {:<12}", "Family", "#", "Check", "Threshold");
    println!("{}", "-".repeat(80));
    for check in available_checks()
        .into_iter()
        .filter(|c| family.is_none_or(|f| c.family == f))
    {
        println!(
            "{:<6} {:>3}  {:<36} {:<12}",
            check.family.label(),
            check.number,
            check.name,
            check.threshold
        );
        println!("            {}", check.description);
    }
    println!("{}", "=".repeat(80));
    Ok(())
}

fn show_stats(db: &Path) -> CliResult {
    let stats = open_store(db)?.get_stats()?;

    println!("Database: {}", db.display());
    println!("  Companies:         {}", stats.companies);
    println!("  Facts:             {}", stats.facts);
    println!("  Distinct concepts: {}", stats.distinct_concepts);
    println!("  Prices:            {}", stats.prices);
    Ok(())
}
