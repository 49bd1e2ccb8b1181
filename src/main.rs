use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use census_linkage::{
    BatchSummary, IdentifyOutcome, MatchReport, MatcherConfig, MatchingEngine,
    RecommendationPolicy, SqliteStore,
};

#[derive(Debug, Parser)]
#[command(name = "census-linkage")]
#[command(version)]
#[command(about = "Link census component records to master registry identities")]
struct Cli {
    #[arg(long, default_value = "./census_linkage.db")]
    db: PathBuf,

    /// JSON matcher configuration (table names, year, threshold, policy)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the component, master and alias CSV exports into the database
    Import(ImportArgs),
    /// Identify every component record in a line number range
    Run(RunArgs),
    /// Identify one record and print its candidate assessments
    Identify { line_num: i64 },
    /// Write stored results to CSV
    Export(ExportArgs),
    /// Accuracy summary of stored results
    Report {
        #[arg(long)]
        run_id: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[arg(long)]
    components: Option<PathBuf>,
    #[arg(long)]
    master: Option<PathBuf>,
    #[arg(long)]
    aliases: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    start: Option<i64>,
    #[arg(long)]
    stop: Option<i64>,
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    run_id: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    StrictBest,
    RankedList,
}

impl From<PolicyArg> for RecommendationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::StrictBest => RecommendationPolicy::StrictBest,
            PolicyArg::RankedList => RecommendationPolicy::RankedList,
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MatcherConfig::from_file(path)?,
        None => MatcherConfig::default(),
    };

    let mut store = open_store(&cli.db, &config)?;

    match cli.command {
        Command::Import(args) => run_import(&mut store, &args),
        Command::Run(args) => {
            if let Some(policy) = args.policy {
                config.policy = policy.into();
            }
            run_batch(&mut store, &config, &args)
        }
        Command::Identify { line_num } => run_identify(&mut store, &config, line_num),
        Command::Export(args) => run_export(&store, &args),
        Command::Report { run_id } => run_report(&store, run_id.as_deref()),
    }
}

fn open_store(db_path: &Path, config: &MatcherConfig) -> Result<SqliteStore> {
    SqliteStore::open(db_path, config.tables.clone(), config.observation_year)
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

fn run_import(store: &mut SqliteStore, args: &ImportArgs) -> Result<()> {
    println!("🗄️  Data Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if let Some(path) = &args.components {
        println!("\n📂 Loading component records...");
        let count = store.import_components(path)?;
        println!("✓ Inserted {} component records", count);
    }

    if let Some(path) = &args.master {
        println!("\n📂 Loading master registry...");
        let count = store.import_master(path)?;
        println!("✓ Inserted {} master rows", count);
    }

    if let Some(path) = &args.aliases {
        println!("\n📂 Loading name aliases...");
        let count = store.import_aliases(path)?;
        println!("✓ Inserted {} aliases", count);
    }

    Ok(())
}

fn run_batch(store: &mut SqliteStore, config: &MatcherConfig, args: &RunArgs) -> Result<()> {
    let start = args.start.unwrap_or(config.batch.start);
    let stop = args.stop.unwrap_or(config.batch.stop);

    println!("🧭 Matching lines {}..={} ({})", start, stop, config.policy.as_str());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(run_id = store.run_id(), start, stop, "starting batch");

    let engine = MatchingEngine::from_config(config);
    let summary = engine.run_batch(store, start, stop);

    println!("\n{}", summary.summary());
    println!("✓ Run id: {}", store.run_id());

    Ok(())
}

fn run_identify(store: &mut SqliteStore, config: &MatcherConfig, line_num: i64) -> Result<()> {
    let engine = MatchingEngine::from_config(config);

    match engine.identify(store, line_num)? {
        IdentifyOutcome::NotFound => println!("❌ No component record with line number {}", line_num),
        IdentifyOutcome::Skipped => println!("⏭️  Line {} has no identification, skipped", line_num),
        IdentifyOutcome::Recorded(report) => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &MatchReport) {
    println!("📄 {}", report.record);
    for name in &report.unrecognized {
        println!("⚠️  Unrecognized {}: {}", name.field, name.raw);
    }

    match report.retrieval {
        Some(strategy) => println!("🔎 {} rows via {:?}", report.candidates_found, strategy),
        None => println!("🔎 No candidates"),
    }

    if !report.assessments.is_empty() {
        println!("\n{:>8} {:>6} {:>6} {:>6} {:>8}", "id", "nb", "name", "year", "overall");
        for a in &report.assessments {
            println!(
                "{:>8} {:>6.2} {:>6.2} {:>6.2} {:>8.3}",
                a.candidate_id, a.neighborhood, a.name.score, a.year.score, a.overall
            );
        }
    }

    let result = &report.result;
    println!(
        "\n✓ Recommendation: {} (ground truth {}, correct {})",
        result.recommendation,
        result.ground_truth,
        result.correct.code()
    );
    if let Some(ranked) = result.ranked_string() {
        println!("✓ Ranked: {}", ranked);
    }
}

fn run_export(store: &SqliteStore, args: &ExportArgs) -> Result<()> {
    let count = store.export_results_csv(&args.out, args.run_id.as_deref())?;
    println!("✓ Exported {} results to {}", count, args.out.display());
    Ok(())
}

fn run_report(store: &SqliteStore, run_id: Option<&str>) -> Result<()> {
    let stored = store
        .load_results(run_id)
        .context("Failed to load stored results")?;
    let summary = BatchSummary::from_results(stored.iter().map(|s| &s.result));

    println!("📊 Results report{}", run_id.map(|id| format!(" for run {}", id)).unwrap_or_default());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", summary.summary());

    Ok(())
}
