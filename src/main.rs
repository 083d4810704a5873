use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use engagement_signal::calibration::WeightGrid;
use engagement_signal::config::AnalysisConfig;
use engagement_signal::dataset::{load_rated_posts, RawTable};
use engagement_signal::synthetic::{generate_synthetic_posts, SyntheticOptions};
use engagement_signal::target::TargetPolicy;
use engagement_signal::{
    compare_schemes, format_float, format_optional, score_dataset, search_weights, Error, Result,
};

#[derive(Parser)]
#[command(name = "engagement-signal", about = "Engagement scoring scheme analysis")]
struct Cli {
    /// Path to the analysis config (defaults to config/analysis.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute rates, scheme scores and decay columns
    Score(ScoreArgs),
    /// Grid-search comment and share weights against the top-20% label
    Search(SearchArgs),
    /// Rank scheme columns by correlation with the target
    Compare(CompareArgs),
    /// Write a reproducible synthetic post export
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
struct ScoreArgs {
    #[arg(long, default_value = "data/intermediate/clean_data.csv")]
    input: PathBuf,
    #[arg(long, default_value = "data/features/model_ready.csv")]
    output: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct SearchArgs {
    #[arg(long, default_value = "data/intermediate/clean_data.csv")]
    input: PathBuf,
    /// Target metric: "engagements" or "auto"
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    start: Option<u32>,
    #[arg(long)]
    stop: Option<u32>,
    #[arg(long)]
    step: Option<u32>,
    #[arg(long)]
    parallel: bool,
    #[arg(long)]
    json: bool,
    /// Store the winning weights in the config under this scheme name
    #[arg(long)]
    seed_scheme: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct CompareArgs {
    #[arg(long, default_value = "data/features/model_ready.csv")]
    input: PathBuf,
    #[arg(long, default_value = "data/scheme_comparison_results.csv")]
    output: PathBuf,
    /// Rescore this cleaned export into --input before comparing
    #[arg(long)]
    score_from: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    #[arg(long, default_value = "data/intermediate/synthetic_clean_data.csv")]
    output: PathBuf,
    #[arg(long, default_value_t = 500)]
    rows: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 0.05)]
    missing_followers: f64,
}

fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = AnalysisConfig::load(cli.config)?;

    match cli.command {
        Command::Score(args) => run_score(&args.input, &args.output, &config),
        Command::Search(args) => run_search(args, config, config_path),
        Command::Compare(args) => run_compare(args, &config),
        Command::Generate(args) => run_generate(args),
    }
}

fn run_score(input: &Path, output: &Path, config: &AnalysisConfig) -> Result<()> {
    tracing::info!(path = %input.display(), "loading cleaned posts");
    let table = RawTable::from_path(input)?;
    let scored = score_dataset(table, config)?;
    scored.output_table()?.write_csv(output)?;

    println!("Model ready data saved to {}", output.display());
    let names: Vec<&str> = scored
        .sheet
        .schemes
        .iter()
        .chain(scored.sheet.decayed.iter())
        .map(|column| column.name.as_str())
        .collect();
    println!("Scored columns: {}", names.join(", "));
    if let Some(reference) = scored.sheet.reference {
        println!("Decay reference time: {}", reference.to_rfc3339());
    }
    Ok(())
}

fn run_search(
    args: SearchArgs,
    mut config: AnalysisConfig,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let policy = match args.target.as_deref() {
        Some(value) => TargetPolicy::from_str(value)
            .ok_or_else(|| Error::Config(format!("invalid target policy: {}", value)))?,
        None => config.search.target,
    };
    let grid = config.search.grid;
    config.search.grid = WeightGrid::new(
        args.start.unwrap_or(grid.start),
        args.stop.unwrap_or(grid.stop),
        args.step.unwrap_or(grid.step),
    );
    config.search.parallel |= args.parallel;
    config.search.grid.validate()?;

    let (_, posts) = load_rated_posts(&args.input)?;
    let (target, result) = search_weights(&posts, &config, policy)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Target: Top {}% of {} (Threshold: {})",
            format_float((1.0 - target.quantile) * 100.0, 0),
            target.metric.column(),
            format_float(target.threshold, 4)
        );
        println!("Rows: {}", target.population().len());
        println!(
            "Candidates: {} evaluated, {} undefined",
            result.evaluated, result.skipped
        );
        println!("Best Correlation: {}", format_float(result.correlation, 5));
        println!(
            "Best Weights: Likes={}, Comments={}, Shares={}",
            result.weights.likes, result.weights.comments, result.weights.shares
        );
        println!("Winning Formula: {}", result.to_scheme("winner").formula());
    }

    if let Some(name) = args.seed_scheme {
        let path = config_path.unwrap_or_else(|| PathBuf::from("config/analysis.toml"));
        config.upsert_scheme(result.to_scheme(name.clone()));
        config.write(&path)?;
        tracing::info!(scheme = %name, path = %path.display(), "seeded scheme into config");
    }

    Ok(())
}

fn run_compare(args: CompareArgs, config: &AnalysisConfig) -> Result<()> {
    if let Some(clean) = args.score_from.as_deref() {
        run_score(clean, &args.input, config)?;
    }

    let table = RawTable::from_path(&args.input)?;
    let report = compare_schemes(&table, config)?;

    println!(
        "Target Definition: Top {}% by {} (Threshold: {})",
        format_float((1.0 - config.target.quantile) * 100.0, 0),
        report.metric.column(),
        format_float(report.threshold, 4)
    );
    println!("Sample size for correlation: {}", report.sample_size);
    println!("\n--- Scheme Comparison (ranked by top-20% correlation) ---");
    for row in &report.rankings {
        println!(
            "{:<24} continuous {:>8} | binary {:>8}",
            row.scheme,
            format_optional(row.corr_continuous, 4),
            format_optional(row.corr_top20_binary, 4)
        );
    }

    println!("\n--- Summary ---");
    if let Some(best) = report.best() {
        println!(
            "Best Scheme: {} (Corr: {})",
            best.scheme,
            format_optional(best.corr_top20_binary, 4)
        );
    }
    if let Some(legacy) = report.legacy() {
        println!(
            "Legacy ({}): {}",
            legacy.scheme,
            format_optional(legacy.corr_top20_binary, 4)
        );
    }
    if let Some(baseline) = report.baseline() {
        println!(
            "Baseline ({}): {}",
            baseline.scheme,
            format_optional(baseline.corr_top20_binary, 4)
        );
    }

    report.to_table().write_csv(&args.output)?;
    println!("\nFull results saved to {}", args.output.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let options = SyntheticOptions {
        rows: args.rows,
        seed: args.seed,
        missing_followers: args.missing_followers.clamp(0.0, 1.0),
    };
    generate_synthetic_posts(&options).write_csv(&args.output)?;
    println!("Wrote {} synthetic posts to {}", args.rows, args.output.display());
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
