use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use skiptrace_core::config::{Config, CONFIG_FILE};
use skiptrace_core::extract::ExtractionEngine;
use skiptrace_core::input::parse_builds_file;
use skiptrace_core::pipeline::ComparisonPipeline;
use skiptrace_core::provider::GitSnapshotProvider;
use skiptrace_core::telemetry::init_tracing;
use skiptrace_java::JavaAnalyzer;
use skiptrace_report::{text, CsvResultSink};

#[derive(Parser)]
#[command(name = "skiptrace")]
#[command(about = "Detect failing tests that silently vanish between consecutive CI builds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare consecutive builds from a build-record CSV export
    Run {
        /// Path to the CSV input file
        input: PathBuf,
        /// Output folder for results and repository checkouts
        output: PathBuf,
        /// Config file path (defaults to .skiptrace.toml in the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Create a default .skiptrace.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            config,
            verbose,
        } => {
            if let Err(message) = validate_run_args(&input, &output) {
                eprintln!("{message}");
                process::exit(1);
            }
            cmd_run(&input, &output, config.as_deref(), verbose)
        }
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn validate_run_args(input: &Path, output: &Path) -> Result<(), String> {
    if !input.exists() {
        return Err("The specified input file does not exist.".to_string());
    }
    let is_csv = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err("The specified input file is not a CSV file.".to_string());
    }
    if output.exists() && !output.is_dir() {
        return Err("The specified output folder is an already existing file.".to_string());
    }
    Ok(())
}

fn cmd_run(input: &Path, output: &Path, config_path: Option<&Path>, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output folder '{}'", output.display()))?;

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(level);

    let config = load_config(config_path)?;
    let builds = parse_builds_file(input)?;
    let builds_parsed = builds.len();

    let provider = GitSnapshotProvider::new(
        output.join(&config.provider.repos_dir),
        config.provider.remote_base.clone(),
    );
    let analyzer = JavaAnalyzer::new().context("failed to initialize Java analyzer")?;
    let engine = ExtractionEngine::new(Box::new(analyzer), Box::new(provider), &config.extract)?;
    let pipeline = ComparisonPipeline::new(engine);

    let results_dir = output.join("Results");
    let mut all_results = CsvResultSink::open(&results_dir.join("all_results.csv"))?;
    let mut smell_results = CsvResultSink::open(&results_dir.join("smell_results.csv"))?;

    let totals = pipeline.compare_builds(builds, &mut all_results, &mut smell_results)?;

    print!("{}", text::format_summary(&totals, builds_parsed, &results_dir));
    info!(output = %output.display(), "analysis finished");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Ok(Config::load_or_default(Path::new("."))),
    }
}
