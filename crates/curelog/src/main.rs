//! Curate, audit, and plan from a personal health journal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable (a `.env`
//! file in the working directory is honored). `MODEL_ID` and `MAX_WORKERS`
//! provide defaults that the flags below override.
//!
//! # Examples
//!
//! ```sh
//! # Format a journal into a curated log (cache-aware, concurrent)
//! curelog curate journal.md --output curated.md
//!
//! # Verify a curated log against its source
//! curelog audit --original journal.md --curated curated.md
//!
//! # Ask for a ranked action plan over the curated history
//! curelog advise curated.md --goals "more energy, better sleep"
//!
//! # Full pipeline: curate, audit every section, then plan
//! curelog run journal.md
//!
//! # Which source dates never made it into the curated set? (offline)
//! curelog coverage output/ ~/health/labs/
//! ```
//!
//! Exit codes: 0 on success, 1 when an audit finds discrepancies, 2 on
//! operational errors (missing key, unreadable file, API failure).

use clap::{Parser, Subcommand};
use curelog::api::usage::UsageTotals;
use curelog::pipeline::{
    AuditOutcome, PipelineConfig, advise, audit, curate_journal, render_report,
};
use curelog::{OpenRouterClient, journal};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Curate, audit, and plan from a personal health journal.
#[derive(Parser)]
#[command(name = "curelog", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format a raw journal into a curated, date-sectioned Markdown log
    Curate {
        /// Raw journal file with `### YYYY-MM-DD` sections
        input: PathBuf,

        /// Where to write the merged curated log
        #[arg(long, default_value = "./output.md")]
        output: PathBuf,

        #[command(flatten)]
        curate: CurateArgs,
    },

    /// Audit a curated log against the original entry it was built from
    Audit {
        /// The original raw entry
        #[arg(long)]
        original: PathBuf,

        /// The curated version to verify
        #[arg(long)]
        curated: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Produce a ranked action plan from a curated clinical history
    Advise {
        /// Curated history file (typically `curate` output)
        history: PathBuf,

        /// Free-text goals to steer the plan
        #[arg(long)]
        goals: Option<String>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Run the full pipeline: curate, audit every section, then plan
    Run {
        /// Raw journal file with `### YYYY-MM-DD` sections
        input: PathBuf,

        /// Where to write the merged curated log
        #[arg(long, default_value = "./output.md")]
        output: PathBuf,

        /// Free-text goals to steer the plan
        #[arg(long)]
        goals: Option<String>,

        #[command(flatten)]
        curate: CurateArgs,
    },

    /// Report source dates missing from a curated directory (no LLM calls)
    Coverage {
        /// Directory of curated files (date-prefixed filenames)
        curated_dir: PathBuf,

        /// Directory of source files (date-prefixed filenames)
        source_dir: PathBuf,
    },
}

/// Flags shared by every LLM-calling subcommand.
#[derive(clap::Args)]
struct LlmArgs {
    /// Model to use (default: MODEL_ID env, then the built-in default)
    #[arg(long)]
    model: Option<String>,

    /// Retries for transient API failures
    #[arg(long)]
    retries: Option<u32>,
}

impl LlmArgs {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        config
    }
}

/// Flags for subcommands that run the concurrent, cache-backed formatter.
#[derive(clap::Args)]
struct CurateArgs {
    #[command(flatten)]
    llm: LlmArgs,

    /// Directory for per-section cache files
    #[arg(long, default_value = "output")]
    data_dir: PathBuf,

    /// Maximum concurrent formatting calls (default: MAX_WORKERS env, then 4)
    #[arg(long)]
    max_workers: Option<usize>,
}

impl CurateArgs {
    fn into_config(self) -> PipelineConfig {
        let mut config = self.llm.into_config().with_data_dir(self.data_dir);
        if let Some(workers) = self.max_workers {
            config = config.with_max_workers(workers);
        }
        config
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".to_string())
}

fn make_client() -> Result<OpenRouterClient, String> {
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "OPENROUTER_KEY environment variable is not set".to_string())?;
    OpenRouterClient::new(api_key)
}

/// Group `(date, text)` pairs by date, joining multiple texts per date.
fn group_by_date(pairs: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
    let mut grouped: BTreeMap<String, String> = BTreeMap::new();
    for (date, text) in pairs {
        grouped
            .entry(date)
            .and_modify(|existing| {
                existing.push_str("\n\n");
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    grouped
}

// ── Subcommand handlers ────────────────────────────────────────────

async fn cmd_curate(input: &Path, output: &Path, config: &PipelineConfig) -> Result<u8, String> {
    let client = make_client()?;
    let text = read_file(input)?;
    let mut totals = UsageTotals::new();

    let curated = curate_journal(&client, config, &file_stem(input), &text, &mut totals).await?;

    std::fs::write(output, &curated.text)
        .map_err(|e| format!("failed to write '{}': {e}", output.display()))?;
    info!(
        "curated log written to {} ({} cached, {} formatted; {})",
        output.display(),
        curated.cache_hits,
        curated.formatted,
        totals.summary(),
    );
    Ok(0)
}

async fn cmd_audit(
    original: &Path,
    curated: &Path,
    config: &PipelineConfig,
) -> Result<u8, String> {
    let client = make_client()?;
    let original_text = read_file(original)?;
    let curated_text = read_file(curated)?;
    let mut totals = UsageTotals::new();

    let outcome = audit(&client, config, &original_text, &curated_text, &mut totals).await?;
    info!("audit done ({})", totals.summary());
    println!("{}", render_report(&outcome));
    Ok(if outcome.is_clean() { 0 } else { 1 })
}

async fn cmd_advise(
    history: &Path,
    goals: Option<&str>,
    config: &PipelineConfig,
) -> Result<u8, String> {
    let client = make_client()?;
    let history_text = read_file(history)?;
    let mut totals = UsageTotals::new();

    let plan = advise(&client, config, &history_text, goals, &mut totals).await?;
    info!(
        "plan: {} recommendation(s) ({})",
        plan.len(),
        totals.summary(),
    );
    println!("{}", plan.text);
    Ok(0)
}

async fn cmd_run(
    input: &Path,
    output: &Path,
    goals: Option<&str>,
    config: &PipelineConfig,
) -> Result<u8, String> {
    let client = make_client()?;
    let text = read_file(input)?;
    let mut totals = UsageTotals::new();

    // Stage 1: formatter.
    let curated = curate_journal(&client, config, &file_stem(input), &text, &mut totals).await?;
    std::fs::write(output, &curated.text)
        .map_err(|e| format!("failed to write '{}': {e}", output.display()))?;
    info!(
        "curated log written to {} ({} cached, {} formatted)",
        output.display(),
        curated.cache_hits,
        curated.formatted,
    );

    // Stage 2: audit each date's curated output against its source section.
    let originals = group_by_date(
        journal::split_sections(&text)
            .into_iter()
            .map(|s| (s.date.clone(), s.text())),
    );
    let curated_by_date = group_by_date(curated.entries.iter().cloned());

    let mut failed = false;
    for (date, original_section) in &originals {
        let Some(curated_section) = curated_by_date.get(date) else {
            eprintln!("{date}: no curated output for this date");
            failed = true;
            continue;
        };
        let outcome = audit(&client, config, original_section, curated_section, &mut totals).await?;
        match outcome {
            AuditOutcome::Clean => info!("{date}: audit clean"),
            AuditOutcome::Discrepancies(_) => {
                eprintln!("{date}:\n{}", render_report(&outcome));
                failed = true;
            }
        }
    }
    if failed {
        info!("pipeline stopped before advisor ({})", totals.summary());
        return Ok(1);
    }

    // Stage 3: advisor, only over verified history.
    let plan = advise(&client, config, &curated.text, goals, &mut totals).await?;
    info!(
        "pipeline done: {} recommendation(s) ({})",
        plan.len(),
        totals.summary(),
    );
    println!("{}", plan.text);
    Ok(0)
}

fn cmd_coverage(curated_dir: &Path, source_dir: &Path) -> Result<u8, String> {
    let curated = journal::dates_in_dir(curated_dir)?;
    let source = journal::dates_in_dir(source_dir)?;
    let missing = journal::missing_dates(&curated, &source);

    if missing.is_empty() {
        println!(
            "all {} dated file(s) in {} are covered",
            source.len(),
            source_dir.display(),
        );
    } else {
        println!(
            "dates in {} but not in {}:",
            source_dir.display(),
            curated_dir.display(),
        );
        for date in &missing {
            println!("{date}");
        }
    }
    Ok(0)
}

async fn run(cli: Cli) -> Result<u8, String> {
    match cli.command {
        Command::Curate {
            input,
            output,
            curate,
        } => cmd_curate(&input, &output, &curate.into_config()).await,
        Command::Audit {
            original,
            curated,
            llm,
        } => cmd_audit(&original, &curated, &llm.into_config()).await,
        Command::Advise {
            history,
            goals,
            llm,
        } => cmd_advise(&history, goals.as_deref(), &llm.into_config()).await,
        Command::Run {
            input,
            output,
            goals,
            curate,
        } => cmd_run(&input, &output, goals.as_deref(), &curate.into_config()).await,
        Command::Coverage {
            curated_dir,
            source_dir,
        } => cmd_coverage(&curated_dir, &source_dir),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code as i32),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}
