//! Span - adaptive curriculum engine for second-language practice
//!
//! CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use span::config::Config;
use span::error::{exit_codes, SpanError};
use span::storage::FileStore;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SPAN_LOG";

// =============================================================================
// CLI Definition
// =============================================================================

/// Span - adaptive curriculum engine for second-language practice
#[derive(Parser)]
#[command(name = "span")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Catalog] Import curriculum items from a JSON array
    Import {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Learner] Build today's practice plan
    Plan {
        /// Learner ID
        learner: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Learner] Record responses to items in one session
    Practice {
        /// Learner ID
        learner: String,
        /// Item term or numeric ID
        #[arg(required_unless_present = "responses")]
        term: Option<String>,
        /// Quality score 0-5 for TERM (derived from correctness and latency if omitted)
        #[arg(long)]
        quality: Option<i64>,
        /// Mark the TERM response as wrong (only used without --quality)
        #[arg(long)]
        incorrect: bool,
        /// TERM response latency in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,
        /// Another response as term:quality[:latency_ms] (repeatable, same session)
        #[arg(long = "response", value_name = "TERM:QUALITY[:LATENCY_MS]")]
        responses: Vec<String>,
        /// Topic to record for the session
        #[arg(long)]
        topic: Option<String>,
        /// Observed skill level as skill=level (repeatable)
        #[arg(long = "observe")]
        observations: Vec<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Learner] Start tracking a new item
    Introduce {
        /// Learner ID
        learner: String,
        /// Item ID
        item_id: u64,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Learner] Look up a term for a conversational hint
    Hint {
        /// Term or fragment to look up
        term: String,
        /// Learner whose skills pick the prompt type
        #[arg(long)]
        learner: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [State] Show a learner's skill vector
    Skills {
        /// Learner ID
        learner: String,
        /// Observed skill level as skill=level (repeatable, only raises)
        #[arg(long = "observe")]
        observations: Vec<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [State] Show or edit a learner's weak and strong topics
    Profile {
        /// Learner ID
        learner: String,
        /// Mark a topic weak (repeatable)
        #[arg(long)]
        weak: Vec<String>,
        /// Mark a topic strong (repeatable)
        #[arg(long)]
        strong: Vec<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("span error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Install the stderr log subscriber, filtered by `SPAN_LOG` (default `warn`).
fn init_tracing() {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);

    match cli.command {
        Commands::Import { file, json, quiet } => run_import(&file, json, quiet, config),
        Commands::Plan {
            learner,
            json,
            quiet,
        } => run_plan(&learner, json, quiet, config),
        Commands::Practice {
            learner,
            term,
            quality,
            incorrect,
            latency_ms,
            responses,
            topic,
            observations,
            json,
            quiet,
        } => {
            use span::cli::practice::PracticeOptions;
            let options = PracticeOptions {
                json,
                quiet,
                quality,
                incorrect,
                latency_ms,
                responses,
                topic,
                observations,
            };
            run_practice(&learner, term.as_deref(), &options, config)
        }
        Commands::Introduce {
            learner,
            item_id,
            json,
            quiet,
        } => run_introduce(&learner, item_id, json, quiet, config),
        Commands::Hint {
            term,
            learner,
            json,
            quiet,
        } => run_hint(&term, learner, json, quiet, config),
        Commands::Skills {
            learner,
            observations,
            json,
            quiet,
        } => run_skills(&learner, observations, json, quiet, config),
        Commands::Profile {
            learner,
            weak,
            strong,
            json,
            quiet,
        } => run_profile(&learner, weak, strong, json, quiet, config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Open the file store at the configured data directory.
fn open_store(config: &Config) -> Result<FileStore, SpanError> {
    match config.data_dir() {
        Some(dir) => FileStore::with_dir(dir),
        None => FileStore::new(),
    }
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

/// Exit code for commands that can miss an entity.
fn lookup_exit_code(success: bool, found: bool) -> ExitCode {
    if success && !found {
        ExitCode::from(exit_codes::NOT_FOUND as u8)
    } else {
        success_to_exit_code(success)
    }
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
        if !formatted.ends_with('\n') {
            println!();
        }
    }
}

fn run_import(
    file: &Path,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::import::{ImportCommand, ImportOptions};

    let store = open_store(&config)?;
    let cmd = ImportCommand::new(store);
    let options = ImportOptions { json, quiet };

    let output = cmd.run(file, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_plan(
    learner: &str,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::plan::{PlanCommand, PlanOptions};

    let store = open_store(&config)?;
    let cmd = PlanCommand::new(store, config);
    let options = PlanOptions { json, quiet };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_practice(
    learner: &str,
    term: Option<&str>,
    options: &span::cli::practice::PracticeOptions,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::practice::PracticeCommand;

    let store = open_store(&config)?;
    let cmd = PracticeCommand::new(store, config);

    let output = cmd.run(learner, term, options);
    print_output(&cmd.format_output(&output, options));

    Ok(lookup_exit_code(output.success, output.found))
}

fn run_introduce(
    learner: &str,
    item_id: u64,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::introduce::{IntroduceCommand, IntroduceOptions};

    let store = open_store(&config)?;
    let cmd = IntroduceCommand::new(store, config);
    let options = IntroduceOptions { json, quiet };

    let output = cmd.run(learner, item_id, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(lookup_exit_code(output.success, output.found))
}

fn run_hint(
    term: &str,
    learner: Option<String>,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::hint::{HintCommand, HintOptions};

    let store = open_store(&config)?;
    let cmd = HintCommand::new(store, config);
    let options = HintOptions {
        json,
        quiet,
        learner_id: learner,
    };

    let output = cmd.run(term, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(lookup_exit_code(output.success, output.found))
}

fn run_skills(
    learner: &str,
    observations: Vec<String>,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::skills::{SkillsCommand, SkillsOptions};

    let store = open_store(&config)?;
    let cmd = SkillsCommand::new(store, config);
    let options = SkillsOptions {
        json,
        quiet,
        observations,
    };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_profile(
    learner: &str,
    weak: Vec<String>,
    strong: Vec<String>,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use span::cli::profile::{ProfileCommand, ProfileOptions};

    let store = open_store(&config)?;
    let cmd = ProfileCommand::new(store);
    let options = ProfileOptions {
        json,
        quiet,
        weak,
        strong,
    };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
