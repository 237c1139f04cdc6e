// pricewise CLI - config-driven grocery listing comparison

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pricewise")]
#[command(about = "Normalize, match and price-compare grocery listings across sources")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a comparison from a TOML config file
    #[command(after_help = "\
Examples:
  pricewise run weekly.toml
  pricewise run weekly.toml --json
  pricewise run weekly.toml --output report.json
  pricewise run weekly.toml --json --allow-unmatched | jq '.statistics'
  RUST_LOG=debug pricewise run weekly.toml --sequential")]
    Run {
        /// Path to the comparison config
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Process reference listings on one thread
        #[arg(long)]
        sequential: bool,

        /// Exit 0 even when some reference listings have no match
        #[arg(long)]
        allow_unmatched: bool,
    },

    /// Parse and validate a config without loading any listings
    #[command(after_help = "\
Examples:
  pricewise validate weekly.toml")]
    Validate {
        /// Path to the comparison config
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  pricewise-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  pricewise-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

/// Diagnostics go to stderr so `--json` stdout stays a single JSON value.
/// `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            sequential,
            allow_unmatched,
        } => run::cmd_run(run::RunOptions {
            config_path: config,
            json,
            output,
            sequential,
            allow_unmatched,
        }),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
