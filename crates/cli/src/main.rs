use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use assetsync_engine::{BatchSummary, ImportConfig, run_batch};

#[derive(Parser, Debug)]
#[command(name = "assetsync", version, about = "Import inventory snapshots into the asset database")]
struct Args {
    /// Directory holding `*.json` snapshot files.
    #[arg(long, env = "ASSETSYNC_INPUT")]
    input: PathBuf,

    /// SQLite database file; created if absent.
    #[arg(long, env = "ASSETSYNC_DATABASE")]
    database: PathBuf,

    #[arg(long, env = "ASSETSYNC_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Stop starting new files after this many seconds.
    #[arg(long, env = "ASSETSYNC_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Use the tables as deployed instead of creating missing ones.
    #[arg(long, env = "ASSETSYNC_NO_INIT_SCHEMA", default_value_t = false)]
    no_init_schema: bool,

    /// Print the run summary as JSON.
    #[arg(long, env = "ASSETSYNC_JSON", default_value_t = false)]
    json: bool,
}

impl Args {
    fn config(&self) -> ImportConfig {
        ImportConfig::new(&self.input, &self.database)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .with_init_schema(!self.no_init_schema)
            .with_deadline(self.deadline_secs.map(Duration::from_secs))
    }
}

fn print_summary(summary: &BatchSummary, json: bool) -> anyhow::Result<()> {
    if json {
        let body = serde_json::to_string_pretty(summary).context("serializing run summary")?;
        println!("{body}");
    } else {
        print!("{summary}");
    }
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so `--json` output stays machine readable.
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let summary = match run_batch(&args.config()) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "import run aborted");
            eprintln!("assetsync: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    print_summary(&summary, args.json)?;
    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
