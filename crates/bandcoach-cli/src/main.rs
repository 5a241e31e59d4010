//! bandcoach CLI: track a predicted band score, run repair drills, and
//! apply decay from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "bandcoach", version, about = "Exam band-score coach")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show score, streak, and active weaknesses
    Status,

    /// Ingest a graded mock test
    MockTest {
        /// Path to the graded mock-test TOML file
        #[arg(long)]
        result: PathBuf,
    },

    /// Run a repair drill, optionally targeting one weakness
    Repair {
        /// Weakness topic to clear (e.g. "Match Headings")
        #[arg(long)]
        topic: Option<String>,
    },

    /// Run an untargeted daily-mix drill
    DailyMix {
        /// Content category (e.g. "Vocab", "Reading")
        #[arg(long)]
        category: String,
    },

    /// Record a speaking answer
    Record {
        /// Stop the recording early after this many milliseconds
        #[arg(long)]
        stop_after_ms: Option<u64>,
    },

    /// Apply score decay
    Decay {
        /// Decay amount (defaults to the configured amount)
        #[arg(long)]
        amount: Option<f64>,

        /// Only decay if the learner has been inactive long enough
        #[arg(long)]
        if_inactive: bool,
    },

    /// Reset the score
    Reset {
        /// Band to reset to
        #[arg(long, default_value = "6.5")]
        score: f64,

        /// Keep the active weaknesses
        #[arg(long)]
        keep_weaknesses: bool,
    },

    /// Create a starter config and an example mock-test result
    Init,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bandcoach=info,bandcoach_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Status => commands::status::execute(config),
        Commands::MockTest { result } => commands::mock_test::execute(result, config).await,
        Commands::Repair { topic } => commands::repair::execute(topic, config).await,
        Commands::DailyMix { category } => commands::daily_mix::execute(category, config).await,
        Commands::Record { stop_after_ms } => commands::record::execute(stop_after_ms, config).await,
        Commands::Decay {
            amount,
            if_inactive,
        } => commands::decay::execute(amount, if_inactive, config),
        Commands::Reset {
            score,
            keep_weaknesses,
        } => commands::reset::execute(score, keep_weaknesses, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
