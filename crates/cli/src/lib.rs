pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use curator_core::config::{AppConfig, LogFormat};

use crate::commands::GlobalOptions;

#[derive(Debug, Parser)]
#[command(
    name = "curator",
    about = "Catalog curation batch jobs",
    long_about = "Cluster item embeddings into labeled topics, build engagement recommendations, \
                  and inject model scores into catalog files.",
    after_help = "Examples:\n  curator cluster\n  curator score --json\n  \
                  curator all --data-dir ./data"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a curator.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the data directory")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the log level (trace, debug, info, warn, error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Emit machine-readable JSON output")]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Cluster item embeddings and write labeled topic clusters")]
    Cluster,
    #[command(about = "Factorize engagement data and write similar-item recommendations")]
    Recommend,
    #[command(about = "Inject model scores into catalog files and rank categories")]
    Score,
    #[command(about = "Run cluster, recommend, and score in order, stopping at the first failure")]
    All,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.global.config,
        data_dir: cli.global.data_dir,
        log_level: cli.global.log_level,
        json: cli.global.json,
    };

    if !matches!(cli.command, Command::Config) {
        if let Ok(config) = AppConfig::load(options.load_options()) {
            init_logging(&config);
        }
    }

    let result = match cli.command {
        Command::Cluster => commands::cluster::run(&options),
        Command::Recommend => commands::recommend::run(&options),
        Command::Score => commands::score::run(&options),
        Command::All => commands::all::run(&options),
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed by an embedding process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
