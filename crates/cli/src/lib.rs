pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::commands::simulate::SimulateOptions;

#[derive(Debug, Parser)]
#[command(
    name = "ringside",
    about = "Ringside sales conversation simulator",
    long_about = "Run simulated sales conversations between a sales agent and randomized prospects, then score intent detection and booking outcomes.",
    after_help = "Examples:\n  ringside simulate --count 20 --seed 7\n  ringside report transcripts/conversation_transcripts_20240601_093000.json\n  ringside config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a batch of simulated conversations and save the transcripts")]
    Simulate(SimulateArgs),
    #[command(about = "Score a saved transcript file")]
    Report {
        #[arg(help = "Path to a conversation_transcripts_*.json file")]
        file: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[arg(long, help = "Number of conversations to run")]
    count: Option<u32>,
    #[arg(long, help = "Maximum sales/prospect exchanges per conversation")]
    max_exchanges: Option<u32>,
    #[arg(long, help = "Conversations allowed in flight at once")]
    concurrency: Option<u32>,
    #[arg(long, help = "Seed for reproducible prospect profiles")]
    seed: Option<u64>,
    #[arg(long, help = "Directory for the transcript file")]
    output_dir: Option<PathBuf>,
    #[arg(long, help = "Skip writing the transcript file")]
    no_save: bool,
}

impl From<SimulateArgs> for SimulateOptions {
    fn from(args: SimulateArgs) -> Self {
        Self {
            count: args.count,
            max_exchanges: args.max_exchanges,
            concurrency: args.concurrency,
            seed: args.seed,
            output_dir: args.output_dir,
            no_save: args.no_save,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Simulate(args) => commands::simulate::run(args.into()),
        Command::Report { file, json } => commands::report::run(&file, json),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
