pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "casenote",
    about = "Casenote operator CLI",
    long_about = "Operate Casenote migrations, thread ingestion, config inspection, and readiness checks.",
    after_help = "Examples:\n  casenote doctor --json\n  casenote ingest\n  casenote reset --all"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Ingest email threads from a JSON file, or the bundled samples by default")]
    Ingest {
        #[arg(long, help = "Path to a JSON threads file; omit to load the bundled samples")]
        file: Option<PathBuf>,
    },
    #[command(about = "Delete workflow summaries; a full reset also truncates the export logs")]
    Reset {
        #[arg(long, help = "Reset a single thread, leaving export logs untouched")]
        thread_id: Option<String>,
        #[arg(long, help = "Delete every summary and truncate both export logs")]
        all: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credential presence, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Ingest { file } => commands::ingest::run(file.as_deref()),
        Command::Reset { thread_id, all } => commands::reset::run(thread_id.as_deref(), all),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
