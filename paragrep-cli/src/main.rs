use clap::{Parser, Subcommand};
use paragrep::{scan, worker, ScanConfig, ScanError, ScanResult, MAX_WORKERS};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "paragrep",
    version,
    about = "Print paragraphs of a text file matching a regular expression, \
             scanned in parallel by a pool of worker processes",
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// POSIX extended regular expression to match paragraphs against
    #[arg(value_name = "PATTERN", required = true)]
    pattern: Option<String>,

    /// Text file to scan
    #[arg(value_name = "FILE", required = true)]
    file: Option<PathBuf>,

    /// Number of worker processes
    #[arg(
        value_name = "NUM_WORKERS",
        required = true,
        value_parser = clap::value_parser!(u32).range(1..=MAX_WORKERS as i64)
    )]
    num_workers: Option<u32>,

    /// Per-chunk CSV log file, overwritten at startup
    #[arg(value_name = "LOGFILE", required = true)]
    logfile: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Internal mode: run as a scan worker over stdin/stdout pipes.
    #[command(name = "__worker", hide = true)]
    Worker {
        /// Worker id carried in frames and the chunk log
        #[arg(long)]
        id: u32,

        /// Input file; each worker opens its own read handle
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr in both modes: the coordinator's stdout
    // carries matched paragraphs and a worker's stdout carries frames.
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("paragrep: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ScanResult<()> {
    if let Some(Commands::Worker { id, file }) = cli.command {
        return worker::run(id, &file);
    }

    let (pattern, file, workers, logfile) =
        match (cli.pattern, cli.file, cli.num_workers, cli.logfile) {
            (Some(pattern), Some(file), Some(workers), Some(logfile)) => {
                (pattern, file, workers, logfile)
            }
            _ => {
                return Err(ScanError::config_error(
                    "usage: paragrep <pattern> <file> <num_workers> <logfile>",
                ))
            }
        };

    let config = ScanConfig::new(pattern, file, workers as usize, logfile)?;
    scan(&config)?;
    Ok(())
}
