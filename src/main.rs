use std::{
    io::{self, Write},
    num::NonZeroUsize,
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use station_stats::{
    count_records, process_file_with_progress, process_reader, Config, NoProgress, Progress,
};
use tracing_subscriber::EnvFilter;

/// Per-station min/mean/max temperatures
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Measurements file, `-` for stdin
    #[arg(default_value = "data/measurements.txt")]
    path: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Worker threads [default: available cores]
    #[arg(short, long)]
    threads: Option<NonZeroUsize>,

    /// Report records processed on stderr
    #[arg(long)]
    progress: bool,

    /// Log phases and counts
    #[arg(short, long)]
    verbose: bool,
}

/// `total` is known for files, not for stdin.
struct StderrProgress {
    total: Option<u64>,
}

impl Progress for StderrProgress {
    fn on_progress(&self, records: u64) {
        match self.total {
            Some(total) if total > 0 => eprint!(
                "\rProcessing: {}/{} records ({:.0}%)",
                records,
                total,
                records as f64 * 100. / total as f64
            ),
            _ => eprint!("\rProcessing: {} records", records),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = Config::parallel().with_delimiter(args.delimiter)?;
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    let stdin = args.path.as_os_str() == "-";
    let stderr_progress;
    let progress: &dyn Progress = if args.progress {
        let total = if stdin {
            None
        } else {
            Some(
                count_records(&args.path)
                    .with_context(|| format!("failed to read {}", args.path.display()))?,
            )
        };
        stderr_progress = StderrProgress { total };
        &stderr_progress
    } else {
        &NoProgress
    };

    let start = Instant::now();
    let report = if stdin {
        process_reader(io::stdin().lock(), &config, progress)
    } else {
        process_file_with_progress(&args.path, &config, progress)
    }
    .with_context(|| format!("failed to process {}", args.path.display()))?;
    let elapsed = start.elapsed();
    if args.progress {
        eprintln!();
    }

    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", report)?;
    writeln!(stdout, "\nProcessed in {:.2} seconds", elapsed.as_secs_f64())?;
    Ok(())
}
