use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use station_stats::generate::write_measurements;

/// Generate a synthetic `station;temperature` file
#[derive(Debug, Parser)]
struct Args {
    /// Number of rows, `_` separators allowed (e.g. 1_000_000)
    rows: String,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let rows: u64 = args
        .rows
        .replace('_', "")
        .parse()
        .with_context(|| format!("invalid row count {:?}", args.rows))?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    write_measurements(BufWriter::new(out), rows, args.seed)?;
    Ok(())
}
