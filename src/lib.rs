//! Per-station min/mean/max over a large `station;temperature` file.
//!
//! The input is consumed in a single pass. Memory grows with the number of
//! distinct stations, never with the number of records, so the station set is
//! assumed to be small and bounded. Records whose temperature does not parse
//! are skipped.
//!
//! ```no_run
//! use station_stats::{process_file, Config};
//!
//! let report = process_file("data/measurements.txt", &Config::parallel())?;
//! print!("{}", report);
//! # Ok::<(), station_stats::Error>(())
//! ```

mod config;
pub mod engine;
mod error;
pub mod generate;
mod hash;
pub mod parallel;
pub mod progress;
pub mod reader;

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::File,
    io::BufRead,
    path::Path,
};

use memmap2::Mmap;
use tracing::info;

pub use config::{Config, DEFAULT_DELIMITER, DEFAULT_PROGRESS_INTERVAL};
pub use engine::{accumulate, Aggregator, Malformed, Reading};
pub use error::{Error, Result};
pub use progress::{NoProgress, Progress};
pub use reader::{Record, RecordSource, SliceRecords, StreamRecords};

use hash::BuildFxHash;
use progress::ProgressCounter;

/// Magnitude from which every `f64` is an integer, so already exact at tenths.
const EXACT_AT_TENTHS: f64 = 1e15;

/// Round to one decimal, ties away from zero. `-0.0` becomes `0.0`.
fn round_to_tenths(x: f64) -> f64 {
    if x.abs() >= EXACT_AT_TENTHS {
        return x;
    }
    let rounded = (x * 10.).round() / 10.;
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}

/// Neumaier compensated summation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub const ZERO: Self = Self {
        sum: 0.,
        compensation: 0.,
    };

    #[inline]
    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn merge(&mut self, other: &CompensatedSum) {
        self.add(other.sum);
        self.compensation += other.compensation;
    }

    /// Saturates to `±inf` once the running sum overflows.
    pub fn value(&self) -> f64 {
        if !self.sum.is_finite() {
            return self.sum;
        }
        self.sum + self.compensation
    }
}

/// Running statistics of one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub min: f64,
    pub max: f64,
    sum: CompensatedSum,
    pub count: u64,
}

impl Default for Station {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Station {
    pub const MIN_SENTINEL: f64 = f64::INFINITY;
    pub const MAX_SENTINEL: f64 = f64::NEG_INFINITY;

    /// No readings yet. Identity element of [`Station::merge`].
    pub const EMPTY: Self = Self {
        min: Self::MIN_SENTINEL,
        max: Self::MAX_SENTINEL,
        sum: CompensatedSum::ZERO,
        count: 0,
    };

    pub fn new(temp: f64) -> Self {
        let mut station = Self::EMPTY;
        station.update(temp);
        station
    }

    #[inline]
    pub fn update(&mut self, temp: f64) {
        self.min = self.min.min(temp);
        self.max = self.max.max(temp);
        self.sum.add(temp);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &Station) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum.merge(&other.sum);
        self.count += other.count;
    }

    pub fn sum(&self) -> f64 {
        self.sum.value()
    }

    /// Clamped to `[min, max]` so rounding noise in the sum cannot push the
    /// mean outside the observed range. An overflowed sum saturates to the
    /// bound on its side, and merging two sums that overflowed in opposite
    /// directions falls back to the midpoint. NaN when there are no readings.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let mean = self.sum() / self.count as f64;
        if mean.is_nan() {
            return self.min / 2. + self.max / 2.;
        }
        mean.clamp(self.min, self.max)
    }

    fn summary(&self) -> Summary {
        Summary {
            min: round_to_tenths(self.min),
            mean: round_to_tenths(self.mean()),
            max: round_to_tenths(self.max),
        }
    }
}

/// Aggregation state: one [`Station`] per distinct name.
#[derive(Debug, Default)]
pub struct Stations {
    inner: HashMap<Box<str>, Station, BuildFxHash>,
}

impl Stations {
    /// Only allocates the first time a name is seen.
    pub fn update(&mut self, name: &str, temp: f64) {
        if let Some(station) = self.inner.get_mut(name) {
            station.update(temp);
        } else {
            self.inner.insert(name.into(), Station::new(temp));
        }
    }

    pub fn merge(&mut self, other: Stations) {
        for (name, other_station) in other.inner {
            self.inner
                .entry(name)
                .and_modify(|station| station.merge(&other_station))
                .or_insert(other_station);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Station> {
        self.inner.get(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sorts by name and rounds every station's statistics.
    pub fn finish(self) -> Report {
        Report {
            inner: self
                .inner
                .into_iter()
                .map(|(name, station)| (name.into_string(), station.summary()))
                .collect(),
        }
    }
}

/// Rounded min/mean/max of one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}/{:.1}/{:.1}", self.min, self.mean, self.max)
    }
}

/// Final result, ordered by station name (byte-wise).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    inner: BTreeMap<String, Summary>,
}

impl Report {
    pub fn get(&self, name: &str) -> Option<&Summary> {
        self.inner.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Summary)> {
        self.inner.iter().map(|(name, summary)| (name.as_str(), summary))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One `<station>: <min>/<mean>/<max>` line per station.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, summary) in &self.inner {
            writeln!(f, "{}: {}", name, summary)?;
        }
        Ok(())
    }
}

pub fn process_file(path: impl AsRef<Path>, config: &Config) -> Result<Report> {
    process_file_with_progress(path, config, &NoProgress)
}

/// Memory maps the file and aggregates it with `config.threads` workers.
pub fn process_file_with_progress(
    path: impl AsRef<Path>,
    config: &Config,
    progress: &dyn Progress,
) -> Result<Report> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::unreadable_path(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::unreadable_path(path, e))?
        .len();
    info!(path = %path.display(), bytes = len, "loading measurements");
    if len == 0 {
        return Ok(Report::default());
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::unreadable_path(path, e))?;
    parallel::process_buffer(&mmap, config, progress)
}

/// Number of records (lines) in the file, for showing progress as a fraction.
/// A final line without a trailing newline counts too.
pub fn count_records(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::unreadable_path(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::unreadable_path(path, e))?
        .len();
    if len == 0 {
        return Ok(0);
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::unreadable_path(path, e))?;
    Ok(reader::count_lines(&mmap))
}

/// Sequential aggregation of any buffered stream, e.g. stdin.
pub fn process_reader<R: BufRead>(
    reader: R,
    config: &Config,
    progress: &dyn Progress,
) -> Result<Report> {
    let counter = ProgressCounter::new(progress);
    let mut aggregator = Aggregator::with_progress(&counter, config.progress_interval);
    aggregator.consume(StreamRecords::new(reader, config.delimiter))?;
    Ok(aggregator.finish())
}
