//! Aggregation Engine
//!
//! Consumes records one at a time and folds the valid ones into a
//! [`Stations`] map. A record is valid when its station name is non-empty
//! UTF-8 and its temperature parses as a finite number; anything else is
//! skipped without touching any station.

use std::str;

use tracing::{info, trace};

use crate::{
    progress::ProgressCounter,
    reader::{Record, RecordSource},
    Report, Result, Stations,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    EmptyStation,
    StationEncoding,
    Temperature,
}

/// A record after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<'a> {
    Valid { station: &'a str, temperature: f64 },
    Malformed(Malformed),
}

impl<'a> Reading<'a> {
    pub fn parse(record: Record<'a>) -> Self {
        let Some(temperature) = parse_temperature(record.temperature) else {
            return Self::Malformed(Malformed::Temperature);
        };
        match str::from_utf8(record.station) {
            Ok("") => Self::Malformed(Malformed::EmptyStation),
            Ok(station) => Self::Valid {
                station,
                temperature,
            },
            Err(_) => Self::Malformed(Malformed::StationEncoding),
        }
    }
}

/// Surrounding ASCII whitespace (a trailing `\r` included) is ignored.
/// Non-finite values are rejected.
fn parse_temperature(bytes: &[u8]) -> Option<f64> {
    let text = str::from_utf8(bytes)
        .ok()?
        .trim_matches(|c: char| c.is_ascii_whitespace());
    let value = text.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Single-pass accumulator over a record sequence.
pub struct Aggregator<'p> {
    stations: Stations,
    records: u64,
    skipped: u64,
    pending: u64,
    progress_interval: u64,
    progress: Option<&'p ProgressCounter<'p>>,
}

impl Default for Aggregator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> Aggregator<'p> {
    pub fn new() -> Self {
        Self {
            stations: Stations::default(),
            records: 0,
            skipped: 0,
            pending: 0,
            progress_interval: u64::MAX,
            progress: None,
        }
    }

    /// Publishes the consumed record count to `counter` every
    /// `progress_interval` records and once more when the input ends.
    pub fn with_progress(counter: &'p ProgressCounter<'p>, progress_interval: u64) -> Self {
        Self {
            progress_interval: progress_interval.max(1),
            progress: Some(counter),
            ..Self::new()
        }
    }

    #[inline]
    pub fn push(&mut self, record: Record<'_>) {
        self.records += 1;
        match Reading::parse(record) {
            Reading::Valid {
                station,
                temperature,
            } => self.stations.update(station, temperature),
            Reading::Malformed(reason) => {
                self.skipped += 1;
                trace!(?reason, line = self.records, "skipping malformed record");
            }
        }
        self.pending += 1;
        if self.pending >= self.progress_interval {
            self.flush_progress();
        }
    }

    /// Infallible sources, e.g. [`SliceRecords`](crate::SliceRecords).
    pub fn extend<'r>(&mut self, records: impl IntoIterator<Item = Record<'r>>) {
        for record in records {
            self.push(record);
        }
        self.flush_progress();
    }

    /// Stops at the first read error; records consumed so far are kept but
    /// the caller is expected to discard the aggregator.
    pub fn consume<S: RecordSource>(&mut self, mut source: S) -> Result<()> {
        while let Some(record) = source.next_record()? {
            self.push(record);
        }
        self.flush_progress();
        Ok(())
    }

    fn flush_progress(&mut self) {
        if let Some(counter) = self.progress {
            counter.add(self.pending);
        }
        self.pending = 0;
    }

    /// Records consumed, valid or not.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn stations(&self) -> &Stations {
        &self.stations
    }

    pub fn into_stations(self) -> Stations {
        self.stations
    }

    pub fn finish(self) -> Report {
        info!(
            records = self.records,
            skipped = self.skipped,
            stations = self.stations.len(),
            "computing statistics"
        );
        self.stations.finish()
    }
}

/// Aggregates `source` to the end and returns the sorted, rounded report.
/// An empty source yields an empty report.
pub fn accumulate<S: RecordSource>(source: S) -> Result<Report> {
    let mut aggregator = Aggregator::new();
    aggregator.consume(source)?;
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, BufReader, Cursor, Read},
        sync::Mutex,
    };

    use proptest::prelude::*;

    use super::*;
    use crate::{process_reader, reader::StreamRecords, test, Config, NoProgress, SliceRecords};

    fn run(input: &str) -> Report {
        accumulate(SliceRecords::new(input.as_bytes(), b';')).unwrap()
    }

    fn record<'a>(station: &'a [u8], temperature: &'a [u8]) -> Record<'a> {
        Record {
            station,
            temperature,
        }
    }

    #[test]
    fn test_correctness_slice() {
        test::correctness(|buf| accumulate(SliceRecords::new(buf, b';')).unwrap());
    }

    #[test]
    fn test_correctness_stream() {
        test::correctness(|buf| accumulate(StreamRecords::new(Cursor::new(buf), b';')).unwrap());
    }

    #[test]
    fn test_parse_reading() {
        assert_eq!(
            Reading::parse(record(b"Oslo", b"-12.3")),
            Reading::Valid {
                station: "Oslo",
                temperature: -12.3
            }
        );
        assert_eq!(
            Reading::parse(record(b"Oslo", b" 4\r")),
            Reading::Valid {
                station: "Oslo",
                temperature: 4.0
            }
        );
        for temperature in [&b"not_a_number"[..], b"", b"NaN", b"inf", b"-infinity", b"1.0;2.0", b"\xff"] {
            assert_eq!(
                Reading::parse(record(b"Oslo", temperature)),
                Reading::Malformed(Malformed::Temperature)
            );
        }
        assert_eq!(
            Reading::parse(record(b"", b"1.0")),
            Reading::Malformed(Malformed::EmptyStation)
        );
        assert_eq!(
            Reading::parse(record(b"Os\xfflo", b"1.0")),
            Reading::Malformed(Malformed::StationEncoding)
        );
    }

    #[test]
    fn test_scenario_a() {
        let report = run("Oslo;5.0\nOslo;7.0\nBergen;3.5");
        assert_eq!(report.len(), 2);
        assert_eq!(report.get("Bergen").unwrap().to_string(), "3.5/3.5/3.5");
        assert_eq!(report.get("Oslo").unwrap().to_string(), "5.0/6.0/7.0");
    }

    #[test]
    fn test_scenario_b_malformed_is_excluded() {
        let report = run("Oslo;5.0\nOslo;not_a_number\nOslo;7.0\nOslo;-40x\n");
        assert_eq!(report.get("Oslo").unwrap().to_string(), "5.0/6.0/7.0");
    }

    #[test]
    fn test_scenario_c_empty_input() {
        let report = run("");
        assert!(report.is_empty());
        let report = accumulate(StreamRecords::new(Cursor::new(b""), b';')).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_scenario_d_single_reading() {
        let report = run("X;10.0\n");
        assert_eq!(report.get("X").unwrap().to_string(), "10.0/10.0/10.0");
    }

    #[test]
    fn test_huge_readings_print_finite() {
        let report = run("X;1e308\nY;-2e307\nZ;1.7e308\nZ;1.7e308\n");
        let x = report.get("X").unwrap();
        assert_eq!((x.min, x.mean, x.max), (1e308, 1e308, 1e308));
        let y = report.get("Y").unwrap();
        assert_eq!((y.min, y.mean, y.max), (-2e307, -2e307, -2e307));
        let z = report.get("Z").unwrap();
        assert_eq!((z.min, z.mean, z.max), (1.7e308, 1.7e308, 1.7e308));

        let output = report.to_string();
        assert!(!output.contains("inf") && !output.contains("NaN"), "{}", output);
        assert_eq!(output.lines().count(), 3);
    }

    /// Serves `lines` once, then fails every read.
    struct BrokenPipe {
        lines: &'static [u8],
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.lines.is_empty() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            self.lines.read(buf)
        }
    }

    #[test]
    fn test_read_failure_mid_stream_is_fatal() {
        let reader = BufReader::new(BrokenPipe {
            lines: b"Oslo;5.0\nOslo;7.0\nBergen;3.5\n",
        });
        let err = process_reader(reader, &Config::default(), &NoProgress).unwrap_err();
        assert!(err.is_stream_unreadable());

        let source = StreamRecords::new(BufReader::new(BrokenPipe { lines: b"X;1.0\n" }), b';');
        assert!(accumulate(source).unwrap_err().is_stream_unreadable());
    }

    #[test]
    fn test_malformed_never_creates_station() {
        let mut aggregator = Aggregator::new();
        aggregator.extend(SliceRecords::new(b"Ghost;n/a\nGhost\n;1.0\nReal;1.0", b';'));
        assert_eq!(aggregator.records(), 4);
        assert_eq!(aggregator.skipped(), 3);
        assert!(aggregator.stations().get("Ghost").is_none());
        assert_eq!(aggregator.stations().len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let report = accumulate(SliceRecords::new(b"Oslo,5.0\nOslo;7.0\nOslo,7.0", b',')).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.get("Oslo").unwrap().to_string(), "5.0/6.0/7.0");
    }

    #[test]
    fn test_progress_counts_every_record() {
        let seen = Mutex::new(vec![]);
        let observer = |records: u64| seen.lock().unwrap().push(records);
        let counter = ProgressCounter::new(&observer);
        let mut aggregator = Aggregator::with_progress(&counter, 2);
        aggregator.extend(SliceRecords::new(b"A;1.0\nA;bad\nB;2.0\nC;3.0\nD;4.0", b';'));
        assert_eq!(*seen.lock().unwrap(), vec![2, 4, 5]);
        assert_eq!(counter.total(), 5);
        assert_eq!(aggregator.finish().len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let input = "b;1.5\na;-3.0\nb;2.25\nc;0.0\na;8.1\n";
        assert_eq!(run(input), run(input));
        assert_eq!(run(input).to_string(), run(input).to_string());
    }

    fn line() -> impl Strategy<Value = String> {
        prop_oneof![
            4 => ("[A-E]", -999i32..=999).prop_map(|(name, t)| format!("{};{:.1}", name, t as f64 / 10.)),
            1 => ("[A-F]", "[a-z_]{0,6}").prop_map(|(name, junk)| format!("{};{}", name, junk)),
            1 => "[A-F]{0,3}",
        ]
    }

    proptest! {
        #[test]
        fn skipped_lines_do_not_change_report(lines in prop::collection::vec(line(), 0..60)) {
            let with_junk = lines.join("\n");
            let valid = lines
                .iter()
                .filter(|line| matches!(
                    Reading::parse(Record::split(line.as_bytes(), b';')),
                    Reading::Valid { .. }
                ))
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
            prop_assert_eq!(run(&with_junk), run(&valid));
        }

        #[test]
        fn report_is_sorted_and_bounded(lines in prop::collection::vec(line(), 0..60)) {
            let report = run(&lines.join("\n"));
            let names = report.iter().map(|(name, _)| name).collect::<Vec<_>>();
            prop_assert!(names.windows(2).all(|w| w[0] < w[1]));
            for (_, summary) in report.iter() {
                prop_assert!(summary.min <= summary.mean && summary.mean <= summary.max);
            }
        }
    }
}
