//! Parallel aggregation of an in-memory buffer.
//!
//! The buffer is cut into one newline-aligned chunk per worker. Each worker
//! owns its own [`Stations`] and the results are merged station by station
//! once all workers are done, so no state is shared while aggregating apart
//! from the progress counter.

use std::{ops::Range, thread};

use tracing::{debug, info};

use crate::{
    engine::Aggregator,
    progress::{Progress, ProgressCounter},
    reader::SliceRecords,
    Config, Error, Report, Result, Stations,
};

/// Split `buf` into at most `parts` ranges, each ending right after a
/// newline (or at the end of the buffer) so no line straddles two ranges.
pub fn split_aligned(buf: &[u8], parts: usize) -> Vec<Range<usize>> {
    let chunk_len = buf.len().div_ceil(parts.max(1)).max(1);
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    while start < buf.len() {
        let end = (start + chunk_len).min(buf.len());
        let end = match buf[end..].iter().position(|&c| c == b'\n') {
            Some(offset) => end + offset + 1,
            None => buf.len(),
        };
        ranges.push(start..end);
        start = end;
    }
    ranges
}

fn process_chunk<'p>(chunk: &[u8], config: &Config, counter: &'p ProgressCounter<'p>) -> Stations {
    let mut aggregator = Aggregator::with_progress(counter, config.progress_interval);
    aggregator.extend(SliceRecords::new(chunk, config.delimiter));
    debug!(
        bytes = chunk.len(),
        records = aggregator.records(),
        skipped = aggregator.skipped(),
        stations = aggregator.stations().len(),
        "chunk done"
    );
    aggregator.into_stations()
}

/// Aggregate `buf` with `config.threads` workers. A single worker runs on the
/// calling thread.
pub fn process_buffer(buf: &[u8], config: &Config, progress: &dyn Progress) -> Result<Report> {
    let counter = ProgressCounter::new(progress);
    let ranges = split_aligned(buf, config.threads.get());

    let stations = if ranges.len() <= 1 {
        process_chunk(buf, config, &counter)
    } else {
        thread::scope(|s| {
            let handles = ranges
                .iter()
                .map(|range| {
                    let chunk = &buf[range.clone()];
                    let counter = &counter;
                    s.spawn(move || process_chunk(chunk, config, counter))
                })
                .collect::<Vec<_>>();

            // Join every worker before reporting a panic.
            let results = handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Vec<_>>();
            let mut stations = Stations::default();
            for result in results {
                stations.merge(result.map_err(|_| Error::WorkerPanicked)?);
            }
            Ok::<_, Error>(stations)
        })?
    };

    info!(
        records = counter.total(),
        stations = stations.len(),
        workers = ranges.len(),
        "sorting"
    );
    Ok(stations.finish())
}
